//! Evaluation of charstrings into the spline model.

use kurbo::Point as KPoint;

use super::{
    blend::BlendState, number, operator::Operator, stack::Stack, CffContext, CharstringVersion,
    NESTING_DEPTH_LIMIT,
};
use crate::{
    data::Cursor,
    error::CharstringError,
    hint::{mask_byte_len, HintMask},
    model::{ComponentRef, CurveOrder, FigureBuilder, Glyph, OutlineFormat, PointId},
    round::round_to_precision,
    Decoded,
};

/// Number of slots in the transient array used by `put` and `get`.
const TRANSIENT_ARRAY_LEN: usize = 32;

/// Othersubr numbers with defined meaning in Type1 fonts.
const OTHERSUBR_FLEX_END: i32 = 0;
const OTHERSUBR_FLEX_START: i32 = 1;
const OTHERSUBR_FLEX_POINT: i32 = 2;
const OTHERSUBR_HINT_REPLACEMENT: i32 = 3;

/// Decodes a single charstring into a glyph.
///
/// The glyph is always returned. Problems that prevent the charstring from
/// being fully evaluated are listed in the diagnostics and the glyph holds
/// whatever was built up to that point.
///
/// Type1 charstrings are expected to be decrypted already; see
/// [`decrypt_charstring`](super::decrypt_charstring).
pub fn decode_charstring(data: &[u8], ctx: &CffContext) -> Decoded<Glyph, CharstringError> {
    decode_charstring_with_hint_count(data, ctx).0
}

/// Decodes a charstring, also returning the hint count once it ends.
///
/// Mask lengths account for the [`hint_count`](CffContext::hint_count)
/// stems declared before this charstring began. The returned count adds
/// the stems declared here, ready to seed the context for a charstring
/// that continues from this one.
pub fn decode_charstring_with_hint_count(
    data: &[u8],
    ctx: &CffContext,
) -> (Decoded<Glyph, CharstringError>, usize) {
    let mut interpreter = Interpreter::new(*ctx);
    if let Err(e) = interpreter.run(data) {
        log::debug!("charstring evaluation stopped: {e}");
        interpreter.diagnostics.push(e);
    }
    interpreter.finish()
}

/// Type1 flex state. Points are captured from `rmoveto` while active.
#[derive(Default)]
struct FlexCapture {
    active: bool,
    points: Vec<KPoint>,
}

struct Interpreter<'a> {
    ctx: CffContext<'a>,
    version: CharstringVersion,
    stack: Stack,
    builder: FigureBuilder,
    glyph: Glyph,
    diagnostics: Vec<CharstringError>,
    x: f64,
    y: f64,
    width_parsed: bool,
    /// Hint numbers of the stems in charstring declaration order. Mask bit
    /// `ctx.hint_count + i` refers to entry `i`.
    declared: Vec<u16>,
    /// Mask to attach to the next point created.
    pending_mask: Option<HintMask>,
    /// Set while stems are being collected for a Type1 hint replacement.
    replacing_hints: bool,
    blend: Option<BlendState<'a>>,
    transient: [f64; TRANSIENT_ARRAY_LEN],
    random_seed: u32,
    // Type1 side bearing point
    sbx: f64,
    sby: f64,
    flex: FlexCapture,
    /// Results of `callothersubr`, retrieved with `pop`.
    ps_stack: Vec<f64>,
}

impl<'a> Interpreter<'a> {
    fn new(ctx: CffContext<'a>) -> Self {
        let version = ctx.version;
        let mut glyph = Glyph::new(OutlineFormat::PostScript);
        if version == CharstringVersion::Type2 {
            glyph.advance_width = ctx.private.default_width_x();
        }
        Self {
            ctx,
            version,
            stack: Stack::new(version.max_stack()),
            builder: FigureBuilder::new(CurveOrder::Cubic),
            glyph,
            diagnostics: Vec::new(),
            x: 0.0,
            y: 0.0,
            width_parsed: false,
            declared: Vec::new(),
            pending_mask: None,
            replacing_hints: false,
            blend: None,
            transient: [0.0; TRANSIENT_ARRAY_LEN],
            random_seed: 0x2545_f491,
            sbx: 0.0,
            sby: 0.0,
            flex: FlexCapture::default(),
            ps_stack: Vec::new(),
        }
    }

    /// Evaluates the charstring, expanding subroutine calls.
    fn run<'d>(&mut self, data: &'d [u8]) -> Result<(), CharstringError>
    where
        'a: 'd,
    {
        let mut frames = vec![Cursor::new(data)];
        while let Some(cursor) = frames.last_mut() {
            if cursor.remaining_bytes() == 0 {
                frames.pop();
                continue;
            }
            let b0 = cursor
                .read::<u8>()
                .map_err(|_| CharstringError::UnexpectedEnd)?;
            if number::is_operand_prefix(b0, self.version) {
                let value = number::parse_operand(cursor, b0, self.version)?;
                self.stack.push(value)?;
                continue;
            }
            let operator = match Operator::read(cursor, b0, self.version) {
                Ok(operator) => operator,
                Err(err @ CharstringError::UnsupportedOperator { name: "dotsection", .. }) => {
                    self.report(err);
                    self.stack.clear();
                    continue;
                }
                Err(err) => return Err(err),
            };
            match operator {
                Operator::CallSubr | Operator::CallGsubr => {
                    let index = self.stack.pop_i32()?;
                    let subrs = if operator == Operator::CallSubr {
                        self.ctx.local_subrs
                    } else {
                        self.ctx.global_subrs
                    };
                    if frames.len() > NESTING_DEPTH_LIMIT as usize {
                        self.report(CharstringError::NestingDepthLimitExceeded);
                        continue;
                    }
                    match subrs.get(index) {
                        Ok(subr) => frames.push(Cursor::new(subr)),
                        Err(err) => self.report(err),
                    }
                }
                Operator::Return => {
                    frames.pop();
                }
                Operator::EndChar => {
                    self.end_char()?;
                    break;
                }
                Operator::HintMask | Operator::CntrMask => {
                    self.mask(operator == Operator::CntrMask, cursor)?;
                }
                _ => self.evaluate(operator)?,
            }
        }
        Ok(())
    }

    fn finish(mut self) -> (Decoded<Glyph, CharstringError>, usize) {
        let hint_count = self.hint_count();
        let figure = std::mem::take(&mut self.builder).finish();
        if !figure.is_empty() {
            self.glyph.figures.push(figure);
        }
        self.glyph.compute_bbox();
        if self.version != CharstringVersion::Type1 {
            self.glyph.lsb = self.glyph.bbox.x0;
        }
        (Decoded::new(self.glyph, self.diagnostics), hint_count)
    }

    /// Stems declared so far, including those declared before this
    /// charstring.
    fn hint_count(&self) -> usize {
        self.ctx.hint_count + self.declared.len()
    }

    fn evaluate(&mut self, operator: Operator) -> Result<(), CharstringError> {
        use Operator::*;
        match operator {
            HStem | HStemHm => {
                self.add_stems(true)?;
                self.stack.clear();
            }
            VStem | VStemHm => {
                self.add_stems(false)?;
                self.stack.clear();
            }
            HStem3 | VStem3 => {
                let horizontal = operator == HStem3;
                let values = self.stack.get_array::<6>(0)?;
                for pair in values.chunks_exact(2) {
                    self.add_stem(horizontal, pair[0], pair[1])?;
                }
                self.stack.clear();
            }
            RMoveTo => {
                self.take_width(self.stack.len() > 2);
                let [dx, dy] = self.stack.get_array::<2>(0)?;
                self.move_to(dx, dy);
                self.stack.clear();
            }
            HMoveTo | VMoveTo => {
                self.take_width(self.stack.len() > 1);
                let delta = self.stack.get(0)?;
                if operator == HMoveTo {
                    self.move_to(delta, 0.0);
                } else {
                    self.move_to(0.0, delta);
                }
                self.stack.clear();
            }
            RLineTo => {
                self.stack.verify_at_least_len(2)?;
                let mut i = 0;
                while i + 2 <= self.stack.len() {
                    let [dx, dy] = self.stack.get_array::<2>(i)?;
                    self.line_to(dx, dy);
                    i += 2;
                }
                self.stack.clear();
            }
            HLineTo | VLineTo => {
                self.stack.verify_at_least_len(1)?;
                let mut horizontal = operator == HLineTo;
                for i in 0..self.stack.len() {
                    let delta = self.stack.get(i)?;
                    if horizontal {
                        self.line_to(delta, 0.0);
                    } else {
                        self.line_to(0.0, delta);
                    }
                    horizontal = !horizontal;
                }
                self.stack.clear();
            }
            RrCurveTo => {
                self.stack.verify_at_least_len(6)?;
                let mut i = 0;
                while i + 6 <= self.stack.len() {
                    let args = self.stack.get_array::<6>(i)?;
                    self.curve_to(args);
                    i += 6;
                }
                self.stack.clear();
            }
            RCurveLine => {
                self.stack.verify_at_least_len(8)?;
                let curve_end = self.stack.len() - 2;
                let mut i = 0;
                while i + 6 <= curve_end {
                    let args = self.stack.get_array::<6>(i)?;
                    self.curve_to(args);
                    i += 6;
                }
                let [dx, dy] = self.stack.get_array::<2>(curve_end)?;
                self.line_to(dx, dy);
                self.stack.clear();
            }
            RLineCurve => {
                self.stack.verify_at_least_len(8)?;
                let line_end = self.stack.len() - 6;
                let mut i = 0;
                while i + 2 <= line_end {
                    let [dx, dy] = self.stack.get_array::<2>(i)?;
                    self.line_to(dx, dy);
                    i += 2;
                }
                let args = self.stack.get_array::<6>(line_end)?;
                self.curve_to(args);
                self.stack.clear();
            }
            VvCurveTo => {
                let mut i = 0;
                let mut dx1 = 0.0;
                if self.stack.len_is_odd() {
                    dx1 = self.stack.get(0)?;
                    i = 1;
                }
                self.stack.verify_at_least_len(i + 4)?;
                while i + 4 <= self.stack.len() {
                    let [dy1, dx2, dy2, dy3] = self.stack.get_array::<4>(i)?;
                    self.curve_to([dx1, dy1, dx2, dy2, 0.0, dy3]);
                    dx1 = 0.0;
                    i += 4;
                }
                self.stack.clear();
            }
            HhCurveTo => {
                let mut i = 0;
                let mut dy1 = 0.0;
                if self.stack.len_is_odd() {
                    dy1 = self.stack.get(0)?;
                    i = 1;
                }
                self.stack.verify_at_least_len(i + 4)?;
                while i + 4 <= self.stack.len() {
                    let [dx1, dx2, dy2, dx3] = self.stack.get_array::<4>(i)?;
                    self.curve_to([dx1, dy1, dx2, dy2, dx3, 0.0]);
                    dy1 = 0.0;
                    i += 4;
                }
                self.stack.clear();
            }
            VhCurveTo | HvCurveTo => {
                self.stack.verify_at_least_len(4)?;
                let len = self.stack.len();
                let mut horizontal = operator == HvCurveTo;
                let mut i = 0;
                while i + 4 <= len {
                    let [a, b, c, d] = self.stack.get_array::<4>(i)?;
                    // the final curve may carry a fifth operand
                    let last = if len - i == 5 { self.stack.get(i + 4)? } else { 0.0 };
                    if horizontal {
                        self.curve_to([a, 0.0, b, c, last, d]);
                    } else {
                        self.curve_to([0.0, a, b, c, d, last]);
                    }
                    horizontal = !horizontal;
                    i += 4;
                }
                self.stack.clear();
            }
            HFlex => {
                let [dx1, dx2, dy2, dx3, dx4, dx5, dx6] = self.stack.get_array::<7>(0)?;
                self.curve_to([dx1, 0.0, dx2, dy2, dx3, 0.0]);
                self.curve_to([dx4, 0.0, dx5, -dy2, dx6, 0.0]);
                self.stack.clear();
            }
            Flex => {
                let args = self.stack.get_array::<12>(0)?;
                self.curve_to([args[0], args[1], args[2], args[3], args[4], args[5]]);
                self.curve_to([args[6], args[7], args[8], args[9], args[10], args[11]]);
                self.stack.clear();
            }
            HFlex1 => {
                let [dx1, dy1, dx2, dy2, dx3, dx4, dx5, dy5, dx6] = self.stack.get_array::<9>(0)?;
                self.curve_to([dx1, dy1, dx2, dy2, dx3, 0.0]);
                self.curve_to([dx4, 0.0, dx5, dy5, dx6, -(dy1 + dy2 + dy5)]);
                self.stack.clear();
            }
            Flex1 => {
                let args = self.stack.get_array::<11>(0)?;
                let dx: f64 = args[..10].iter().step_by(2).sum();
                let dy: f64 = args[1..10].iter().step_by(2).sum();
                let (dx6, dy6) = if dx.abs() > dy.abs() {
                    (args[10], -dy)
                } else {
                    (-dx, args[10])
                };
                self.curve_to([args[0], args[1], args[2], args[3], args[4], args[5]]);
                self.curve_to([args[6], args[7], args[8], args[9], dx6, dy6]);
                self.stack.clear();
            }
            ClosePath => {
                self.builder.close();
                self.stack.clear();
            }
            Hsbw => {
                let [sbx, wx] = self.stack.get_array::<2>(0)?;
                self.set_side_bearing(sbx, 0.0, wx);
                self.stack.clear();
            }
            Sbw => {
                let [sbx, sby, wx, _wy] = self.stack.get_array::<4>(0)?;
                self.set_side_bearing(sbx, sby, wx);
                self.stack.clear();
            }
            Seac => {
                let [asb, adx, ady, bchar, achar] = self.stack.get_array::<5>(0)?;
                self.add_accented_refs(bchar, achar, adx + self.sbx - asb, ady);
                self.stack.clear();
            }
            SetCurrentPoint => {
                let [x, y] = self.stack.get_array::<2>(0)?;
                self.x = x;
                self.y = y;
                self.stack.clear();
            }
            CallOtherSubr => self.call_other_subr()?,
            Pop => {
                let value = self.ps_stack.pop().ok_or(CharstringError::StackUnderflow)?;
                self.stack.push(value)?;
            }
            VariationStoreIndex => {
                let index = self.stack.pop_i32()?;
                let store = self
                    .ctx
                    .var_store
                    .ok_or(CharstringError::MissingBlendState)?;
                let index = u16::try_from(index)
                    .map_err(|_| CharstringError::InvalidVariationStoreIndex(u16::MAX))?;
                match &mut self.blend {
                    Some(blend) => blend.set_store_index(index)?,
                    None => self.blend = Some(BlendState::new(store, self.ctx.coords, index)?),
                }
                self.stack.clear();
            }
            Blend => {
                if self.blend.is_none() {
                    let store = self
                        .ctx
                        .var_store
                        .ok_or(CharstringError::MissingBlendState)?;
                    let index = self.ctx.private.vsindex();
                    self.blend = Some(BlendState::new(store, self.ctx.coords, index)?);
                }
                if let Some(blend) = &self.blend {
                    self.stack.apply_blend(blend)?;
                }
            }
            DotSection => self.stack.clear(),
            And | Or | Not | Abs | Add | Sub | Div | Neg | Eq | Drop | Put | Get | IfElse
            | Random | Mul | Sqrt | Dup | Exch | Index | Roll => self.arithmetic(operator)?,
            CallSubr | CallGsubr | Return | EndChar | HintMask | CntrMask => {}
        }
        Ok(())
    }

    fn arithmetic(&mut self, operator: Operator) -> Result<(), CharstringError> {
        use Operator::*;
        let bool_value = |b: bool| if b { 1.0 } else { 0.0 };
        match operator {
            And | Or | Add | Sub | Div | Mul | Eq => {
                let b = self.stack.pop()?;
                let a = self.stack.pop()?;
                let result = match operator {
                    And => bool_value(a != 0.0 && b != 0.0),
                    Or => bool_value(a != 0.0 || b != 0.0),
                    Add => a + b,
                    Sub => a - b,
                    Div if b == 0.0 => 0.0,
                    Div => a / b,
                    Mul => a * b,
                    _ => bool_value(a == b),
                };
                self.stack.push(result)?;
            }
            Not | Abs | Neg | Sqrt => {
                let a = self.stack.pop()?;
                let result = match operator {
                    Not => bool_value(a == 0.0),
                    Abs => a.abs(),
                    Neg => -a,
                    _ => a.max(0.0).sqrt(),
                };
                self.stack.push(result)?;
            }
            Drop => {
                self.stack.pop()?;
            }
            Put => {
                let index = self.stack.pop_i32()?;
                let value = self.stack.pop()?;
                let slot = usize::try_from(index)
                    .ok()
                    .and_then(|ix| self.transient.get_mut(ix))
                    .ok_or(CharstringError::InvalidTransientIndex(index))?;
                *slot = value;
            }
            Get => {
                let index = self.stack.pop_i32()?;
                let value = usize::try_from(index)
                    .ok()
                    .and_then(|ix| self.transient.get(ix))
                    .copied()
                    .ok_or(CharstringError::InvalidTransientIndex(index))?;
                self.stack.push(value)?;
            }
            IfElse => {
                let v2 = self.stack.pop()?;
                let v1 = self.stack.pop()?;
                let s2 = self.stack.pop()?;
                let s1 = self.stack.pop()?;
                self.stack.push(if v1 <= v2 { s1 } else { s2 })?;
            }
            Random => {
                let value = self.next_random();
                self.stack.push(value)?;
            }
            Dup => {
                let a = self.stack.pop()?;
                self.stack.push(a)?;
                self.stack.push(a)?;
            }
            Exch => {
                let b = self.stack.pop()?;
                let a = self.stack.pop()?;
                self.stack.push(b)?;
                self.stack.push(a)?;
            }
            Index => {
                let index = self.stack.pop_i32()?;
                let len = self.stack.len();
                // negative indices duplicate the top element
                let offset = usize::try_from(index).unwrap_or(0);
                let value = len
                    .checked_sub(offset + 1)
                    .map(|ix| self.stack.get(ix))
                    .ok_or(CharstringError::StackUnderflow)??;
                self.stack.push(value)?;
            }
            Roll => {
                let shift = self.stack.pop_i32()?;
                let count = self.stack.pop_i32()?;
                let count = usize::try_from(count).map_err(|_| CharstringError::StackUnderflow)?;
                let values = self.stack.values_mut();
                let start = values
                    .len()
                    .checked_sub(count)
                    .ok_or(CharstringError::StackUnderflow)?;
                if count > 0 {
                    let top = &mut values[start..];
                    let shift = shift.rem_euclid(count as i32) as usize;
                    top.rotate_right(shift);
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Returns a pseudo random number in `(0, 1]`.
    fn next_random(&mut self) -> f64 {
        let mut x = self.random_seed;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.random_seed = x;
        x as f64 / u32::MAX as f64
    }

    /// Consumes the advance width operand for Type2 charstrings.
    ///
    /// The width is an optional extra operand on the first stack clearing
    /// operator of the charstring.
    fn take_width(&mut self, has_width: bool) {
        if self.width_parsed {
            return;
        }
        self.width_parsed = true;
        if self.version == CharstringVersion::Type2 && has_width {
            if let Ok(width) = self.stack.get(0) {
                self.glyph.advance_width = self.ctx.private.nominal_width_x() + width;
                self.stack.remove_bottom(1);
            }
        }
    }

    fn add_stems(&mut self, horizontal: bool) -> Result<(), CharstringError> {
        self.take_width(self.stack.len_is_odd());
        self.stack.verify_at_least_len(2)?;
        let mut pos = 0.0;
        let mut i = 0;
        while i + 2 <= self.stack.len() {
            let [delta, width] = self.stack.get_array::<2>(i)?;
            let start = pos + delta;
            self.add_stem(horizontal, start, width)?;
            pos = start + width;
            i += 2;
        }
        Ok(())
    }

    /// Adds a stem whose start is relative to the side bearing point.
    fn add_stem(
        &mut self,
        horizontal: bool,
        start: f64,
        width: f64,
    ) -> Result<(), CharstringError> {
        let start = round_to_precision(start);
        let width = round_to_precision(width);
        let hint_number = if horizontal {
            self.glyph.hints.add_hstem(start + self.sby, width)?
        } else {
            self.glyph.hints.add_vstem(start + self.sbx, width)?
        };
        self.declared.push(hint_number);
        if self.replacing_hints {
            if let Some(mask) = &mut self.pending_mask {
                mask.set(hint_number as usize);
            }
        }
        Ok(())
    }

    fn mask(&mut self, is_counter: bool, cursor: &mut Cursor) -> Result<(), CharstringError> {
        // operands before the first mask are implied vstem hints
        if !self.stack.is_empty() {
            self.add_stems(false)?;
        }
        self.take_width(false);
        self.stack.clear();
        let len = mask_byte_len(self.hint_count());
        let remaining = cursor.remaining_bytes();
        let bytes = cursor
            .read_array(len)
            .map_err(|_| CharstringError::HintMaskTruncated {
                expected: len,
                remaining,
            })?;
        let (declared, offset) = (&self.declared, self.ctx.hint_count);
        // stems declared before this charstring have no known hint number
        let mask = HintMask::from_bytes(bytes).remap(|bit| {
            let index = bit.checked_sub(offset)?;
            declared.get(index).map(|n| *n as usize)
        });
        if is_counter {
            self.glyph.counter_masks.push(mask);
        } else {
            self.pending_mask = Some(mask);
        }
        Ok(())
    }

    fn attach_mask(&mut self, id: PointId) {
        self.replacing_hints = false;
        if let Some(mask) = self.pending_mask.take() {
            self.builder.point_mut(id).hint_mask = Some(mask);
        }
    }

    /// Moves the current point by the rounded delta.
    fn advance(&mut self, dx: f64, dy: f64) -> KPoint {
        self.x += round_to_precision(dx);
        self.y += round_to_precision(dy);
        KPoint::new(self.x, self.y)
    }

    fn move_to(&mut self, dx: f64, dy: f64) {
        let p = self.advance(dx, dy);
        if self.flex.active {
            self.flex.points.push(p);
            return;
        }
        let id = self.builder.move_to(p);
        self.attach_mask(id);
    }

    fn line_to(&mut self, dx: f64, dy: f64) {
        let p = self.advance(dx, dy);
        let id = self.builder.line_to(p);
        self.attach_mask(id);
    }

    fn curve_to(&mut self, [dx1, dy1, dx2, dy2, dx3, dy3]: [f64; 6]) {
        let c1 = self.advance(dx1, dy1);
        let c2 = self.advance(dx2, dy2);
        let p = self.advance(dx3, dy3);
        let id = self.builder.curve_to(c1, c2, p);
        self.attach_mask(id);
    }

    /// Records a problem that does not stop evaluation.
    fn report(&mut self, err: CharstringError) {
        log::debug!("charstring: {err}");
        self.diagnostics.push(err);
    }

    fn set_side_bearing(&mut self, sbx: f64, sby: f64, wx: f64) {
        self.sbx = sbx;
        self.sby = sby;
        self.x = sbx;
        self.y = sby;
        self.glyph.lsb = sbx;
        self.glyph.advance_width = wx;
    }

    fn end_char(&mut self) -> Result<(), CharstringError> {
        if self.version == CharstringVersion::Type2 {
            let len = self.stack.len();
            self.take_width(len == 5 || len == 1);
            if self.stack.len() == 4 {
                let [adx, ady, bchar, achar] = self.stack.get_array::<4>(0)?;
                self.add_accented_refs(bchar, achar, adx, ady);
            }
        }
        self.stack.clear();
        Ok(())
    }

    /// Adds Standard Encoding references for an accented character.
    fn add_accented_refs(&mut self, bchar: f64, achar: f64, dx: f64, dy: f64) {
        let mut code = |value: f64| {
            let value = value as i32;
            u8::try_from(value).unwrap_or_else(|_| {
                self.diagnostics
                    .push(CharstringError::InvalidSeacCode(value));
                0
            })
        };
        let base = code(bchar);
        let accent = code(achar);
        self.glyph
            .refs
            .push(ComponentRef::standard_code(base, 0.0, 0.0));
        self.glyph
            .refs
            .push(ComponentRef::standard_code(accent, dx, dy));
    }

    /// Handles the Type1 `callothersubr` operator.
    ///
    /// Only flex and hint replacement have an effect on the outline. Other
    /// othersubrs return their arguments unchanged.
    fn call_other_subr(&mut self) -> Result<(), CharstringError> {
        if self.version != CharstringVersion::Type1 {
            log::warn!("callothersubr in a {} charstring", self.version);
        }
        let subr = self.stack.pop_i32()?;
        let arg_count = self.stack.pop_i32()?;
        let arg_count = usize::try_from(arg_count).map_err(|_| CharstringError::StackUnderflow)?;
        self.stack.verify_at_least_len(arg_count)?;
        let start = self.stack.len() - arg_count;
        let args = self.stack.values()[start..].to_vec();
        for _ in 0..arg_count {
            self.stack.pop()?;
        }
        self.ps_stack.clear();
        match subr {
            OTHERSUBR_FLEX_START => {
                self.flex.active = true;
                self.flex.points.clear();
            }
            OTHERSUBR_FLEX_POINT => {}
            OTHERSUBR_FLEX_END => {
                self.flex.active = false;
                let points = std::mem::take(&mut self.flex.points);
                if points.len() >= 7 {
                    let p = &points[points.len() - 6..];
                    self.builder.curve_to(p[0], p[1], p[2]);
                    let id = self.builder.curve_to(p[3], p[4], p[5]);
                    self.attach_mask(id);
                    self.x = p[5].x;
                    self.y = p[5].y;
                } else {
                    log::warn!("flex with {} points", points.len());
                }
                // pops yield the final x then y
                self.ps_stack.push(self.y);
                self.ps_stack.push(self.x);
            }
            OTHERSUBR_HINT_REPLACEMENT => {
                self.pending_mask = Some(HintMask::new());
                self.replacing_hints = true;
                self.ps_stack.extend(args.iter().rev());
            }
            _ => self.ps_stack.extend(args.iter().rev()),
        }
        Ok(())
    }
}
