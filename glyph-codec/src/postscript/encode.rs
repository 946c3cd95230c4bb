//! Generation of compact charstrings from the spline model.
//!
//! Contours are emitted with the shortest operator for each run of
//! segments: axis aligned lines and curves use the `h`/`v` operator
//! variants, consecutive segments share a single operator up to the stack
//! limit and pairs of shallow curves become flex operators.

use std::borrow::Cow;

use kurbo::{Affine, Point as KPoint};

use super::{number::write_operand, operator::Operator, CffContext, CharstringVersion};
use crate::{
    error::EncodeError,
    hint::{HintMask, StemInfo},
    model::{Contour, Figure, Glyph, OutlineFormat, RefTarget, DEFAULT_QUADRATIC_ACCURACY},
    round::{round_to_precision, OtRound},
};

/// Largest magnitude of an absolute coordinate.
const MAX_COORD: f64 = 32767.0;

/// Options controlling charstring generation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EncodeOptions {
    /// Emit flex operators for qualifying curve pairs (Type2 and CFF2).
    pub flex: bool,
    /// Largest distance, in font units, between the joint of a flex and
    /// its chord.
    pub max_flex_depth: f64,
    /// Value of the depth operand of the `flex` operator, in 1/100 device
    /// pixel.
    pub flex_depth_operand: f64,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            flex: true,
            max_flex_depth: 20.0,
            flex_depth_operand: 50.0,
        }
    }
}

/// Encodes a glyph as a charstring of the version given by `ctx`.
///
/// Quadratic contours are converted to cubics. The only references that can
/// be expressed are the two Standard Encoding references of an accented
/// character; other references must be flattened first.
///
/// Type2 widths are written relative to the nominal width of the private
/// dictionary and omitted when equal to the default width. Type1 output is
/// not encrypted; see [`encrypt_charstring`](super::encrypt_charstring).
/// It also uses no othersubrs, so flex curves are written as plain curves
/// and hint masks are dropped with a warning.
pub fn encode_charstring(
    glyph: &Glyph,
    ctx: &CffContext,
    options: &EncodeOptions,
) -> Result<Vec<u8>, EncodeError> {
    let glyph = if glyph.has_quadratics() {
        let mut cubic = glyph.clone();
        cubic.convert_to(OutlineFormat::PostScript, DEFAULT_QUADRATIC_ACCURACY);
        Cow::Owned(cubic)
    } else {
        Cow::Borrowed(glyph)
    };
    let accented = accented_refs(&glyph)?;
    let mut encoder = Encoder::new(ctx.version, *options);
    match ctx.version {
        CharstringVersion::Type1 => encoder.encode_type1(&glyph, accented)?,
        CharstringVersion::Type2 => {
            let private = ctx.private;
            if glyph.advance_width != private.default_width_x() {
                encoder.width = Some(glyph.advance_width - private.nominal_width_x());
            }
            encoder.encode_type2(&glyph, accented)?;
        }
        CharstringVersion::Cff2 => encoder.encode_type2(&glyph, accented)?,
    }
    Ok(encoder.out)
}

/// The components of an accented character.
#[derive(Clone, Copy, Debug)]
struct Accented {
    base: u8,
    accent: u8,
    dx: f64,
    dy: f64,
}

fn accented_refs(glyph: &Glyph) -> Result<Option<Accented>, EncodeError> {
    let unresolved = || {
        let code = glyph.refs.iter().find_map(|r| match r.target {
            RefTarget::StandardCode(code) => Some(code),
            RefTarget::Glyph(_) => None,
        });
        match code {
            Some(code) => EncodeError::UnresolvedReference(code),
            None => EncodeError::UnflattenedReferences(glyph.refs.len()),
        }
    };
    match glyph.refs.as_slice() {
        [] => Ok(None),
        [base, accent] => match (base.target, accent.target) {
            (RefTarget::StandardCode(base_code), RefTarget::StandardCode(accent_code))
                if base.transform == Affine::IDENTITY
                    && accent.linear() == Affine::IDENTITY
                    && glyph.figures.iter().all(Figure::is_empty) =>
            {
                let [.., dx, dy] = accent.transform.as_coeffs();
                Ok(Some(Accented {
                    base: base_code,
                    accent: accent_code,
                    dx,
                    dy,
                }))
            }
            _ => Err(unresolved()),
        },
        _ => Err(unresolved()),
    }
}

/// The geometry of one segment in rounded absolute coordinates.
#[derive(Clone, Copy, Debug)]
enum StepKind {
    Line(KPoint),
    Curve(KPoint, KPoint, KPoint),
}

/// A segment to be encoded, with the mask that becomes active at its end.
#[derive(Clone, Debug)]
struct Step {
    start: KPoint,
    kind: StepKind,
    mask: Option<HintMask>,
}

impl Step {
    fn end(&self) -> KPoint {
        match self.kind {
            StepKind::Line(p) | StepKind::Curve(_, _, p) => p,
        }
    }

    fn line_delta(&self) -> Option<[f64; 2]> {
        match self.kind {
            StepKind::Line(p) => Some([p.x - self.start.x, p.y - self.start.y]),
            StepKind::Curve(..) => None,
        }
    }

    fn curve_delta(&self) -> Option<[f64; 6]> {
        match self.kind {
            StepKind::Curve(c1, c2, p) => Some([
                c1.x - self.start.x,
                c1.y - self.start.y,
                c2.x - c1.x,
                c2.y - c1.y,
                p.x - c2.x,
                p.y - c2.y,
            ]),
            StepKind::Line(_) => None,
        }
    }
}

fn has_masks(glyph: &Glyph) -> bool {
    !glyph.counter_masks.is_empty()
        || glyph
            .figures
            .iter()
            .any(|f| f.points().iter().any(|p| p.hint_mask.is_some()))
}

fn is_axis_aligned([dx, dy]: [f64; 2]) -> bool {
    dx == 0.0 || dy == 0.0
}

/// True if a curve can start a `hhcurveto` run.
fn starts_hh([dx1, dy1, _, _, _, dy3]: [f64; 6]) -> bool {
    dy3 == 0.0 && (dy1 == 0.0 || dx1 != 0.0)
}

/// True if a curve can start a `vvcurveto` run.
fn starts_vv([dx1, dy1, _, _, dx3, _]: [f64; 6]) -> bool {
    dx3 == 0.0 && (dx1 == 0.0 || dy1 != 0.0)
}

/// True if a curve can start a `hvcurveto` or `vhcurveto` run.
fn starts_hv_or_vh([dx1, dy1, ..]: [f64; 6]) -> bool {
    dx1 == 0.0 || dy1 == 0.0
}

/// An operator with its operands, before it is written.
struct Command {
    operator: Operator,
    args: Vec<f64>,
    /// Number of steps consumed.
    steps: usize,
}

struct Encoder {
    version: CharstringVersion,
    options: EncodeOptions,
    max_stack: usize,
    out: Vec<u8>,
    /// Width operand not yet written.
    width: Option<f64>,
    current: KPoint,
    /// Hint numbers in declaration order, indexed by mask bit.
    declared: Vec<u16>,
}

impl Encoder {
    fn new(version: CharstringVersion, options: EncodeOptions) -> Self {
        Self {
            version,
            options,
            max_stack: version.max_stack(),
            out: Vec::new(),
            width: None,
            current: KPoint::ZERO,
            declared: Vec::new(),
        }
    }

    /// Rounds a coordinate to the precision of the output format.
    fn coord(&self, value: f64) -> Result<f64, EncodeError> {
        let rounded = match self.version {
            CharstringVersion::Type1 => OtRound::<f64>::ot_round(value),
            _ => round_to_precision(value),
        };
        if rounded.abs() > MAX_COORD {
            return Err(EncodeError::CoordinateOverflow(value));
        }
        Ok(rounded)
    }

    fn point(&self, p: KPoint) -> Result<KPoint, EncodeError> {
        Ok(KPoint::new(self.coord(p.x)?, self.coord(p.y)?))
    }

    fn emit(&mut self, operator: Operator, args: &[f64]) {
        use Operator::*;
        if matches!(
            operator,
            HStem | VStem | HStemHm | VStemHm | RMoveTo | HMoveTo | VMoveTo | EndChar
        ) {
            if let Some(width) = self.width.take() {
                write_operand(&mut self.out, width, self.version);
            }
        }
        for arg in args {
            write_operand(&mut self.out, *arg, self.version);
        }
        operator.write(&mut self.out);
    }

    fn emit_mask(&mut self, operator: Operator, mask: &HintMask) {
        let declared = &self.declared;
        let bits = mask.remap(|n| declared.iter().position(|d| *d as usize == n));
        operator.write(&mut self.out);
        self.out.extend(bits.bytes(declared.len()));
    }

    fn emit_move(&mut self, to: KPoint) {
        let (dx, dy) = (to.x - self.current.x, to.y - self.current.y);
        if dy == 0.0 {
            self.emit(Operator::HMoveTo, &[dx]);
        } else if dx == 0.0 {
            self.emit(Operator::VMoveTo, &[dy]);
        } else {
            self.emit(Operator::RMoveTo, &[dx, dy]);
        }
        self.current = to;
    }

    /// Collects the segments of a contour, dropping the implied closing
    /// line.
    fn contour_steps(
        &self,
        figure: &Figure,
        contour: &Contour,
    ) -> Result<(KPoint, Vec<Step>), EncodeError> {
        let start = self.point(figure.point(contour.first).anchor)?;
        let closed = figure.is_closed(contour);
        let segments = figure.contour_segments(contour);
        let count = segments.len();
        let mut steps = Vec::with_capacity(count);
        let mut current = start;
        for (i, seg_id) in segments.into_iter().enumerate() {
            let seg = figure.segment(seg_id);
            let is_closing = closed && i + 1 == count;
            if is_closing && seg.is_linear {
                break;
            }
            let from = figure.point(seg.from);
            let to = figure.point(seg.to);
            let end = self.point(to.anchor)?;
            let kind = if seg.is_linear {
                StepKind::Line(end)
            } else {
                StepKind::Curve(
                    self.point(from.next_control())?,
                    self.point(to.prev_control())?,
                    end,
                )
            };
            steps.push(Step {
                start: current,
                kind,
                // the mask of the first point precedes the moveto
                mask: if is_closing { None } else { to.hint_mask.clone() },
            });
            current = end;
        }
        Ok((start, steps))
    }

    /// Returns delta encoded operands for a stem operator.
    fn stem_args(&self, stems: &[StemInfo], origin: f64) -> Result<Vec<f64>, EncodeError> {
        let mut args = Vec::with_capacity(stems.len() * 2);
        let mut pos = 0.0;
        for stem in stems {
            let start = self.coord(stem.start - origin)?;
            let width = self.coord(stem.width)?;
            args.push(start - pos);
            args.push(width);
            pos = start + width;
        }
        Ok(args)
    }

    fn encode_type2(&mut self, glyph: &Glyph, accented: Option<Accented>) -> Result<(), EncodeError> {
        let (h, v) = glyph.hints.declaration_order();
        let use_masks = has_masks(glyph) && !(h.is_empty() && v.is_empty());
        let (h_op, v_op) = if use_masks {
            (Operator::HStemHm, Operator::VStemHm)
        } else {
            (Operator::HStem, Operator::VStem)
        };
        // leave a slot for the width
        let per_operator = (self.max_stack - 1) / 2;
        for (stems, operator) in [(&h, h_op), (&v, v_op)] {
            for chunk in stems.chunks(per_operator) {
                let args = self.stem_args(chunk, 0.0)?;
                self.emit(operator, &args);
            }
        }
        self.declared = h.iter().chain(&v).map(|s| s.hint_number).collect();
        if use_masks {
            for mask in &glyph.counter_masks {
                self.emit_mask(Operator::CntrMask, mask);
            }
        }
        for figure in &glyph.figures {
            for contour in figure.contours() {
                let (start, steps) = self.contour_steps(figure, contour)?;
                if use_masks {
                    if let Some(mask) = &figure.point(contour.first).hint_mask {
                        self.emit_mask(Operator::HintMask, mask);
                    }
                }
                self.emit_move(start);
                self.encode_steps(&steps, use_masks);
                if let Some(last) = steps.last() {
                    self.current = last.end();
                }
            }
        }
        match accented {
            Some(accented) => {
                let args = [
                    self.coord(accented.dx)?,
                    self.coord(accented.dy)?,
                    accented.base as f64,
                    accented.accent as f64,
                ];
                self.emit(Operator::EndChar, &args);
            }
            // CFF2 charstrings end without an operator
            None if self.version == CharstringVersion::Type2 => self.emit(Operator::EndChar, &[]),
            None => {}
        }
        Ok(())
    }

    fn encode_steps(&mut self, steps: &[Step], use_masks: bool) {
        let mut i = 0;
        while i < steps.len() {
            if use_masks {
                if let Some(mask) = &steps[i].mask {
                    self.emit_mask(Operator::HintMask, mask);
                }
            }
            // a masked step must begin its own operator
            let limit = steps[i + 1..]
                .iter()
                .position(|s| use_masks && s.mask.is_some())
                .map(|pos| i + 1 + pos)
                .unwrap_or(steps.len());
            let window = &steps[i..limit];
            let command = self
                .flex(window)
                .or_else(|| self.lines(window))
                .or_else(|| self.curves(window))
                .unwrap_or_else(|| self.single(&window[0]));
            log::trace!(
                "{:?} for {} segment(s) with {} operands",
                command.operator,
                command.steps.max(1),
                command.args.len()
            );
            self.emit(command.operator, &command.args);
            i += command.steps.max(1);
        }
    }

    /// Encodes a pair of shallow curves whose end points are level.
    fn flex(&self, steps: &[Step]) -> Option<Command> {
        if !self.options.flex || self.version == CharstringVersion::Type1 {
            return None;
        }
        let [first, second, ..] = steps else {
            return None;
        };
        let (StepKind::Curve(c1, c2, p), StepKind::Curve(c3, c4, e)) = (first.kind, second.kind)
        else {
            return None;
        };
        let a = first.curve_delta()?;
        let b = second.curve_delta()?;
        let s = first.start;
        if s == e {
            return None;
        }
        let max_depth = self.options.max_flex_depth;
        let (operator, args) = if s.y == e.y {
            if (p.y - s.y).abs() > max_depth || c2.y != p.y || c3.y != p.y {
                return None;
            }
            if c1.y == s.y && c4.y == s.y {
                (Operator::HFlex, vec![a[0], a[2], a[3], a[4], b[0], b[2], b[4]])
            } else {
                (
                    Operator::HFlex1,
                    vec![a[0], a[1], a[2], a[3], a[4], b[0], b[2], b[3], b[4]],
                )
            }
        } else if s.x == e.x {
            if (p.x - s.x).abs() > max_depth || c2.x != p.x || c3.x != p.x {
                return None;
            }
            let (dx, dy) = (c4.x - s.x, c4.y - s.y);
            let mut args = a.to_vec();
            if dx.abs() <= dy.abs() {
                args.extend([b[0], b[1], b[2], b[3], b[5]]);
                (Operator::Flex1, args)
            } else {
                args.extend(b);
                args.push(self.options.flex_depth_operand);
                (Operator::Flex, args)
            }
        } else {
            return None;
        };
        Some(Command {
            operator,
            args,
            steps: 2,
        })
    }

    fn lines(&self, steps: &[Step]) -> Option<Command> {
        let first = steps.first()?.line_delta()?;
        let cap = self.max_stack;
        let mut args = Vec::new();
        if is_axis_aligned(first) {
            let starts_horizontal = first[1] == 0.0;
            let mut horizontal = starts_horizontal;
            for step in steps {
                let Some([dx, dy]) = step.line_delta() else {
                    break;
                };
                if args.len() == cap {
                    break;
                }
                match horizontal {
                    true if dy == 0.0 => args.push(dx),
                    false if dx == 0.0 => args.push(dy),
                    _ => break,
                }
                horizontal = !horizontal;
            }
            let operator = if starts_horizontal {
                Operator::HLineTo
            } else {
                Operator::VLineTo
            };
            let count = args.len();
            return Some(Command {
                operator,
                args,
                steps: count,
            });
        }
        let mut count = 0;
        for step in steps {
            match step.line_delta() {
                Some(delta) if !is_axis_aligned(delta) && args.len() + 2 <= cap => {
                    args.extend(delta);
                    count += 1;
                }
                _ => break,
            }
        }
        if let Some(curve) = steps.get(count).and_then(Step::curve_delta) {
            if args.len() + 6 <= cap {
                args.extend(curve);
                return Some(Command {
                    operator: Operator::RLineCurve,
                    args,
                    steps: count + 1,
                });
            }
        }
        Some(Command {
            operator: Operator::RLineTo,
            args,
            steps: count,
        })
    }

    fn curves(&self, steps: &[Step]) -> Option<Command> {
        let first = steps.first()?.curve_delta()?;
        self.hh_or_vv(steps)
            .or_else(|| self.hv_or_vh(steps))
            .or_else(|| Some(self.rr(steps, first)))
    }

    /// A run of curves whose ends are tangent to the same axis.
    fn hh_or_vv(&self, steps: &[Step]) -> Option<Command> {
        let first = steps.first()?.curve_delta()?;
        let horizontal = if starts_hh(first) {
            true
        } else if starts_vv(first) {
            false
        } else {
            return None;
        };
        let mut args = Vec::new();
        let mut count = 0;
        for step in steps {
            let Some([dx1, dy1, dx2, dy2, dx3, dy3]) = step.curve_delta() else {
                break;
            };
            if args.len() + 5 > self.max_stack {
                break;
            }
            if horizontal {
                if count == 0 && dy1 != 0.0 {
                    args.push(dy1);
                } else if dy1 != 0.0 || dy3 != 0.0 {
                    break;
                }
                args.extend([dx1, dx2, dy2, dx3]);
            } else {
                if count == 0 && dx1 != 0.0 {
                    args.push(dx1);
                } else if dx1 != 0.0 || dx3 != 0.0 {
                    break;
                }
                args.extend([dy1, dx2, dy2, dy3]);
            }
            count += 1;
        }
        Some(Command {
            operator: if horizontal {
                Operator::HhCurveTo
            } else {
                Operator::VvCurveTo
            },
            args,
            steps: count,
        })
    }

    /// A run of curves alternating between horizontal and vertical
    /// tangents.
    fn hv_or_vh(&self, steps: &[Step]) -> Option<Command> {
        let first = steps.first()?.curve_delta()?;
        if !starts_hv_or_vh(first) {
            return None;
        }
        let starts_horizontal = first[1] == 0.0;
        let mut horizontal = starts_horizontal;
        let mut args = Vec::new();
        let mut count = 0;
        for step in steps {
            let Some([dx1, dy1, dx2, dy2, dx3, dy3]) = step.curve_delta() else {
                break;
            };
            if args.len() + 5 > self.max_stack {
                break;
            }
            let (lead, lead_ok, tail, cross) = if horizontal {
                (dx1, dy1 == 0.0, dy3, dx3)
            } else {
                (dy1, dx1 == 0.0, dx3, dy3)
            };
            if !lead_ok {
                break;
            }
            args.extend([lead, dx2, dy2, tail]);
            count += 1;
            if cross != 0.0 {
                // only the final curve may end off axis
                args.push(cross);
                break;
            }
            horizontal = !horizontal;
        }
        Some(Command {
            operator: if starts_horizontal {
                Operator::HvCurveTo
            } else {
                Operator::VhCurveTo
            },
            args,
            steps: count,
        })
    }

    /// General curves, with an optional trailing line.
    fn rr(&self, steps: &[Step], first: [f64; 6]) -> Command {
        let cap = self.max_stack;
        let mut args = first.to_vec();
        let mut count = 1;
        for step in &steps[1..] {
            match step.curve_delta() {
                Some(delta)
                    if !starts_hh(delta)
                        && !starts_vv(delta)
                        && !starts_hv_or_vh(delta)
                        && args.len() + 6 <= cap =>
                {
                    args.extend(delta);
                    count += 1;
                }
                _ => break,
            }
        }
        if let Some(line) = steps.get(count).and_then(Step::line_delta) {
            if args.len() + 2 <= cap {
                args.extend(line);
                return Command {
                    operator: Operator::RCurveLine,
                    args,
                    steps: count + 1,
                };
            }
        }
        Command {
            operator: Operator::RrCurveTo,
            args,
            steps: count,
        }
    }

    /// Encodes a single step with the operators available in every
    /// charstring version.
    fn single(&self, step: &Step) -> Command {
        let (operator, args) = if let Some([dx, dy]) = step.line_delta() {
            if dy == 0.0 {
                (Operator::HLineTo, vec![dx])
            } else if dx == 0.0 {
                (Operator::VLineTo, vec![dy])
            } else {
                (Operator::RLineTo, vec![dx, dy])
            }
        } else if let Some(delta) = step.curve_delta() {
            let [dx1, dy1, dx2, dy2, dx3, dy3] = delta;
            if dy1 == 0.0 && dx3 == 0.0 {
                (Operator::HvCurveTo, vec![dx1, dx2, dy2, dy3])
            } else if dx1 == 0.0 && dy3 == 0.0 {
                (Operator::VhCurveTo, vec![dy1, dx2, dy2, dx3])
            } else {
                (Operator::RrCurveTo, delta.to_vec())
            }
        } else {
            (Operator::RLineTo, vec![0.0, 0.0])
        };
        Command {
            operator,
            args,
            steps: 1,
        }
    }

    fn encode_type1(&mut self, glyph: &Glyph, accented: Option<Accented>) -> Result<(), EncodeError> {
        let sbx = self.coord(glyph.lsb)?;
        let wx = self.coord(glyph.advance_width)?;
        self.emit(Operator::Hsbw, &[sbx, wx]);
        self.current = KPoint::new(sbx, 0.0);
        let (h, v) = glyph.hints.declaration_order();
        // hint replacement would need othersubr 3 and subr 4 of the font
        if has_masks(glyph) {
            log::warn!("hint masks are not written to Type1 charstrings; all stems stay active");
        }
        for stem in &h {
            let args = self.stem_args(std::slice::from_ref(stem), 0.0)?;
            self.emit(Operator::HStem, &args);
        }
        for stem in &v {
            let args = self.stem_args(std::slice::from_ref(stem), sbx)?;
            self.emit(Operator::VStem, &args);
        }
        if let Some(accented) = accented {
            // seac ends the charstring
            let args = [
                sbx,
                self.coord(accented.dx)?,
                self.coord(accented.dy)?,
                accented.base as f64,
                accented.accent as f64,
            ];
            self.emit(Operator::Seac, &args);
            return Ok(());
        }
        for figure in &glyph.figures {
            for contour in figure.contours() {
                let (start, steps) = self.contour_steps(figure, contour)?;
                self.emit_move(start);
                for step in &steps {
                    let command = self.single(step);
                    self.emit(command.operator, &command.args);
                    self.current = step.end();
                }
                self.emit(Operator::ClosePath, &[]);
            }
        }
        self.emit(Operator::EndChar, &[]);
        Ok(())
    }
}
