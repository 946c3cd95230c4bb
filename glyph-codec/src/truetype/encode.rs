//! Writing simple and composite glyph records.

use std::borrow::Cow;

use types::{F2Dot14, GlyphId16};

use super::{
    decode::offset_scale,
    flags::{CompositeGlyphFlags, SimpleGlyphFlags},
    maxima::{saturate, Maxima},
    outline_points,
};
use crate::{
    error::{EncodeError, RefError},
    model::{
        ComponentRef, Glyph, GlyphSource, OutlineFormat, RefTarget, COMPOSITE_RECURSION_LIMIT,
        DEFAULT_QUADRATIC_ACCURACY,
    },
    round::OtRound,
    write::{dump, FontWrite, TableWriter},
};

/// Options for [`GlyfEncoder`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlyfEncodeOptions {
    /// Maximum distance, in font units, between a cubic curve and the
    /// quadratic spline that replaces it.
    pub accuracy: f64,
}

impl Default for GlyfEncodeOptions {
    fn default() -> Self {
        Self {
            accuracy: DEFAULT_QUADRATIC_ACCURACY,
        }
    }
}

/// Serializes glyphs into `glyf` records.
///
/// The encoder accumulates the [`Maxima`] of every glyph it writes.
///
/// # Example
///
/// ```
/// use glyph_codec::{truetype::GlyfEncoder, Glyph};
/// # fn get_glyphs() -> Vec<Glyph> { Vec::new() }
///
/// let glyphs = get_glyphs();
/// let mut encoder = GlyfEncoder::default();
/// for (i, glyph) in glyphs.iter().enumerate() {
///     let gid = glyph_codec::types::GlyphId16::new(i as u16);
///     // your error handling goes here
///     let _record = encoder.encode(gid, glyph, &glyphs).unwrap();
/// }
/// let _maxp_values = encoder.maxima();
/// ```
#[derive(Clone, Debug, Default)]
pub struct GlyfEncoder {
    options: GlyfEncodeOptions,
    maxima: Maxima,
    warned_mixed: bool,
}

impl GlyfEncoder {
    pub fn new(options: GlyfEncodeOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    /// The statistics of all glyphs encoded so far.
    pub fn maxima(&self) -> Maxima {
        self.maxima
    }

    /// Encodes a glyph, returning an empty record for an empty glyph.
    ///
    /// `source` provides the glyphs referenced by components; it is used to
    /// flatten glyphs that mix contours and components, and to compute the
    /// bounding box and statistics of composites.
    pub fn encode(
        &mut self,
        gid: GlyphId16,
        glyph: &Glyph,
        source: &(impl GlyphSource + ?Sized),
    ) -> Result<Vec<u8>, EncodeError> {
        if glyph.refs.is_empty() {
            return self.encode_simple(glyph);
        }
        for component in &glyph.refs {
            component_gid(component)?;
        }
        if glyph.is_mixed() {
            if !self.warned_mixed {
                log::warn!(
                    "glyph {gid} has both contours and components, which TrueType does not \
                     support; components are being flattened into contours"
                );
                self.warned_mixed = true;
            }
            let mut flattened = glyph.clone();
            flattened.flatten_refs(gid, source)?;
            return self.encode_simple(&flattened);
        }
        self.encode_composite(gid, glyph, source)
    }

    fn encode_simple(&mut self, glyph: &Glyph) -> Result<Vec<u8>, EncodeError> {
        let glyph = quadratic(glyph, self.options.accuracy);
        let Some(record) = SimpleRecord::new(&glyph)? else {
            return Ok(Vec::new());
        };
        self.maxima.update(&Maxima {
            max_points: saturate(record.points.len()),
            max_contours: saturate(record.end_pts.len()),
            max_size_of_instructions: saturate(record.instructions.len()),
            ..Default::default()
        });
        Ok(dump(&record))
    }

    fn encode_composite(
        &mut self,
        gid: GlyphId16,
        glyph: &Glyph,
        source: &(impl GlyphSource + ?Sized),
    ) -> Result<Vec<u8>, EncodeError> {
        if glyph.instructions.len() > u16::MAX as usize {
            return Err(EncodeError::InstructionsTooLong(glyph.instructions.len()));
        }
        let mut flattened = glyph.clone();
        flattened.flatten_refs(gid, source)?;
        let mut flattened = quadratic(&flattened, self.options.accuracy).into_owned();

        let mut components = TableWriter::default();
        let last = glyph.refs.len() - 1;
        for (i, component) in glyph.refs.iter().enumerate() {
            let extra = if i < last {
                CompositeGlyphFlags::MORE_COMPONENTS
            } else if !glyph.instructions.is_empty() {
                CompositeGlyphFlags::WE_HAVE_INSTRUCTIONS
            } else {
                CompositeGlyphFlags::empty()
            };
            write_component(component, extra, &mut components)?;
        }

        let bbox = flattened.compute_bbox();
        let mut writer = TableWriter::default();
        (-1i16).write_into(&mut writer);
        for value in [bbox.x0, bbox.y0, bbox.x1, bbox.y1] {
            i16::try_from(OtRound::<i32>::ot_round(value))
                .map_err(|_| EncodeError::CoordinateOverflow(value))?
                .write_into(&mut writer);
        }
        writer.write_slice(&components.into_data());
        if !glyph.instructions.is_empty() {
            (glyph.instructions.len() as u16).write_into(&mut writer);
            glyph.instructions.write_into(&mut writer);
        }
        writer.pad_to_2byte_aligned();

        self.maxima.update(&Maxima {
            max_composite_points: saturate(flattened.numbered_points().len()),
            max_composite_contours: saturate(flattened.contour_count()),
            max_component_elements: saturate(glyph.refs.len()),
            max_component_depth: component_depth(glyph, source, 1)?,
            max_size_of_instructions: saturate(glyph.instructions.len()),
            ..Default::default()
        });
        Ok(writer.into_data())
    }
}

/// Returns the glyph with any cubic curves replaced by quadratic ones.
fn quadratic(glyph: &Glyph, accuracy: f64) -> Cow<'_, Glyph> {
    if glyph.has_cubics() {
        let mut converted = glyph.clone();
        converted.convert_to(OutlineFormat::TrueType, accuracy);
        Cow::Owned(converted)
    } else {
        Cow::Borrowed(glyph)
    }
}

fn component_gid(component: &ComponentRef) -> Result<GlyphId16, EncodeError> {
    match component.target {
        RefTarget::Glyph(gid) => Ok(gid),
        RefTarget::StandardCode(code) => Err(EncodeError::UnresolvedReference(code)),
    }
}

fn component_depth(
    glyph: &Glyph,
    source: &(impl GlyphSource + ?Sized),
    depth: usize,
) -> Result<u16, EncodeError> {
    if glyph.refs.is_empty() {
        return Ok(0);
    }
    let mut deepest = 0;
    for component in &glyph.refs {
        let gid = component_gid(component)?;
        if depth > COMPOSITE_RECURSION_LIMIT {
            return Err(RefError::RecursionLimitExceeded(gid).into());
        }
        let child = source.glyph(gid).ok_or(RefError::GlyphNotFound(gid))?;
        deepest = deepest.max(component_depth(child, source, depth + 1)?);
    }
    Ok(deepest + 1)
}

fn to_f2dot14(value: f64) -> Result<F2Dot14, EncodeError> {
    if !(-2.0..2.0).contains(&value) {
        return Err(EncodeError::TransformOutOfRange(value));
    }
    Ok(F2Dot14::from_f32(value as f32))
}

fn write_component(
    component: &ComponentRef,
    extra_flags: CompositeGlyphFlags,
    writer: &mut TableWriter,
) -> Result<(), EncodeError> {
    let gid = component_gid(component)?;
    let mut flags = CompositeGlyphFlags::from(component.flags) | extra_flags;

    let [xx, yx, xy, yy, dx, dy] = component.transform.as_coeffs();
    let [xx, yx, xy, yy] = [
        to_f2dot14(xx)?,
        to_f2dot14(yx)?,
        to_f2dot14(xy)?,
        to_f2dot14(yy)?,
    ];
    let (zero, one) = (F2Dot14::from_f32(0.0), F2Dot14::from_f32(1.0));
    let transform = if yx != zero || xy != zero {
        flags |= CompositeGlyphFlags::WE_HAVE_A_TWO_BY_TWO;
        vec![xx, yx, xy, yy]
    } else if xx == one && yy == one {
        vec![]
    } else if xx == yy {
        flags |= CompositeGlyphFlags::WE_HAVE_A_SCALE;
        vec![xx]
    } else {
        flags |= CompositeGlyphFlags::WE_HAVE_AN_X_AND_Y_SCALE;
        vec![xx, yy]
    };

    let args = match component.point_match {
        Some(point_match) => {
            if point_match.base > u8::MAX as u16 || point_match.component > u8::MAX as u16 {
                flags |= CompositeGlyphFlags::ARG_1_AND_2_ARE_WORDS;
                Args::Words([point_match.base, point_match.component])
            } else {
                Args::Bytes([point_match.base as u8, point_match.component as u8])
            }
        }
        None => {
            flags |= CompositeGlyphFlags::ARGS_ARE_XY_VALUES;
            let (mut dx, mut dy) = (dx, dy);
            if component.flags.scaled_component_offset && !component.flags.unscaled_component_offset
            {
                let (x_scale, y_scale) = offset_scale(&component.linear());
                if x_scale != 0.0 {
                    dx /= x_scale;
                }
                if y_scale != 0.0 {
                    dy /= y_scale;
                }
            }
            let offset = |v: f64| {
                i16::try_from(OtRound::<i32>::ot_round(v)).map_err(|_| EncodeError::OffsetOverflow(v))
            };
            let (x, y) = (offset(dx)?, offset(dy)?);
            match (i8::try_from(x), i8::try_from(y)) {
                (Ok(x), Ok(y)) => Args::SignedBytes([x, y]),
                _ => {
                    flags |= CompositeGlyphFlags::ARG_1_AND_2_ARE_WORDS;
                    Args::SignedWords([x, y])
                }
            }
        }
    };

    flags.write_into(writer);
    gid.to_u16().write_into(writer);
    match args {
        Args::Bytes(args) => args.write_into(writer),
        Args::Words(args) => args.write_into(writer),
        Args::SignedBytes(args) => args.write_into(writer),
        Args::SignedWords(args) => args.write_into(writer),
    }
    transform.write_into(writer);
    Ok(())
}

/// The narrowest encoding of a component's two arguments.
enum Args {
    Bytes([u8; 2]),
    Words([u16; 2]),
    SignedBytes([i8; 2]),
    SignedWords([i16; 2]),
}

/// A representation of a single coordinate delta.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CoordDelta {
    // implied by the flag, nothing is written
    Skip,
    Short(u8),
    Long(i16),
}

impl FontWrite for CoordDelta {
    fn write_into(&self, writer: &mut TableWriter) {
        match self {
            CoordDelta::Skip => (),
            CoordDelta::Short(val) => val.write_into(writer),
            CoordDelta::Long(val) => val.write_into(writer),
        }
    }
}

impl CoordDelta {
    /// Chooses the shortest form of `delta` and the flag bits describing it.
    fn new(
        delta: i32,
        short: SimpleGlyphFlags,
        same_or_positive: SimpleGlyphFlags,
    ) -> Result<(SimpleGlyphFlags, CoordDelta), EncodeError> {
        const SHORT_MAX: i32 = u8::MAX as i32;
        const SHORT_MIN: i32 = -SHORT_MAX;
        Ok(match delta {
            0 => (same_or_positive, CoordDelta::Skip),
            SHORT_MIN..=-1 => (short, CoordDelta::Short(delta.unsigned_abs() as u8)),
            1..=SHORT_MAX => (short | same_or_positive, CoordDelta::Short(delta as u8)),
            _ => {
                let long = i16::try_from(delta)
                    .map_err(|_| EncodeError::CoordinateOverflow(delta as f64))?;
                (SimpleGlyphFlags::empty(), CoordDelta::Long(long))
            }
        })
    }
}

#[derive(Clone, Copy, Debug)]
struct EncodedPoint {
    flags: SimpleGlyphFlags,
    dx: CoordDelta,
    dy: CoordDelta,
}

/// A simple glyph, ready to be written.
#[derive(Debug)]
struct SimpleRecord {
    bbox: [i16; 4],
    end_pts: Vec<u16>,
    instructions: Vec<u8>,
    points: Vec<EncodedPoint>,
}

impl SimpleRecord {
    /// Returns `None` if the glyph has no points.
    fn new(glyph: &Glyph) -> Result<Option<Self>, EncodeError> {
        let coord = |v: i32| i16::try_from(v).map_err(|_| EncodeError::CoordinateOverflow(v as f64));
        let mut end_pts = Vec::new();
        let mut points = Vec::new();
        let mut bbox: Option<[i16; 4]> = None;
        let (mut last_x, mut last_y) = (0i32, 0i32);
        for figure in &glyph.figures {
            for contour in figure.contours() {
                let outline = outline_points(figure, contour);
                if outline.is_empty() {
                    continue;
                }
                for point in outline {
                    let (x, y): (i32, i32) = point.pos.ot_round();
                    let (x16, y16) = (coord(x)?, coord(y)?);
                    bbox = Some(match bbox {
                        None => [x16, y16, x16, y16],
                        Some([x0, y0, x1, y1]) => [x0.min(x16), y0.min(y16), x1.max(x16), y1.max(y16)],
                    });
                    let (x_flags, dx) = CoordDelta::new(
                        x - last_x,
                        SimpleGlyphFlags::X_SHORT_VECTOR,
                        SimpleGlyphFlags::X_IS_SAME_OR_POSITIVE_X_SHORT_VECTOR,
                    )?;
                    let (y_flags, dy) = CoordDelta::new(
                        y - last_y,
                        SimpleGlyphFlags::Y_SHORT_VECTOR,
                        SimpleGlyphFlags::Y_IS_SAME_OR_POSITIVE_Y_SHORT_VECTOR,
                    )?;
                    (last_x, last_y) = (x, y);
                    let mut flags = x_flags | y_flags;
                    if point.on_curve {
                        flags |= SimpleGlyphFlags::ON_CURVE_POINT;
                    }
                    points.push(EncodedPoint { flags, dx, dy });
                }
                if points.len() > u16::MAX as usize {
                    return Err(EncodeError::TooManyPoints(points.len()));
                }
                end_pts.push((points.len() - 1) as u16);
            }
        }
        let Some(bbox) = bbox else {
            return Ok(None);
        };
        if end_pts.len() > i16::MAX as usize {
            return Err(EncodeError::TooManyContours(end_pts.len()));
        }
        if glyph.instructions.len() > u16::MAX as usize {
            return Err(EncodeError::InstructionsTooLong(glyph.instructions.len()));
        }
        if glyph.overlap_simple {
            if let Some(first) = points.first_mut() {
                first.flags |= SimpleGlyphFlags::OVERLAP_SIMPLE;
            }
        }
        Ok(Some(Self {
            bbox,
            end_pts,
            instructions: glyph.instructions.clone(),
            points,
        }))
    }
}

impl FontWrite for SimpleRecord {
    fn write_into(&self, writer: &mut TableWriter) {
        (self.end_pts.len() as i16).write_into(writer);
        self.bbox.write_into(writer);
        self.end_pts.write_into(writer);
        (self.instructions.len() as u16).write_into(writer);
        self.instructions.write_into(writer);
        write_flags(self.points.iter().map(|p| p.flags), writer);
        self.points.iter().for_each(|p| p.dx.write_into(writer));
        self.points.iter().for_each(|p| p.dy.write_into(writer));
        writer.pad_to_2byte_aligned();
    }
}

/// Writes flags, folding runs into repeat counts.
///
/// A flag that occurs exactly twice is written twice rather than with a
/// repeat count of one; both take two bytes and this matches fontmake.
fn write_flags(flags: impl Iterator<Item = SimpleGlyphFlags>, writer: &mut TableWriter) {
    let mut flags = flags.peekable();
    while let Some(flag) = flags.next() {
        let mut repeat = 0u8;
        while repeat < u8::MAX && flags.peek() == Some(&flag) {
            flags.next();
            repeat += 1;
        }
        match repeat {
            0 => flag.write_into(writer),
            1 => {
                flag.write_into(writer);
                flag.write_into(writer);
            }
            _ => {
                (flag | SimpleGlyphFlags::REPEAT_FLAG).write_into(writer);
                repeat.write_into(writer);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use kurbo::{Affine, Point as KPoint, Rect};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        model::{CurveOrder, FigureBuilder, PointMatch},
        truetype::decode_glyph,
    };

    fn polygon(points: &[(f64, f64)]) -> Glyph {
        let mut builder = FigureBuilder::new(CurveOrder::Quadratic);
        for (i, (x, y)) in points.iter().enumerate() {
            let p = KPoint::new(*x, *y);
            if i == 0 {
                builder.move_to(p);
            } else {
                builder.line_to(p);
            }
        }
        builder.close();
        let mut glyph = Glyph::new(OutlineFormat::TrueType);
        glyph.figures.push(builder.finish());
        glyph
    }

    fn square() -> Glyph {
        polygon(&[(0.0, 0.0), (0.0, 100.0), (100.0, 100.0), (100.0, 0.0)])
    }

    fn encode(glyph: &Glyph) -> Result<Vec<u8>, EncodeError> {
        GlyfEncoder::default().encode(GlyphId16::new(0), glyph, &[square()][..])
    }

    #[test]
    fn simple_round_trip() {
        #[rustfmt::skip]
        let record = [
            0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x64, 0x00, 0x96,
            0x00, 0x04,
            0x00, 0x01, 0xB0,
            0x31, 0x35, 0x36, 0x17, 0x15,
            50, 50,
            100, 50, 50, 100,
        ];
        let decoded = decode_glyph(&record);
        assert!(decoded.is_clean());
        assert_eq!(encode(&decoded.glyph).unwrap(), record);
    }

    #[test]
    fn repeated_flags() {
        let line = polygon(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0), (30.0, 0.0), (40.0, 0.0)]);
        #[rustfmt::skip]
        let expected = [
            0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x28, 0x00, 0x00,
            0x00, 0x04,
            0x00, 0x00,
            0x31, 0x3B, 0x03,
            10, 10, 10, 10,
            0x00, // padding
        ];
        assert_eq!(encode(&line).unwrap(), expected);

        // a single repeat is written as two flags
        let short = polygon(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0)]);
        let bytes = encode(&short).unwrap();
        assert_eq!(&bytes[14..17], &[0x31, 0x33, 0x33]);
    }

    #[test]
    fn long_deltas_and_overlap() {
        let mut glyph = polygon(&[(-500.0, 0.0), (500.0, 1000.0)]);
        glyph.overlap_simple = true;
        let bytes = encode(&glyph).unwrap();
        let decoded = decode_glyph(&bytes);
        assert!(decoded.is_clean());
        assert!(decoded.glyph.overlap_simple);
        assert_eq!(
            decoded.glyph.numbered_points(),
            [KPoint::new(-500.0, 0.0), KPoint::new(500.0, 1000.0)]
        );
        assert_eq!(decoded.glyph.bbox, Rect::new(-500.0, 0.0, 500.0, 1000.0));
    }

    #[test]
    fn empty_glyph_has_no_record() {
        assert!(encode(&Glyph::new(OutlineFormat::TrueType)).unwrap().is_empty());
    }

    #[test]
    fn coordinate_overflow() {
        let glyph = polygon(&[(0.0, 0.0), (40000.0, 0.0)]);
        assert_eq!(encode(&glyph), Err(EncodeError::CoordinateOverflow(40000.0)));
        // both coordinates fit but their difference does not
        let glyph = polygon(&[(-20000.0, 0.0), (20000.0, 0.0)]);
        assert_eq!(encode(&glyph), Err(EncodeError::CoordinateOverflow(40000.0)));
    }

    #[test]
    fn cubic_input_is_converted() {
        let mut builder = FigureBuilder::new(CurveOrder::Cubic);
        builder.move_to(KPoint::new(0.0, 0.0));
        builder.curve_to(
            KPoint::new(0.0, 100.0),
            KPoint::new(200.0, 100.0),
            KPoint::new(200.0, 0.0),
        );
        builder.close();
        let mut glyph = Glyph::new(OutlineFormat::PostScript);
        glyph.figures.push(builder.finish());
        let decoded = decode_glyph(&encode(&glyph).unwrap());
        assert!(decoded.is_clean());
        assert!(decoded.glyph.has_quadratics());
        assert_eq!(decoded.glyph.contour_count(), 1);
        assert_eq!(decoded.glyph.bbox.y0, 0.0);
    }

    #[test]
    fn composite_scale_and_offset() {
        let glyphs = vec![Glyph::new(OutlineFormat::TrueType), square()];
        let mut composite = Glyph::new(OutlineFormat::TrueType);
        composite.refs.push(ComponentRef::new(
            GlyphId16::new(1),
            Affine::new([0.5, 0.0, 0.0, 0.5, 10.0, 20.0]),
        ));
        let mut encoder = GlyfEncoder::default();
        let bytes = encoder.encode(GlyphId16::new(2), &composite, &glyphs).unwrap();
        #[rustfmt::skip]
        let expected = [
            0xFF, 0xFF, 0x00, 0x0A, 0x00, 0x14, 0x00, 0x3C, 0x00, 0x46,
            0x00, 0x0A, // ARGS_ARE_XY_VALUES | WE_HAVE_A_SCALE
            0x00, 0x01,
            10, 20,
            0x20, 0x00,
        ];
        assert_eq!(bytes, expected);
        let decoded = decode_glyph(&bytes);
        assert_eq!(decoded.glyph.refs, composite.refs);

        let maxima = encoder.maxima();
        assert_eq!(maxima.max_composite_points, 4);
        assert_eq!(maxima.max_composite_contours, 1);
        assert_eq!(maxima.max_component_elements, 1);
        assert_eq!(maxima.max_component_depth, 1);
        assert_eq!(maxima.max_points, 0);
    }

    #[test]
    fn composite_round_trip() {
        let glyphs = vec![Glyph::new(OutlineFormat::TrueType), square()];
        let mut composite = Glyph::new(OutlineFormat::TrueType);
        let mut first = ComponentRef::new(GlyphId16::new(1), Affine::translate((300.0, -2.0)));
        first.flags.use_my_metrics = true;
        let mut second = ComponentRef::new(
            GlyphId16::new(1),
            Affine::new([0.5, 0.25, 0.0, -1.0, 0.0, 0.0]),
        );
        second.point_match = Some(PointMatch {
            base: 2,
            component: 300,
        });
        composite.refs = vec![first, second];
        composite.instructions = vec![1, 2, 3];
        let bytes = GlyfEncoder::default()
            .encode(GlyphId16::new(2), &composite, &glyphs)
            .unwrap();
        let decoded = decode_glyph(&bytes);
        assert!(decoded.is_clean(), "{:?}", decoded.diagnostics);
        assert_eq!(decoded.glyph.refs, composite.refs);
        assert_eq!(decoded.glyph.instructions, [1, 2, 3]);
    }

    #[test]
    fn scaled_offset_is_stored_unscaled() {
        let glyphs = vec![Glyph::new(OutlineFormat::TrueType), square()];
        let mut composite = Glyph::new(OutlineFormat::TrueType);
        let mut component = ComponentRef::new(
            GlyphId16::new(1),
            Affine::new([0.5, 0.0, 0.0, 0.5, 10.0, 20.0]),
        );
        component.flags.scaled_component_offset = true;
        composite.refs.push(component);
        let bytes = GlyfEncoder::default()
            .encode(GlyphId16::new(2), &composite, &glyphs)
            .unwrap();
        assert_eq!(&bytes[14..16], &[20, 40]);
        assert_eq!(decode_glyph(&bytes).glyph.refs, composite.refs);
    }

    #[test]
    fn component_errors() {
        let glyphs = vec![Glyph::new(OutlineFormat::TrueType), square()];
        let encode_ref = |component: ComponentRef| {
            let mut composite = Glyph::new(OutlineFormat::TrueType);
            composite.refs.push(component);
            GlyfEncoder::default().encode(GlyphId16::new(2), &composite, &glyphs)
        };
        assert_eq!(
            encode_ref(ComponentRef::new(GlyphId16::new(1), Affine::scale(2.5))),
            Err(EncodeError::TransformOutOfRange(2.5))
        );
        assert_eq!(
            encode_ref(ComponentRef::new(
                GlyphId16::new(1),
                Affine::translate((40000.0, 0.0))
            )),
            Err(EncodeError::OffsetOverflow(40000.0))
        );
        assert_eq!(
            encode_ref(ComponentRef::standard_code(65, 0.0, 0.0)),
            Err(EncodeError::UnresolvedReference(65))
        );
        assert_eq!(
            encode_ref(ComponentRef::new(GlyphId16::new(7), Affine::IDENTITY)),
            Err(EncodeError::Reference(RefError::GlyphNotFound(GlyphId16::new(7))))
        );
    }

    #[test]
    fn mixed_glyph_is_flattened() {
        let _ = env_logger::builder().is_test(true).try_init();
        let glyphs = vec![Glyph::new(OutlineFormat::TrueType), square()];
        let mut mixed = polygon(&[(200.0, 0.0), (300.0, 0.0), (300.0, 50.0)]);
        mixed
            .refs
            .push(ComponentRef::new(GlyphId16::new(1), Affine::IDENTITY));
        let mut encoder = GlyfEncoder::default();
        let bytes = encoder.encode(GlyphId16::new(2), &mixed, &glyphs).unwrap();
        assert!(encoder.warned_mixed);
        let decoded = decode_glyph(&bytes);
        assert!(decoded.glyph.refs.is_empty());
        assert_eq!(decoded.glyph.contour_count(), 2);
        assert_eq!(encoder.maxima().max_points, 7);
        assert_eq!(encoder.maxima().max_contours, 2);
    }

    #[test]
    fn nested_component_depth() {
        let mut glyphs = vec![square(), Glyph::new(OutlineFormat::TrueType)];
        glyphs[1]
            .refs
            .push(ComponentRef::new(GlyphId16::new(0), Affine::IDENTITY));
        let mut outer = Glyph::new(OutlineFormat::TrueType);
        outer
            .refs
            .push(ComponentRef::new(GlyphId16::new(1), Affine::translate((10.0, 0.0))));
        let mut encoder = GlyfEncoder::default();
        encoder.encode(GlyphId16::new(2), &outer, &glyphs).unwrap();
        assert_eq!(encoder.maxima().max_component_depth, 2);
    }
}
