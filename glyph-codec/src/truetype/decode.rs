//! Reading simple and composite glyph records.

use kurbo::{Affine, Point as KPoint, Rect, Vec2};
use types::{F2Dot14, GlyphId16};

use super::flags::{CompositeGlyphFlags, SimpleGlyphFlags};
use crate::{
    data::Cursor,
    error::GlyfError,
    model::{ComponentRef, CurveOrder, FigureBuilder, Glyph, OutlineFormat, PointMatch},
    Decoded,
};

/// Decodes a single `glyf` record.
///
/// An empty record is an empty glyph. Point matched components are left
/// with a zero translation; call [`Glyph::finalize_refs`] once the
/// referenced glyphs are available.
pub fn decode_glyph(data: &[u8]) -> Decoded<Glyph, GlyfError> {
    let mut glyph = Glyph::new(OutlineFormat::TrueType);
    let mut diagnostics = Vec::new();
    if data.is_empty() {
        return Decoded::new(glyph, diagnostics);
    }
    let mut cursor = Cursor::new(data);
    let result = read_header(&mut cursor, &mut glyph).and_then(|num_contours| {
        match usize::try_from(num_contours) {
            Ok(count) => read_simple(&mut cursor, count, &mut glyph, &mut diagnostics),
            Err(_) => read_composite(&mut cursor, &mut glyph),
        }
    });
    if let Err(err) = result {
        log::debug!("glyf record: {err}");
        diagnostics.push(err);
    }
    Decoded::new(glyph, diagnostics)
}

fn read_header(cursor: &mut Cursor, glyph: &mut Glyph) -> Result<i16, GlyfError> {
    let num_contours = cursor.read::<i16>()?;
    let x_min = cursor.read::<i16>()? as f64;
    let y_min = cursor.read::<i16>()? as f64;
    let x_max = cursor.read::<i16>()? as f64;
    let y_max = cursor.read::<i16>()? as f64;
    glyph.bbox = Rect::new(x_min, y_min, x_max, y_max);
    glyph.lsb = x_min;
    Ok(num_contours)
}

fn read_simple(
    cursor: &mut Cursor,
    num_contours: usize,
    glyph: &mut Glyph,
    diagnostics: &mut Vec<GlyfError>,
) -> Result<(), GlyfError> {
    let mut end_pts = Vec::with_capacity(num_contours);
    for i in 0..num_contours {
        let end = cursor.read::<u16>()?;
        if end_pts.last().is_some_and(|prev| end < *prev) {
            return Err(GlyfError::ContourOrder(i));
        }
        end_pts.push(end);
    }
    let num_points = end_pts.last().map_or(0, |end| *end as usize + 1);
    let instruction_len = cursor.read::<u16>()? as usize;
    glyph.instructions = cursor.read_array(instruction_len)?.to_vec();

    let mut flags = Vec::with_capacity(num_points);
    while flags.len() < num_points {
        let flag = cursor.read::<SimpleGlyphFlags>()?;
        let mut count = 1;
        if flag.contains(SimpleGlyphFlags::REPEAT_FLAG) {
            count += cursor.read::<u8>()? as usize;
        }
        let remaining = num_points - flags.len();
        if count > remaining {
            log::debug!("flag repeat count {count} exceeds the {remaining} remaining points");
            diagnostics.push(GlyfError::RepeatCountTooLarge);
            count = remaining;
        }
        flags.extend(std::iter::repeat_n(flag, count));
    }
    glyph.overlap_simple = flags
        .first()
        .is_some_and(|flag| flag.contains(SimpleGlyphFlags::OVERLAP_SIMPLE));

    let xs = read_coordinates(
        cursor,
        &flags,
        SimpleGlyphFlags::X_SHORT_VECTOR,
        SimpleGlyphFlags::X_IS_SAME_OR_POSITIVE_X_SHORT_VECTOR,
    )?;
    let ys = read_coordinates(
        cursor,
        &flags,
        SimpleGlyphFlags::Y_SHORT_VECTOR,
        SimpleGlyphFlags::Y_IS_SAME_OR_POSITIVE_Y_SHORT_VECTOR,
    )?;

    let points: Vec<_> = flags
        .iter()
        .zip(xs.into_iter().zip(ys))
        .enumerate()
        .map(|(i, (flag, (x, y)))| RawPoint {
            pos: KPoint::new(x as f64, y as f64),
            on_curve: flag.contains(SimpleGlyphFlags::ON_CURVE_POINT),
            index: Some(i as u32),
        })
        .collect();

    let mut builder = FigureBuilder::new(CurveOrder::Quadratic);
    let mut start = 0;
    for end in end_pts {
        let end = end as usize + 1;
        // a repeated end point describes an empty contour
        if end > start {
            add_contour(&mut builder, &points[start..end]);
        }
        start = end;
    }
    let figure = builder.finish();
    if !figure.is_empty() {
        glyph.figures.push(figure);
    }
    Ok(())
}

/// Accumulates the deltas for one axis.
fn read_coordinates(
    cursor: &mut Cursor,
    flags: &[SimpleGlyphFlags],
    short: SimpleGlyphFlags,
    same_or_positive: SimpleGlyphFlags,
) -> Result<Vec<i32>, GlyfError> {
    let mut value = 0i32;
    flags
        .iter()
        .map(|flag| -> Result<i32, GlyfError> {
            let delta = if flag.contains(short) {
                let magnitude = cursor.read::<u8>()? as i32;
                if flag.contains(same_or_positive) {
                    magnitude
                } else {
                    -magnitude
                }
            } else if flag.contains(same_or_positive) {
                0
            } else {
                cursor.read::<i16>()? as i32
            };
            value = value.wrapping_add(delta);
            Ok(value)
        })
        .collect()
}

#[derive(Clone, Copy, Debug)]
struct RawPoint {
    pos: KPoint,
    on_curve: bool,
    index: Option<u32>,
}

fn add_contour(builder: &mut FigureBuilder, points: &[RawPoint]) {
    if let [single] = points {
        if !single.on_curve {
            log::warn!(
                "contour made of a single off-curve point {:?}",
                single.index
            );
        }
        let id = builder.move_to(single.pos);
        builder.point_mut(id).ttf_index = single.index;
        builder.close();
        return;
    }
    // start at an on-curve point, synthesizing one if there are none
    let sequence: Vec<RawPoint> = match points.iter().position(|p| p.on_curve) {
        Some(first_on) => points[first_on..]
            .iter()
            .chain(&points[..first_on])
            .copied()
            .collect(),
        None => {
            let (first, last) = (points[0], points[points.len() - 1]);
            std::iter::once(RawPoint {
                pos: last.pos.midpoint(first.pos),
                on_curve: true,
                index: None,
            })
            .chain(points.iter().copied())
            .collect()
        }
    };
    let start = sequence[0];
    let id = builder.move_to(start.pos);
    builder.point_mut(id).ttf_index = start.index;

    let closing = RawPoint {
        index: None,
        ..start
    };
    let mut pending_off: Option<RawPoint> = None;
    for point in sequence[1..].iter().copied().chain(Some(closing)) {
        let current = builder.current();
        let (id, index) = match (pending_off.take(), point.on_curve) {
            (None, true) => (builder.line_to(point.pos), point.index),
            (None, false) => {
                pending_off = Some(point);
                continue;
            }
            (Some(control), on_curve) => {
                if let Some(current) = current {
                    builder.point_mut(current).next_cp_index = control.index;
                }
                if on_curve {
                    (builder.quad_to(control.pos, point.pos), point.index)
                } else {
                    // implied on-curve point between two off-curve points
                    pending_off = Some(point);
                    let mid = control.pos.midpoint(point.pos);
                    (builder.quad_to(control.pos, mid), None)
                }
            }
        };
        builder.point_mut(id).ttf_index = index;
    }
    builder.close();
}

fn read_composite(cursor: &mut Cursor, glyph: &mut Glyph) -> Result<(), GlyfError> {
    loop {
        let flags = cursor.read::<CompositeGlyphFlags>()?;
        let gid = GlyphId16::new(cursor.read::<u16>()?);
        let args_are_xy = flags.contains(CompositeGlyphFlags::ARGS_ARE_XY_VALUES);
        let (arg1, arg2) = match (
            args_are_xy,
            flags.contains(CompositeGlyphFlags::ARG_1_AND_2_ARE_WORDS),
        ) {
            (true, true) => (cursor.read::<i16>()? as i32, cursor.read::<i16>()? as i32),
            (true, false) => (cursor.read::<i8>()? as i32, cursor.read::<i8>()? as i32),
            (false, true) => (cursor.read::<u16>()? as i32, cursor.read::<u16>()? as i32),
            (false, false) => (cursor.read::<u8>()? as i32, cursor.read::<u8>()? as i32),
        };
        let [xx, yx, xy, yy] = read_transform(cursor, flags)?;
        let linear = Affine::new([xx, yx, xy, yy, 0.0, 0.0]);
        let mut component = ComponentRef::new(gid, linear);
        component.flags = flags.into();
        if args_are_xy {
            let mut offset = Vec2::new(arg1 as f64, arg2 as f64);
            if flags.contains(CompositeGlyphFlags::SCALED_COMPONENT_OFFSET)
                && !flags.contains(CompositeGlyphFlags::UNSCALED_COMPONENT_OFFSET)
            {
                let (x_scale, y_scale) = offset_scale(&linear);
                offset = Vec2::new(offset.x * x_scale, offset.y * y_scale);
            }
            component.set_translation(offset.x, offset.y);
        } else {
            component.point_match = Some(PointMatch {
                base: arg1 as u16,
                component: arg2 as u16,
            });
        }
        glyph.refs.push(component);

        if !flags.contains(CompositeGlyphFlags::MORE_COMPONENTS) {
            if flags.contains(CompositeGlyphFlags::WE_HAVE_INSTRUCTIONS) {
                let len = cursor.read::<u16>()? as usize;
                glyph.instructions = cursor.read_array(len)?.to_vec();
            }
            return Ok(());
        }
    }
}

/// Reads the 2x2 transform as `[xx, yx, xy, yy]`.
fn read_transform(cursor: &mut Cursor, flags: CompositeGlyphFlags) -> Result<[f64; 4], GlyfError> {
    let mut read = || -> Result<f64, GlyfError> { Ok(cursor.read::<F2Dot14>()?.to_f32() as f64) };
    Ok(if flags.contains(CompositeGlyphFlags::WE_HAVE_A_SCALE) {
        let scale = read()?;
        [scale, 0.0, 0.0, scale]
    } else if flags.contains(CompositeGlyphFlags::WE_HAVE_AN_X_AND_Y_SCALE) {
        let xx = read()?;
        let yy = read()?;
        [xx, 0.0, 0.0, yy]
    } else if flags.contains(CompositeGlyphFlags::WE_HAVE_A_TWO_BY_TWO) {
        let xx = read()?;
        let yx = read()?;
        let xy = read()?;
        let yy = read()?;
        [xx, yx, xy, yy]
    } else {
        [1.0, 0.0, 0.0, 1.0]
    })
}

/// Scale factors applied to a component offset when `SCALED_COMPONENT_OFFSET`
/// is set, as computed by FreeType.
pub(super) fn offset_scale(linear: &Affine) -> (f64, f64) {
    let [xx, yx, xy, yy, _, _] = linear.as_coeffs();
    (xx.hypot(xy), yy.hypot(yx))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::RefTarget;

    /// A square with a quadratic bump, 5 points in one contour.
    ///
    /// points: (0,0) on, (0,100) on, (50,150) off, (100,100) on, (100,0) on
    pub(crate) fn simple_record() -> Vec<u8> {
        vec![
            0x00, 0x01, // one contour
            0x00, 0x00, 0x00, 0x00, 0x00, 0x64, 0x00, 0x96, // bbox 0,0 100,150
            0x00, 0x04, // end point
            0x00, 0x01, 0xB0, // one instruction byte
            // flags: on | y same, on | y short pos | x same, off | both short pos,
            // on | x short pos | y short neg, on | x same | y short neg
            0x31, 0x35, 0x36, 0x17, 0x15,
            // x: 0 (same), 0 (same), +50, +50, 0 (same)
            50, 50,
            // y: 0 (same), +100, +50, -50, -100
            100, 50, 50, 100,
        ]
    }

    #[test]
    fn simple_glyph() {
        let decoded = decode_glyph(&simple_record());
        assert!(decoded.is_clean(), "{:?}", decoded.diagnostics);
        let glyph = decoded.glyph;
        assert_eq!(glyph.bbox, Rect::new(0.0, 0.0, 100.0, 150.0));
        assert_eq!(glyph.instructions, [0xB0]);
        assert_eq!(glyph.figures.len(), 1);
        let figure = &glyph.figures[0];
        let contour = figure.contours()[0];
        assert!(figure.is_closed(&contour));
        let anchors: Vec<_> = figure
            .contour_points(&contour)
            .into_iter()
            .map(|id| (figure.point(id).anchor, figure.point(id).ttf_index))
            .collect();
        assert_eq!(
            anchors,
            [
                (KPoint::new(0.0, 0.0), Some(0)),
                (KPoint::new(0.0, 100.0), Some(1)),
                (KPoint::new(100.0, 100.0), Some(3)),
                (KPoint::new(100.0, 0.0), Some(4)),
            ]
        );
        let curve_start = figure.point(figure.contour_points(&contour)[1]);
        assert_eq!(curve_start.next_cp, Some(KPoint::new(50.0, 150.0)));
        assert_eq!(curve_start.next_cp_index, Some(2));
        assert_eq!(glyph.numbered_points().len(), 5);
    }

    #[test]
    fn implied_on_curve_points() {
        let data = simple_from_points(
            &[4],
            &[(0, 0, false), (0, 100, false), (100, 100, false), (100, 0, false)],
        );
        let decoded = decode_glyph(&data);
        assert!(decoded.is_clean());
        let figure = &decoded.glyph.figures[0];
        let contour = figure.contours()[0];
        let anchors: Vec<_> = figure
            .contour_points(&contour)
            .into_iter()
            .map(|id| figure.point(id).anchor)
            .collect();
        assert_eq!(
            anchors,
            [
                KPoint::new(50.0, 0.0),
                KPoint::new(0.0, 50.0),
                KPoint::new(50.0, 100.0),
                KPoint::new(100.0, 50.0),
            ]
        );
        // the synthesized points have no point numbers
        assert!(figure.points().iter().all(|p| p.ttf_index.is_none()));
        assert_eq!(decoded.glyph.numbered_points().len(), 4);
    }

    /// Builds a simple glyph record using only two byte deltas.
    pub(crate) fn simple_from_points(end_pts: &[u16], points: &[(i16, i16, bool)]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend((end_pts.len() as i16).to_be_bytes());
        data.extend([0u8; 8]);
        for end in end_pts {
            data.extend((end - 1).to_be_bytes());
        }
        data.extend([0, 0]);
        data.extend(points.iter().map(|p| p.2 as u8));
        let (mut x, mut y) = (0, 0);
        for p in points {
            data.extend((p.0 - x).to_be_bytes());
            x = p.0;
        }
        for p in points {
            data.extend((p.1 - y).to_be_bytes());
            y = p.1;
        }
        data
    }

    #[test]
    fn single_off_curve_point() {
        let _ = env_logger::builder().is_test(true).try_init();
        let data = simple_from_points(&[1], &[(10, 20, false)]);
        let decoded = decode_glyph(&data);
        assert!(decoded.is_clean());
        let figure = &decoded.glyph.figures[0];
        assert_eq!(figure.points().len(), 1);
        assert_eq!(figure.points()[0].anchor, KPoint::new(10.0, 20.0));
        assert_eq!(figure.points()[0].ttf_index, Some(0));
    }

    #[test]
    fn contour_order() {
        // second end point (1) is less than the first (2)
        let data = simple_from_points(&[3, 2], &[(0, 0, true), (1, 1, true), (2, 2, true)]);
        let decoded = decode_glyph(&data);
        assert_eq!(decoded.diagnostics, [GlyfError::ContourOrder(1)]);
        assert!(decoded.glyph.figures.is_empty());
    }

    #[test]
    fn repeat_count_too_large() {
        let mut data = simple_from_points(&[2], &[(0, 0, true), (100, 0, true)]);
        // one repeated flag claiming 5 repeats, in place of the two flags
        data[14] = 0x01 | 0x08;
        data[15] = 5;
        let decoded = decode_glyph(&data);
        assert_eq!(decoded.diagnostics, [GlyfError::RepeatCountTooLarge]);
        assert_eq!(decoded.glyph.numbered_points().len(), 2);
    }

    #[test]
    fn truncated() {
        let data = simple_record();
        let decoded = decode_glyph(&data[..data.len() - 1]);
        assert_eq!(decoded.diagnostics, [GlyfError::OutOfBounds]);
        // the header was still read
        assert_eq!(decoded.glyph.bbox, Rect::new(0.0, 0.0, 100.0, 150.0));
    }

    #[test]
    fn empty_record() {
        let decoded = decode_glyph(&[]);
        assert!(decoded.is_clean());
        assert!(decoded.glyph.is_empty());
    }

    #[test]
    fn composite_scale_and_offset() {
        let data = [
            0xFF, 0xFF, 0, 0, 0, 0, 0, 0, 0, 0, // header
            0x00, 0x0B, // ARG_1_AND_2_ARE_WORDS | ARGS_ARE_XY_VALUES | WE_HAVE_A_SCALE
            0x00, 0x03, // glyph 3
            0x00, 0x0A, 0x00, 0x14, // offset (10, 20)
            0x20, 0x00, // scale 0.5
        ];
        let decoded = decode_glyph(&data);
        assert!(decoded.is_clean());
        let glyph = decoded.glyph;
        assert_eq!(glyph.refs.len(), 1);
        let component = &glyph.refs[0];
        assert_eq!(component.target, RefTarget::Glyph(GlyphId16::new(3)));
        assert_eq!(
            component.transform.as_coeffs(),
            [0.5, 0.0, 0.0, 0.5, 10.0, 20.0]
        );
        assert_eq!(component.point_match, None);
    }

    #[test]
    fn composite_point_match_and_flags() {
        let data = [
            0xFF, 0xFF, 0, 0, 0, 0, 0, 0, 0, 0, // header
            0x00, 0x21, // ARG_1_AND_2_ARE_WORDS | MORE_COMPONENTS
            0x00, 0x01, // glyph 1
            0x00, 0x00, 0x00, 0x00, // point numbers 0, 0
            0x03, 0x00, // USE_MY_METRICS | WE_HAVE_INSTRUCTIONS, byte args
            0x00, 0x02, // glyph 2
            0x05, 0x01, // base point 5, component point 1
            0x00, 0x02, 0xAA, 0xBB, // instructions
        ];
        let decoded = decode_glyph(&data);
        assert!(decoded.is_clean(), "{:?}", decoded.diagnostics);
        let glyph = decoded.glyph;
        assert_eq!(glyph.refs.len(), 2);
        assert_eq!(
            glyph.refs[1].point_match,
            Some(PointMatch {
                base: 5,
                component: 1
            })
        );
        assert!(glyph.refs[1].flags.use_my_metrics);
        assert!(!glyph.refs[0].flags.use_my_metrics);
        assert_eq!(glyph.instructions, [0xAA, 0xBB]);
    }

    #[test]
    fn scaled_component_offset() {
        let data = [
            0xFF, 0xFF, 0, 0, 0, 0, 0, 0, 0, 0, // header
            0x08, 0x42, // SCALED_COMPONENT_OFFSET | WE_HAVE_AN_X_AND_Y_SCALE | ARGS_ARE_XY_VALUES
            0x00, 0x01, // glyph 1
            10, 20, // byte offsets
            0x20, 0x00, 0x40, 0x00, // x scale 0.5, y scale 1.0
        ];
        let decoded = decode_glyph(&data);
        assert!(decoded.is_clean(), "{:?}", decoded.diagnostics);
        assert_eq!(
            decoded.glyph.refs[0].transform.as_coeffs(),
            [0.5, 0.0, 0.0, 1.0, 5.0, 20.0]
        );
    }
}
