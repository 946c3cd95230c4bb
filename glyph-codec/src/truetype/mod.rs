//! TrueType `glyf` records.
//!
//! [`decode_glyph`] reads a single simple or composite glyph record into a
//! quadratic [`Glyph`](crate::model::Glyph) and [`GlyfEncoder`] writes glyphs
//! back out, tracking the font-wide [`Maxima`] needed by the `maxp` table.
//!
//! See <https://learn.microsoft.com/en-us/typography/opentype/spec/glyf>

mod decode;
mod encode;
pub mod flags;
mod maxima;

use kurbo::Point as KPoint;

pub use decode::decode_glyph;
pub use encode::{GlyfEncodeOptions, GlyfEncoder};
pub use flags::{CompositeGlyphFlags, SimpleGlyphFlags};
pub use maxima::Maxima;

use crate::{
    model::{Contour, CurveOrder, Figure},
    round::isclose,
};

/// A point as it appears in a `glyf` record.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct OutlinePoint {
    pub pos: KPoint,
    pub on_curve: bool,
    /// Point number in the source record, if known.
    pub index: Option<u32>,
}

impl OutlinePoint {
    fn on(pos: KPoint, index: Option<u32>) -> Self {
        Self {
            pos,
            on_curve: true,
            index,
        }
    }

    fn off(pos: KPoint, index: Option<u32>) -> Self {
        Self {
            pos,
            on_curve: false,
            index,
        }
    }
}

/// Lists the points of a contour in `glyf` order.
///
/// Control points of quadratic segments are off-curve points; cubic segments
/// contribute both of their control points. On-curve points that were
/// synthesized as the midpoint of two off-curve points are implied by the
/// format and left out. When the contour carries point numbers it is rotated
/// so that the lowest numbered point comes first.
pub(crate) fn outline_points(figure: &Figure, contour: &Contour) -> Vec<OutlinePoint> {
    let mut points = Vec::new();
    for id in figure.contour_points(contour) {
        let point = figure.point(id);
        points.push(OutlinePoint::on(point.anchor, point.ttf_index));
        let Some(seg) = point.next.map(|seg| figure.segment(seg)) else {
            continue;
        };
        if seg.is_linear {
            continue;
        }
        match seg.order {
            CurveOrder::Quadratic => {
                points.push(OutlinePoint::off(point.next_control(), point.next_cp_index))
            }
            CurveOrder::Cubic => {
                points.push(OutlinePoint::off(point.next_control(), None));
                points.push(OutlinePoint::off(figure.point(seg.to).prev_control(), None));
            }
        }
    }

    let closed = figure.is_closed(contour);
    let len = points.len();
    let implied = |i: usize| {
        let point = &points[i];
        if !point.on_curve || point.index.is_some() || (!closed && (i == 0 || i + 1 == len)) {
            return false;
        }
        let prev = &points[(i + len - 1) % len];
        let next = &points[(i + 1) % len];
        if prev.on_curve || next.on_curve {
            return false;
        }
        let mid = prev.pos.midpoint(next.pos);
        isclose(mid.x, point.pos.x) && isclose(mid.y, point.pos.y)
    };
    let keep: Vec<bool> = (0..len).map(|i| !implied(i)).collect();
    let mut points: Vec<_> = points
        .into_iter()
        .zip(keep)
        .filter_map(|(point, keep)| keep.then_some(point))
        .collect();

    if closed {
        let lowest = points
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.index.map(|index| (index, i)))
            .min();
        if let Some((_, start)) = lowest {
            points.rotate_left(start);
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FigureBuilder;

    #[test]
    fn implied_midpoints_are_dropped() {
        let mut builder = FigureBuilder::new(CurveOrder::Quadratic);
        builder.move_to(KPoint::new(0.0, 0.0));
        builder.quad_to(KPoint::new(0.0, 100.0), KPoint::new(50.0, 100.0));
        builder.quad_to(KPoint::new(100.0, 100.0), KPoint::new(100.0, 0.0));
        builder.close();
        let figure = builder.finish();
        let points = outline_points(&figure, &figure.contours()[0]);
        let flags: Vec<_> = points.iter().map(|p| p.on_curve).collect();
        assert_eq!(flags, [true, false, false, true]);
        assert_eq!(points[2].pos, KPoint::new(100.0, 100.0));
    }

    #[test]
    fn cubic_segments_have_two_off_curve_points() {
        let mut builder = FigureBuilder::new(CurveOrder::Cubic);
        builder.move_to(KPoint::new(0.0, 0.0));
        builder.curve_to(
            KPoint::new(0.0, 50.0),
            KPoint::new(50.0, 100.0),
            KPoint::new(100.0, 100.0),
        );
        let figure = builder.finish();
        let points = outline_points(&figure, &figure.contours()[0]);
        assert_eq!(points.len(), 4);
        assert!(points[0].on_curve && points[3].on_curve);
        assert!(!points[1].on_curve && !points[2].on_curve);
    }
}
