//! Index addressed storage for points, segments and contours.

use kurbo::{Affine, Point as KPoint, Vec2};

use crate::{hint::HintMask, round::isclose};

/// Identifies a [`Point`] within its owning [`Figure`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PointId(u32);

impl PointId {
    pub fn to_usize(self) -> usize {
        self.0 as usize
    }
}

/// Identifies a [`Segment`] within its owning [`Figure`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SegmentId(u32);

impl SegmentId {
    pub fn to_usize(self) -> usize {
        self.0 as usize
    }
}

/// Degree of the curve connecting two points.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CurveOrder {
    /// TrueType style curves with a single control point.
    Quadratic,
    /// PostScript style curves with two control points.
    #[default]
    Cubic,
}

/// Classification of an on-curve point by the shape of the path through it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PointType {
    Corner,
    /// A point joining a line and a curve whose tangent continues the line.
    Tangent,
    /// A smooth point between two curves.
    Curve,
}

/// An on-curve point along with its adjacent control points.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    pub anchor: KPoint,
    /// Incoming control point, `None` when it coincides with the anchor.
    pub prev_cp: Option<KPoint>,
    /// Outgoing control point, `None` when it coincides with the anchor.
    pub next_cp: Option<KPoint>,
    /// Hints that become active at this point.
    pub hint_mask: Option<HintMask>,
    /// TrueType point number of the anchor, if it was present in the source
    /// data (synthesized midpoints have none).
    pub ttf_index: Option<u32>,
    /// TrueType point number of `next_cp` for quadratic segments.
    pub next_cp_index: Option<u32>,
    pub prev: Option<SegmentId>,
    pub next: Option<SegmentId>,
}

impl Point {
    pub fn new(anchor: KPoint) -> Self {
        Self {
            anchor,
            ..Default::default()
        }
    }

    /// The incoming control point, falling back to the anchor.
    pub fn prev_control(&self) -> KPoint {
        self.prev_cp.unwrap_or(self.anchor)
    }

    /// The outgoing control point, falling back to the anchor.
    pub fn next_control(&self) -> KPoint {
        self.next_cp.unwrap_or(self.anchor)
    }
}

/// A spline segment connecting two points.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Segment {
    pub from: PointId,
    pub to: PointId,
    pub order: CurveOrder,
    pub is_linear: bool,
}

/// An ordered path of points.
///
/// The path starts at `first` and follows each point's `next` segment. A
/// contour is closed when the segment leaving `last` returns to `first`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Contour {
    pub first: PointId,
    pub last: PointId,
}

/// A group of contours owning the storage for their points and segments.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Figure {
    points: Vec<Point>,
    segments: Vec<Segment>,
    contours: Vec<Contour>,
}

impl Figure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.contours.is_empty()
    }

    pub fn contours(&self) -> &[Contour] {
        &self.contours
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn point(&self, id: PointId) -> &Point {
        &self.points[id.to_usize()]
    }

    pub fn point_mut(&mut self, id: PointId) -> &mut Point {
        &mut self.points[id.to_usize()]
    }

    pub fn segment(&self, id: SegmentId) -> &Segment {
        &self.segments[id.to_usize()]
    }

    /// Adds a new unconnected point.
    pub fn add_point(&mut self, point: Point) -> PointId {
        let id = PointId(self.points.len() as u32);
        self.points.push(point);
        id
    }

    /// Connects two points with a new segment.
    ///
    /// The segment is linear if neither of the facing control points is
    /// present.
    pub fn connect(&mut self, from: PointId, to: PointId, order: CurveOrder) -> SegmentId {
        let id = SegmentId(self.segments.len() as u32);
        let is_linear = self.point(from).next_cp.is_none() && self.point(to).prev_cp.is_none();
        self.segments.push(Segment {
            from,
            to,
            order,
            is_linear,
        });
        self.point_mut(from).next = Some(id);
        self.point_mut(to).prev = Some(id);
        id
    }

    pub fn push_contour(&mut self, contour: Contour) {
        self.contours.push(contour);
    }

    /// Returns true if the contour's path returns to its first point.
    pub fn is_closed(&self, contour: &Contour) -> bool {
        self.point(contour.last)
            .next
            .is_some_and(|seg| self.segment(seg).to == contour.first)
    }

    /// Returns the points of a contour in path order, starting with `first`.
    pub fn contour_points(&self, contour: &Contour) -> Vec<PointId> {
        let mut result = vec![contour.first];
        let mut current = contour.first;
        // bounded by the arena size so corrupt links can't loop forever
        while result.len() <= self.points.len() {
            let Some(seg) = self.point(current).next else {
                break;
            };
            let next = self.segment(seg).to;
            if next == contour.first {
                break;
            }
            result.push(next);
            current = next;
        }
        result
    }

    /// Returns the segments of a contour in path order, including the
    /// closing segment of a closed contour.
    pub fn contour_segments(&self, contour: &Contour) -> Vec<SegmentId> {
        self.contour_points(contour)
            .into_iter()
            .filter_map(|id| self.point(id).next)
            .collect()
    }

    /// Closes the contour at `index` with a line back to its first point.
    ///
    /// Contours that are already closed or contain a single point are left
    /// alone.
    pub fn close_contour(&mut self, index: usize, order: CurveOrder) {
        let Some(contour) = self.contours.get(index).copied() else {
            return;
        };
        if contour.first == contour.last || self.is_closed(&contour) {
            return;
        }
        self.point_mut(contour.last).next_cp = None;
        self.point_mut(contour.first).prev_cp = None;
        self.connect(contour.last, contour.first, order);
    }

    /// Classifies the point by its neighboring control points.
    pub fn point_type(&self, id: PointId) -> PointType {
        let point = self.point(id);
        let incoming = match point.prev_cp {
            Some(cp) => Some(point.anchor - cp),
            None => point
                .prev
                .map(|seg| point.anchor - self.point(self.segment(seg).from).anchor),
        };
        let outgoing = match point.next_cp {
            Some(cp) => Some(cp - point.anchor),
            None => point
                .next
                .map(|seg| self.point(self.segment(seg).to).anchor - point.anchor),
        };
        let (Some(incoming), Some(outgoing)) = (incoming, outgoing) else {
            return PointType::Corner;
        };
        if !is_smooth(incoming, outgoing) {
            return PointType::Corner;
        }
        match (point.prev_cp.is_some(), point.next_cp.is_some()) {
            (true, true) => PointType::Curve,
            (true, false) | (false, true) => PointType::Tangent,
            (false, false) => PointType::Corner,
        }
    }

    /// Applies an affine transform to every point.
    pub fn transform(&mut self, affine: Affine) {
        for point in &mut self.points {
            point.anchor = affine * point.anchor;
            point.prev_cp = point.prev_cp.map(|cp| affine * cp);
            point.next_cp = point.next_cp.map(|cp| affine * cp);
        }
    }

    /// Returns true if any curved segment is cubic.
    pub fn has_cubics(&self) -> bool {
        self.segments
            .iter()
            .any(|seg| !seg.is_linear && seg.order == CurveOrder::Cubic)
    }

    /// Returns true if any curved segment is quadratic.
    pub fn has_quadratics(&self) -> bool {
        self.segments
            .iter()
            .any(|seg| !seg.is_linear && seg.order == CurveOrder::Quadratic)
    }
}

fn is_smooth(incoming: Vec2, outgoing: Vec2) -> bool {
    let (len_in, len_out) = (incoming.hypot(), outgoing.hypot());
    if len_in == 0.0 || len_out == 0.0 {
        return false;
    }
    // sine of the turning angle
    (incoming.cross(outgoing) / (len_in * len_out)).abs() < 0.01 && incoming.dot(outgoing) > 0.0
}

/// Incrementally builds a [`Figure`] from path commands.
///
/// Each `move_to` starts a new contour. Contours are left open unless
/// [`close`](Self::close) is called, but a contour whose final point lands
/// on its first point is always joined into a closed loop.
#[derive(Debug, Default)]
pub struct FigureBuilder {
    figure: Figure,
    order: CurveOrder,
    start: Option<PointId>,
    current: Option<PointId>,
}

impl FigureBuilder {
    /// Creates a builder. Lines are tagged with the given order.
    pub fn new(order: CurveOrder) -> Self {
        Self {
            order,
            ..Default::default()
        }
    }

    /// The most recently added point.
    pub fn current(&self) -> Option<PointId> {
        self.current
    }

    pub fn point_mut(&mut self, id: PointId) -> &mut Point {
        self.figure.point_mut(id)
    }

    pub fn move_to(&mut self, p: KPoint) -> PointId {
        self.finish_contour(false);
        let id = self.figure.add_point(Point::new(p));
        self.start = Some(id);
        self.current = Some(id);
        id
    }

    pub fn line_to(&mut self, p: KPoint) -> PointId {
        let from = self.ensure_started(p);
        let to = self.figure.add_point(Point::new(p));
        self.figure.connect(from, to, self.order);
        self.current = Some(to);
        to
    }

    pub fn quad_to(&mut self, c: KPoint, p: KPoint) -> PointId {
        let from = self.ensure_started(c);
        self.figure.point_mut(from).next_cp = Some(c);
        let to = self.figure.add_point(Point {
            prev_cp: Some(c),
            ..Point::new(p)
        });
        self.figure.connect(from, to, CurveOrder::Quadratic);
        self.current = Some(to);
        to
    }

    pub fn curve_to(&mut self, c1: KPoint, c2: KPoint, p: KPoint) -> PointId {
        let from = self.ensure_started(c1);
        let from_point = self.figure.point_mut(from);
        from_point.next_cp = (c1 != from_point.anchor).then_some(c1);
        let to = self.figure.add_point(Point {
            prev_cp: (c2 != p).then_some(c2),
            ..Point::new(p)
        });
        self.figure.connect(from, to, CurveOrder::Cubic);
        self.current = Some(to);
        to
    }

    /// Closes the current contour.
    pub fn close(&mut self) {
        self.finish_contour(true);
    }

    /// Finishes the last contour, leaving it open, and returns the figure.
    pub fn finish(mut self) -> Figure {
        self.finish_contour(false);
        self.figure
    }

    fn ensure_started(&mut self, p: KPoint) -> PointId {
        match self.current {
            Some(id) => id,
            None => self.move_to(p),
        }
    }

    fn finish_contour(&mut self, close: bool) {
        let (Some(first), Some(mut last)) = (self.start.take(), self.current.take()) else {
            return;
        };
        if first != last {
            let figure = &mut self.figure;
            let coincident = {
                let (a, b) = (figure.point(first).anchor, figure.point(last).anchor);
                isclose(a.x, b.x) && isclose(a.y, b.y)
            };
            // `last` is always the most recently added point, so it can be
            // removed without invalidating other ids
            if coincident && last.to_usize() + 1 == figure.points.len() {
                if let Some(removed) = figure.points.pop() {
                    if let Some(seg) = removed.prev {
                        let prev = figure.segments[seg.to_usize()].from;
                        figure.segments[seg.to_usize()].to = first;
                        let first_point = figure.point_mut(first);
                        first_point.prev = Some(seg);
                        first_point.prev_cp = removed.prev_cp;
                        if first_point.hint_mask.is_none() {
                            first_point.hint_mask = removed.hint_mask;
                        }
                        last = prev;
                    }
                }
            } else if close {
                figure.point_mut(last).next_cp = None;
                figure.point_mut(first).prev_cp = None;
                figure.connect(last, first, self.order);
            }
        }
        self.figure.contours.push(Contour { first, last });
    }
}
