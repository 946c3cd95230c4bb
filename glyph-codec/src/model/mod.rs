//! The in-memory spline representation shared by all codecs.
//!
//! A [`Glyph`] owns zero or more [`Figure`]s, each of which stores the
//! points and segments of its contours in an index addressed arena, along
//! with component references, metrics and stem hints.

mod component;
mod figure;

use kurbo::{Affine, CubicBez, Point as KPoint, Rect};
use types::Pen;

pub use component::{
    ComponentFlags, ComponentRef, GlyphSource, PointMatch, RefTarget, COMPOSITE_RECURSION_LIMIT,
};
pub use figure::{
    Contour, CurveOrder, Figure, FigureBuilder, Point, PointId, PointType, Segment, SegmentId,
};

use crate::{
    hint::{HintMask, StemHints},
    postscript::PaintType,
};

/// Default tolerance, in font units, when approximating cubic curves with
/// quadratic ones.
pub const DEFAULT_QUADRATIC_ACCURACY: f64 = 1.0;

/// The kind of outline a glyph was decoded from or will be encoded to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OutlineFormat {
    /// Quadratic outlines from the `glyf` table.
    TrueType,
    /// Cubic outlines from Type1, CFF or CFF2 charstrings.
    #[default]
    PostScript,
}

impl OutlineFormat {
    /// The curve order native to this format.
    pub fn curve_order(self) -> CurveOrder {
        match self {
            Self::TrueType => CurveOrder::Quadratic,
            Self::PostScript => CurveOrder::Cubic,
        }
    }
}

/// One outline program for a single glyph.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Glyph {
    pub format: OutlineFormat,
    pub figures: Vec<Figure>,
    pub refs: Vec<ComponentRef>,
    pub advance_width: f64,
    pub lsb: f64,
    pub hints: StemHints,
    /// Counter masks from `cntrmask` operators, in program order.
    pub counter_masks: Vec<HintMask>,
    pub bbox: Rect,
    /// TrueType instructions.
    pub instructions: Vec<u8>,
    /// Set when the first TrueType flag carried `OVERLAP_SIMPLE`.
    pub overlap_simple: bool,
}

impl Glyph {
    pub fn new(format: OutlineFormat) -> Self {
        Self {
            format,
            ..Default::default()
        }
    }

    /// Returns true if the glyph has neither contours nor references.
    pub fn is_empty(&self) -> bool {
        self.refs.is_empty() && self.figures.iter().all(Figure::is_empty)
    }

    /// Returns true if the glyph has both contours and references.
    pub fn is_mixed(&self) -> bool {
        !self.refs.is_empty() && !self.figures.iter().all(Figure::is_empty)
    }

    pub fn contour_count(&self) -> usize {
        self.figures.iter().map(|f| f.contours().len()).sum()
    }

    pub fn has_cubics(&self) -> bool {
        self.figures.iter().any(Figure::has_cubics)
    }

    pub fn has_quadratics(&self) -> bool {
        self.figures.iter().any(Figure::has_quadratics)
    }

    /// Returns the outline points in TrueType point number order.
    ///
    /// Off-curve points are included; implied on-curve midpoints are not.
    pub fn numbered_points(&self) -> Vec<KPoint> {
        self.figures
            .iter()
            .flat_map(|figure| {
                figure
                    .contours()
                    .iter()
                    .flat_map(|contour| crate::truetype::outline_points(figure, contour))
            })
            .map(|p| p.pos)
            .collect()
    }

    /// Adds a closing line to every open contour.
    ///
    /// Stroked (paint type 2) fonts may legitimately contain open paths and
    /// are left untouched.
    pub fn close_open_contours(&mut self, paint_type: PaintType) {
        if paint_type == PaintType::Stroked {
            return;
        }
        let order = self.format.curve_order();
        for figure in &mut self.figures {
            for i in 0..figure.contours().len() {
                figure.close_contour(i, order);
            }
        }
    }

    /// Recomputes and returns the bounding box of all outline points,
    /// including control points.
    ///
    /// References are not taken into account.
    pub fn compute_bbox(&mut self) -> Rect {
        let mut points = self.figures.iter().flat_map(|figure| {
            figure.points().iter().flat_map(|p| {
                std::iter::once(p.anchor)
                    .chain(p.prev_cp)
                    .chain(p.next_cp)
            })
        });
        self.bbox = match points.next() {
            Some(first) => points.fold(Rect::from_points(first, first), |rect, p| rect.union_pt(p)),
            None => Rect::ZERO,
        };
        self.bbox
    }

    /// Applies an affine transform to all contours and references.
    pub fn transform(&mut self, affine: Affine) {
        for figure in &mut self.figures {
            figure.transform(affine);
        }
        for component in &mut self.refs {
            component.transform = affine * component.transform;
        }
    }

    /// Rebuilds all contours using the curve order of `format`.
    ///
    /// Quadratic curves are converted to cubics exactly; cubic curves are
    /// approximated by quadratic splines within `accuracy` font units.
    pub fn convert_to(&mut self, format: OutlineFormat, accuracy: f64) {
        let order = format.curve_order();
        self.figures = self
            .figures
            .iter()
            .map(|figure| rebuild_figure(figure, order, accuracy))
            .collect();
        self.format = format;
    }

    /// Emits the outline to the given pen.
    ///
    /// Every contour is closed, so open PostScript paths are implicitly
    /// closed with a line.
    pub fn draw(&self, pen: &mut impl Pen) {
        for figure in &self.figures {
            for contour in figure.contours() {
                let start = figure.point(contour.first).anchor;
                pen.move_to(start.x as f32, start.y as f32);
                let closed = figure.is_closed(contour);
                let segments = figure.contour_segments(contour);
                let count = segments.len();
                for (i, seg_id) in segments.into_iter().enumerate() {
                    let seg = figure.segment(seg_id);
                    if closed && i + 1 == count && seg.is_linear {
                        break;
                    }
                    let from = figure.point(seg.from);
                    let to = figure.point(seg.to);
                    let p = to.anchor;
                    match (seg.is_linear, seg.order) {
                        (true, _) => pen.line_to(p.x as f32, p.y as f32),
                        (false, CurveOrder::Quadratic) => {
                            let c = from.next_control();
                            pen.quad_to(c.x as f32, c.y as f32, p.x as f32, p.y as f32)
                        }
                        (false, CurveOrder::Cubic) => {
                            let (c1, c2) = (from.next_control(), to.prev_control());
                            pen.curve_to(
                                c1.x as f32,
                                c1.y as f32,
                                c2.x as f32,
                                c2.y as f32,
                                p.x as f32,
                                p.y as f32,
                            )
                        }
                    }
                }
                pen.close();
            }
        }
    }
}

fn copy_attributes(builder: &mut FigureBuilder, id: PointId, source: &Point) {
    let point = builder.point_mut(id);
    point.hint_mask = source.hint_mask.clone();
    point.ttf_index = source.ttf_index;
}

fn rebuild_figure(figure: &Figure, order: CurveOrder, accuracy: f64) -> Figure {
    let mut builder = FigureBuilder::new(order);
    for contour in figure.contours() {
        let first = figure.point(contour.first);
        let start = builder.move_to(first.anchor);
        copy_attributes(&mut builder, start, first);
        let closed = figure.is_closed(contour);
        let segments = figure.contour_segments(contour);
        let count = segments.len();
        for (i, seg_id) in segments.into_iter().enumerate() {
            let seg = *figure.segment(seg_id);
            let is_closing = closed && i + 1 == count;
            if is_closing && seg.is_linear {
                break;
            }
            let from = figure.point(seg.from);
            let to = figure.point(seg.to);
            let current = builder.current();
            let end = match (seg.is_linear, seg.order, order) {
                (true, ..) => builder.line_to(to.anchor),
                (false, CurveOrder::Quadratic, CurveOrder::Quadratic) => {
                    let c = from.next_control();
                    if let Some(current) = current {
                        builder.point_mut(current).next_cp_index = from.next_cp_index;
                    }
                    builder.quad_to(c, to.anchor)
                }
                (false, CurveOrder::Quadratic, CurveOrder::Cubic) => {
                    let c = from.next_control();
                    let c1 = from.anchor + (c - from.anchor) * (2.0 / 3.0);
                    let c2 = to.anchor + (c - to.anchor) * (2.0 / 3.0);
                    builder.curve_to(c1, c2, to.anchor)
                }
                (false, CurveOrder::Cubic, CurveOrder::Cubic) => {
                    builder.curve_to(from.next_control(), to.prev_control(), to.anchor)
                }
                (false, CurveOrder::Cubic, CurveOrder::Quadratic) => {
                    let cubic =
                        CubicBez::new(from.anchor, from.next_control(), to.prev_control(), to.anchor);
                    let mut end = None;
                    for (_, _, quad) in cubic.to_quads(accuracy) {
                        end = Some(builder.quad_to(quad.p1, quad.p2));
                    }
                    match end {
                        Some(end) => end,
                        None => builder.line_to(to.anchor),
                    }
                }
            };
            if !is_closing {
                copy_attributes(&mut builder, end, to);
            }
        }
        if closed {
            builder.close();
        }
    }
    builder.finish()
}

/// The outlines of a glyph in each of the supported formats.
///
/// Each format is owned independently; switching formats selects which one
/// is active rather than mutating a shared structure.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GlyphOutlines {
    active: OutlineFormat,
    truetype: Option<Glyph>,
    postscript: Option<Glyph>,
}

impl GlyphOutlines {
    /// Creates a set of outlines with `glyph` as the active outline.
    pub fn new(glyph: Glyph) -> Self {
        let mut outlines = Self {
            active: glyph.format,
            ..Default::default()
        };
        outlines.insert(glyph);
        outlines
    }

    pub fn active_format(&self) -> OutlineFormat {
        self.active
    }

    pub fn active(&self) -> Option<&Glyph> {
        self.get(self.active)
    }

    pub fn active_mut(&mut self) -> Option<&mut Glyph> {
        self.get_mut(self.active)
    }

    pub fn get(&self, format: OutlineFormat) -> Option<&Glyph> {
        match format {
            OutlineFormat::TrueType => self.truetype.as_ref(),
            OutlineFormat::PostScript => self.postscript.as_ref(),
        }
    }

    pub fn get_mut(&mut self, format: OutlineFormat) -> Option<&mut Glyph> {
        match format {
            OutlineFormat::TrueType => self.truetype.as_mut(),
            OutlineFormat::PostScript => self.postscript.as_mut(),
        }
    }

    /// Stores a glyph in the slot for its format, returning the previous
    /// one.
    pub fn insert(&mut self, glyph: Glyph) -> Option<Glyph> {
        let slot = match glyph.format {
            OutlineFormat::TrueType => &mut self.truetype,
            OutlineFormat::PostScript => &mut self.postscript,
        };
        slot.replace(glyph)
    }

    /// Makes `format` the active outline kind.
    ///
    /// If no outline of that kind exists, one is built by converting the
    /// currently active outline.
    pub fn set_active(&mut self, format: OutlineFormat, accuracy: f64) {
        if self.get(format).is_none() {
            if let Some(mut converted) = self.active().cloned() {
                converted.convert_to(format, accuracy);
                self.insert(converted);
            }
        }
        self.active = format;
    }
}
