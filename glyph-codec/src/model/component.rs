//! Component references and their resolution.

use std::collections::{BTreeMap, HashMap};

use kurbo::{Affine, Point as KPoint};
use types::GlyphId16;

use super::{Figure, Glyph};
use crate::error::RefError;

/// Maximum depth of nested component references.
///
/// This matches the limit used by FreeType and HarfBuzz.
pub const COMPOSITE_RECURSION_LIMIT: usize = 32;

/// The glyph targeted by a component reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RefTarget {
    Glyph(GlyphId16),
    /// A code point in the Adobe Standard Encoding, produced by `seac`.
    StandardCode(u8),
}

/// A pair of point numbers used to position a component.
///
/// The component is translated so that its `component` point lands on the
/// `base` point of the glyph assembled so far.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PointMatch {
    pub base: u16,
    pub component: u16,
}

/// Per component options that survive a TrueType round trip.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ComponentFlags {
    /// Round the offset to the pixel grid.
    pub round_xy_to_grid: bool,
    /// Use this component's metrics for the composite glyph.
    pub use_my_metrics: bool,
    /// The composite has overlapping contours.
    pub overlap_compound: bool,
    /// The offset is scaled by the component transform.
    pub scaled_component_offset: bool,
    /// The offset is applied after the component transform.
    pub unscaled_component_offset: bool,
}

/// A reference to another glyph, placed with an affine transform.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ComponentRef {
    pub target: RefTarget,
    /// Transform as `[xx, yx, xy, yy, dx, dy]`.
    pub transform: Affine,
    /// Point matching anchor, resolved into the translation of `transform`
    /// by [`Glyph::finalize_refs`].
    pub point_match: Option<PointMatch>,
    pub flags: ComponentFlags,
}

impl ComponentRef {
    pub fn new(gid: GlyphId16, transform: Affine) -> Self {
        Self {
            target: RefTarget::Glyph(gid),
            transform,
            point_match: None,
            flags: Default::default(),
        }
    }

    /// A reference by Standard Encoding code, translated by `(dx, dy)`.
    pub fn standard_code(code: u8, dx: f64, dy: f64) -> Self {
        Self {
            target: RefTarget::StandardCode(code),
            transform: Affine::translate((dx, dy)),
            point_match: None,
            flags: Default::default(),
        }
    }

    /// Returns the target glyph id, failing for unresolved Standard Encoding
    /// references.
    pub fn glyph_id(&self) -> Result<GlyphId16, RefError> {
        match self.target {
            RefTarget::Glyph(gid) => Ok(gid),
            RefTarget::StandardCode(code) => Err(RefError::UnresolvedStandardCode(code)),
        }
    }

    /// The 2x2 portion of the transform, without translation.
    pub fn linear(&self) -> Affine {
        let [xx, yx, xy, yy, _, _] = self.transform.as_coeffs();
        Affine::new([xx, yx, xy, yy, 0.0, 0.0])
    }

    pub fn set_translation(&mut self, dx: f64, dy: f64) {
        let [xx, yx, xy, yy, _, _] = self.transform.as_coeffs();
        self.transform = Affine::new([xx, yx, xy, yy, dx, dy]);
    }
}

/// Access to other glyphs of a font, needed to resolve component references.
pub trait GlyphSource {
    fn glyph(&self, gid: GlyphId16) -> Option<&Glyph>;
}

impl GlyphSource for [Glyph] {
    fn glyph(&self, gid: GlyphId16) -> Option<&Glyph> {
        self.get(gid.to_u16() as usize)
    }
}

impl GlyphSource for Vec<Glyph> {
    fn glyph(&self, gid: GlyphId16) -> Option<&Glyph> {
        self.as_slice().glyph(gid)
    }
}

impl GlyphSource for BTreeMap<GlyphId16, Glyph> {
    fn glyph(&self, gid: GlyphId16) -> Option<&Glyph> {
        self.get(&gid)
    }
}

impl<S: std::hash::BuildHasher> GlyphSource for HashMap<GlyphId16, Glyph, S> {
    fn glyph(&self, gid: GlyphId16) -> Option<&Glyph> {
        self.get(&gid)
    }
}

fn lookup<'a>(
    source: &'a (impl GlyphSource + ?Sized),
    root: GlyphId16,
    target: GlyphId16,
) -> Result<&'a Glyph, RefError> {
    if target == root {
        return Err(RefError::SelfReference(root));
    }
    source.glyph(target).ok_or(RefError::GlyphNotFound(target))
}

/// Returns the numbered points of a glyph with all components placed.
fn placed_points(
    glyph: &Glyph,
    root: GlyphId16,
    source: &(impl GlyphSource + ?Sized),
    depth: usize,
) -> Result<Vec<KPoint>, RefError> {
    let mut points = glyph.numbered_points();
    for component in &glyph.refs {
        let gid = component.glyph_id()?;
        if depth > COMPOSITE_RECURSION_LIMIT {
            return Err(RefError::RecursionLimitExceeded(gid));
        }
        let child = lookup(source, root, gid)?;
        let child_points = placed_points(child, root, source, depth + 1)?;
        points.extend(child_points.into_iter().map(|p| component.transform * p));
    }
    Ok(points)
}

fn placed_figures(
    glyph: &Glyph,
    root: GlyphId16,
    source: &(impl GlyphSource + ?Sized),
    depth: usize,
) -> Result<Vec<Figure>, RefError> {
    let mut figures = glyph.figures.clone();
    for component in &glyph.refs {
        let gid = component.glyph_id()?;
        if depth > COMPOSITE_RECURSION_LIMIT {
            return Err(RefError::RecursionLimitExceeded(gid));
        }
        let child = lookup(source, root, gid)?;
        for mut figure in placed_figures(child, root, source, depth + 1)? {
            figure.transform(component.transform);
            figures.push(figure);
        }
    }
    Ok(figures)
}

impl Glyph {
    /// Resolves point matched component positions.
    ///
    /// For each reference carrying a [`PointMatch`], the translation is set
    /// so that the component's point (after applying the 2x2 part of the
    /// transform) coincides with the base point of the components placed
    /// before it. All referenced glyphs must be available from `source`.
    pub fn finalize_refs(
        &mut self,
        gid: GlyphId16,
        source: &(impl GlyphSource + ?Sized),
    ) -> Result<(), RefError> {
        let mut points = self.numbered_points();
        for component in &mut self.refs {
            let target = component.glyph_id()?;
            let child = lookup(source, gid, target)?;
            let child_points = placed_points(child, gid, source, 1)?;
            if let Some(anchor) = component.point_match {
                let base = points
                    .get(anchor.base as usize)
                    .ok_or(RefError::InvalidAnchorPoint(gid, anchor.base))?;
                let matched = child_points
                    .get(anchor.component as usize)
                    .ok_or(RefError::InvalidAnchorPoint(target, anchor.component))?;
                let delta = *base - component.linear() * *matched;
                component.set_translation(delta.x, delta.y);
            }
            points.extend(child_points.into_iter().map(|p| component.transform * p));
        }
        Ok(())
    }

    /// Replaces Standard Encoding references with glyph references.
    ///
    /// `lookup` maps a Standard Encoding code to the glyph with that
    /// encoding in the current font.
    pub fn resolve_standard_codes(
        &mut self,
        mut lookup: impl FnMut(u8) -> Option<GlyphId16>,
    ) -> Result<(), RefError> {
        for component in &mut self.refs {
            if let RefTarget::StandardCode(code) = component.target {
                let gid = lookup(code).ok_or(RefError::UnresolvedStandardCode(code))?;
                component.target = RefTarget::Glyph(gid);
            }
        }
        Ok(())
    }

    /// Replaces all component references with transformed copies of the
    /// referenced outlines.
    ///
    /// On failure the glyph is left unchanged.
    pub fn flatten_refs(
        &mut self,
        gid: GlyphId16,
        source: &(impl GlyphSource + ?Sized),
    ) -> Result<(), RefError> {
        let mut figures = Vec::new();
        for component in &self.refs {
            let target = component.glyph_id()?;
            let child = lookup(source, gid, target)?;
            for mut figure in placed_figures(child, gid, source, 1)? {
                figure.transform(component.transform);
                figures.push(figure);
            }
        }
        self.refs.clear();
        self.figures.extend(figures.into_iter().filter(|f| !f.is_empty()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use kurbo::Point as KPoint;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{CurveOrder, FigureBuilder, OutlineFormat};

    fn square(x: f64, y: f64, size: f64) -> Glyph {
        let mut builder = FigureBuilder::new(CurveOrder::Quadratic);
        let corners = [(x, y), (x, y + size), (x + size, y + size), (x + size, y)];
        for (i, (px, py)) in corners.into_iter().enumerate() {
            let id = if i == 0 {
                builder.move_to(KPoint::new(px, py))
            } else {
                builder.line_to(KPoint::new(px, py))
            };
            builder.point_mut(id).ttf_index = Some(i as u32);
        }
        builder.close();
        let mut glyph = Glyph::new(OutlineFormat::TrueType);
        glyph.figures.push(builder.finish());
        glyph
    }

    #[test]
    fn point_matching_sets_translation() {
        let glyphs = vec![Glyph::new(OutlineFormat::TrueType), square(0.0, 0.0, 100.0)];
        let mut composite = Glyph::new(OutlineFormat::TrueType);
        composite
            .refs
            .push(ComponentRef::new(GlyphId16::new(1), Affine::translate((10.0, 0.0))));
        let mut second = ComponentRef::new(GlyphId16::new(1), Affine::scale(0.5));
        // point 2 of the composite so far is (110, 100)
        second.point_match = Some(PointMatch {
            base: 2,
            component: 0,
        });
        composite.refs.push(second);
        composite.finalize_refs(GlyphId16::new(2), &glyphs).unwrap();
        assert_eq!(
            composite.refs[1].transform.as_coeffs(),
            [0.5, 0.0, 0.0, 0.5, 110.0, 100.0]
        );
        // matched point lands exactly on the base point
        let placed = composite.refs[1].transform * KPoint::new(0.0, 0.0);
        assert_eq!(placed, KPoint::new(110.0, 100.0));
    }

    #[test]
    fn invalid_anchor_point() {
        let glyphs = vec![Glyph::new(OutlineFormat::TrueType), square(0.0, 0.0, 100.0)];
        let mut composite = Glyph::new(OutlineFormat::TrueType);
        let mut component = ComponentRef::new(GlyphId16::new(1), Affine::IDENTITY);
        component.point_match = Some(PointMatch {
            base: 0,
            component: 0,
        });
        composite.refs.push(component);
        assert_eq!(
            composite.finalize_refs(GlyphId16::new(2), &glyphs),
            Err(RefError::InvalidAnchorPoint(GlyphId16::new(2), 0))
        );
    }

    #[test]
    fn self_reference() {
        let mut glyphs = vec![Glyph::new(OutlineFormat::TrueType)];
        glyphs[0]
            .refs
            .push(ComponentRef::new(GlyphId16::new(0), Affine::IDENTITY));
        let mut glyph = glyphs[0].clone();
        assert_eq!(
            glyph.flatten_refs(GlyphId16::new(0), &glyphs),
            Err(RefError::SelfReference(GlyphId16::new(0)))
        );
        assert_eq!(glyph.refs.len(), 1);
    }

    #[test]
    fn flatten_nested() {
        let mut glyphs = vec![square(0.0, 0.0, 10.0), Glyph::new(OutlineFormat::TrueType)];
        glyphs[1]
            .refs
            .push(ComponentRef::new(GlyphId16::new(0), Affine::translate((5.0, 0.0))));
        let mut glyph = Glyph::new(OutlineFormat::TrueType);
        glyph
            .refs
            .push(ComponentRef::new(GlyphId16::new(1), Affine::scale(2.0)));
        glyph.flatten_refs(GlyphId16::new(2), &glyphs).unwrap();
        assert!(glyph.refs.is_empty());
        assert_eq!(glyph.figures.len(), 1);
        let anchors: Vec<_> = glyph.figures[0].points().iter().map(|p| p.anchor).collect();
        assert_eq!(
            anchors,
            [
                KPoint::new(10.0, 0.0),
                KPoint::new(10.0, 20.0),
                KPoint::new(30.0, 20.0),
                KPoint::new(30.0, 0.0)
            ]
        );
    }

    #[test]
    fn standard_codes() {
        let mut glyph = Glyph::new(OutlineFormat::PostScript);
        glyph.refs.push(ComponentRef::standard_code(65, 0.0, 0.0));
        glyph.refs.push(ComponentRef::standard_code(194, 30.0, 200.0));
        assert_eq!(
            glyph.clone().resolve_standard_codes(|code| (code == 65).then_some(GlyphId16::new(34))),
            Err(RefError::UnresolvedStandardCode(194))
        );
        glyph
            .resolve_standard_codes(|code| Some(GlyphId16::new(code as u16)))
            .unwrap();
        assert_eq!(glyph.refs[1].target, RefTarget::Glyph(GlyphId16::new(194)));
        assert_eq!(glyph.refs[1].transform.translation(), kurbo::Vec2::new(30.0, 200.0));
    }
}
