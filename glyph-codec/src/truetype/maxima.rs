//! Font-wide glyph statistics for the `maxp` table.

/// The maximum values of the `maxp` version 1.0 glyph statistics.
///
/// A [`GlyfEncoder`](super::GlyfEncoder) merges the statistics of every
/// glyph it writes; the owner of the `maxp` table copies them out when the
/// font is assembled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Maxima {
    /// Maximum points in a simple glyph.
    pub max_points: u16,
    /// Maximum contours in a simple glyph.
    pub max_contours: u16,
    /// Maximum points in a composite glyph, counting all of its leaves.
    pub max_composite_points: u16,
    /// Maximum contours in a composite glyph, counting all of its leaves.
    pub max_composite_contours: u16,
    /// Maximum number of components referenced by a single composite.
    pub max_component_elements: u16,
    /// Maximum levels of composite nesting; a composite of simple glyphs
    /// has depth 1.
    pub max_component_depth: u16,
    /// Maximum byte count of glyph instructions.
    pub max_size_of_instructions: u16,
}

impl Maxima {
    /// Raises each statistic to at least the value in `other`.
    pub fn update(&mut self, other: &Maxima) {
        self.max_points = self.max_points.max(other.max_points);
        self.max_contours = self.max_contours.max(other.max_contours);
        self.max_composite_points = self.max_composite_points.max(other.max_composite_points);
        self.max_composite_contours = self
            .max_composite_contours
            .max(other.max_composite_contours);
        self.max_component_elements = self
            .max_component_elements
            .max(other.max_component_elements);
        self.max_component_depth = self.max_component_depth.max(other.max_component_depth);
        self.max_size_of_instructions = self
            .max_size_of_instructions
            .max(other.max_size_of_instructions);
    }
}

/// Converts a count to `u16`, saturating.
pub(super) fn saturate(count: usize) -> u16 {
    u16::try_from(count).unwrap_or(u16::MAX)
}
