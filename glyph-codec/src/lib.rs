//! Translating glyph outline programs to and from a spline model.
//!
//! This crate converts between the two binary glyph encodings found in
//! OpenType fonts and a single in-memory representation:
//!
//! * PostScript charstrings (Type1, Type2/CFF and CFF2) are decoded by the
//!   [charstring interpreter](postscript::decode_charstring) and produced by
//!   the [charstring encoder](postscript::encode_charstring).
//! * TrueType `glyf` records (simple and composite) are handled by
//!   [`truetype::decode_glyph`] and [`truetype::GlyfEncoder`].
//!
//! Both directions share the [spline model](model): glyphs made of figures,
//! which own their points and segments in an index-addressed arena, plus
//! component references and stem hints.
//!
//! The surrounding font container (CFF dictionaries, subroutine indexes,
//! `loca`, `hmtx` and so on) is not parsed here; callers hand the relevant
//! pieces over through [`postscript::CffContext`] and the
//! [`model::GlyphSource`] trait.
//!
//! ## Error handling
//!
//! Decoding problems are reported per glyph. Decoders return a [`Decoded`]
//! value that always carries the glyph (possibly partially built) along with
//! any diagnostics, so that a malformed glyph never prevents processing the
//! rest of a font.

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

mod data;
pub mod error;
pub mod hint;
pub mod model;
pub mod postscript;
mod round;
pub mod truetype;
mod write;

/// Public re-export of the font-types crate.
pub extern crate font_types as types;

pub use error::{CharstringError, EncodeError, Error, GlyfError, RefError};
pub use hint::{HintMask, StemHints, StemInfo, StemList};
pub use model::{
    ComponentRef, Contour, Figure, Glyph, GlyphOutlines, GlyphSource, OutlineFormat, Point,
    PointId, Segment, SegmentId,
};

/// The result of decoding a single glyph.
///
/// Decoding never discards a glyph: when something goes wrong the glyph is
/// left in whatever state it had reached and the problems are listed in
/// `diagnostics`.
#[derive(Clone, Debug)]
pub struct Decoded<T, E> {
    /// The decoded (or partially decoded) value.
    pub glyph: T,
    /// Problems encountered while decoding, in the order they occurred.
    pub diagnostics: Vec<E>,
}

impl<T, E> Decoded<T, E> {
    pub(crate) fn new(glyph: T, diagnostics: Vec<E>) -> Self {
        Self { glyph, diagnostics }
    }

    /// Returns `true` if no diagnostics were reported.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Converts into a `Result`, returning the first diagnostic as the error.
    pub fn into_result(self) -> Result<T, E> {
        match self.diagnostics.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(self.glyph),
        }
    }
}
