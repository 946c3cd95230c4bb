//! Errors that may occur while decoding or encoding glyph programs.

use std::fmt;

use types::GlyphId16;

use crate::postscript::CharstringVersion;

/// Errors produced while evaluating a PostScript charstring.
#[derive(Clone, Debug, PartialEq)]
pub enum CharstringError {
    /// An operator required more operands than were on the stack.
    StackUnderflow,
    /// More operands were pushed than the stack can hold.
    StackOverflow,
    /// An invalid operator occurred.
    InvalidOperator(u8),
    /// An invalid escaped (two byte) operator occurred.
    InvalidEscapedOperator(u8),
    /// An operator is not permitted for this charstring version.
    UnsupportedOperator {
        name: &'static str,
        version: CharstringVersion,
    },
    /// A subroutine call was made but no subroutines are available.
    MissingSubroutines,
    /// A biased subroutine index was outside the bounds of the subroutine array.
    SubroutineIndexOutOfRange { index: i32, count: usize },
    /// The subroutine call stack exceeded its maximum depth.
    NestingDepthLimitExceeded,
    /// A hint or counter mask extended past the end of the charstring.
    HintMaskTruncated { expected: usize, remaining: usize },
    /// Every hint number has been assigned to a stem.
    TooManyHints,
    /// An accent composition referenced a code outside of the Standard Encoding.
    InvalidSeacCode(i32),
    /// A `put` or `get` referenced a slot outside of the transient array.
    InvalidTransientIndex(i32),
    /// A `blend` or `vsindex` operator was used without variation data.
    MissingBlendState,
    /// The variation store has no item variation data at this index.
    InvalidVariationStoreIndex(u16),
    /// The charstring ended in the middle of an operand or operator.
    UnexpectedEnd,
}

impl fmt::Display for CharstringError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StackUnderflow => write!(f, "operand stack underflow"),
            Self::StackOverflow => write!(f, "operand stack overflow"),
            Self::InvalidOperator(op) => write!(f, "invalid charstring operator {op}"),
            Self::InvalidEscapedOperator(op) => {
                write!(f, "invalid escaped charstring operator 12 {op}")
            }
            Self::UnsupportedOperator { name, version } => {
                write!(f, "operator '{name}' is not supported in {version} charstrings")
            }
            Self::MissingSubroutines => {
                write!(f, "encountered a subroutine call but no subroutines are available")
            }
            Self::SubroutineIndexOutOfRange { index, count } => write!(
                f,
                "subroutine index {index} is out of range for {count} subroutines"
            ),
            Self::NestingDepthLimitExceeded => write!(
                f,
                "subroutine nesting depth exceeded limit of {}",
                crate::postscript::NESTING_DEPTH_LIMIT
            ),
            Self::HintMaskTruncated {
                expected,
                remaining,
            } => write!(
                f,
                "hint mask requires {expected} bytes but only {remaining} remain"
            ),
            Self::TooManyHints => write!(f, "glyph has more than {} stem hints", 1u32 << 16),
            Self::InvalidSeacCode(code) => {
                write!(f, "accent component code {code} is outside of 0..=255")
            }
            Self::InvalidTransientIndex(ix) => write!(f, "invalid transient array index {ix}"),
            Self::MissingBlendState => write!(
                f,
                "encountered a blend operator but no variation data was provided"
            ),
            Self::InvalidVariationStoreIndex(ix) => {
                write!(f, "invalid variation store index {ix}")
            }
            Self::UnexpectedEnd => write!(f, "charstring ended unexpectedly"),
        }
    }
}

impl std::error::Error for CharstringError {}

/// Errors produced while decoding a TrueType glyph record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GlyfError {
    /// The record ended before all of its data could be read.
    OutOfBounds,
    /// Contour end point at this index was less than its preceding end point.
    ContourOrder(usize),
    /// A repeated flag extended past the declared number of points.
    RepeatCountTooLarge,
}

impl fmt::Display for GlyfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds => write!(f, "glyph record is truncated"),
            Self::ContourOrder(ix) => write!(
                f,
                "contour end point at index {ix} was less than preceding end point"
            ),
            Self::RepeatCountTooLarge => write!(f, "repeat count too large in glyph flags"),
        }
    }
}

impl std::error::Error for GlyfError {}

impl From<crate::data::OutOfBounds> for GlyfError {
    fn from(_: crate::data::OutOfBounds) -> Self {
        Self::OutOfBounds
    }
}

/// Errors produced while resolving component references.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RefError {
    /// A glyph referenced itself, directly or through other components.
    SelfReference(GlyphId16),
    /// The referenced glyph is not available.
    GlyphNotFound(GlyphId16),
    /// A point matching index did not exist in the relevant glyph.
    InvalidAnchorPoint(GlyphId16, u16),
    /// Exceeded the composite nesting limit.
    RecursionLimitExceeded(GlyphId16),
    /// A reference by Standard Encoding code could not be mapped to a glyph.
    UnresolvedStandardCode(u8),
}

impl fmt::Display for RefError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SelfReference(gid) => write!(f, "glyph {gid} references itself"),
            Self::GlyphNotFound(gid) => write!(f, "referenced glyph {gid} was not found"),
            Self::InvalidAnchorPoint(gid, index) => write!(
                f,
                "invalid anchor point index ({index}) for component glyph {gid}"
            ),
            Self::RecursionLimitExceeded(gid) => write!(
                f,
                "recursion limit ({}) exceeded when loading component {gid}",
                crate::model::COMPOSITE_RECURSION_LIMIT
            ),
            Self::UnresolvedStandardCode(code) => {
                write!(f, "no glyph for Standard Encoding code {code}")
            }
        }
    }
}

impl std::error::Error for RefError {}

/// Errors produced while encoding a glyph.
#[derive(Clone, Debug, PartialEq)]
pub enum EncodeError {
    /// A coordinate does not fit in the output format.
    CoordinateOverflow(f64),
    /// A component transform has a 2x2 entry outside of the 2.14 range.
    TransformOutOfRange(f64),
    /// A component offset does not fit in a signed 16-bit value.
    OffsetOverflow(f64),
    /// A glyph has more points than can be addressed.
    TooManyPoints(usize),
    /// A glyph has more contours than can be represented.
    TooManyContours(usize),
    /// Instructions are longer than 65535 bytes.
    InstructionsTooLong(usize),
    /// A component still refers to a Standard Encoding code.
    UnresolvedReference(u8),
    /// A charstring cannot express these glyph references; they must be
    /// flattened first.
    UnflattenedReferences(usize),
    /// Flattening references failed.
    Reference(RefError),
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CoordinateOverflow(v) => write!(f, "coordinate {v} overflows output format"),
            Self::TransformOutOfRange(v) => {
                write!(f, "transform component {v} is outside of [-2, 2)")
            }
            Self::OffsetOverflow(v) => write!(f, "component offset {v} overflows 16 bits"),
            Self::TooManyPoints(n) => write!(f, "glyph has too many points ({n})"),
            Self::TooManyContours(n) => write!(f, "glyph has too many contours ({n})"),
            Self::InstructionsTooLong(n) => write!(f, "instructions len ({n}) overflows"),
            Self::UnresolvedReference(code) => write!(
                f,
                "component refers to Standard Encoding code {code} rather than a glyph"
            ),
            Self::UnflattenedReferences(n) => write!(
                f,
                "{n} component references cannot be expressed in a charstring"
            ),
            Self::Reference(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for EncodeError {}

impl From<RefError> for EncodeError {
    fn from(value: RefError) -> Self {
        Self::Reference(value)
    }
}

/// Any error produced by this crate.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    Charstring(CharstringError),
    Glyf(GlyfError),
    Reference(RefError),
    Encode(EncodeError),
}

impl From<CharstringError> for Error {
    fn from(value: CharstringError) -> Self {
        Self::Charstring(value)
    }
}

impl From<GlyfError> for Error {
    fn from(value: GlyfError) -> Self {
        Self::Glyf(value)
    }
}

impl From<RefError> for Error {
    fn from(value: RefError) -> Self {
        Self::Reference(value)
    }
}

impl From<EncodeError> for Error {
    fn from(value: EncodeError) -> Self {
        Self::Encode(value)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Charstring(e) => write!(f, "{e}"),
            Self::Glyf(e) => write!(f, "{e}"),
            Self::Reference(e) => write!(f, "{e}"),
            Self::Encode(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for Error {}
