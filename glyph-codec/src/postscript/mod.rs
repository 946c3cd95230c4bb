//! PostScript charstrings: Type1, Type2 (CFF) and CFF2.
//!
//! The font level structures (dictionaries, subroutine indexes, variation
//! store) belong to the surrounding table container. The pieces of them that
//! the codec needs are supplied through a [`CffContext`].

mod blend;
mod encode;
mod interpret;
mod number;
mod operator;
mod stack;
mod type1;

use std::fmt;

use types::F2Dot14;

use crate::error::CharstringError;

pub use blend::{ItemVariationData, RegionAxis, VariationRegion, VariationStore};
pub use encode::{encode_charstring, EncodeOptions};
pub use interpret::{decode_charstring, decode_charstring_with_hint_count};
pub use type1::{decrypt_charstring, encrypt_charstring, CHARSTRING_KEY, DEFAULT_LEN_IV};

/// Maximum nesting depth for subroutine calls.
///
/// See "Appendix B Type 2 Charstring Implementation Limits" at
/// <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf#page=33>
pub const NESTING_DEPTH_LIMIT: u32 = 10;

/// Charstring dialect.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CharstringVersion {
    /// Type 1 fonts.
    Type1,
    /// CFF fonts.
    #[default]
    Type2,
    /// CFF2 (variable) fonts.
    Cff2,
}

impl CharstringVersion {
    /// Maximum number of operands on the argument stack.
    pub fn max_stack(self) -> usize {
        match self {
            Self::Type1 | Self::Type2 => 48,
            Self::Cff2 => 513,
        }
    }
}

impl fmt::Display for CharstringVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type1 => f.write_str("Type1"),
            Self::Type2 => f.write_str("Type2"),
            Self::Cff2 => f.write_str("CFF2"),
        }
    }
}

/// The `PaintType` of a font.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PaintType {
    /// Paint type 0.
    #[default]
    Filled,
    /// Paint type 2, where outlines are stroked and paths may be open.
    Stroked,
}

impl PaintType {
    pub fn from_raw(value: i32) -> Self {
        match value {
            2 => Self::Stroked,
            _ => Self::Filled,
        }
    }
}

/// An array of subroutines with the bias applied to operands of
/// `callsubr` and `callgsubr`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Subrs<'a> {
    items: &'a [Vec<u8>],
    bias: i32,
}

impl<'a> Subrs<'a> {
    pub fn new(items: &'a [Vec<u8>], version: CharstringVersion) -> Self {
        let bias = match version {
            CharstringVersion::Type1 => 0,
            _ => subr_bias(items.len()),
        };
        Self { items, bias }
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn bias(&self) -> i32 {
        self.bias
    }

    /// Returns the subroutine for the given operand, with bias applied.
    pub fn get(&self, index: i32) -> Result<&'a [u8], CharstringError> {
        if self.items.is_empty() {
            return Err(CharstringError::MissingSubroutines);
        }
        let biased = index.saturating_add(self.bias);
        usize::try_from(biased)
            .ok()
            .and_then(|ix| self.items.get(ix))
            .map(Vec::as_slice)
            .ok_or(CharstringError::SubroutineIndexOutOfRange {
                index: biased,
                count: self.items.len(),
            })
    }
}

/// Returns the bias for a subroutine array with `count` entries.
///
/// See <https://learn.microsoft.com/en-us/typography/opentype/spec/cff2#9-local-and-global-subr-indexes>
pub fn subr_bias(count: usize) -> i32 {
    if count < 1240 {
        107
    } else if count < 33900 {
        1131
    } else {
        32768
    }
}

/// Keys of the Private DICT entries consumed by the codec.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PrivateKey {
    BlueValues,
    OtherBlues,
    FamilyBlues,
    FamilyOtherBlues,
    BlueScale,
    BlueShift,
    BlueFuzz,
    StdHw,
    StdVw,
    StemSnapH,
    StemSnapV,
    ForceBold,
    LanguageGroup,
    ExpansionFactor,
    DefaultWidthX,
    NominalWidthX,
    VariationStoreIndex,
    /// Type1 only: number of random bytes at the start of each charstring.
    LenIv,
}

/// The payload of a Private DICT entry.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DictValue {
    Number(f64),
    Array(Vec<f64>),
    Bool(bool),
    /// A CFF2 value with one delta per variation region.
    Blend { default: f64, deltas: Vec<f64> },
}

impl DictValue {
    /// Returns the numeric value at the location described by the region
    /// scalars.
    pub fn number(&self, scalars: &[f64]) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Blend { default, deltas } => Some(
                deltas
                    .iter()
                    .zip(scalars)
                    .fold(*default, |acc, (delta, scalar)| acc + delta * scalar),
            ),
            Self::Bool(value) => Some(*value as i32 as f64),
            Self::Array(_) => None,
        }
    }
}

/// Private DICT entries.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PrivateDict {
    entries: Vec<(PrivateKey, DictValue)>,
}

impl PrivateDict {
    pub fn get(&self, key: PrivateKey) -> Option<&DictValue> {
        self.entries
            .iter()
            .find_map(|(k, value)| (*k == key).then_some(value))
    }

    /// Sets the value for `key`, replacing any previous value.
    pub fn set(&mut self, key: PrivateKey, value: DictValue) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Returns the value for `key` at the default location.
    pub fn number(&self, key: PrivateKey) -> Option<f64> {
        self.get(key).and_then(|value| value.number(&[]))
    }

    pub fn default_width_x(&self) -> f64 {
        self.number(PrivateKey::DefaultWidthX).unwrap_or(0.0)
    }

    pub fn nominal_width_x(&self) -> f64 {
        self.number(PrivateKey::NominalWidthX).unwrap_or(0.0)
    }

    pub fn vsindex(&self) -> u16 {
        self.number(PrivateKey::VariationStoreIndex)
            .map(|v| v as u16)
            .unwrap_or(0)
    }

    pub fn len_iv(&self) -> i32 {
        self.number(PrivateKey::LenIv)
            .map(|v| v as i32)
            .unwrap_or(DEFAULT_LEN_IV)
    }
}

/// Font level state borrowed by the charstring interpreter and encoder.
#[derive(Clone, Copy, Debug)]
pub struct CffContext<'a> {
    pub version: CharstringVersion,
    pub paint_type: PaintType,
    pub private: &'a PrivateDict,
    pub global_subrs: Subrs<'a>,
    pub local_subrs: Subrs<'a>,
    pub var_store: Option<&'a VariationStore>,
    /// Normalized design space location for blending.
    pub coords: &'a [F2Dot14],
    /// Number of stems declared before the charstring begins.
    ///
    /// This is nonzero when decoding a charstring, such as a subroutine,
    /// whose masks refer to stems declared elsewhere.
    pub hint_count: usize,
}

impl<'a> CffContext<'a> {
    pub fn new(version: CharstringVersion, private: &'a PrivateDict) -> Self {
        Self {
            version,
            paint_type: PaintType::Filled,
            private,
            global_subrs: Subrs::default(),
            local_subrs: Subrs::default(),
            var_store: None,
            coords: &[],
            hint_count: 0,
        }
    }

    pub fn with_subrs(mut self, global: &'a [Vec<u8>], local: &'a [Vec<u8>]) -> Self {
        self.global_subrs = Subrs::new(global, self.version);
        self.local_subrs = Subrs::new(local, self.version);
        self
    }

    pub fn with_variations(mut self, store: &'a VariationStore, coords: &'a [F2Dot14]) -> Self {
        self.var_store = Some(store);
        self.coords = coords;
        self
    }

    pub fn with_paint_type(mut self, paint_type: PaintType) -> Self {
        self.paint_type = paint_type;
        self
    }

    pub fn with_hint_count(mut self, hint_count: usize) -> Self {
        self.hint_count = hint_count;
        self
    }
}
