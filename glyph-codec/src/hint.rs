//! Stem hints and hint masks.
//!
//! Stems are kept in two lists (horizontal and vertical) ordered by
//! `(start, width)`. Each stem receives a hint number when first inserted;
//! masks are expressed in terms of these numbers so that they remain valid
//! when stems are added or reordered.

use crate::{error::CharstringError, round::isclose};

/// Returns the number of bytes occupied by a hint mask for the given number
/// of stems.
pub fn mask_byte_len(stem_count: usize) -> usize {
    stem_count.div_ceil(8)
}

/// A bit vector selecting a set of stem hints.
///
/// Bit `n` (counting from the most significant bit of the first byte)
/// corresponds to hint number `n`. The mask grows to hold the highest bit
/// set; trailing zero bytes are never stored, so equal sets compare equal.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HintMask(Vec<u8>);

impl HintMask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mask from the raw bytes found in a charstring.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut mask = Self(bytes.to_vec());
        mask.trim();
        mask
    }

    /// Returns true if bit `n` is set.
    pub fn get(&self, n: usize) -> bool {
        self.0
            .get(n / 8)
            .is_some_and(|byte| byte & (0x80 >> (n % 8)) != 0)
    }

    /// Sets bit `n`, growing the mask as needed.
    pub fn set(&mut self, n: usize) {
        let index = n / 8;
        if index >= self.0.len() {
            self.0.resize(index + 1, 0);
        }
        self.0[index] |= 0x80 >> (n % 8);
    }

    pub fn clear(&mut self, n: usize) {
        if let Some(byte) = self.0.get_mut(n / 8) {
            *byte &= !(0x80 >> (n % 8));
            self.trim();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the mask as it is written in a charstring declaring
    /// `stem_count` stems.
    ///
    /// The result is always `ceil(stem_count / 8)` bytes long; bits at or
    /// beyond `stem_count` are dropped.
    pub fn bytes(&self, stem_count: usize) -> Vec<u8> {
        let len = mask_byte_len(stem_count);
        let mut bytes = self.0.clone();
        bytes.resize(len, 0);
        if let (Some(last), 1..=7) = (bytes.last_mut(), stem_count % 8) {
            *last &= 0xFFu8 << (8 - stem_count % 8);
        }
        bytes
    }

    /// Returns an iterator over the indices of all set bits.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().enumerate().flat_map(|(i, byte)| {
            (0..8)
                .filter(move |bit| byte & (0x80 >> bit) != 0)
                .map(move |bit| i * 8 + bit)
        })
    }

    /// Builds a new mask by mapping each set bit through `f`.
    ///
    /// Bits for which `f` returns `None` are dropped.
    pub fn remap(&self, mut f: impl FnMut(usize) -> Option<usize>) -> Self {
        let mut result = Self::default();
        for n in self.iter() {
            if let Some(mapped) = f(n) {
                result.set(mapped);
            }
        }
        result
    }

    fn trim(&mut self) {
        while self.0.last() == Some(&0) {
            self.0.pop();
        }
    }
}

impl std::fmt::Debug for HintMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// A single stem hint.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StemInfo {
    /// Coordinate of the stem edge closest to the origin.
    pub start: f64,
    /// Stem width. Negative widths of -20 and -21 denote ghost hints.
    pub width: f64,
    /// Number used to refer to this stem from a [`HintMask`].
    pub hint_number: u16,
}

impl StemInfo {
    /// Coordinate of the far edge of the stem.
    pub fn end(&self) -> f64 {
        self.start + self.width
    }

    fn same_stem(&self, start: f64, width: f64) -> bool {
        isclose(self.start, start) && isclose(self.width, width)
    }
}

/// Stem hints along a single axis, sorted by `(start, width)`.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StemList {
    stems: Vec<StemInfo>,
}

impl StemList {
    pub fn len(&self) -> usize {
        self.stems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stems.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StemInfo> + '_ {
        self.stems.iter()
    }

    /// Returns the stem with the given hint number.
    pub fn by_hint_number(&self, hint_number: u16) -> Option<&StemInfo> {
        self.stems.iter().find(|s| s.hint_number == hint_number)
    }

    fn find(&self, start: f64, width: f64) -> Option<&StemInfo> {
        self.stems.iter().find(|s| s.same_stem(start, width))
    }

    fn insert(&mut self, stem: StemInfo) {
        let pos = self
            .stems
            .iter()
            .position(|s| (s.start, s.width) > (stem.start, stem.width))
            .unwrap_or(self.stems.len());
        self.stems.insert(pos, stem);
    }
}

/// Horizontal and vertical stem hints for a glyph.
///
/// Hint numbers are shared across both axes and assigned in order of first
/// insertion.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StemHints {
    /// Horizontal stems (`hstem`), positioned along the y axis.
    pub h: StemList,
    /// Vertical stems (`vstem`), positioned along the x axis.
    pub v: StemList,
    /// `None` once the last hint number has been handed out.
    next_number: Option<u16>,
}

impl Default for StemHints {
    fn default() -> Self {
        Self {
            h: StemList::default(),
            v: StemList::default(),
            next_number: Some(0),
        }
    }
}

impl StemHints {
    /// Adds a horizontal stem, returning its hint number.
    ///
    /// If an identical stem already exists, its hint number is returned
    /// and the list is left unchanged. Fails once every hint number has
    /// been assigned.
    pub fn add_hstem(&mut self, start: f64, width: f64) -> Result<u16, CharstringError> {
        Self::add(&mut self.h, &mut self.next_number, start, width)
    }

    /// Adds a vertical stem, returning its hint number.
    pub fn add_vstem(&mut self, start: f64, width: f64) -> Result<u16, CharstringError> {
        Self::add(&mut self.v, &mut self.next_number, start, width)
    }

    fn add(
        list: &mut StemList,
        next_number: &mut Option<u16>,
        start: f64,
        width: f64,
    ) -> Result<u16, CharstringError> {
        if let Some(existing) = list.find(start, width) {
            return Ok(existing.hint_number);
        }
        let hint_number = next_number.ok_or(CharstringError::TooManyHints)?;
        *next_number = hint_number.checked_add(1);
        list.insert(StemInfo {
            start,
            width,
            hint_number,
        });
        Ok(hint_number)
    }

    /// Total number of stems on both axes.
    pub fn count(&self) -> usize {
        self.h.len() + self.v.len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Number of bytes in a hint mask for these stems.
    pub fn mask_len(&self) -> usize {
        mask_byte_len(self.count())
    }

    /// Returns the horizontal then vertical stems, each in hint number
    /// order.
    ///
    /// This is the order in which stems are declared in a charstring, so the
    /// position of a stem in this sequence is its bit in a charstring mask.
    pub fn declaration_order(&self) -> (Vec<StemInfo>, Vec<StemInfo>) {
        let sorted = |list: &StemList| {
            let mut stems = list.stems.clone();
            stems.sort_by_key(|s| s.hint_number);
            stems
        };
        (sorted(&self.h), sorted(&self.v))
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_stem_returns_existing_number() {
        let mut hints = StemHints::default();
        let a = hints.add_hstem(10.0, 50.0).unwrap();
        let b = hints.add_hstem(-5.0, 20.0).unwrap();
        assert_eq!(hints.add_hstem(10.0, 50.0), Ok(a));
        assert_eq!(hints.h.len(), 2);
        assert_ne!(a, b);
        // ascending by start
        let starts: Vec<_> = hints.h.iter().map(|s| s.start).collect();
        assert_eq!(starts, [-5.0, 10.0]);
    }

    #[test]
    fn numbers_are_shared_across_axes() {
        let mut hints = StemHints::default();
        assert_eq!(hints.add_hstem(0.0, 10.0), Ok(0));
        assert_eq!(hints.add_vstem(0.0, 10.0), Ok(1));
        assert_eq!(hints.add_hstem(100.0, 10.0), Ok(2));
        assert_eq!(hints.count(), 3);
        let (h, v) = hints.declaration_order();
        assert_eq!(h.iter().map(|s| s.hint_number).collect::<Vec<_>>(), [0, 2]);
        assert_eq!(v[0].hint_number, 1);
    }

    #[test]
    fn hint_numbers_run_out() {
        let mut hints = StemHints {
            next_number: Some(u16::MAX),
            ..Default::default()
        };
        assert_eq!(hints.add_hstem(0.0, 10.0), Ok(u16::MAX));
        assert_eq!(
            hints.add_vstem(0.0, 10.0),
            Err(CharstringError::TooManyHints)
        );
        // existing stems are still found
        assert_eq!(hints.add_hstem(0.0, 10.0), Ok(u16::MAX));
        assert_eq!(hints.count(), 1);
        hints.clear();
        assert_eq!(hints.add_vstem(0.0, 10.0), Ok(0));
    }

    #[test]
    fn mask_lengths() {
        assert_eq!(mask_byte_len(0), 0);
        assert_eq!(mask_byte_len(1), 1);
        assert_eq!(mask_byte_len(8), 1);
        assert_eq!(mask_byte_len(9), 2);
    }

    #[test]
    fn mask_bits() {
        let mut mask = HintMask::from_bytes(&[0b1010_0000, 0x01]);
        assert!(mask.get(0));
        assert!(!mask.get(1));
        assert!(mask.get(2));
        assert!(mask.get(15));
        assert_eq!(mask.iter().collect::<Vec<_>>(), [0, 2, 15]);
        mask.clear(15);
        mask.set(95);
        assert_eq!(mask.bytes(3), [0b1010_0000]);
        assert_eq!(mask.iter().collect::<Vec<_>>(), [0, 2, 95]);
        let shifted = mask.remap(|n| (n < 95).then_some(n + 1));
        assert_eq!(shifted.iter().collect::<Vec<_>>(), [1, 3]);
    }

    #[test]
    fn masks_grow_past_type2_limit() {
        let mut mask = HintMask::new();
        mask.set(0);
        mask.set(130);
        assert!(mask.get(130));
        let bytes = mask.bytes(140);
        assert_eq!(bytes.len(), 18);
        assert_eq!(bytes[0], 0x80);
        assert_eq!(bytes[16], 0b0010_0000);
        assert_eq!(HintMask::from_bytes(&bytes), mask);
        // bits past the stem count are not written
        assert_eq!(mask.bytes(100).len(), 13);
        assert_eq!(mask.bytes(100)[12], 0);
    }

    #[test]
    fn equal_sets_are_equal_masks() {
        let mut mask = HintMask::from_bytes(&[0x40, 0, 0]);
        assert_eq!(mask, HintMask::from_bytes(&[0x40]));
        mask.set(20);
        mask.clear(20);
        assert_eq!(mask, HintMask::from_bytes(&[0x40]));
        mask.clear(1);
        assert!(mask.is_empty());
        assert_eq!(mask, HintMask::new());
    }
}
