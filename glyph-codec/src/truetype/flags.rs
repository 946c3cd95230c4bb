//! Flag bitsets for simple and composite glyph records.

use crate::{
    data::ReadScalar,
    write::{FontWrite, TableWriter},
};

// most of the generated methods follow the bitflags crate, under the MIT/Apache license
// https://docs.rs/bitflags/latest/bitflags/
macro_rules! glyph_flags {
    (
        $(#[$attrs:meta])*
        pub struct $name:ident: $typ:ty {
            $(
                $(#[$var_attrs:meta])*
                const $var:ident = $value:expr;
            )*
        }
    ) => {
        $(#[$attrs])*
        #[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[repr(transparent)]
        pub struct $name {
            bits: $typ,
        }

        impl $name {
            $(
                $(#[$var_attrs])*
                pub const $var: Self = Self { bits: $value };
            )*

            /// Returns an empty set of flags.
            #[inline]
            pub const fn empty() -> Self {
                Self { bits: 0 }
            }

            /// Returns the set containing all flags.
            #[inline]
            pub const fn all() -> Self {
                Self { bits: $(Self::$var.bits)|* }
            }

            /// Returns the raw value of the flags currently stored.
            #[inline]
            pub const fn bits(&self) -> $typ {
                self.bits
            }

            /// Convert from underlying bit representation, dropping any bits
            /// that do not correspond to flags.
            #[inline]
            pub const fn from_bits_truncate(bits: $typ) -> Self {
                Self { bits: bits & Self::all().bits }
            }

            /// Returns `true` if no flags are currently stored.
            #[inline]
            pub const fn is_empty(&self) -> bool {
                self.bits == 0
            }

            /// Returns `true` if all of the flags in `other` are contained within `self`.
            #[inline]
            pub const fn contains(&self, other: Self) -> bool {
                (self.bits & other.bits) == other.bits
            }

            /// Inserts the specified flags in-place.
            #[inline]
            pub fn insert(&mut self, other: Self) {
                self.bits |= other.bits;
            }

            /// Removes the specified flags in-place.
            #[inline]
            pub fn remove(&mut self, other: Self) {
                self.bits &= !other.bits;
            }

            /// Inserts or removes the specified flags depending on `value`.
            #[inline]
            pub fn set(&mut self, other: Self, value: bool) {
                if value {
                    self.insert(other)
                } else {
                    self.remove(other)
                }
            }
        }

        impl std::ops::BitOr for $name {
            type Output = Self;

            #[inline]
            fn bitor(self, other: Self) -> Self {
                Self { bits: self.bits | other.bits }
            }
        }

        impl std::ops::BitOrAssign for $name {
            #[inline]
            fn bitor_assign(&mut self, other: Self) {
                self.bits |= other.bits;
            }
        }

        impl std::ops::BitAnd for $name {
            type Output = Self;

            #[inline]
            fn bitand(self, other: Self) -> Self {
                Self { bits: self.bits & other.bits }
            }
        }

        impl std::ops::Not for $name {
            type Output = Self;

            #[inline]
            fn not(self) -> Self {
                Self { bits: !self.bits & Self::all().bits }
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                let members: &[(&str, Self)] = &[$((stringify!($var), Self::$var),)*];
                let mut first = true;
                for (name, value) in members {
                    if self.contains(*value) {
                        if !first {
                            f.write_str(" | ")?;
                        }
                        first = false;
                        f.write_str(name)?;
                    }
                }
                if first {
                    f.write_str("(empty)")?;
                }
                Ok(())
            }
        }

        impl ReadScalar for $name {
            const RAW_BYTE_LEN: usize = std::mem::size_of::<$typ>();

            #[inline]
            fn read(bytes: &[u8]) -> Option<Self> {
                <$typ>::read(bytes).map(Self::from_bits_truncate)
            }
        }

        impl FontWrite for $name {
            fn write_into(&self, writer: &mut TableWriter) {
                self.bits.write_into(writer)
            }
        }
    };
}

glyph_flags! {
    /// Flags describing each point of a simple glyph.
    ///
    /// See <https://learn.microsoft.com/en-us/typography/opentype/spec/glyf#simple-glyph-description>
    pub struct SimpleGlyphFlags: u8 {
        /// The point is on the curve.
        const ON_CURVE_POINT = 0x01;
        /// The x delta is a single byte, with the sign given by
        /// `X_IS_SAME_OR_POSITIVE_X_SHORT_VECTOR`.
        const X_SHORT_VECTOR = 0x02;
        /// The y delta is a single byte, with the sign given by
        /// `Y_IS_SAME_OR_POSITIVE_Y_SHORT_VECTOR`.
        const Y_SHORT_VECTOR = 0x04;
        /// The next byte is the number of additional times this flag repeats.
        const REPEAT_FLAG = 0x08;
        /// With `X_SHORT_VECTOR`, the delta is positive; otherwise the x
        /// coordinate is the same as the previous one.
        const X_IS_SAME_OR_POSITIVE_X_SHORT_VECTOR = 0x10;
        /// With `Y_SHORT_VECTOR`, the delta is positive; otherwise the y
        /// coordinate is the same as the previous one.
        const Y_IS_SAME_OR_POSITIVE_Y_SHORT_VECTOR = 0x20;
        /// Contours may overlap. Only meaningful on the first flag.
        const OVERLAP_SIMPLE = 0x40;
    }
}

glyph_flags! {
    /// Flags for a single component of a composite glyph.
    ///
    /// See <https://learn.microsoft.com/en-us/typography/opentype/spec/glyf#composite-glyph-description>
    pub struct CompositeGlyphFlags: u16 {
        /// The arguments are 16-bit values; otherwise they are bytes.
        const ARG_1_AND_2_ARE_WORDS = 0x0001;
        /// The arguments are signed xy offsets; otherwise they are unsigned
        /// point numbers.
        const ARGS_ARE_XY_VALUES = 0x0002;
        /// Round the xy offset to the grid.
        const ROUND_XY_TO_GRID = 0x0004;
        /// A single scale follows the arguments.
        const WE_HAVE_A_SCALE = 0x0008;
        /// At least one more component follows this one.
        const MORE_COMPONENTS = 0x0020;
        /// Separate x and y scales follow the arguments.
        const WE_HAVE_AN_X_AND_Y_SCALE = 0x0040;
        /// A 2x2 transform follows the arguments.
        const WE_HAVE_A_TWO_BY_TWO = 0x0080;
        /// Instructions follow the last component.
        const WE_HAVE_INSTRUCTIONS = 0x0100;
        /// Use this component's metrics for the composite.
        const USE_MY_METRICS = 0x0200;
        /// The components of the composite overlap.
        const OVERLAP_COMPOUND = 0x0400;
        /// The offset is scaled by the transform.
        const SCALED_COMPONENT_OFFSET = 0x0800;
        /// The offset is not scaled by the transform.
        const UNSCALED_COMPONENT_OFFSET = 0x1000;
    }
}

impl From<CompositeGlyphFlags> for crate::model::ComponentFlags {
    fn from(src: CompositeGlyphFlags) -> Self {
        Self {
            round_xy_to_grid: src.contains(CompositeGlyphFlags::ROUND_XY_TO_GRID),
            use_my_metrics: src.contains(CompositeGlyphFlags::USE_MY_METRICS),
            overlap_compound: src.contains(CompositeGlyphFlags::OVERLAP_COMPOUND),
            scaled_component_offset: src.contains(CompositeGlyphFlags::SCALED_COMPONENT_OFFSET),
            unscaled_component_offset: src.contains(CompositeGlyphFlags::UNSCALED_COMPONENT_OFFSET),
        }
    }
}

impl From<crate::model::ComponentFlags> for CompositeGlyphFlags {
    fn from(value: crate::model::ComponentFlags) -> Self {
        let mut flags = CompositeGlyphFlags::empty();
        flags.set(Self::ROUND_XY_TO_GRID, value.round_xy_to_grid);
        flags.set(Self::USE_MY_METRICS, value.use_my_metrics);
        flags.set(Self::OVERLAP_COMPOUND, value.overlap_compound);
        flags.set(Self::SCALED_COMPONENT_OFFSET, value.scaled_component_offset);
        flags.set(Self::UNSCALED_COMPONENT_OFFSET, value.unscaled_component_offset);
        flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ComponentFlags;

    #[test]
    fn truncate_and_debug() {
        let flags = SimpleGlyphFlags::from_bits_truncate(0xFF);
        assert_eq!(flags.bits(), 0x7F);
        assert_eq!(
            format!("{:?}", SimpleGlyphFlags::ON_CURVE_POINT | SimpleGlyphFlags::REPEAT_FLAG),
            "ON_CURVE_POINT | REPEAT_FLAG"
        );
        assert_eq!(format!("{:?}", CompositeGlyphFlags::empty()), "(empty)");
        assert_eq!(
            !SimpleGlyphFlags::REPEAT_FLAG & SimpleGlyphFlags::all(),
            SimpleGlyphFlags::from_bits_truncate(0x77)
        );
    }

    #[test]
    fn component_flags_round_trip() {
        let raw = CompositeGlyphFlags::USE_MY_METRICS
            | CompositeGlyphFlags::OVERLAP_COMPOUND
            | CompositeGlyphFlags::MORE_COMPONENTS;
        let flags = ComponentFlags::from(raw);
        assert!(flags.use_my_metrics && flags.overlap_compound);
        assert!(!flags.round_xy_to_grid);
        // layout bits are not carried over
        assert_eq!(
            CompositeGlyphFlags::from(flags),
            CompositeGlyphFlags::USE_MY_METRICS | CompositeGlyphFlags::OVERLAP_COMPOUND
        );
    }
}
