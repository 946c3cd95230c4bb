//! Rounding whose behavior is defined by the
//! [font specification](https://learn.microsoft.com/en-us/typography/opentype/spec/otff).

/// Floating-point rounding per the [OpenType spec][spec].
///
/// <https://github.com/fonttools/fonttools/issues/1248#issuecomment-383198166> captures the rationale
/// for the current implementation.
///
/// [spec]: https://docs.microsoft.com/en-us/typography/opentype/spec/otvaroverview#coordinate-scales-and-normalization
pub(crate) trait OtRound<U, T = Self> {
    fn ot_round(self) -> U;
}

impl OtRound<f64> for f64 {
    #[inline]
    fn ot_round(self) -> f64 {
        (self + 0.5).floor()
    }
}

impl OtRound<i32> for f64 {
    #[inline]
    fn ot_round(self) -> i32 {
        (self + 0.5).floor() as i32
    }
}

impl OtRound<(i32, i32)> for kurbo::Point {
    #[inline]
    fn ot_round(self) -> (i32, i32) {
        (self.x.ot_round(), self.y.ot_round())
    }
}

/// Charstring coordinates are kept at a precision of 1/1024 units.
pub(crate) const COORD_PRECISION: f64 = 1024.0;

/// Round a value to the nearest 1/1024th of a unit.
#[inline]
pub(crate) fn round_to_precision(value: f64) -> f64 {
    (value * COORD_PRECISION).round() / COORD_PRECISION
}

/// Returns `true` if the two values are equal at charstring precision.
#[inline]
pub(crate) fn isclose(a: f64, b: f64) -> bool {
    (a - b).abs() < 0.5 / COORD_PRECISION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding() {
        assert_eq!(OtRound::<i32>::ot_round(-0.5f64), 0);
        assert_eq!(OtRound::<i32>::ot_round(1.5f64), 2);
        assert_eq!(OtRound::<i32>::ot_round(-1.51f64), -2);
        assert_eq!(round_to_precision(0.1), 102.0 / 1024.0);
        assert!(isclose(1.0, 1.0 + 0.4 / 1024.0));
        assert!(!isclose(1.0, 1.0 + 1.0 / 1024.0));
    }
}
