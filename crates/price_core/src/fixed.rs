//! Fixed-point conversions shared by the encoder, the ensemble and the predictor.
//!
//! Tree thresholds, leaf values and feature vectors are all `i64` values at
//! micro precision (1e-6). Keeping the model integer-only makes inference
//! bit-for-bit reproducible across platforms and across a save/load cycle;
//! floats only appear at the edges (raw input, metrics, final price).

/// Scaling factor: 1 unit = 1e-6.
pub const SCALE: i64 = 1_000_000;

/// Convert an `f64` value into fixed-point, rounding to the nearest micro unit.
///
/// Values outside the `i64` range saturate.
#[inline]
pub fn to_fixed(value: f64) -> i64 {
    (value * SCALE as f64).round() as i64
}

/// Convert a fixed-point value back to `f64`.
#[inline]
pub fn from_fixed(raw: i64) -> f64 {
    raw as f64 / SCALE as f64
}

/// Fixed-point representation of a categorical code.
#[inline]
pub fn code_to_fixed(index: usize) -> i64 {
    (index as i64).saturating_mul(SCALE)
}

/// Round a monetary amount to two decimal places.
#[inline]
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_roundtrip_preserves_micro_precision() {
        assert_eq!(to_fixed(2015.0), 2_015_000_000);
        assert_eq!(to_fixed(0.000_001), 1);
        assert_eq!(from_fixed(to_fixed(75_000.5)), 75_000.5);
        assert_eq!(to_fixed(-1.5), -1_500_000);
    }

    #[test]
    fn codes_scale_to_whole_units() {
        assert_eq!(code_to_fixed(0), 0);
        assert_eq!(code_to_fixed(3), 3 * SCALE);
    }

    #[test]
    fn round_cents_keeps_two_decimals() {
        assert_eq!(round_cents(12_345.678), 12_345.68);
        assert_eq!(round_cents(9_999.994), 9_999.99);
        assert_eq!(round_cents(100.0), 100.0);
    }
}
