//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Floor a f64 and clamp it to the i32 range, returning 0 for NaN values.
#[must_use]
pub fn floor_f64_to_i32(value: f64) -> i32 {
    if value.is_nan() {
        return 0;
    }
    let min = cast::<i32, f64>(i32::MIN).unwrap_or(f64::MIN);
    let max = cast::<i32, f64>(i32::MAX).unwrap_or(f64::MAX);
    let clamped = value.clamp(min, max).floor();
    cast::<f64, i32>(clamped).unwrap_or(0)
}

/// Floor a f64 into `[min, max]` as a percentage byte.
#[must_use]
pub fn floor_f64_to_pct(value: f64, min: u8, max: u8) -> u8 {
    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
    let floored = floor_f64_to_i32(value).clamp(i32::from(lo), i32::from(hi));
    u8::try_from(floored).unwrap_or(lo)
}

/// Widen an i32 for formula arithmetic.
#[must_use]
pub fn i32_to_f64(value: i32) -> f64 {
    f64::from(value)
}
