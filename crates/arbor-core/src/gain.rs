//! Linear/decibel gain conversion.

/// Linear amplitude to dB. Non-positive levels map to negative infinity.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}

/// dB to linear amplitude. Negative infinity maps to 0.
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    if db == f32::NEG_INFINITY {
        0.0
    } else {
        10.0_f32.powf(db / 20.0)
    }
}
