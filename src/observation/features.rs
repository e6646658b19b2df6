//! Feature scaling shared by the encoders.

/// Lower bound of a scaled feature inside its known range.
pub const LOWER: f64 = -1.0;
/// Upper bound of a scaled feature inside its known range.
pub const UPPER: f64 = 1.0;
/// Value for anything below the known range, including `-inf`.
pub const UNDER: f64 = -2.0;
/// Value for anything above the known range, including `+inf` (unreachable, never).
pub const OVER: f64 = 2.0;

/// Maps `value` from `[known_min, known_max]` onto `[LOWER, UPPER]`.
///
/// Values outside the range saturate at [`UNDER`] / [`OVER`]. A degenerate
/// range maps its single value to [`LOWER`]. NaN is treated as below range.
pub fn min_max_scaling(value: f64, known_min: f64, known_max: f64) -> f64 {
    if value.is_nan() || value < known_min {
        return UNDER;
    }
    if value > known_max {
        return OVER;
    }
    let span = known_max - known_min;
    if span <= 0.0 {
        return LOWER;
    }
    LOWER + (value - known_min) * (UPPER - LOWER) / span
}

/// Boolean feature: [`UPPER`] when set, [`LOWER`] otherwise.
pub fn flag(set: bool) -> f64 {
    if set {
        UPPER
    } else {
        LOWER
    }
}

/// Count or step feature in `[0, max]`; `None` means "not within range".
pub fn steps(value: Option<u32>, max: usize) -> f64 {
    match value {
        Some(v) => min_max_scaling(v as f64, 0.0, max as f64),
        None => OVER,
    }
}
