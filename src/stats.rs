//! Small numeric helpers shared by the scoring stages.

/// Weighted average of `(weight, value)` pairs, clamped to [0, 1].
/// Returns 0.0 when the weights sum to zero.
pub fn weighted_unit(pairs: &[(f64, f64)]) -> f64 {
    let total: f64 = pairs.iter().map(|(w, _)| w).sum();
    if total <= 0.0 {
        return 0.0;
    }
    let score = pairs.iter().map(|(w, v)| w * v).sum::<f64>() / total;
    clamp_unit(score)
}

/// Maps `x >= 0` onto [0, 1): `1 - e^(-x/scale)`. Strictly increasing in `x`.
#[inline]
pub fn saturate(x: f64, scale: f64) -> f64 {
    if x <= 0.0 || scale <= 0.0 {
        return 0.0;
    }
    1.0 - (-x / scale).exp()
}

#[inline]
pub fn clamp_unit(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Population standard deviation from running sums. Guards the
/// catastrophic-cancellation case where `sum_sq/n - mean^2` dips below zero.
#[inline]
pub fn std_dev_from_sums(count: f64, sum: f64, sum_sq: f64) -> f64 {
    if count < 1.0 {
        return 0.0;
    }
    let mean = sum / count;
    let var = sum_sq / count - mean * mean;
    if var <= 0.0 {
        0.0
    } else {
        var.sqrt()
    }
}
