use statrs::statistics::Statistics;

/// Standard deviation over the absolute mean; `None` for fewer than two values or a zero mean.
pub fn coefficient_of_variation(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = values.iter().mean();
    if !mean.is_finite() || mean.abs() <= f64::EPSILON {
        return None;
    }
    let std_dev = values.iter().population_std_dev();
    std_dev.is_finite().then(|| std_dev / mean.abs())
}

/// Pearson correlation of two equally long slices; 0.0 when either side has no variance.
pub fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return 0.0;
    }
    let (a, b) = (&a[..n], &b[..n]);
    let sd_a = a.iter().population_std_dev();
    let sd_b = b.iter().population_std_dev();
    if sd_a <= f64::EPSILON || sd_b <= f64::EPSILON {
        return 0.0;
    }
    let r = a.iter().population_covariance(b.iter()) / (sd_a * sd_b);
    if r.is_finite() {
        r.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Mean of the slice, 0.0 when empty.
pub fn mean_or_zero(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().mean()
    }
}
