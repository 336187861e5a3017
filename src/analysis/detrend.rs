use tracing::warn;

use crate::options::HighPassOptions;

/// Natural log of the prices, shifted into the positive range first when needed.
pub fn log_prices(prices: &[f64]) -> Vec<f64> {
    let min_price = prices.iter().copied().fold(f64::INFINITY, f64::min);
    if min_price <= 0.0 {
        prices.iter().map(|p| (p - min_price + 1.0).ln()).collect()
    } else {
        prices.iter().map(|p| p.ln()).collect()
    }
}

/// Least-squares polynomial fit evaluated at every sample.
///
/// Abscissae are mapped onto [-1, 1] before building the normal equations so cubic fits over
/// thousands of bars stay well conditioned. Returns `None` when the system is singular.
pub fn polynomial_trend(values: &[f64], degree: usize) -> Option<Vec<f64>> {
    let n = values.len();
    if n <= degree {
        return None;
    }
    let terms = degree + 1;
    let scale = if n > 1 { 2.0 / (n - 1) as f64 } else { 0.0 };
    let x_at = |i: usize| i as f64 * scale - 1.0;

    // Power sums of x up to 2 * degree, and x^k * y sums.
    let mut power_sums = vec![0.0; 2 * degree + 1];
    let mut rhs = vec![0.0; terms];
    for (i, &y) in values.iter().enumerate() {
        let x = x_at(i);
        let mut xp = 1.0;
        for (k, sum) in power_sums.iter_mut().enumerate() {
            *sum += xp;
            if k < terms {
                rhs[k] += xp * y;
            }
            xp *= x;
        }
    }

    let mut matrix: Vec<Vec<f64>> = (0..terms)
        .map(|row| (0..terms).map(|col| power_sums[row + col]).collect())
        .collect();
    let coeffs = solve_linear(&mut matrix, &mut rhs)?;

    Some(
        (0..n)
            .map(|i| {
                let x = x_at(i);
                coeffs.iter().rev().fold(0.0, |acc, c| acc * x + c)
            })
            .collect(),
    )
}

/// Residuals after removing a polynomial trend; falls back to mean removal when the fit is
/// degenerate.
pub fn detrend(values: &[f64], degree: usize) -> Vec<f64> {
    match polynomial_trend(values, degree) {
        Some(trend) => values.iter().zip(trend).map(|(v, t)| v - t).collect(),
        None => {
            if !values.is_empty() {
                warn!(
                    len = values.len(),
                    degree, "polynomial detrend failed; removing the mean instead"
                );
            }
            let mean = if values.is_empty() {
                0.0
            } else {
                values.iter().sum::<f64>() / values.len() as f64
            };
            values.iter().map(|v| v - mean).collect()
        }
    }
}

/// Subtract a centred, edge-padded moving average so cycles much longer than
/// `min(max_period, len / 3)` bars drop out of the scan.
pub fn suppress_long_cycles(values: &[f64], options: &HighPassOptions) -> Vec<f64> {
    let n = values.len();
    let period = options.max_period.min(n / 3);
    if period <= options.min_threshold || period == 0 {
        return values.to_vec();
    }

    let half = period / 2;
    let clamp = |idx: isize| -> f64 {
        let bounded = idx.clamp(0, n as isize - 1) as usize;
        values[bounded]
    };

    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let start = i as isize - half as isize;
        let sum: f64 = (0..period as isize).map(|k| clamp(start + k)).sum();
        out.push(values[i] - sum / period as f64);
    }
    out
}

fn solve_linear(matrix: &mut [Vec<f64>], rhs: &mut [f64]) -> Option<Vec<f64>> {
    let n = rhs.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&a, &b| matrix[a][col].abs().total_cmp(&matrix[b][col].abs()))?;
        if matrix[pivot][col].abs() < 1e-12 {
            return None;
        }
        matrix.swap(col, pivot);
        rhs.swap(col, pivot);

        let pivot_row = matrix[col].clone();
        let pivot_rhs = rhs[col];
        for row in col + 1..n {
            let factor = matrix[row][col] / pivot_row[col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                matrix[row][k] -= factor * pivot_row[k];
            }
            rhs[row] -= factor * pivot_rhs;
        }
    }

    let mut solution = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| matrix[row][k] * solution[k]).sum();
        solution[row] = (rhs[row] - tail) / matrix[row][row];
    }
    if solution.iter().all(|c| c.is_finite()) {
        Some(solution)
    } else {
        None
    }
}
