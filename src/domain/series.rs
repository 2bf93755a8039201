//! Rolling-statistic kernels over price slices.
//!
//! All series-shaped outputs are full length and aligned index-for-index
//! with their input; positions without enough history hold NaN. Scalar
//! statistics skip NaN entries (pairwise for covariance), so a returns
//! column with its leading NaN can be fed in unsliced.

/// Percentage returns: r[t] = p[t] / p[t-1] - 1, NaN at index 0.
pub fn pct_returns(prices: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(prices.len());
    for i in 0..prices.len() {
        if i == 0 {
            out.push(f64::NAN);
        } else {
            out.push(prices[i] / prices[i - 1] - 1.0);
        }
    }
    out
}

/// Simple moving average over `window` observations. NaN until the window
/// is filled (first `window - 1` positions).
pub fn sma(prices: &[f64], window: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; prices.len()];
    if window == 0 {
        return out;
    }
    let mut running = 0.0;
    for i in 0..prices.len() {
        running += prices[i];
        if i >= window {
            running -= prices[i - window];
        }
        if i + 1 >= window {
            out[i] = running / window as f64;
        }
    }
    out
}

/// Exponential moving average with alpha = 2 / (span + 1), seeded on the
/// first observation and therefore defined from index 0.
pub fn ema(prices: &[f64], span: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; prices.len()];
    if span == 0 || prices.is_empty() {
        return out;
    }
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut prev = prices[0];
    out[0] = prev;
    for i in 1..prices.len() {
        prev = alpha * prices[i] + (1.0 - alpha) * prev;
        out[i] = prev;
    }
    out
}

/// Mean of the finite entries. None when no entry is finite.
pub fn mean(values: &[f64]) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for &v in values {
        if v.is_finite() {
            sum += v;
            count += 1;
        }
    }
    if count == 0 { None } else { Some(sum / count as f64) }
}

/// Sample variance (n - 1 denominator) over the finite entries. None below
/// 2 finite observations.
pub fn sample_variance(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let mut sum_sq = 0.0;
    let mut count = 0usize;
    for &v in values {
        if v.is_finite() {
            let diff = v - m;
            sum_sq += diff * diff;
            count += 1;
        }
    }
    if count < 2 {
        None
    } else {
        Some(sum_sq / (count - 1) as f64)
    }
}

/// Sample covariance over indices where both series are finite (pairwise
/// deletion, n - 1 denominator). None below 2 such pairs.
pub fn sample_covariance(a: &[f64], b: &[f64]) -> Option<f64> {
    let n = a.len().min(b.len());
    let mut sum_a = 0.0;
    let mut sum_b = 0.0;
    let mut count = 0usize;
    for i in 0..n {
        if a[i].is_finite() && b[i].is_finite() {
            sum_a += a[i];
            sum_b += b[i];
            count += 1;
        }
    }
    if count < 2 {
        return None;
    }
    let mean_a = sum_a / count as f64;
    let mean_b = sum_b / count as f64;
    let mut sum_cross = 0.0;
    for i in 0..n {
        if a[i].is_finite() && b[i].is_finite() {
            sum_cross += (a[i] - mean_a) * (b[i] - mean_b);
        }
    }
    Some(sum_cross / (count - 1) as f64)
}
