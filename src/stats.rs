/*!
 * Outlier resistant summary statistics.
 *
 * Quantiles use linear interpolation between the closest ranks, the same definition most data
 * analysis tools default to.
 */
use crate::{NightLightError, NightLightResult};

/// Multiplier applied to the interquartile range to get the outlier fences.
pub const IQR_FENCE: f64 = 1.5;

/**
 * Summary statistics for a set of radiance values.
 */
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stats {
    pub mean: f64,
    pub median: f64,
    /// Mean after discarding 5% of the values from each tail.
    pub trimmed_mean_5pct: f64,
    /// Mean after discarding 10% of the values from each tail.
    pub trimmed_mean_10pct: f64,
    /// Sample standard deviation (n - 1 in the denominator), zero for a single value.
    pub std: f64,
    /// Median absolute deviation from the median.
    pub mad: f64,
    pub q1: f64,
    pub q3: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
    pub sum: f64,
}

impl Stats {
    /// Compute the statistics of a set of values. NaN values are ignored.
    pub fn from_values<I: IntoIterator<Item = f64>>(values: I) -> NightLightResult<Self> {
        let mut sorted: Vec<f64> = values.into_iter().filter(|v| !v.is_nan()).collect();
        if sorted.is_empty() {
            return Err(NightLightError::EmptyDataset);
        }
        sorted.sort_unstable_by(f64::total_cmp);

        let count = sorted.len();
        let sum: f64 = sorted.iter().sum();
        let mean = sum / count as f64;

        let std = if count > 1 {
            let ss: f64 = sorted.iter().map(|v| (v - mean) * (v - mean)).sum();
            (ss / (count - 1) as f64).sqrt()
        } else {
            0.0
        };

        let median = quantile(&sorted, 0.5);

        let mut deviations: Vec<f64> = sorted.iter().map(|v| (v - median).abs()).collect();
        deviations.sort_unstable_by(f64::total_cmp);
        let mad = quantile(&deviations, 0.5);

        Ok(Stats {
            mean,
            median,
            trimmed_mean_5pct: trimmed_mean(&sorted, 0.05),
            trimmed_mean_10pct: trimmed_mean(&sorted, 0.10),
            std,
            mad,
            q1: quantile(&sorted, 0.25),
            q3: quantile(&sorted, 0.75),
            min: sorted[0],
            max: sorted[count - 1],
            count,
            sum,
        })
    }
}

/// The `q` quantile of already sorted values.
///
/// # Panics
///
/// If `sorted` is empty.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    assert!(!sorted.is_empty());
    debug_assert!((0.0..=1.0).contains(&q));

    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;

    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Mean of sorted values after cutting `floor(proportion * n)` values from each end.
///
/// # Panics
///
/// If `sorted` is empty.
pub fn trimmed_mean(sorted: &[f64], proportion: f64) -> f64 {
    assert!(!sorted.is_empty());
    debug_assert!((0.0..0.5).contains(&proportion));

    let cut = (proportion * sorted.len() as f64) as usize;
    let kept = &sorted[cut..sorted.len() - cut];

    kept.iter().sum::<f64>() / kept.len() as f64
}

/// The inclusive `[Q1 - 1.5 IQR, Q3 + 1.5 IQR]` fences for a set of values.
///
/// Returns `None` if there are no (non-NaN) values.
pub fn iqr_bounds<I: IntoIterator<Item = f64>>(values: I) -> Option<(f64, f64)> {
    let mut sorted: Vec<f64> = values.into_iter().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_unstable_by(f64::total_cmp);

    let q1 = quantile(&sorted, 0.25);
    let q3 = quantile(&sorted, 0.75);
    let iqr = q3 - q1;

    Some((q1 - IQR_FENCE * iqr, q3 + IQR_FENCE * iqr))
}

/// Pearson correlation coefficient of paired values.
///
/// Returns `None` with fewer than two pairs or if either series has no variance.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    debug_assert_eq!(xs.len(), ys.len());

    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }

    let mean_x = xs[..n].iter().sum::<f64>() / n as f64;
    let mean_y = ys[..n].iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }

    Some(cov / (var_x * var_y).sqrt())
}
