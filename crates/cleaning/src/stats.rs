//! Distribution statistics over quantity samples.
//!
//! Percentiles use linear interpolation between closest ranks, so the
//! p-th quantile of `n` sorted values sits at position `p * (n - 1)`.

use ordered_float::OrderedFloat;
use rfq_core::GlobalQuantityStats;

/// Linear-interpolated quantile of an ascending slice.
///
/// `q` is clamped to [0, 1]. Returns `None` for an empty slice.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }

    let q = q.clamp(0.0, 1.0);
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;

    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// A sorted, non-empty sample of quantities.
#[derive(Debug, Clone)]
pub struct QuantityDistribution {
    sorted: Vec<f64>,
}

impl QuantityDistribution {
    /// Build a distribution. Returns `None` when there are no values.
    pub fn new(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let mut sorted: Vec<f64> = values.into_iter().collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by_key(|&v| OrderedFloat(v));
        Some(Self { sorted })
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    /// Always false; empty samples are rejected at construction.
    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    /// Values in ascending order.
    pub fn values(&self) -> &[f64] {
        &self.sorted
    }

    /// Smallest value.
    pub fn min(&self) -> f64 {
        self.sorted[0]
    }

    /// Largest value.
    pub fn max(&self) -> f64 {
        self.sorted[self.sorted.len() - 1]
    }

    /// Median (mean of the two middle values for even counts).
    pub fn median(&self) -> f64 {
        self.quantile(0.5)
    }

    /// Linear-interpolated quantile, `q` in [0, 1].
    pub fn quantile(&self, q: f64) -> f64 {
        // Non-empty by construction
        quantile_sorted(&self.sorted, q).unwrap_or(f64::NAN)
    }

    /// 25th percentile.
    pub fn q1(&self) -> f64 {
        self.quantile(0.25)
    }

    /// 75th percentile.
    pub fn q3(&self) -> f64 {
        self.quantile(0.75)
    }

    /// Interquartile range.
    pub fn iqr(&self) -> f64 {
        self.q3() - self.q1()
    }

    /// Highest and second-highest values, when there are at least two.
    pub fn top_two(&self) -> Option<(f64, f64)> {
        let n = self.sorted.len();
        if n < 2 {
            return None;
        }
        Some((self.sorted[n - 1], self.sorted[n - 2]))
    }

    /// Dataset-wide summary used to cap per-entity thresholds.
    pub fn global_stats(&self) -> GlobalQuantityStats {
        GlobalQuantityStats {
            valid_count: self.len(),
            median: self.median(),
            p95: self.quantile(0.95),
            p99: self.quantile(0.99),
            p999: self.quantile(0.999),
        }
    }
}
