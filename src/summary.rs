use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Distribution summary of one simulated stat.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatSummary {
    pub count: usize,
    pub mean: f64,
    /// Sample (n - 1) standard deviation; 0 for a single sample
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub p25: f64,
    pub p75: f64,
    pub p90: f64,
}

impl StatSummary {
    /// `None` for an empty sample.
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);

        let std = samples.iter().std_dev();
        Some(StatSummary {
            count: samples.len(),
            mean: samples.iter().mean(),
            std: if std.is_finite() { std } else { 0.0 },
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            median: quantile(&sorted, 0.5),
            p25: quantile(&sorted, 0.25),
            p75: quantile(&sorted, 0.75),
            p90: quantile(&sorted, 0.9),
        })
    }
}

/// Linear-interpolated quantile of pre-sorted data, `q` in [0, 1].
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            sorted[lo] + (pos - lo as f64) * (sorted[hi] - sorted[lo])
        }
    }
}
