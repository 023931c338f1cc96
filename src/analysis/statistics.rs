//! Mean and standard deviation of RSSI samples.

use serde::Serialize;

/// Aggregate of the samples found in one log.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Statistics {
    /// Number of samples
    pub count: usize,
    /// Arithmetic mean, 0 when there are no samples
    pub mean: f64,
    /// Sample (n - 1) standard deviation, 0 when there are fewer than two samples
    pub stdev: f64,
}

impl Statistics {
    /// Compute statistics over `samples`.
    pub fn from_samples(samples: &[i64]) -> Self {
        let count = samples.len();
        if count == 0 {
            return Self {
                count,
                mean: 0.0,
                stdev: 0.0,
            };
        }

        let n = count as f64;
        let mean = samples.iter().map(|&s| s as f64).sum::<f64>() / n;
        let stdev = if count < 2 {
            0.0
        } else {
            let squares: f64 = samples
                .iter()
                .map(|&s| {
                    let d = s as f64 - mean;
                    d * d
                })
                .sum();
            (squares / (n - 1.0)).sqrt()
        };

        Self { count, mean, stdev }
    }

    /// `"Mean: <value>"` for display
    pub fn mean_display(&self) -> String {
        format!("Mean: {}", format_rounded(self.mean))
    }

    /// `"Std: <value>"` for display
    pub fn stdev_display(&self) -> String {
        format!("Std: {}", format_rounded(self.stdev))
    }
}

/// Round to 4 decimals and drop trailing zeros (`-45.0` → `"-45"`, `7.07106` → `"7.0711"`).
pub fn format_rounded(value: f64) -> String {
    let text = format!("{:.4}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    match text {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}
