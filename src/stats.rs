//! RTT statistics over successful probe samples

use crate::types::RttSample;
use serde::{Deserialize, Serialize};

/// Statistical summary of round-trip times, computed only over
/// successful samples. An all-failed sample set has no statistics
/// (callers get `None`), never a NaN or a divide-by-zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RttStats {
    /// Minimum RTT (milliseconds)
    pub min_ms: f64,
    /// Average RTT (milliseconds)
    pub avg_ms: f64,
    /// Maximum RTT (milliseconds)
    pub max_ms: f64,
    /// Mean deviation of samples, a jitter proxy (milliseconds)
    pub mdev_ms: f64,
    /// Number of successful samples included
    pub sample_count: usize,
}

impl RttStats {
    /// Calculate statistics from a set of probe samples, skipping
    /// timeouts and I/O errors. Returns `None` when no sample succeeded.
    pub fn from_samples(samples: &[RttSample]) -> Option<Self> {
        let values: Vec<f64> = samples.iter().filter_map(|s| s.rtt_ms()).collect();
        Self::from_values(&values)
    }

    /// Calculate statistics from raw RTT values in milliseconds
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let count = values.len();
        let sum: f64 = values.iter().sum();
        let avg = sum / count as f64;
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

        // Mean absolute deviation, matching ping's own mdev column
        let mdev = values.iter().map(|&x| (x - avg).abs()).sum::<f64>() / count as f64;

        Some(Self {
            min_ms: min,
            avg_ms: avg,
            max_ms: max,
            mdev_ms: mdev,
            sample_count: count,
        })
    }

    /// Format an RTT value for narratives; sub-millisecond values
    /// display as "< 1 ms"
    pub fn format_rtt(rtt_ms: f64) -> String {
        if rtt_ms < 1.0 {
            "< 1 ms".to_string()
        } else {
            format!("{:.2} ms", rtt_ms)
        }
    }
}

/// Success/timeout/I/O-error counters for a bounded attempt sequence
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptCounts {
    pub success: usize,
    pub timeout: usize,
    pub io_error: usize,
}

impl AttemptCounts {
    /// Tally samples into counters
    pub fn from_samples(samples: &[RttSample]) -> Self {
        let mut counts = Self::default();
        for sample in samples {
            match sample {
                RttSample::Ok(_) => counts.success += 1,
                RttSample::Timeout => counts.timeout += 1,
                RttSample::IoError => counts.io_error += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.success + self.timeout + self.io_error
    }

    pub fn failures(&self) -> usize {
        self.timeout + self.io_error
    }
}
