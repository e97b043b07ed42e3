//! Utility helpers shared by the monitors

/// Statistical utilities
///
/// Every function returns `0.0` for empty input instead of failing.
pub mod stats {
    pub fn mean(values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        values.iter().sum::<f64>() / values.len() as f64
    }

    pub fn min(values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        values.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn max(values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Lower-rank percentile: index `floor(p/100 * (n - 1))` over the sorted values,
    /// clamped to the slice. For ten values the 95th percentile is the ninth.
    pub fn percentile(values: &[f64], p: f64) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let len = sorted.len();
        let rank = (p.clamp(0.0, 100.0) / 100.0 * (len - 1) as f64).floor() as usize;
        sorted[rank.min(len - 1)]
    }

    /// `part / whole * 100`, or zero when the whole is not positive
    pub fn percent_of(part: f64, whole: f64) -> f64 {
        if whole > 0.0 {
            part / whole * 100.0
        } else {
            0.0
        }
    }
}

/// Format utilities
pub mod format {
    pub fn bytes_human(bytes: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = bytes as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", bytes, UNITS[unit_index])
        } else {
            format!("{:.1} {}", size, UNITS[unit_index])
        }
    }

    pub fn kilobytes(bytes: u64) -> f64 {
        bytes as f64 / 1024.0
    }

    /// Two decimals, trailing zeros trimmed
    pub fn number(value: f64) -> String {
        let formatted = format!("{:.2}", value);
        let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
        if trimmed.is_empty() || trimmed == "-0" {
            "0".to_string()
        } else {
            trimmed.to_string()
        }
    }

    pub fn percent(value: f64) -> String {
        format!("{:.1}%", value)
    }
}

/// Probabilistic sampling of incoming observations
pub mod sampling {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[derive(Debug, Clone)]
    pub struct Sampler {
        rate: f64,
        rng: StdRng,
    }

    impl Sampler {
        pub fn new(rate: f64) -> Self {
            Self {
                rate,
                rng: StdRng::from_entropy(),
            }
        }

        /// Deterministic sampler for tests and reproducible runs
        pub fn seeded(rate: f64, seed: u64) -> Self {
            Self {
                rate,
                rng: StdRng::seed_from_u64(seed),
            }
        }

        pub fn rate(&self) -> f64 {
            self.rate
        }

        pub fn should_sample(&mut self) -> bool {
            if self.rate >= 1.0 {
                return true;
            }
            if self.rate <= 0.0 {
                return false;
            }
            self.rng.gen::<f64>() < self.rate
        }
    }
}
