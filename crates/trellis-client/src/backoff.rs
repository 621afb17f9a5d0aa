use std::time::Duration;

/// Retry curve for transient transport failures: exponential growth from
/// `first_ms` capped at `max_ms`.
#[derive(Debug, Clone)]
pub struct Backoff {
    pub first_ms: u64,
    pub max_ms: u64,
    pub factor: f64,
    /// Retries after the initial attempt.
    pub retries: u32,
}

impl Backoff {
    pub fn delay(&self, attempt: u32) -> Duration {
        let ms = (self.first_ms as f64 * self.factor.powi(attempt as i32)).min(self.max_ms as f64);
        Duration::from_millis(ms as u64)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            first_ms: 250,
            max_ms: 5_000,
            factor: 2.0,
            retries: 3,
        }
    }
}
