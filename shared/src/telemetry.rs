use std::time::{Duration, Instant};

/// Wall-clock timer for a single request/response round trip.
pub struct Telemetry {
    label: &'static str,
    start: Instant,
}

impl Telemetry {
    pub fn start(label: &'static str) -> Self {
        Self {
            label,
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Emit the elapsed time as a tracing event and return it in milliseconds.
    pub fn finish(self, succeeded: bool) -> u64 {
        let elapsed_ms = u64::try_from(self.elapsed().as_millis()).unwrap_or(u64::MAX);
        if succeeded {
            tracing::info!(turn = self.label, elapsed_ms, "round trip completed");
        } else {
            tracing::warn!(turn = self.label, elapsed_ms, "round trip failed");
        }
        elapsed_ms
    }
}
