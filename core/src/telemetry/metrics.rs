use serde::Serialize;
use std::sync::Mutex;

/// Process-wide action counters, shared by every tool session.
pub struct MetricsRecorder {
    inner: Mutex<MetricsSnapshot>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub simulations: usize,
    pub uploads: usize,
    pub interpretations: usize,
    pub errors: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    fn bump(&self, field: impl FnOnce(&mut MetricsSnapshot) -> &mut usize) {
        if let Ok(mut metrics) = self.inner.lock() {
            *field(&mut metrics) += 1;
        }
    }

    pub fn record_simulation(&self) {
        self.bump(|m| &mut m.simulations);
    }

    pub fn record_upload(&self) {
        self.bump(|m| &mut m.uploads);
    }

    pub fn record_interpretation(&self) {
        self.bump(|m| &mut m.interpretations);
    }

    pub fn record_error(&self) {
        self.bump(|m| &mut m.errors);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.inner.lock().map(|m| *m).unwrap_or_default()
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_independent() {
        let metrics = MetricsRecorder::new();
        metrics.record_simulation();
        metrics.record_simulation();
        metrics.record_upload();
        metrics.record_error();
        assert_eq!(
            metrics.snapshot(),
            MetricsSnapshot {
                simulations: 2,
                uploads: 1,
                interpretations: 0,
                errors: 1,
            }
        );
    }
}
