//! Running call counters that feed the anomaly detector

use crate::anomaly::CallMetrics;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;

/// Point-in-time copy of [`CallStatistics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatisticsSnapshot {
    /// Calls in the pipeline right now
    pub live: u64,
    /// Calls started in the current window
    pub started: u64,
    pub completed: u64,
    pub aborted: u64,
    pub completed_duration_ms: u64,
}

impl StatisticsSnapshot {
    pub fn finished(&self) -> u64 {
        self.completed + self.aborted
    }

    /// Derive call metrics from the window. `latency` is the routed call's
    /// own measurement, when there is one.
    pub fn call_metrics(&self, latency: Option<f64>) -> CallMetrics {
        let avg_duration = (self.completed > 0)
            .then(|| self.completed_duration_ms as f64 / self.completed as f64);
        let failure_rate =
            (self.finished() > 0).then(|| self.aborted as f64 / self.finished() as f64);

        CallMetrics {
            call_volume: Some(self.started as f64),
            avg_duration,
            failure_rate,
            latency,
        }
    }
}

/// Metrics for a call gated against `window`, plus its own route latency
pub fn system_metrics(window: Option<StatisticsSnapshot>, latency: Option<f64>) -> CallMetrics {
    match window {
        Some(window) => window.call_metrics(latency),
        None => CallMetrics {
            latency,
            ..Default::default()
        },
    }
}

/// Lock-free call counters shared by every call the orchestrator runs.
///
/// `started`, `completed`, `aborted` and the duration total cover the
/// current window; [`reset_window`](Self::reset_window) closes it and
/// starts a new one. `live` is a gauge and survives resets.
///
/// Risk gating reads only the last closed window, so outcomes inside the
/// open window never change another call's decision.
#[derive(Debug, Default)]
pub struct CallStatistics {
    live: AtomicU64,
    started: AtomicU64,
    completed: AtomicU64,
    aborted: AtomicU64,
    completed_duration_ms: AtomicU64,
    closed: RwLock<Option<StatisticsSnapshot>>,
}

impl CallStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_started(&self) {
        self.live.fetch_add(1, Ordering::Relaxed);
        self.started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_completed(&self, duration: Duration) {
        self.release_live();
        self.completed.fetch_add(1, Ordering::Relaxed);
        self.completed_duration_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn record_aborted(&self) {
        self.release_live();
        self.aborted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            live: self.live.load(Ordering::Relaxed),
            started: self.started.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            aborted: self.aborted.load(Ordering::Relaxed),
            completed_duration_ms: self.completed_duration_ms.load(Ordering::Relaxed),
        }
    }

    /// The most recently closed window, `None` until the first reset
    pub fn closed_window(&self) -> Option<StatisticsSnapshot> {
        match self.closed.read() {
            Ok(closed) => *closed,
            Err(poisoned) => {
                tracing::warn!("Statistics window lock poisoned, recovering");
                *poisoned.into_inner()
            }
        }
    }

    /// System metrics for anomaly detection, taken from the closed window.
    /// Only `latency` is reported before the first window closes.
    pub fn call_metrics(&self, latency: Option<f64>) -> CallMetrics {
        system_metrics(self.closed_window(), latency)
    }

    /// Zero the window counters, publish their final values as the closed
    /// window and return them
    pub fn reset_window(&self) -> StatisticsSnapshot {
        let window = StatisticsSnapshot {
            live: self.live.load(Ordering::Relaxed),
            started: self.started.swap(0, Ordering::Relaxed),
            completed: self.completed.swap(0, Ordering::Relaxed),
            aborted: self.aborted.swap(0, Ordering::Relaxed),
            completed_duration_ms: self.completed_duration_ms.swap(0, Ordering::Relaxed),
        };
        match self.closed.write() {
            Ok(mut closed) => *closed = Some(window),
            Err(poisoned) => {
                tracing::warn!("Statistics window lock poisoned, recovering");
                *poisoned.into_inner() = Some(window);
            }
        }
        window
    }

    fn release_live(&self) {
        // Saturate: a call started before construction must not wrap the gauge
        let _ = self
            .live
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }
}
