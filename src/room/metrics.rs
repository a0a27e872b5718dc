//! Engagement sampling loop
//!
//! One loop per joined session posts a sample every period while the local
//! camera is on. Ticks with the camera off are skipped, so turning the camera
//! back on resumes posting on the next tick without a restart.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::Rng;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::api::types::MetricsSample;
use crate::api::MeetingBackend;
use crate::session::Session;

/// Produces the attention/gaze/face figures for one window
///
/// Implementations wrap an attention-estimation pipeline.
pub trait SampleSource: Send + Sync {
    fn next_sample(&self, meeting_id: i64, user_id: i64, window_seconds: u64) -> MetricsSample;
}

/// Uniform random figures in `[0, 1)`, a stand-in until a real estimator is wired in
#[derive(Debug, Default, Clone, Copy)]
pub struct SyntheticSource;

impl SampleSource for SyntheticSource {
    fn next_sample(&self, meeting_id: i64, user_id: i64, window_seconds: u64) -> MetricsSample {
        let mut rng = rand::thread_rng();
        MetricsSample {
            meeting_id,
            user_id,
            attention: rng.gen::<f64>(),
            gaze: rng.gen::<f64>(),
            face: rng.gen::<f64>(),
            window_seconds,
        }
    }
}

/// Shared "local camera is on" flag
#[derive(Debug, Clone)]
pub struct CameraGate(Arc<AtomicBool>);

impl CameraGate {
    pub fn new(on: bool) -> Self {
        Self(Arc::new(AtomicBool::new(on)))
    }

    pub fn set(&self, on: bool) {
        self.0.store(on, Ordering::SeqCst);
    }

    pub fn is_on(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl Default for CameraGate {
    fn default() -> Self {
        Self::new(true)
    }
}

pub struct MetricsLoop {
    backend: Arc<dyn MeetingBackend>,
    source: Arc<dyn SampleSource>,
    gate: CameraGate,
    period: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl MetricsLoop {
    pub fn new(
        backend: Arc<dyn MeetingBackend>,
        source: Arc<dyn SampleSource>,
        gate: CameraGate,
        period: Duration,
    ) -> Self {
        Self {
            backend,
            source,
            gate,
            period: period.max(Duration::from_millis(1)),
            task: Mutex::new(None),
        }
    }

    pub fn gate(&self) -> &CameraGate {
        &self.gate
    }

    /// Spawns the loop for `session`
    ///
    /// Returns false and spawns nothing when a loop is already running. The
    /// first tick fires one full period after start.
    pub fn start(&self, session: &Session) -> bool {
        let Ok(mut task) = self.task.lock() else {
            return false;
        };
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            tracing::debug!(meeting_id = session.meeting_id, "Metrics loop already running");
            return false;
        }

        let backend = Arc::clone(&self.backend);
        let source = Arc::clone(&self.source);
        let gate = self.gate.clone();
        let period = self.period;
        let session = *session;

        *task = Some(tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                if !gate.is_on() {
                    tracing::trace!(meeting_id = session.meeting_id, "Camera off, sample skipped");
                    continue;
                }

                let sample = source.next_sample(session.meeting_id, session.user_id, period.as_secs());
                if let Err(e) = backend.post_metrics(&sample).await {
                    tracing::warn!(
                        meeting_id = session.meeting_id,
                        error = %e,
                        "Failed to post engagement sample"
                    );
                }
            }
        }));

        tracing::info!(
            meeting_id = session.meeting_id,
            period_secs = self.period.as_secs(),
            "Metrics loop started"
        );
        true
    }

    /// Aborts the loop; returns false when nothing was running
    pub fn stop(&self) -> bool {
        let handle = match self.task.lock() {
            Ok(mut task) => task.take(),
            Err(_) => None,
        };
        match handle {
            Some(handle) => {
                handle.abort();
                tracing::info!("Metrics loop stopped");
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .map(|t| t.as_ref().is_some_and(|h| !h.is_finished()))
            .unwrap_or(false)
    }
}

impl Drop for MetricsLoop {
    fn drop(&mut self) {
        self.stop();
    }
}
