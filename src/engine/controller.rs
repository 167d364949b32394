//! Timer-driven session controller.
//!
//! Wraps a [`Session`] behind an async mutex and drives `step` from a single
//! tokio task. Only one timer task exists at a time, and a step always runs
//! to completion under the lock before the task sleeps again, so steps never
//! overlap.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::session::{Session, SessionSnapshot, StepOutcome};
use crate::feeds::SampleSink;
use crate::types::{now_ms, StrategyConfig};

pub struct SessionController {
    session: Arc<Mutex<Session>>,
    timer: Mutex<Option<JoinHandle<()>>>,
    sink: Option<Arc<dyn SampleSink>>,
}

impl SessionController {
    pub fn new(session: Session) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            timer: Mutex::new(None),
            sink: None,
        }
    }

    /// Forward every fresh sample to `sink` after its step completes.
    pub fn with_sink(mut self, sink: Arc<dyn SampleSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Begin stepping every `tick_interval_ms`. Returns `false` if the timer
    /// was already running (no second timer is started).
    pub async fn start(&self) -> bool {
        let mut timer = self.timer.lock().await;
        if timer.as_ref().is_some_and(|h| !h.is_finished()) {
            return false;
        }

        let session = Arc::clone(&self.session);
        let sink = self.sink.clone();
        *timer = Some(tokio::spawn(async move {
            loop {
                // Re-read before every sleep so a reconfigured period applies
                // from the next tick.
                let tick = session.lock().await.config().effective_tick_ms();
                tokio::time::sleep(Duration::from_millis(tick)).await;
                let outcome = session.lock().await.step(now_ms());
                persist(sink.as_deref(), &outcome).await;
            }
        }));

        info!("Trading session started");
        true
    }

    /// Suspend the timer. Session state is preserved. Returns `false` if the
    /// timer was not running.
    pub async fn stop(&self) -> bool {
        let mut timer = self.timer.lock().await;
        match timer.take() {
            Some(handle) => {
                // Abort lands on an await point: either the sleep or the lock
                // acquisition, never inside a step.
                handle.abort();
                info!("Trading session stopped");
                true
            }
            None => false,
        }
    }

    pub async fn is_running(&self) -> bool {
        self.timer
            .lock()
            .await
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Run one step immediately, outside the timer.
    pub async fn step_now(&self) -> StepOutcome {
        let outcome = self.session.lock().await.step(now_ms());
        persist(self.sink.as_deref(), &outcome).await;
        outcome
    }

    /// Replace the strategy configuration; effective from the next step.
    pub async fn reconfigure(&self, config: StrategyConfig) -> StrategyConfig {
        self.session.lock().await.reconfigure(config)
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let running = self.is_running().await;
        self.session.lock().await.snapshot(running)
    }
}

/// Hand the step's fresh sample to the sink. Failures are logged and the
/// session carries on.
async fn persist(sink: Option<&dyn SampleSink>, outcome: &StepOutcome) {
    let (Some(sink), Some(sample)) = (sink, outcome.sample) else {
        return;
    };
    if let Err(e) = sink.record(&sample).await {
        warn!(error = %e, score = sample.score, "Failed to persist sentiment sample");
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if let Some(handle) = self.timer.get_mut().take() {
            handle.abort();
        }
    }
}
