//! ActionSequencer: the capture → locate → decide → map → encode → send loop.
//!
//! One sequencer drives one device for one session.  Every cycle:
//!
//! 1. make sure the sink is connected (short reconnect budget);
//! 2. grab a frame;
//! 3. locate the device screen, crop to it and encode the crop;
//! 4. ask the decision producer for the next action;
//! 5. log the decision;
//! 6. stop on `done`, skip the device on `none`;
//! 7. map the action to destination units, encode it and send it;
//! 8. sleep whatever is left of `min_interval`.
//!
//! # Failure handling
//!
//! Only the initial connection is fatal ([`ActionSequencer::start`]).  Inside
//! the loop a failure abandons the current cycle and the loop carries on:
//!
//! | Failure            | Effect                                        |
//! |--------------------|-----------------------------------------------|
//! | reconnect          | cycle abandoned, counted                      |
//! | frame acquisition  | cycle abandoned, counted                      |
//! | screen encoding    | cycle abandoned, counted                      |
//! | decision producer  | treated as `none`                             |
//! | send               | cycle abandoned, sink reconnects next cycle   |
//!
//! A locator that finds nothing is not a failure: the full frame is used.
//!
//! # Cancellation
//!
//! The loop checks a shared `running` flag between cycles.  Setting it to
//! `false` (the binary does so on Ctrl-C) ends the session after the current
//! cycle; the sink is closed and the capture session released.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{self, Instant};
use touchpilot_core::{
    Action, CoordinateMapper, Decision, EncoderConfig, Extent, HidEncoder, ImageEncoding,
    LocatorConfig, ScreenLocator,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::retry::{connect_with_retry_while, RetryError, RetryPolicy};
use crate::infrastructure::capture::CaptureSession;
use crate::infrastructure::decision::DecisionProducer;
use crate::infrastructure::transport::{ConnectionState, TransportSink};

/// Error type for the sequencer.
#[derive(Debug, Error)]
pub enum SequencerError {
    /// The transport never came up within the startup budget.
    #[error("initial transport connection failed: {0}")]
    Startup(#[from] RetryError),
}

/// Everything the sequencer needs besides its collaborators.
#[derive(Debug, Clone, PartialEq)]
pub struct SequencerConfig {
    pub objective: String,
    pub min_interval: Duration,
    /// `None` runs until `done` or cancellation.
    pub max_cycles: Option<u64>,
    pub image_encoding: ImageEncoding,
    pub locator: LocatorConfig,
    pub encoder: EncoderConfig,
    /// Extent of the destination HID coordinate space.
    pub destination: Extent,
    pub startup: RetryPolicy,
    pub reconnect: RetryPolicy,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            objective: String::new(),
            min_interval: Duration::from_secs(1),
            max_cycles: None,
            image_encoding: ImageEncoding::Png,
            locator: LocatorConfig::default(),
            encoder: EncoderConfig::default(),
            destination: Extent::new(280, 550),
            startup: RetryPolicy::default(),
            reconnect: RetryPolicy {
                interval: Duration::from_secs(2),
                timeout: Duration::from_secs(4),
                max_attempts: None,
            },
        }
    }
}

/// What one cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Steps were delivered to the device.
    Sent,
    /// Nothing to send this cycle.
    Idle,
    /// The decision producer declared the objective complete.
    Done,
    /// The cycle was abandoned.
    Failed,
}

/// Totals for one session, returned by [`ActionSequencer::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub cycles: u64,
    pub actions_sent: u64,
    pub failures: u64,
    /// `true` when the session ended because the producer answered `done`.
    pub finished: bool,
}

/// Drives one device from captured frames and producer decisions.
pub struct ActionSequencer {
    config: SequencerConfig,
    capture: CaptureSession,
    locator: ScreenLocator,
    encoder: HidEncoder,
    producer: Box<dyn DecisionProducer>,
    sink: Box<dyn TransportSink>,
    running: Arc<AtomicBool>,
    session_id: Uuid,
}

impl ActionSequencer {
    pub fn new(
        config: SequencerConfig,
        capture: CaptureSession,
        producer: Box<dyn DecisionProducer>,
        sink: Box<dyn TransportSink>,
    ) -> Self {
        Self {
            locator: ScreenLocator::new(config.locator),
            encoder: HidEncoder::new(config.encoder.clone()),
            config,
            capture,
            producer,
            sink,
            running: Arc::new(AtomicBool::new(true)),
            session_id: Uuid::new_v4(),
        }
    }

    /// Replaces the cancellation flag.  `true` means keep going.
    pub fn with_running_flag(mut self, running: Arc<AtomicBool>) -> Self {
        self.running = running;
        self
    }

    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Establishes the initial connection.  Clearing the running flag stops
    /// the retries.
    ///
    /// # Errors
    ///
    /// Returns [`SequencerError::Startup`] if the startup retry budget runs out
    /// or the session is cancelled first.
    pub async fn start(&mut self) -> Result<(), SequencerError> {
        info!(
            session = %self.session_id,
            family = %self.sink.family(),
            "connecting transport"
        );
        let attempts =
            connect_with_retry_while(self.sink.as_mut(), &self.config.startup, &self.running).await?;
        info!(attempts, "transport ready");
        Ok(())
    }

    /// Runs cycles until `done`, `max_cycles` or cancellation, then closes the sink.
    pub async fn run(&mut self) -> SessionSummary {
        let mut summary = SessionSummary {
            session_id: self.session_id,
            cycles: 0,
            actions_sent: 0,
            failures: 0,
            finished: false,
        };
        info!(session = %self.session_id, objective = %self.config.objective, "session started");

        while self.running.load(Ordering::Relaxed) {
            if self.config.max_cycles.is_some_and(|max| summary.cycles >= max) {
                info!(cycles = summary.cycles, "cycle limit reached");
                break;
            }

            let started = Instant::now();
            summary.cycles += 1;
            match self.run_cycle().await {
                CycleOutcome::Sent => summary.actions_sent += 1,
                CycleOutcome::Idle => {}
                CycleOutcome::Failed => summary.failures += 1,
                CycleOutcome::Done => {
                    summary.finished = true;
                    break;
                }
            }
            time::sleep_until(started + self.config.min_interval).await;
        }

        self.sink.close().await;
        info!(
            session = %summary.session_id,
            cycles = summary.cycles,
            actions_sent = summary.actions_sent,
            failures = summary.failures,
            finished = summary.finished,
            "session ended"
        );
        summary
    }

    /// Executes one cycle without pacing.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        if self.sink.state() != ConnectionState::Connected {
            let policy = &self.config.reconnect;
            if let Err(e) = connect_with_retry_while(self.sink.as_mut(), policy, &self.running).await {
                warn!("transport unavailable, cycle abandoned: {e}");
                return CycleOutcome::Failed;
            }
        }

        let frame = match self.capture.grab() {
            Ok(frame) => frame,
            Err(e) => {
                warn!("frame acquisition failed: {e}");
                return CycleOutcome::Failed;
            }
        };

        let located = self.locator.locate(&frame);
        debug!(region = ?located.region, fallback = located.is_fallback(), "screen located");
        let screen = match frame.crop(&located.region).encode(self.config.image_encoding) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!("screen encoding failed: {e}");
                return CycleOutcome::Failed;
            }
        };

        let decision = match self.producer.decide(&screen, &self.config.objective).await {
            Ok(decision) => decision,
            Err(e) => {
                warn!("decision failed, doing nothing this cycle: {e}");
                Decision::new(Action::None)
            }
        };
        match &decision.explanation {
            Some(why) => info!(action = %decision.action, "decision: {why}"),
            None => info!(action = %decision.action, "decision"),
        }

        let mapper = CoordinateMapper::new(located.region, self.config.destination);
        let resolved = match &decision.action {
            Action::Done => return CycleOutcome::Done,
            action => match mapper.resolve(action) {
                Some(resolved) => resolved,
                None => return CycleOutcome::Idle,
            },
        };

        let steps = self.encoder.encode(&resolved, self.sink.family());
        if steps.is_empty() {
            return CycleOutcome::Idle;
        }
        if let Err(e) = self.sink.send(&steps).await {
            warn!("send failed, cycle abandoned: {e}");
            return CycleOutcome::Failed;
        }
        debug!(steps = steps.len(), "action delivered");
        CycleOutcome::Sent
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
