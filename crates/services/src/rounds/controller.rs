use std::fmt;
use std::sync::Arc;

use quiz_core::Clock;
use quiz_core::model::{GameRecord, Question, StatsSnapshot};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::config::RoundConfig;
use super::observer::RoundObserver;
use super::round::{DisplayState, QuestionStep, Round, RoundEvent, RoundStep};
use crate::error::{ControllerError, QuestionSourceError};
use crate::questions::QuestionSource;
use crate::statistics::StatisticsStore;

//
// ─── EVENTS ────────────────────────────────────────────────────────────────────
//

/// Outcome of a finished round as shown to the player.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundResult {
    pub record: GameRecord,
    /// `None` when statistics could not be updated.
    pub stats: Option<StatsSnapshot>,
}

/// What `RoundController::process_next` applied.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    Loaded,
    LoadFailed(String),
    QuestionShown(QuestionStep),
    RoundFinished(RoundResult),
    /// The source had no questions at all for this round.
    Exhausted,
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerPhase {
    Idle,
    Loading,
    AwaitingQuestion,
    QuestionShown,
    Failed,
    Finished,
}

/// Results sent back by spawned source tasks.
enum Delivery {
    Loaded(Result<(), QuestionSourceError>),
    Question(Result<Option<Question>, QuestionSourceError>),
    /// The task was dropped before it could deliver, e.g. the source panicked.
    Stopped,
}

/// One expected delivery. Sends `Delivery::Stopped` if dropped unsent.
struct DeliveryGuard {
    tx: Option<mpsc::UnboundedSender<Delivery>>,
}

impl DeliveryGuard {
    fn new(tx: mpsc::UnboundedSender<Delivery>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Returns `false` when the round that expected it is gone.
    fn send(mut self, delivery: Delivery) -> bool {
        self.tx
            .take()
            .is_some_and(|tx| tx.send(delivery).is_ok())
    }
}

impl Drop for DeliveryGuard {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Delivery::Stopped);
        }
    }
}

//
// ─── CONTROLLER ────────────────────────────────────────────────────────────────
//

/// Owns the current round and wires it to the question source, statistics
/// and the presentation observer.
///
/// Source calls run on spawned tasks and report back over a channel that
/// belongs to the current round. `process_next` applies those deliveries one
/// at a time, so the round itself is only ever touched through `&mut self`.
/// Starting a new round aborts the previous round's tasks and replaces the
/// channel, so nothing from an abandoned round can reach the new one.
pub struct RoundController {
    config: RoundConfig,
    clock: Clock,
    source: Arc<dyn QuestionSource>,
    statistics: Arc<StatisticsStore>,
    observer: Arc<dyn RoundObserver>,
    round: Option<Round>,
    loading: bool,
    failed: bool,
    tx: mpsc::UnboundedSender<Delivery>,
    rx: mpsc::UnboundedReceiver<Delivery>,
    outstanding: usize,
    tasks: Vec<JoinHandle<()>>,
    last_result: Option<RoundResult>,
}

impl RoundController {
    #[must_use]
    pub fn new(
        config: RoundConfig,
        clock: Clock,
        source: Arc<dyn QuestionSource>,
        statistics: Arc<StatisticsStore>,
        observer: Arc<dyn RoundObserver>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            config,
            clock,
            source,
            statistics,
            observer,
            round: None,
            loading: false,
            failed: false,
            tx,
            rx,
            outstanding: 0,
            tasks: Vec::new(),
            last_result: None,
        }
    }

    #[must_use]
    pub fn config(&self) -> &RoundConfig {
        &self.config
    }

    #[must_use]
    pub fn round(&self) -> Option<&Round> {
        self.round.as_ref()
    }

    #[must_use]
    pub fn last_result(&self) -> Option<&RoundResult> {
        self.last_result.as_ref()
    }

    #[must_use]
    pub fn display_state(&self) -> Option<DisplayState> {
        self.round.as_ref().map(Round::display_state)
    }

    /// True while a delivery for the current round is still expected.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.outstanding > 0
    }

    #[must_use]
    pub fn phase(&self) -> ControllerPhase {
        let Some(round) = &self.round else {
            return ControllerPhase::Idle;
        };
        if round.is_finished() {
            ControllerPhase::Finished
        } else if self.failed {
            ControllerPhase::Failed
        } else if self.loading {
            ControllerPhase::Loading
        } else if round.current_question().is_some() {
            ControllerPhase::QuestionShown
        } else {
            ControllerPhase::AwaitingQuestion
        }
    }

    /// Abandon any current round and start a fresh one.
    ///
    /// Loads the source, then requests the first question. Must be called
    /// from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError::Round` if the configured round is invalid.
    pub fn start_round(&mut self) -> Result<(), ControllerError> {
        self.cancel_pending();

        let mut round = Round::new(self.config.question_count())?;
        round.start();
        self.round = Some(round);
        self.last_result = None;
        self.failed = false;
        self.loading = true;

        info!(question_count = self.config.question_count(), "starting round");
        self.observer.on_loading(true);

        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        self.spawn(async move {
            let guard = DeliveryGuard::new(tx.clone());
            let loaded = source.load().await;
            let proceed = loaded.is_ok();
            if !guard.send(Delivery::Loaded(loaded)) || !proceed {
                return;
            }
            let guard = DeliveryGuard::new(tx);
            let next = source.request_next().await;
            guard.send(Delivery::Question(next));
        });
        Ok(())
    }

    /// Wait for the next delivery of the current round and apply it.
    ///
    /// Returns `None` when nothing is outstanding.
    pub async fn process_next(&mut self) -> Option<ControllerEvent> {
        if self.outstanding == 0 {
            return None;
        }
        let delivery = self.rx.recv().await?;
        self.outstanding -= 1;

        let event = match delivery {
            Delivery::Loaded(result) => self.apply_loaded(result),
            Delivery::Question(result) => self.apply_question(result).await,
            Delivery::Stopped => self.apply_stopped(),
        };
        Some(event)
    }

    /// Answer the question on screen.
    ///
    /// Feedback is reported right away. The next question is requested after
    /// the configured pacing delay; the last answer records statistics and
    /// reports the round result instead.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError::NoRound` before the first round, and
    /// `ControllerError::Round` when no question is awaiting an answer (for
    /// example a second tap on the same question).
    pub async fn answer(&mut self, tap: bool) -> Result<bool, ControllerError> {
        let now = self.clock.now();
        let round = self.round.as_mut().ok_or(ControllerError::NoRound)?;
        let outcome = round.submit_answer(tap, now)?;

        self.observer.on_answer_feedback(outcome.is_correct);

        match outcome.step {
            RoundStep::RequestNext => self.schedule_next_question(),
            RoundStep::Finished(record) => {
                self.finish_round(record).await;
            }
        }
        Ok(outcome.is_correct)
    }

    fn apply_loaded(&mut self, result: Result<(), QuestionSourceError>) -> ControllerEvent {
        self.loading = false;
        self.observer.on_loading(false);

        match result {
            Ok(()) => {
                // The spawned task goes on to request the first question.
                self.outstanding += 1;
                ControllerEvent::Loaded
            }
            Err(err) => self.fail(&err.to_string()),
        }
    }

    fn apply_stopped(&mut self) -> ControllerEvent {
        if self.loading {
            self.loading = false;
            self.observer.on_loading(false);
        }
        self.fail("question source stopped unexpectedly")
    }

    async fn apply_question(
        &mut self,
        result: Result<Option<Question>, QuestionSourceError>,
    ) -> ControllerEvent {
        let question = match result {
            Ok(question) => question,
            Err(err) => return self.fail(&err.to_string()),
        };

        let now = self.clock.now();
        let Some(round) = self.round.as_mut() else {
            return ControllerEvent::Ignored;
        };

        match round.on_question_received(question, now) {
            Ok(RoundEvent::QuestionAvailable(step)) => {
                debug!(position = %step.display, "question available");
                self.observer.on_question_available(&step);
                ControllerEvent::QuestionShown(step)
            }
            Ok(RoundEvent::Finished(record)) => {
                info!(answered = round.index(), "question source ran dry, finishing early");
                ControllerEvent::RoundFinished(self.finish_round(record).await)
            }
            Ok(RoundEvent::Exhausted) => {
                warn!("question source had no questions");
                self.observer.on_load_failed("no questions available");
                ControllerEvent::Exhausted
            }
            Ok(RoundEvent::Ignored) => ControllerEvent::Ignored,
            Err(err) => self.fail(&err.to_string()),
        }
    }

    fn fail(&mut self, reason: &str) -> ControllerEvent {
        warn!(reason, "question load failed");
        if let Some(round) = self.round.as_mut() {
            round.on_request_failed();
        }
        self.failed = true;
        self.observer.on_load_failed(reason);
        ControllerEvent::LoadFailed(reason.to_owned())
    }

    fn schedule_next_question(&mut self) {
        let pacing = self.config.pacing();
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        self.spawn(async move {
            let guard = DeliveryGuard::new(tx);
            tokio::time::sleep(pacing).await;
            let next = source.request_next().await;
            guard.send(Delivery::Question(next));
        });
    }

    /// Record statistics once and report the result.
    async fn finish_round(&mut self, record: GameRecord) -> RoundResult {
        let stats = match self.statistics.record(&record).await {
            Ok(()) => match self.statistics.current_stats().await {
                Ok(snapshot) => Some(snapshot),
                Err(err) => {
                    warn!(error = %err, "failed to read statistics after round");
                    None
                }
            },
            Err(err) => {
                warn!(error = %err, "failed to record round statistics");
                None
            }
        };

        info!(
            correct = record.correct(),
            total = record.total(),
            "round finished"
        );
        self.observer.on_round_finished(&record, stats.as_ref());

        let result = RoundResult { record, stats };
        self.last_result = Some(result.clone());
        result
    }

    fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.retain(|handle| !handle.is_finished());
        self.outstanding += 1;
        self.tasks.push(tokio::spawn(task));
    }

    fn cancel_pending(&mut self) {
        for handle in self.tasks.drain(..) {
            handle.abort();
        }
        if self.outstanding > 0 {
            debug!(outstanding = self.outstanding, "discarding deliveries of abandoned round");
        }
        let (tx, rx) = mpsc::unbounded_channel();
        self.tx = tx;
        self.rx = rx;
        self.outstanding = 0;
        if self.loading {
            self.loading = false;
            self.observer.on_loading(false);
        }
    }
}

impl Drop for RoundController {
    fn drop(&mut self) {
        for handle in &self.tasks {
            handle.abort();
        }
    }
}

impl fmt::Debug for RoundController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoundController")
            .field("config", &self.config)
            .field("round", &self.round)
            .field("phase", &self.phase())
            .field("outstanding", &self.outstanding)
            .field("last_result", &self.last_result)
            .finish_non_exhaustive()
    }
}
