use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use quiz_core::model::{GameRecord, Question, StatsSnapshot};
use quiz_core::time::fixed_now;
use services::{
    Clock, ControllerError, ControllerEvent, ControllerPhase, FixedQuestionSource,
    QuestionSource, QuestionSourceError, QuestionStep, RoundConfig, RoundController,
    RoundError, RoundObserver, StatisticsStore,
};
use storage::repository::{KeyValueStore, StorageError};

const PACING: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq)]
enum Seen {
    Question(String, String),
    Feedback(bool),
    Finished(GameRecord, Option<StatsSnapshot>),
    LoadFailed(String),
    Loading(bool),
}

#[derive(Default)]
struct RecordingObserver {
    events: Mutex<Vec<Seen>>,
}

impl RecordingObserver {
    fn events(&self) -> Vec<Seen> {
        self.events.lock().unwrap().clone()
    }

    fn count(&self, pred: impl Fn(&Seen) -> bool) -> usize {
        self.events().iter().filter(|e| pred(e)).count()
    }

    fn push(&self, event: Seen) {
        self.events.lock().unwrap().push(event);
    }
}

impl RoundObserver for RecordingObserver {
    fn on_question_available(&self, step: &QuestionStep) {
        self.push(Seen::Question(
            step.question.prompt().to_owned(),
            step.display.to_string(),
        ));
    }

    fn on_answer_feedback(&self, is_correct: bool) {
        self.push(Seen::Feedback(is_correct));
    }

    fn on_round_finished(&self, record: &GameRecord, stats: Option<&StatsSnapshot>) {
        self.push(Seen::Finished(*record, stats.copied()));
    }

    fn on_load_failed(&self, reason: &str) {
        self.push(Seen::LoadFailed(reason.to_owned()));
    }

    fn on_loading(&self, is_loading: bool) {
        self.push(Seen::Loading(is_loading));
    }
}

struct Harness {
    controller: RoundController,
    observer: Arc<RecordingObserver>,
    statistics: Arc<StatisticsStore>,
}

fn harness(question_count: u32, source: Arc<dyn QuestionSource>) -> Harness {
    harness_with_stats(question_count, source, Arc::new(StatisticsStore::in_memory()))
}

fn harness_with_stats(
    question_count: u32,
    source: Arc<dyn QuestionSource>,
    statistics: Arc<StatisticsStore>,
) -> Harness {
    let observer = Arc::new(RecordingObserver::default());
    let controller = RoundController::new(
        RoundConfig::new(question_count, PACING).unwrap(),
        Clock::fixed(fixed_now()),
        source,
        Arc::clone(&statistics),
        observer.clone(),
    );
    Harness {
        controller,
        observer,
        statistics,
    }
}

async fn next_question(controller: &mut RoundController) -> QuestionStep {
    loop {
        match controller.process_next().await {
            Some(ControllerEvent::QuestionShown(step)) => return step,
            Some(ControllerEvent::Loaded | ControllerEvent::Ignored) => {}
            other => panic!("expected a question, got {other:?}"),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn full_round_records_expected_score_once() {
    let correct = [true, true, true, false, false, false, true, false, true, true];
    let answers = [true, false, true, true, false, false, true, true, true, false];
    let source = Arc::new(FixedQuestionSource::from_answers(&correct));
    let Harness {
        mut controller,
        observer,
        statistics,
    } = harness(10, source);

    controller.start_round().unwrap();
    assert_eq!(controller.phase(), ControllerPhase::Loading);

    for (i, answer) in answers.into_iter().enumerate() {
        let step = next_question(&mut controller).await;
        assert_eq!(step.display.question_ordinal, u32::try_from(i).unwrap() + 1);
        assert_eq!(controller.phase(), ControllerPhase::QuestionShown);

        let is_correct = controller.answer(answer).await.unwrap();
        assert_eq!(is_correct, answer == correct[i]);
    }

    assert_eq!(controller.phase(), ControllerPhase::Finished);
    assert!(controller.process_next().await.is_none());

    let result = controller.last_result().expect("round result").clone();
    assert_eq!(result.record.correct(), 6);
    assert_eq!(result.record.total(), 10);

    let stats = result.stats.expect("stats snapshot");
    assert_eq!(stats.games_played, 1);
    assert_eq!(stats.best_game, Some(result.record));
    assert_eq!(stats.total_accuracy.to_string(), "60.0");

    assert_eq!(statistics.current_stats().await.unwrap().games_played, 1);
    assert_eq!(observer.count(|e| matches!(e, Seen::Finished(..))), 1);
    assert_eq!(observer.count(|e| matches!(e, Seen::Feedback(_))), 10);
    assert_eq!(
        observer.events().first(),
        Some(&Seen::Loading(true)),
        "loading is signalled before anything else"
    );
}

#[tokio::test(start_paused = true)]
async fn second_tap_on_same_question_is_rejected() {
    let source = Arc::new(FixedQuestionSource::from_answers(&[true, false, true]));
    let Harness {
        mut controller,
        observer,
        ..
    } = harness(3, source);

    controller.start_round().unwrap();
    next_question(&mut controller).await;

    assert!(controller.answer(true).await.unwrap());
    let err = controller.answer(true).await.unwrap_err();
    assert_eq!(err, ControllerError::Round(RoundError::NoActiveQuestion));
    assert_eq!(controller.round().unwrap().index(), 1);
    assert_eq!(observer.count(|e| matches!(e, Seen::Feedback(_))), 1);

    let step = next_question(&mut controller).await;
    assert_eq!(step.display.to_string(), "2 / 3");
}

#[tokio::test]
async fn answering_before_any_round_fails() {
    let source = Arc::new(FixedQuestionSource::from_answers(&[true]));
    let Harness { mut controller, .. } = harness(1, source);
    assert_eq!(controller.phase(), ControllerPhase::Idle);
    assert_eq!(
        controller.answer(true).await.unwrap_err(),
        ControllerError::NoRound
    );
}

#[tokio::test(start_paused = true)]
async fn next_question_waits_for_pacing_delay() {
    let source = Arc::new(FixedQuestionSource::from_answers(&[true, true, true]));
    let Harness { mut controller, .. } = harness(3, source);

    controller.start_round().unwrap();
    next_question(&mut controller).await;
    controller.answer(false).await.unwrap();
    assert_eq!(controller.phase(), ControllerPhase::AwaitingQuestion);

    let before = tokio::time::Instant::now();
    next_question(&mut controller).await;
    assert!(before.elapsed() >= PACING);
}

#[tokio::test(start_paused = true)]
async fn restarting_discards_pending_question_request() {
    let source = Arc::new(FixedQuestionSource::from_answers(&[
        true, false, true, false,
    ]));
    let Harness {
        mut controller,
        observer,
        statistics,
    } = harness(3, source.clone());

    controller.start_round().unwrap();
    let first = next_question(&mut controller).await;
    assert_eq!(first.question.prompt(), "Question 1");
    controller.answer(true).await.unwrap();
    assert!(controller.has_pending());

    // Restart while the paced request for question 2 is still sleeping.
    controller.start_round().unwrap();
    assert_eq!(controller.round().unwrap().index(), 0);

    let step = next_question(&mut controller).await;
    assert_eq!(step.question.prompt(), "Question 2");
    assert_eq!(step.display.to_string(), "1 / 3");

    // Let any stray timer fire; nothing may arrive for the new round.
    tokio::time::sleep(PACING * 3).await;
    assert!(!controller.has_pending());
    assert!(controller.process_next().await.is_none());
    assert_eq!(source.remaining().unwrap(), 2);
    assert_eq!(
        observer.count(|e| matches!(e, Seen::Question(..))),
        2,
        "one question per round start"
    );
    assert_eq!(statistics.current_stats().await.unwrap().games_played, 0);
}

/// Fails the first `failures` loads, then behaves like the wrapped source.
struct FlakySource {
    inner: FixedQuestionSource,
    failures: AtomicUsize,
}

#[async_trait]
impl QuestionSource for FlakySource {
    async fn load(&self) -> Result<(), QuestionSourceError> {
        let left = self.failures.load(Ordering::SeqCst);
        if left > 0 {
            self.failures.store(left - 1, Ordering::SeqCst);
            return Err(QuestionSourceError::Failed("movies unavailable".into()));
        }
        self.inner.load().await
    }

    async fn request_next(&self) -> Result<Option<Question>, QuestionSourceError> {
        self.inner.request_next().await
    }
}

#[tokio::test(start_paused = true)]
async fn load_failure_is_reported_and_restart_retries() {
    let source = Arc::new(FlakySource {
        inner: FixedQuestionSource::from_answers(&[true, true]),
        failures: AtomicUsize::new(1),
    });
    let Harness {
        mut controller,
        observer,
        ..
    } = harness(2, source);

    controller.start_round().unwrap();
    let event = controller.process_next().await;
    assert_eq!(
        event,
        Some(ControllerEvent::LoadFailed("movies unavailable".into()))
    );
    assert_eq!(controller.phase(), ControllerPhase::Failed);
    assert!(controller.process_next().await.is_none());
    assert!(observer
        .events()
        .contains(&Seen::LoadFailed("movies unavailable".into())));
    assert!(observer.events().contains(&Seen::Loading(false)));

    controller.start_round().unwrap();
    let step = next_question(&mut controller).await;
    assert_eq!(step.question.prompt(), "Question 1");
}

#[tokio::test(start_paused = true)]
async fn running_dry_mid_round_finishes_early() {
    let source = Arc::new(FixedQuestionSource::from_answers(&[true, false]));
    let Harness {
        mut controller,
        statistics,
        ..
    } = harness(5, source);

    controller.start_round().unwrap();
    next_question(&mut controller).await;
    controller.answer(true).await.unwrap();
    next_question(&mut controller).await;
    controller.answer(true).await.unwrap();

    let event = controller.process_next().await;
    let Some(ControllerEvent::RoundFinished(result)) = event else {
        panic!("expected early finish, got {event:?}");
    };
    assert_eq!(result.record.correct(), 1);
    assert_eq!(result.record.total(), 5);
    assert_eq!(controller.phase(), ControllerPhase::Finished);
    assert_eq!(statistics.current_stats().await.unwrap().games_played, 1);
}

#[tokio::test(start_paused = true)]
async fn empty_source_records_nothing() {
    let source = Arc::new(FixedQuestionSource::from_answers(&[]));
    let Harness {
        mut controller,
        observer,
        statistics,
    } = harness(10, source);

    controller.start_round().unwrap();
    assert_eq!(
        controller.process_next().await,
        Some(ControllerEvent::Loaded)
    );
    assert_eq!(
        controller.process_next().await,
        Some(ControllerEvent::Exhausted)
    );
    assert_eq!(controller.phase(), ControllerPhase::Finished);
    assert!(controller.last_result().is_none());
    assert_eq!(observer.count(|e| matches!(e, Seen::LoadFailed(_))), 1);
    assert_eq!(statistics.current_stats().await.unwrap().games_played, 0);
}

/// Reads succeed with no history; every write fails.
struct ReadOnlyStore;

#[async_trait]
impl KeyValueStore for ReadOnlyStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Connection("read-only".into()))
    }

    async fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Connection("read-only".into()))
    }
}

#[tokio::test(start_paused = true)]
async fn statistics_failure_still_reports_round_result() {
    let source = Arc::new(FixedQuestionSource::from_answers(&[true]));
    let statistics = Arc::new(StatisticsStore::new(Arc::new(ReadOnlyStore)));
    let Harness {
        mut controller,
        observer,
        ..
    } = harness_with_stats(1, source, statistics);

    controller.start_round().unwrap();
    next_question(&mut controller).await;
    assert!(controller.answer(true).await.unwrap());

    let result = controller.last_result().expect("round result");
    assert_eq!(result.record.correct(), 1);
    assert!(result.stats.is_none());
    assert_eq!(
        observer.count(|e| matches!(e, Seen::Finished(_, None))),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn consecutive_rounds_accumulate_statistics() {
    let source = Arc::new(FixedQuestionSource::from_answers(&[
        true, true, true, true,
    ]));
    let Harness {
        mut controller,
        statistics,
        ..
    } = harness(2, source);

    for answers in [[true, true], [true, false]] {
        controller.start_round().unwrap();
        for answer in answers {
            next_question(&mut controller).await;
            controller.answer(answer).await.unwrap();
        }
        assert_eq!(controller.phase(), ControllerPhase::Finished);
    }

    let stats = statistics.current_stats().await.unwrap();
    assert_eq!(stats.games_played, 2);
    assert_eq!(stats.best_game.map(|g| g.correct()), Some(2));
    assert_eq!(stats.total_accuracy.to_string(), "75.0");
}

/// Loads fine, then crashes on every question request.
struct PanickingSource;

#[async_trait]
impl QuestionSource for PanickingSource {
    async fn load(&self) -> Result<(), QuestionSourceError> {
        Ok(())
    }

    async fn request_next(&self) -> Result<Option<Question>, QuestionSourceError> {
        panic!("poster decoder crashed");
    }
}

#[tokio::test(start_paused = true)]
async fn panicking_source_fails_the_round_instead_of_hanging() {
    let Harness {
        mut controller,
        observer,
        ..
    } = harness(3, Arc::new(PanickingSource));

    controller.start_round().unwrap();
    assert_eq!(
        controller.process_next().await,
        Some(ControllerEvent::Loaded)
    );

    let event = tokio::time::timeout(Duration::from_secs(2), controller.process_next())
        .await
        .expect("delivery after the source task died");
    assert_eq!(
        event,
        Some(ControllerEvent::LoadFailed(
            "question source stopped unexpectedly".into()
        ))
    );
    assert_eq!(controller.phase(), ControllerPhase::Failed);
    assert!(!controller.has_pending());
    assert!(controller.process_next().await.is_none());
    assert_eq!(
        observer.count(|e| matches!(e, Seen::LoadFailed(_))),
        1
    );
}

/// Fails the request at `fail_on` (1-based), otherwise defers to the inner source.
struct FailingRequestSource {
    inner: FixedQuestionSource,
    requests: AtomicUsize,
    fail_on: usize,
}

#[async_trait]
impl QuestionSource for FailingRequestSource {
    async fn load(&self) -> Result<(), QuestionSourceError> {
        self.inner.load().await
    }

    async fn request_next(&self) -> Result<Option<Question>, QuestionSourceError> {
        let n = self.requests.fetch_add(1, Ordering::SeqCst) + 1;
        if n == self.fail_on {
            return Err(QuestionSourceError::Failed("poster download failed".into()));
        }
        self.inner.request_next().await
    }
}

#[tokio::test(start_paused = true)]
async fn request_failure_mid_round_refuses_answers() {
    let source = Arc::new(FailingRequestSource {
        inner: FixedQuestionSource::from_answers(&[true, true, true]),
        requests: AtomicUsize::new(0),
        fail_on: 2,
    });
    let Harness {
        mut controller,
        observer,
        statistics,
    } = harness(3, source);

    controller.start_round().unwrap();
    next_question(&mut controller).await;
    assert!(controller.answer(true).await.unwrap());

    assert_eq!(
        controller.process_next().await,
        Some(ControllerEvent::LoadFailed("poster download failed".into()))
    );
    assert_eq!(controller.phase(), ControllerPhase::Failed);
    assert!(!controller.round().unwrap().is_awaiting());
    assert_eq!(
        controller.answer(true).await.unwrap_err(),
        ControllerError::Round(RoundError::NoActiveQuestion)
    );
    assert_eq!(controller.round().unwrap().index(), 1);
    assert!(observer
        .events()
        .contains(&Seen::LoadFailed("poster download failed".into())));
    assert!(controller.process_next().await.is_none());
    assert_eq!(statistics.current_stats().await.unwrap().games_played, 0);
}

#[tokio::test(start_paused = true)]
async fn restarting_while_loading_closes_the_loading_indicator() {
    let source = Arc::new(FixedQuestionSource::from_answers(&[true, true]));
    let Harness {
        mut controller,
        observer,
        ..
    } = harness(2, source);

    controller.start_round().unwrap();
    controller.start_round().unwrap();
    assert_eq!(
        observer.events(),
        vec![Seen::Loading(true), Seen::Loading(false), Seen::Loading(true)]
    );

    let step = next_question(&mut controller).await;
    assert_eq!(step.question.prompt(), "Question 1");
}
