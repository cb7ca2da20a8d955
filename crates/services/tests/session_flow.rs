mod common;

use std::sync::Arc;

use chrono::Duration;
use tokio::sync::oneshot;

use common::{FakeApi, FlakyStore, five_questions, mock_key, question, shared, study_key};
use exam_core::model::{ExamMode, QuestionId, SessionSnapshot, Verdict};
use exam_core::time::fixed_now;
use services::{
    Clock, ExamSessionService, NoticeKind, QueueNotifier, SessionError, SubmitPolicy,
};
use storage::repository::{InMemoryStore, KeyValueStore, Storage, put_json};

fn id(raw: &str) -> QuestionId {
    QuestionId::new(raw)
}

fn service_over(
    store: Arc<dyn KeyValueStore>,
    api: Arc<FakeApi>,
    notifier: &QueueNotifier,
) -> ExamSessionService {
    ExamSessionService::new(Clock::fixed(fixed_now()), store, api, Arc::new(notifier.clone()))
}

async fn stored_snapshot(store: &dyn KeyValueStore, key: &str) -> Option<SessionSnapshot> {
    let raw = store.get(key).await.unwrap()?;
    Some(serde_json::from_str(&raw).unwrap())
}

#[tokio::test]
async fn study_session_scores_twenty_percent_and_clears_snapshot() {
    let store = shared(InMemoryStore::new());
    let api = shared(FakeApi::default());
    let notifier = QueueNotifier::new();
    let service = service_over(store.clone(), api.clone(), &notifier);

    let mut exam = service.start(study_key(), five_questions(), None).await.unwrap();
    service.select_option(&mut exam, &id("q1"), 2).await.unwrap();
    service.select_option(&mut exam, &id("q2"), 1).await.unwrap();
    if let Some(sync) = service.reveal(&mut exam, &id("q1")).await.unwrap() {
        assert!(sync.wait().await);
    }
    if let Some(sync) = service.reveal(&mut exam, &id("q2")).await.unwrap() {
        assert!(sync.wait().await);
    }

    let result = service.finish(&mut exam).await.unwrap();
    assert_eq!(result.correct(), 1);
    assert_eq!(result.total(), 5);
    assert!((result.percentage() - 20.0).abs() < f64::EPSILON);
    assert_eq!(result.outcomes()[1].verdict, Verdict::Incorrect);
    assert_eq!(result.outcomes()[4].verdict, Verdict::Unanswered);

    let key = exam.key().storage_key();
    assert_eq!(key, "study_MTH101_2019");
    assert!(store.get(&key).await.unwrap().is_none());
    assert_eq!(api.calls(), vec!["progress q1".to_owned(), "progress q2".to_owned()]);
}

#[tokio::test]
async fn every_mutation_is_written_through() {
    let store = shared(InMemoryStore::new());
    let service = service_over(store.clone(), shared(FakeApi::default()), &QueueNotifier::new());

    let mut exam = service.start(study_key(), five_questions(), None).await.unwrap();
    let key = exam.key().storage_key();
    assert_eq!(stored_snapshot(store.as_ref(), &key).await, Some(service.snapshot(&exam)));

    service.select_option(&mut exam, &id("q3"), 4).await.unwrap();
    service.navigate(&mut exam, 3).await.unwrap();
    service.reveal(&mut exam, &id("q3")).await.unwrap();

    let stored = stored_snapshot(store.as_ref(), &key).await.unwrap();
    assert_eq!(stored.user_answers.get(&id("q3")), Some(&4));
    assert_eq!(stored.current_question_index, 3);
    assert_eq!(stored.studied_questions, vec![id("q3")]);
    assert_eq!(stored.show_explanation.get(&id("q3")), Some(&true));
}

#[tokio::test]
async fn studied_answers_are_frozen_and_reveal_is_idempotent() {
    let api = shared(FakeApi::default());
    let service = service_over(shared(InMemoryStore::new()), api.clone(), &QueueNotifier::new());

    let mut exam = service.start(study_key(), five_questions(), None).await.unwrap();
    service.select_option(&mut exam, &id("q1"), 1).await.unwrap();
    let first = service.reveal(&mut exam, &id("q1")).await.unwrap();
    assert!(first.expect("first reveal syncs").wait().await);

    assert!(!service.select_option(&mut exam, &id("q1"), 2).await.unwrap());
    assert!(service.reveal(&mut exam, &id("q1")).await.unwrap().is_none());
    assert_eq!(exam.session().answer(&id("q1")), Some(1));
    assert_eq!(exam.session().studied().len(), 1);
    assert_eq!(api.calls(), vec!["progress q1".to_owned()]);
}

#[tokio::test]
async fn invalid_inputs_are_rejected() {
    let service = service_over(
        shared(InMemoryStore::new()),
        shared(FakeApi::default()),
        &QueueNotifier::new(),
    );
    let mut study = service.start(study_key(), five_questions(), None).await.unwrap();
    let mut mock = service.start(mock_key(), five_questions(), None).await.unwrap();

    for err in [
        service.select_option(&mut study, &id("q1"), 0).await.unwrap_err(),
        service.select_option(&mut study, &id("q1"), 5).await.unwrap_err(),
        service.select_option(&mut study, &id("nope"), 1).await.unwrap_err(),
        service.reveal(&mut mock, &id("q1")).await.unwrap_err(),
    ] {
        assert!(err.is_invalid_input(), "{err}");
    }
    assert!(study.session().answers().is_empty());
    assert!(service.toggle_bookmark(&mut study, &id("nope")).unwrap_err().is_invalid_input());
}

#[tokio::test]
async fn resumes_after_restart_even_when_reordered() {
    let store: Arc<dyn KeyValueStore> = shared(InMemoryStore::new());
    let notifier = QueueNotifier::new();

    let first = service_over(Arc::clone(&store), shared(FakeApi::default()), &notifier);
    let mut exam = first.start(mock_key(), five_questions(), None).await.unwrap();
    first.select_option(&mut exam, &id("q2"), 3).await.unwrap();
    first.select_option(&mut exam, &id("q5"), 1).await.unwrap();
    first.next(&mut exam).await.unwrap();
    drop(exam);

    let mut reordered = five_questions();
    reordered.reverse();
    let second = service_over(Arc::clone(&store), shared(FakeApi::default()), &notifier);
    let resumed = second.start(mock_key(), reordered, None).await.unwrap();

    assert!(resumed.resumed());
    assert_eq!(resumed.session().current_index(), 1);
    assert_eq!(resumed.session().current_question().id(), &id("q2"));
    assert_eq!(resumed.session().answer(&id("q2")), Some(3));
    assert_eq!(resumed.session().answer(&id("q5")), Some(1));
}

#[tokio::test]
async fn shuffled_session_keeps_its_order_across_restarts() {
    let notifier = QueueNotifier::new();
    for _ in 0..10 {
        let store: Arc<dyn KeyValueStore> = shared(InMemoryStore::new());
        let first = service_over(Arc::clone(&store), shared(FakeApi::default()), &notifier)
            .with_shuffle(true);
        let mut exam = first.start(mock_key(), five_questions(), None).await.unwrap();
        first.navigate(&mut exam, 2).await.unwrap();
        let order: Vec<QuestionId> =
            exam.session().questions().iter().map(|q| q.id().clone()).collect();
        let current = exam.session().current_question().id().clone();

        let second = service_over(Arc::clone(&store), shared(FakeApi::default()), &notifier)
            .with_shuffle(true);
        let resumed = second.start(mock_key(), five_questions(), None).await.unwrap();
        let resumed_order: Vec<QuestionId> =
            resumed.session().questions().iter().map(|q| q.id().clone()).collect();

        assert!(resumed.resumed());
        assert_eq!(resumed_order, order);
        assert_eq!(resumed.session().current_question().id(), &current);
    }
}

#[tokio::test]
async fn stale_snapshot_is_replaced_by_a_fresh_session() {
    let store = shared(InMemoryStore::new());
    let service = service_over(store.clone(), shared(FakeApi::default()), &QueueNotifier::new());
    let key = study_key().storage_key();

    let foreign = SessionSnapshot {
        user_answers: [(id("other"), 1)].into_iter().collect(),
        studied_questions: Vec::new(),
        show_explanation: Default::default(),
        current_question_index: 0,
        timestamp: 0,
        started_at: None,
        question_order: None,
    };
    put_json(store.as_ref(), &key, &foreign).await.unwrap();

    let exam = service.start(study_key(), five_questions(), None).await.unwrap();
    assert!(!exam.resumed());
    assert!(exam.session().answers().is_empty());
    let stored = stored_snapshot(store.as_ref(), &key).await.unwrap();
    assert!(stored.user_answers.is_empty());
}

#[tokio::test]
async fn unreadable_snapshot_is_treated_as_stale() {
    let store = shared(InMemoryStore::new());
    let service = service_over(store.clone(), shared(FakeApi::default()), &QueueNotifier::new());
    store.put(&study_key().storage_key(), "{not json").await.unwrap();

    let exam = service.start(study_key(), five_questions(), None).await.unwrap();
    assert!(!exam.resumed());
}

#[tokio::test]
async fn failed_persistence_leaves_state_unchanged() {
    let store = shared(FlakyStore::default());
    let service = service_over(store.clone(), shared(FakeApi::default()), &QueueNotifier::new());
    let mut exam = service.start(study_key(), five_questions(), None).await.unwrap();
    service.select_option(&mut exam, &id("q1"), 2).await.unwrap();

    store.fail(true);
    let err = service.select_option(&mut exam, &id("q1"), 3).await.unwrap_err();
    assert!(matches!(err, SessionError::Storage(_)));
    assert_eq!(exam.session().answer(&id("q1")), Some(2));

    assert!(service.navigate(&mut exam, 4).await.is_err());
    assert_eq!(exam.session().current_index(), 0);

    assert!(service.finish(&mut exam).await.is_err());
    assert!(!exam.session().is_submitted());
    assert!(exam.result().is_none());
}

#[tokio::test]
async fn recompute_policy_scores_again_at_the_first_submission_time() {
    let service = service_over(
        shared(InMemoryStore::new()),
        shared(FakeApi::default()),
        &QueueNotifier::new(),
    );
    let mut exam = service.start(mock_key(), five_questions(), None).await.unwrap();
    service.select_option(&mut exam, &id("q1"), 2).await.unwrap();

    let first = service.finish(&mut exam).await.unwrap();
    assert!(!service.select_option(&mut exam, &id("q2"), 3).await.unwrap());
    let second = service.finish(&mut exam).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(exam.result(), Some(&second));
}

#[tokio::test]
async fn at_most_once_policy_rejects_second_finish() {
    let service = service_over(
        shared(InMemoryStore::new()),
        shared(FakeApi::default()),
        &QueueNotifier::new(),
    )
    .with_submit_policy(SubmitPolicy::AtMostOnce);
    let mut exam = service.start(mock_key(), five_questions(), None).await.unwrap();

    service.finish(&mut exam).await.unwrap();
    let err = service.finish(&mut exam).await.unwrap_err();
    assert!(matches!(err, SessionError::AlreadySubmitted));
}

#[tokio::test]
async fn exit_clears_the_snapshot_without_scoring() {
    let store = shared(InMemoryStore::new());
    let service = service_over(store.clone(), shared(FakeApi::default()), &QueueNotifier::new());
    let exam = service.start(study_key(), five_questions(), None).await.unwrap();
    let key = exam.key().storage_key();

    service.exit(exam).await.unwrap();
    assert!(store.get(&key).await.unwrap().is_none());
}

#[tokio::test]
async fn mock_timer_runs_on_the_service_clock_across_reloads() {
    let store: Arc<dyn KeyValueStore> = shared(InMemoryStore::new());
    let notifier = QueueNotifier::new();
    let limit = Some(Duration::minutes(10));

    let early = service_over(Arc::clone(&store), shared(FakeApi::default()), &notifier);
    let mut exam = early.start(mock_key(), five_questions(), limit).await.unwrap();
    early.select_option(&mut exam, &id("q1"), 2).await.unwrap();
    let progress = early.progress(&exam);
    assert_eq!(progress.remaining, Some(Duration::minutes(10)));
    assert!(!progress.expired);
    assert_eq!(progress.answered, 1);

    let mut later_clock = Clock::fixed(fixed_now());
    later_clock.advance(Duration::minutes(11));
    let later = ExamSessionService::new(
        later_clock,
        Arc::clone(&store),
        shared(FakeApi::default()),
        Arc::new(notifier.clone()),
    );
    let resumed = later.start(mock_key(), five_questions(), limit).await.unwrap();
    let progress = later.progress(&resumed);
    assert!(resumed.resumed());
    assert_eq!(progress.remaining, Some(Duration::zero()));
    assert!(progress.expired);
    assert!(!progress.submitted);
}

#[tokio::test]
async fn bookmark_failure_is_notified_without_rollback() {
    let api = shared(FakeApi {
        fail_sync: true,
        ..FakeApi::default()
    });
    let notifier = QueueNotifier::new();
    let service = service_over(shared(InMemoryStore::new()), api, &notifier);
    let mut exam = service.start(study_key(), five_questions(), None).await.unwrap();

    let toggle = service.toggle_bookmark(&mut exam, &id("q2")).unwrap();
    assert!(toggle.bookmarked);
    assert!(!toggle.sync.wait().await);

    assert!(exam.session().is_bookmarked(&id("q2")));
    let notices = notifier.drain();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].kind, NoticeKind::NetworkFailure);
}

#[tokio::test]
async fn rapid_bookmark_toggles_race_on_the_backend() {
    let (release_post, post_gate) = oneshot::channel();
    let (release_delete, delete_gate) = oneshot::channel();
    let api = shared(FakeApi::default());
    *api.post_gate.lock().unwrap() = Some(post_gate);
    *api.delete_gate.lock().unwrap() = Some(delete_gate);

    let service = service_over(shared(InMemoryStore::new()), api.clone(), &QueueNotifier::new());
    let mut exam = service.start(study_key(), five_questions(), None).await.unwrap();

    let add = service.toggle_bookmark(&mut exam, &id("q1")).unwrap();
    let remove = service.toggle_bookmark(&mut exam, &id("q1")).unwrap();
    assert!(add.bookmarked);
    assert!(!remove.bookmarked);
    assert!(!exam.session().is_bookmarked(&id("q1")));

    // The delete lands first, the add second.
    release_delete.send(()).unwrap();
    assert!(remove.sync.wait().await);
    release_post.send(()).unwrap();
    assert!(add.sync.wait().await);

    assert!(!exam.session().is_bookmarked(&id("q1")));
    assert!(api.backend_bookmarks.lock().unwrap().contains(&id("q1")));
}

#[tokio::test]
async fn report_goes_to_the_api() {
    let api = shared(FakeApi::default());
    let notifier = QueueNotifier::new();
    let service = service_over(shared(InMemoryStore::new()), api.clone(), &notifier);
    let exam = service.start(study_key(), vec![question("q1", 1)], None).await.unwrap();

    service.report(&exam, &id("q1"), "  option C is a duplicate ").await.unwrap();
    assert_eq!(api.calls(), vec!["report q1 option C is a duplicate".to_owned()]);
    assert_eq!(notifier.drain()[0].kind, NoticeKind::Info);
}

#[tokio::test]
async fn sqlite_store_resumes_between_services() {
    let storage = Storage::sqlite("sqlite:file:memdb_exam_resume?mode=memory&cache=shared")
        .await
        .expect("storage");
    let notifier = QueueNotifier::new();

    let first = service_over(Arc::clone(&storage.kv), shared(FakeApi::default()), &notifier);
    let mut exam = first.start(study_key(), five_questions(), None).await.unwrap();
    first.select_option(&mut exam, &id("q4"), 4).await.unwrap();
    first.reveal(&mut exam, &id("q4")).await.unwrap();

    let second = service_over(Arc::clone(&storage.kv), shared(FakeApi::default()), &notifier);
    let resumed = second.start(study_key(), five_questions(), None).await.unwrap();
    assert!(resumed.resumed());
    assert_eq!(resumed.mode(), ExamMode::Study);
    assert!(resumed.session().is_frozen(&id("q4")));
    assert_eq!(resumed.session().answer(&id("q4")), Some(4));
}
