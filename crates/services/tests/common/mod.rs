#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::oneshot;

use exam_core::model::{
    CompetitionId, Course, CourseId, ExamMode, ExamScope, LeaderboardEntry, Question,
    QuestionDraft, QuestionId, SessionKey,
};
use services::ClientError;
use services::client::ExamApi;
use storage::repository::{InMemoryStore, KeyValueStore, StorageError};

pub fn question(id: &str, correct: u32) -> Question {
    QuestionDraft {
        id: QuestionId::new(id),
        text: format!("Question {id}"),
        options: vec!["w".into(), "x".into(), "y".into(), "z".into()],
        correct_option: correct,
        explanation: Some(format!("Because {id}")),
        year: Some("2019".into()),
    }
    .validate()
    .expect("valid question")
}

pub fn five_questions() -> Vec<Question> {
    vec![
        question("q1", 2),
        question("q2", 3),
        question("q3", 1),
        question("q4", 4),
        question("q5", 2),
    ]
}

pub fn course() -> Course {
    Course::new(CourseId::new("c-mth"), "MTH101", "Elementary Mathematics")
}

pub fn study_key() -> SessionKey {
    SessionKey::new(ExamMode::Study, &course(), ExamScope::Year("2019".into()))
}

pub fn mock_key() -> SessionKey {
    SessionKey::new(
        ExamMode::Mock,
        &course(),
        ExamScope::Competition(CompetitionId::new("cmp-7")),
    )
}

/// Backend double: records calls, keeps bookmark state, optionally fails or
/// holds bookmark calls until released.
#[derive(Default)]
pub struct FakeApi {
    pub questions: Vec<Question>,
    pub courses: Vec<Course>,
    pub leaderboard: Vec<LeaderboardEntry>,
    pub fail_sync: bool,
    pub fail_bookmarks_load: bool,
    pub backend_bookmarks: Mutex<BTreeSet<QuestionId>>,
    pub calls: Mutex<Vec<String>>,
    pub post_gate: Mutex<Option<oneshot::Receiver<()>>>,
    pub delete_gate: Mutex<Option<oneshot::Receiver<()>>>,
}

impl FakeApi {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn sync_result(&self) -> Result<(), ClientError> {
        if self.fail_sync {
            Err(ClientError::HttpStatus(reqwest::StatusCode::SERVICE_UNAVAILABLE))
        } else {
            Ok(())
        }
    }
}

async fn pass(gate: &Mutex<Option<oneshot::Receiver<()>>>) {
    let gate = gate.lock().unwrap().take();
    if let Some(gate) = gate {
        let _ = gate.await;
    }
}

#[async_trait]
impl ExamApi for FakeApi {
    async fn fetch_courses(&self) -> Result<Vec<Course>, ClientError> {
        self.record("courses".into());
        Ok(self.courses.clone())
    }

    async fn fetch_questions(
        &self,
        course: &Course,
        scope: &ExamScope,
        mode: ExamMode,
    ) -> Result<Vec<Question>, ClientError> {
        self.record(format!("questions {} {} {mode}", course.code, scope.identifier()));
        Ok(self.questions.clone())
    }

    async fn post_study_progress(&self, question_id: &QuestionId) -> Result<(), ClientError> {
        self.record(format!("progress {question_id}"));
        self.sync_result()
    }

    async fn get_bookmarks(&self) -> Result<BTreeSet<QuestionId>, ClientError> {
        self.record("bookmarks".into());
        if self.fail_bookmarks_load {
            return Err(ClientError::HttpStatus(reqwest::StatusCode::BAD_GATEWAY));
        }
        Ok(self.backend_bookmarks.lock().unwrap().clone())
    }

    async fn post_bookmark(&self, question_id: &QuestionId) -> Result<(), ClientError> {
        pass(&self.post_gate).await;
        self.record(format!("bookmark+ {question_id}"));
        self.sync_result()?;
        self.backend_bookmarks.lock().unwrap().insert(question_id.clone());
        Ok(())
    }

    async fn delete_bookmark(&self, question_id: &QuestionId) -> Result<(), ClientError> {
        pass(&self.delete_gate).await;
        self.record(format!("bookmark- {question_id}"));
        self.sync_result()?;
        self.backend_bookmarks.lock().unwrap().remove(question_id);
        Ok(())
    }

    async fn post_report(&self, question_id: &QuestionId, description: &str) -> Result<(), ClientError> {
        self.record(format!("report {question_id} {description}"));
        self.sync_result()
    }

    async fn fetch_leaderboard(
        &self,
        competition_id: &CompetitionId,
    ) -> Result<Vec<LeaderboardEntry>, ClientError> {
        self.record(format!("leaderboard {competition_id}"));
        Ok(self.leaderboard.clone())
    }
}

/// In-memory store whose writes can be switched off.
#[derive(Default)]
pub struct FlakyStore {
    inner: InMemoryStore,
    pub fail_writes: AtomicBool,
}

impl FlakyStore {
    pub fn fail(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(StorageError::Connection("disk full".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl KeyValueStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check()?;
        self.inner.put(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        self.check()?;
        self.inner.remove(key).await
    }

    async fn take(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.check()?;
        self.inner.take(key).await
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        self.inner.keys_with_prefix(prefix).await
    }
}

pub fn shared<T>(value: T) -> Arc<T> {
    Arc::new(value)
}
