use std::collections::BTreeSet;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::{Deserialize, Serialize};

use exam_core::model::{
    CompetitionId, Course, CoursePayload, ExamMode, ExamScope, LeaderboardEntry, Question,
    QuestionDraft, QuestionId,
};

use crate::config::ApiConfig;
use crate::error::ClientError;

/// Backend calls the session layer depends on.
///
/// Every method is best-effort from the session's point of view: failures are
/// reported, never used to undo local state.
#[async_trait]
pub trait ExamApi: Send + Sync {
    /// Known courses, used to resolve course references in handoff records.
    async fn fetch_courses(&self) -> Result<Vec<Course>, ClientError>;

    async fn fetch_questions(
        &self,
        course: &Course,
        scope: &ExamScope,
        mode: ExamMode,
    ) -> Result<Vec<Question>, ClientError>;

    async fn post_study_progress(&self, question_id: &QuestionId) -> Result<(), ClientError>;

    async fn get_bookmarks(&self) -> Result<BTreeSet<QuestionId>, ClientError>;

    async fn post_bookmark(&self, question_id: &QuestionId) -> Result<(), ClientError>;

    async fn delete_bookmark(&self, question_id: &QuestionId) -> Result<(), ClientError>;

    async fn post_report(&self, question_id: &QuestionId, description: &str)
    -> Result<(), ClientError>;

    async fn fetch_leaderboard(
        &self,
        competition_id: &CompetitionId,
    ) -> Result<Vec<LeaderboardEntry>, ClientError>;
}

/// `ExamApi` over HTTP with reqwest. Every call fails with `ClientError::Disabled`
/// when no API is configured.
#[derive(Clone)]
pub struct HttpExamApi {
    client: Client,
    config: Option<ApiConfig>,
}

impl HttpExamApi {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(ApiConfig::from_env())
    }

    #[must_use]
    pub fn new(config: Option<ApiConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    /// Request against the base URL with `segments` appended, each percent-encoded
    /// as a single path segment.
    fn request(
        &self,
        method: reqwest::Method,
        segments: &[&str],
    ) -> Result<RequestBuilder, ClientError> {
        let config = self.config.as_ref().ok_or(ClientError::Disabled)?;
        let invalid = || ClientError::InvalidBaseUrl(config.base_url.clone());
        let mut url = Url::parse(&config.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|()| invalid())?
            .pop_if_empty()
            .extend(segments);
        let builder = self.client.request(method, url);
        Ok(match &config.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    async fn send(builder: RequestBuilder) -> Result<Response, ClientError> {
        let response = builder.send().await?;
        if !response.status().is_success() {
            return Err(ClientError::HttpStatus(response.status()));
        }
        Ok(response)
    }
}

#[async_trait]
impl ExamApi for HttpExamApi {
    async fn fetch_courses(&self) -> Result<Vec<Course>, ClientError> {
        let builder = self.request(reqwest::Method::GET, &["courses"])?;
        let payload: Vec<CoursePayload> = Self::send(builder).await?.json().await?;
        Ok(payload.into_iter().map(|c| c.resolve(&[])).collect())
    }

    async fn fetch_questions(
        &self,
        course: &Course,
        scope: &ExamScope,
        mode: ExamMode,
    ) -> Result<Vec<Question>, ClientError> {
        let scope_param = match scope {
            ExamScope::Year(year) => ("year", year.clone()),
            ExamScope::Competition(id) => ("competition", id.to_string()),
        };
        let builder = self.request(reqwest::Method::GET, &["questions"])?.query(&[
            ("course", course.id.to_string()),
            (scope_param.0, scope_param.1),
            ("mode", mode.to_string()),
        ]);
        let payload: Vec<QuestionPayload> = Self::send(builder).await?.json().await?;
        payload
            .into_iter()
            .map(|q| q.into_draft().validate().map_err(ClientError::from))
            .collect()
    }

    async fn post_study_progress(&self, question_id: &QuestionId) -> Result<(), ClientError> {
        let builder = self
            .request(reqwest::Method::POST, &["progress", "study"])?
            .json(&QuestionRef { question_id });
        Self::send(builder).await?;
        Ok(())
    }

    async fn get_bookmarks(&self) -> Result<BTreeSet<QuestionId>, ClientError> {
        let builder = self.request(reqwest::Method::GET, &["bookmarks"])?;
        let payload: Vec<BookmarkPayload> = Self::send(builder).await?.json().await?;
        Ok(payload.into_iter().map(BookmarkPayload::into_id).collect())
    }

    async fn post_bookmark(&self, question_id: &QuestionId) -> Result<(), ClientError> {
        let builder = self
            .request(reqwest::Method::POST, &["bookmarks"])?
            .json(&QuestionRef { question_id });
        Self::send(builder).await?;
        Ok(())
    }

    async fn delete_bookmark(&self, question_id: &QuestionId) -> Result<(), ClientError> {
        let builder =
            self.request(reqwest::Method::DELETE, &["bookmarks", question_id.as_str()])?;
        Self::send(builder).await?;
        Ok(())
    }

    async fn post_report(
        &self,
        question_id: &QuestionId,
        description: &str,
    ) -> Result<(), ClientError> {
        let builder = self
            .request(reqwest::Method::POST, &["reports"])?
            .json(&ReportRequest {
                question_id,
                description,
            });
        Self::send(builder).await?;
        Ok(())
    }

    async fn fetch_leaderboard(
        &self,
        competition_id: &CompetitionId,
    ) -> Result<Vec<LeaderboardEntry>, ClientError> {
        let builder = self.request(
            reqwest::Method::GET,
            &["competitions", competition_id.as_str(), "leaderboard"],
        )?;
        Ok(Self::send(builder).await?.json().await?)
    }
}

//
// ─── WIRE PAYLOADS ─────────────────────────────────────────────────────────────
//

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QuestionRef<'a> {
    question_id: &'a QuestionId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportRequest<'a> {
    question_id: &'a QuestionId,
    description: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuestionPayload {
    #[serde(alias = "_id")]
    id: QuestionId,
    #[serde(alias = "question")]
    text: String,
    options: Vec<String>,
    #[serde(alias = "answer")]
    correct_option: u32,
    #[serde(default)]
    explanation: Option<String>,
    #[serde(default, deserialize_with = "year_text")]
    year: Option<String>,
}

impl QuestionPayload {
    fn into_draft(self) -> QuestionDraft {
        QuestionDraft {
            id: self.id,
            text: self.text,
            options: self.options,
            correct_option: self.correct_option,
            explanation: self.explanation,
            year: self.year,
        }
    }
}

/// Years come back as either numbers or strings.
fn year_text<'de, D: serde::Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Year {
        Number(i64),
        Text(String),
    }

    Ok(Option::<Year>::deserialize(d)?.map(|year| match year {
        Year::Number(n) => n.to_string(),
        Year::Text(s) => s,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BookmarkPayload {
    Id(QuestionId),
    Record {
        #[serde(alias = "question", alias = "questionId")]
        question_id: QuestionId,
    },
}

impl BookmarkPayload {
    fn into_id(self) -> QuestionId {
        match self {
            BookmarkPayload::Id(id) | BookmarkPayload::Record { question_id: id } => id,
        }
    }
}
