#![forbid(unsafe_code)]

pub mod app_services;
pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod leaderboard_service;
pub mod notify;
pub mod sessions;

pub use exam_core::Clock;
pub use sessions as session;

pub use app_services::AppServices;
pub use client::{ExamApi, HttpExamApi};
pub use config::{ApiConfig, ServicesConfig, SubmitPolicy};
pub use error::{AppServicesError, ClientError, ExportError, SessionError};
pub use leaderboard_service::LeaderboardService;
pub use notify::{Notice, NoticeKind, Notifier, QueueNotifier, TracingNotifier};
pub use sessions::{ActiveExam, BookmarkToggle, ExamSessionService, SessionProgress, SyncHandle};
