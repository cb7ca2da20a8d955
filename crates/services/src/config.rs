use std::env;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_DB_URL: &str = "sqlite://exam.sqlite3";

/// What `finish()` does when called on an already submitted session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmitPolicy {
    /// Score again from the current in-memory state.
    #[default]
    Recompute,
    /// Reject the second call with `SessionError::AlreadySubmitted`.
    AtMostOnce,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePolicyError(String);

impl fmt::Display for ParsePolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown submit policy: {} (expected recompute or at-most-once)", self.0)
    }
}

impl std::error::Error for ParsePolicyError {}

impl FromStr for SubmitPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "recompute" => Ok(SubmitPolicy::Recompute),
            "at-most-once" | "once" => Ok(SubmitPolicy::AtMostOnce),
            other => Err(ParsePolicyError(other.to_owned())),
        }
    }
}

/// Connection settings for the exam REST API.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
    pub token: Option<String>,
}

impl ApiConfig {
    /// Read `EXAM_API_BASE_URL` and `EXAM_API_TOKEN`. `None` when no base URL is set.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let base_url = lookup("EXAM_API_BASE_URL")?;
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return None;
        }
        let token = lookup("EXAM_API_TOKEN")
            .map(|t| t.trim().to_owned())
            .filter(|t| !t.is_empty());
        Some(Self {
            base_url: base_url.to_owned(),
            token,
        })
    }
}

/// Everything the services layer reads from the environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServicesConfig {
    pub api: Option<ApiConfig>,
    pub db_url: String,
    pub submit_policy: SubmitPolicy,
    pub shuffle_questions: bool,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            api: None,
            db_url: DEFAULT_DB_URL.into(),
            submit_policy: SubmitPolicy::default(),
            shuffle_questions: false,
        }
    }
}

impl ServicesConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Unparseable values fall back to defaults.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let db_url = lookup("EXAM_DB_URL")
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.db_url);
        let submit_policy = lookup("EXAM_SUBMIT_POLICY")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.submit_policy);
        let shuffle_questions = lookup("EXAM_SHUFFLE")
            .is_some_and(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"));

        Self {
            api: ApiConfig::from_lookup(&lookup),
            db_url,
            submit_policy,
            shuffle_questions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = ServicesConfig::from_lookup(lookup(&[]));
        assert_eq!(config, ServicesConfig::default());
    }

    #[test]
    fn reads_all_variables() {
        let config = ServicesConfig::from_lookup(lookup(&[
            ("EXAM_API_BASE_URL", "https://api.example.test/v1/"),
            ("EXAM_API_TOKEN", " secret "),
            ("EXAM_DB_URL", "sqlite://other.db"),
            ("EXAM_SUBMIT_POLICY", "at_most_once"),
            ("EXAM_SHUFFLE", "TRUE"),
        ]));
        let api = config.api.unwrap();
        assert_eq!(api.base_url, "https://api.example.test/v1");
        assert_eq!(api.token.as_deref(), Some("secret"));
        assert_eq!(config.db_url, "sqlite://other.db");
        assert_eq!(config.submit_policy, SubmitPolicy::AtMostOnce);
        assert!(config.shuffle_questions);
    }

    #[test]
    fn blank_api_url_disables_client() {
        assert!(ApiConfig::from_lookup(lookup(&[("EXAM_API_BASE_URL", " / ")])).is_none());
    }

    #[test]
    fn bad_policy_falls_back() {
        let config = ServicesConfig::from_lookup(lookup(&[("EXAM_SUBMIT_POLICY", "twice")]));
        assert_eq!(config.submit_policy, SubmitPolicy::Recompute);
        assert!("twice".parse::<SubmitPolicy>().is_err());
    }
}
