use chrono::{DateTime, Utc};

use super::GithubHandle;

/// A comment as returned by the platform. Any field may be missing on
/// malformed payloads; such comments are skipped by every consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentRepr {
    pub id: u64,
    pub user: Option<GithubHandle>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub text: Option<String>,
}

impl CommentRepr {
    pub fn is_valid(&self) -> bool {
        self.user.as_deref().is_some_and(|login| !login.is_empty())
            && self.created_at.is_some()
            && self.updated_at.is_some()
            && self.text.is_some()
    }

    pub fn is_authored_by(&self, login: &str) -> bool {
        self.user.as_deref() == Some(login)
    }

    pub fn body(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueEvent {
    pub event: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl IssueEvent {
    pub const REOPENED: &'static str = "reopened";

    pub fn is_reopened(&self) -> bool {
        self.event.as_deref() == Some(Self::REOPENED)
    }
}
