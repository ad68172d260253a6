use std::{
    collections::BTreeSet,
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use shared::{CommentRepr, IssueEvent, ItemKind, ItemMetadata, RepoInfo};

use super::MungeObject;

pub const BOT: &str = "bot";
pub const CI_BOT: &str = "ci-bot";

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

pub fn days_ago(days: i64) -> DateTime<Utc> {
    now() - Duration::days(days)
}

pub fn comment(id: u64, user: &str, text: &str, updated: DateTime<Utc>) -> CommentRepr {
    CommentRepr {
        id,
        user: Some(user.to_string()),
        created_at: Some(updated),
        updated_at: Some(updated),
        text: Some(text.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Wrote(String),
    Deleted(u64),
    ClosedPr,
    ClosedIssue(String),
}

/// In-memory item that records every mutation a munger performs.
/// Comments written through it show up in later `list_comments` calls,
/// stamped with `clock`.
pub struct FakeItem {
    pub item: ItemMetadata,
    pub comments: Mutex<Vec<CommentRepr>>,
    pub review_comments: Vec<CommentRepr>,
    pub events: Vec<IssueEvent>,
    pub fail_comments: bool,
    pub fail_review_comments: bool,
    pub fail_events: bool,
    pub clock: Mutex<DateTime<Utc>>,
    mutations: Mutex<Vec<Mutation>>,
    next_id: AtomicU64,
}

impl FakeItem {
    pub fn new(kind: ItemKind, created: DateTime<Utc>) -> Self {
        Self {
            item: ItemMetadata {
                repo_info: RepoInfo::new("owner", "repo", 42),
                kind,
                author: Some("author".to_string()),
                assignees: vec![],
                labels: BTreeSet::new(),
                created,
                closed: false,
            },
            comments: Mutex::new(vec![]),
            review_comments: vec![],
            events: vec![],
            fail_comments: false,
            fail_review_comments: false,
            fail_events: false,
            clock: Mutex::new(now()),
            mutations: Mutex::new(vec![]),
            next_id: AtomicU64::new(1000),
        }
    }

    pub fn pr(created: DateTime<Utc>) -> Self {
        Self::new(ItemKind::PullRequest, created)
    }

    pub fn issue(created: DateTime<Utc>) -> Self {
        Self::new(ItemKind::Issue, created)
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.item.labels.insert(label.to_string());
        self
    }

    pub fn with_comment(self, comment: CommentRepr) -> Self {
        self.comments.lock().unwrap().push(comment);
        self
    }

    pub fn with_review_comment(mut self, comment: CommentRepr) -> Self {
        self.review_comments.push(comment);
        self
    }

    pub fn with_event(mut self, event: &str, created_at: DateTime<Utc>) -> Self {
        self.events.push(IssueEvent {
            event: Some(event.to_string()),
            created_at: Some(created_at),
        });
        self
    }

    pub fn set_clock(&self, time: DateTime<Utc>) {
        *self.clock.lock().unwrap() = time;
    }

    pub fn mutations(&self) -> Vec<Mutation> {
        self.mutations.lock().unwrap().clone()
    }

    pub fn written(&self) -> Vec<String> {
        self.mutations()
            .into_iter()
            .filter_map(|m| match m {
                Mutation::Wrote(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn current_comments(&self) -> Vec<CommentRepr> {
        self.comments.lock().unwrap().clone()
    }

    fn record(&self, mutation: Mutation) {
        self.mutations.lock().unwrap().push(mutation);
    }
}

#[async_trait]
impl MungeObject for FakeItem {
    fn item(&self) -> &ItemMetadata {
        &self.item
    }

    async fn list_comments(&self) -> anyhow::Result<Vec<CommentRepr>> {
        if self.fail_comments {
            anyhow::bail!("comments unavailable");
        }
        Ok(self.current_comments())
    }

    async fn list_review_comments(&self) -> anyhow::Result<Vec<CommentRepr>> {
        if self.fail_review_comments {
            anyhow::bail!("review comments unavailable");
        }
        Ok(self.review_comments.clone())
    }

    async fn get_events(&self) -> anyhow::Result<Vec<IssueEvent>> {
        if self.fail_events {
            anyhow::bail!("events unavailable");
        }
        Ok(self.events.clone())
    }

    async fn write_comment(&self, text: &str) -> anyhow::Result<()> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let time = *self.clock.lock().unwrap();
        self.comments
            .lock()
            .unwrap()
            .push(comment(id, BOT, text, time));
        self.record(Mutation::Wrote(text.to_string()));
        Ok(())
    }

    async fn delete_comment(&self, comment: &CommentRepr) -> anyhow::Result<()> {
        self.comments.lock().unwrap().retain(|c| c.id != comment.id);
        self.record(Mutation::Deleted(comment.id));
        Ok(())
    }

    async fn close_pr(&self) -> anyhow::Result<()> {
        self.record(Mutation::ClosedPr);
        Ok(())
    }

    async fn close_issue(&self, reason: &str) -> anyhow::Result<()> {
        self.record(Mutation::ClosedIssue(reason.to_string()));
        Ok(())
    }
}
