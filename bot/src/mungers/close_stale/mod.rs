use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, instrument, warn};

use shared::CommentRepr;

use super::{BotIdentity, MungeObject, MungeResult, Munger, StaleComments};

mod activity;
mod comments;

pub use activity::last_activity;
pub use comments::*;

pub const NAME: &str = "close-stale";

const KEEP_OPEN_LABEL: &str = "keep-open";
const KIND_FLAKE_LABEL: &str = "kind/flake";

// Close the item if no human interaction for this many days
const STALE_PERIOD_DAYS: i64 = 90;
// Warn once the close deadline is this close
const START_WARNING_DAYS: i64 = 60;
const REMIND_WARNING_DAYS: i64 = 30;
const MIN_WARNING_LEAD_DAYS: i64 = 1;

/// Warns about and finally closes PRs (and `kind/flake` issues) without human
/// activity for 90 days.
///
/// Nothing is persisted between loops: the only memory is the warning comment
/// the bot left on the item.
#[derive(Debug, Clone)]
pub struct CloseStale {
    identity: BotIdentity,
    classifier: CommentClassifier,
}

impl CloseStale {
    pub fn new(identity: BotIdentity) -> anyhow::Result<Self> {
        Ok(Self {
            identity,
            classifier: CommentClassifier::new()?,
        })
    }

    fn is_warning_comment(&self, comment: &CommentRepr) -> bool {
        comment.is_valid()
            && self.identity.is_own(comment)
            && self.classifier.is_warning(comment.body())
    }

    /// Latest warning the bot has posted, if any. Older duplicates are deleted.
    /// Equal update times are ordered by comment id.
    pub async fn find_latest_warning_comment(
        &self,
        obj: &dyn MungeObject,
    ) -> anyhow::Result<Option<CommentRepr>> {
        let mut warnings = obj
            .list_comments()
            .await?
            .into_iter()
            .filter(|comment| self.is_warning_comment(comment))
            .collect::<Vec<_>>();
        warnings.sort_by_key(|comment| (comment.updated_at, comment.id));

        let latest = warnings.pop();
        for duplicate in &warnings {
            debug!("Deleting duplicate warning comment {}", duplicate.id);
            if let Err(e) = obj.delete_comment(duplicate).await {
                warn!("Failed to delete duplicate warning {}: {e:#}", duplicate.id);
            }
        }

        Ok(latest)
    }

    async fn close(&self, obj: &dyn MungeObject, inactive_for: Duration) -> anyhow::Result<()> {
        if let Some(warning) = self.find_latest_warning_comment(obj).await? {
            obj.delete_comment(&warning).await?;
        }

        let item = obj.item();
        let text = closing_comment(item.kind, inactive_for, &item.users());
        obj.write_comment(&text).await?;

        if obj.is_pr() {
            obj.close_pr().await
        } else {
            obj.close_issue("").await
        }
    }

    async fn post_warning(
        &self,
        obj: &dyn MungeObject,
        inactive_for: Duration,
        close_in: Duration,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let item = obj.item();
        let text = warning_comment(item.kind, inactive_for, close_in, now, &item.users());
        obj.write_comment(&text).await
    }

    async fn check_and_warn(
        &self,
        obj: &dyn MungeObject,
        inactive_for: Duration,
        close_in: Duration,
        now: DateTime<Utc>,
    ) -> anyhow::Result<MungeResult> {
        if close_in < Duration::days(MIN_WARNING_LEAD_DAYS) {
            // Closing in less than a day, the next loop will close it
            return Ok(MungeResult::TooLateToWarn);
        }

        match self.find_latest_warning_comment(obj).await? {
            None => {
                self.post_warning(obj, inactive_for, close_in, now).await?;
                Ok(MungeResult::Warned)
            }
            Some(warning)
                if warning
                    .updated_at
                    .is_some_and(|updated| now - updated > Duration::days(REMIND_WARNING_DAYS)) =>
            {
                obj.delete_comment(&warning).await?;
                self.post_warning(obj, inactive_for, close_in, now).await?;
                Ok(MungeResult::WarningRefreshed)
            }
            Some(_) => Ok(MungeResult::WarningKept),
        }
    }

    async fn remove_warning(&self, obj: &dyn MungeObject) -> anyhow::Result<MungeResult> {
        match self.find_latest_warning_comment(obj).await? {
            Some(warning) => {
                obj.delete_comment(&warning).await?;
                Ok(MungeResult::WarningRemoved)
            }
            None => Ok(MungeResult::Active),
        }
    }
}

#[async_trait]
impl Munger for CloseStale {
    fn name(&self) -> &'static str {
        NAME
    }

    #[instrument(skip_all, fields(item = %obj.item().repo_info.full_id))]
    async fn munge(
        &self,
        obj: &dyn MungeObject,
        now: DateTime<Utc>,
    ) -> anyhow::Result<MungeResult> {
        if !obj.is_pr() && !obj.has_label(KIND_FLAKE_LABEL) {
            return Ok(MungeResult::Skipped);
        }

        if obj.has_label(KEEP_OPEN_LABEL) {
            debug!("Labelled {KEEP_OPEN_LABEL}. Skipping");
            return Ok(MungeResult::Skipped);
        }

        let last_modified = last_activity(obj, &self.identity).await?;
        let close_in = last_modified + Duration::days(STALE_PERIOD_DAYS) - now;
        let inactive_for = now - last_modified;

        if close_in <= Duration::zero() {
            info!(
                "Closing after {} of inactivity",
                duration_to_days(inactive_for)
            );
            self.close(obj, inactive_for).await?;
            Ok(MungeResult::Closed)
        } else if close_in <= Duration::days(START_WARNING_DAYS) {
            self.check_and_warn(obj, inactive_for, close_in, now).await
        } else {
            // Active again, drop a warning left from an earlier period
            self.remove_warning(obj).await
        }
    }

    fn as_stale_comments(&self) -> Option<&dyn StaleComments> {
        Some(self)
    }
}

impl StaleComments for CloseStale {
    fn is_stale_comment(&self, _obj: &dyn MungeObject, comment: &CommentRepr) -> bool {
        self.identity.is_own(comment) && self.classifier.is_closing(comment.body())
    }
}
