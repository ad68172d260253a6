use anyhow::Context as _;
use chrono::{DateTime, Utc};
use tracing::{instrument, trace};

use shared::{CommentRepr, IssueEvent};

use crate::mungers::{BotIdentity, MungeObject};

/// Last time a human touched the item: a comment, a review comment on a PR,
/// or a reopen. Never earlier than the item creation.
#[instrument(skip_all, fields(item = %obj.item().repo_info.full_id))]
pub async fn last_activity(
    obj: &dyn MungeObject,
    identity: &BotIdentity,
) -> anyhow::Result<DateTime<Utc>> {
    let created = obj.item().created;

    let comments = obj
        .list_comments()
        .await
        .context("Failed to list comments")?;
    let mut last = last_human_update(created, &comments, identity);

    let events = obj.get_events().await.context("Failed to list events")?;
    last = last.max(last_reopen(created, &events));

    if obj.is_pr() {
        let review_comments = obj
            .list_review_comments()
            .await
            .context("Failed to list review comments")?;
        last = last.max(last_human_update(created, &review_comments, identity));
    }

    trace!("Last activity at {last}");
    Ok(last)
}

fn last_human_update(
    floor: DateTime<Utc>,
    comments: &[CommentRepr],
    identity: &BotIdentity,
) -> DateTime<Utc> {
    comments
        .iter()
        .filter(|comment| comment.is_valid() && !identity.is_bot(comment))
        .filter_map(|comment| comment.updated_at)
        .fold(floor, Ord::max)
}

fn last_reopen(floor: DateTime<Utc>, events: &[IssueEvent]) -> DateTime<Utc> {
    events
        .iter()
        .filter(|event| event.is_reopened())
        .filter_map(|event| event.created_at)
        .fold(floor, Ord::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mungers::testing::{comment, days_ago, FakeItem, BOT, CI_BOT};

    fn identity() -> BotIdentity {
        BotIdentity::new(BOT, CI_BOT)
    }

    #[tokio::test]
    async fn defaults_to_creation_time() {
        let item = FakeItem::pr(days_ago(100));
        assert_eq!(
            last_activity(&item, &identity()).await.unwrap(),
            days_ago(100)
        );
    }

    #[tokio::test]
    async fn bot_comments_are_not_activity() {
        let item = FakeItem::pr(days_ago(100))
            .with_comment(comment(1, "human", "ping", days_ago(95)))
            .with_comment(comment(2, BOT, "reminder", days_ago(3)))
            .with_comment(comment(3, CI_BOT, "/test failed", days_ago(2)))
            .with_review_comment(comment(4, CI_BOT, "lint", days_ago(1)));

        assert_eq!(
            last_activity(&item, &identity()).await.unwrap(),
            days_ago(95)
        );
    }

    #[tokio::test]
    async fn malformed_comments_are_ignored() {
        let mut no_body = comment(1, "human", "", days_ago(10));
        no_body.text = None;
        let mut no_author = comment(2, "human", "hi", days_ago(9));
        no_author.user = None;
        let mut no_update = comment(3, "human", "hi", days_ago(8));
        no_update.updated_at = None;

        let item = FakeItem::pr(days_ago(100))
            .with_comment(no_body)
            .with_comment(no_author)
            .with_comment(no_update);

        assert_eq!(
            last_activity(&item, &identity()).await.unwrap(),
            days_ago(100)
        );
    }

    #[tokio::test]
    async fn only_reopen_events_count() {
        let item = FakeItem::issue(days_ago(100))
            .with_comment(comment(1, "human", "ping", days_ago(95)))
            .with_event("labeled", days_ago(1))
            .with_event("reopened", days_ago(5))
            .with_event("closed", days_ago(6));

        assert_eq!(
            last_activity(&item, &identity()).await.unwrap(),
            days_ago(5)
        );
    }

    #[tokio::test]
    async fn review_comments_count_for_prs_only() {
        let review = comment(1, "reviewer", "nit", days_ago(10));

        let pr = FakeItem::pr(days_ago(100)).with_review_comment(review.clone());
        assert_eq!(last_activity(&pr, &identity()).await.unwrap(), days_ago(10));

        let mut issue = FakeItem::issue(days_ago(100)).with_review_comment(review);
        issue.fail_review_comments = true;
        assert_eq!(
            last_activity(&issue, &identity()).await.unwrap(),
            days_ago(100)
        );
    }

    #[tokio::test]
    async fn comment_edits_count() {
        let mut edited = comment(1, "human", "updated", days_ago(60));
        edited.updated_at = Some(days_ago(20));
        let item = FakeItem::pr(days_ago(100)).with_comment(edited);

        assert_eq!(
            last_activity(&item, &identity()).await.unwrap(),
            days_ago(20)
        );
    }

    #[tokio::test]
    async fn any_failed_fetch_fails() {
        let mut item = FakeItem::pr(days_ago(100));
        item.fail_events = true;
        assert!(last_activity(&item, &identity()).await.is_err());

        let mut item = FakeItem::pr(days_ago(100));
        item.fail_review_comments = true;
        assert!(last_activity(&item, &identity()).await.is_err());

        let mut item = FakeItem::issue(days_ago(100));
        item.fail_comments = true;
        assert!(last_activity(&item, &identity()).await.is_err());
    }
}
