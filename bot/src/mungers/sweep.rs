use std::sync::Arc;

use tracing::{debug, instrument};

use super::{MungeObject, Munger};

/// Deletes comments the mungers consider obsolete, e.g. a closing comment on
/// an item that has been reopened since. Runs on open items only, before the
/// mungers get to post anything new in this loop.
#[instrument(skip_all, fields(item = %obj.item().repo_info.full_id))]
pub async fn delete_stale_comments(
    obj: &dyn MungeObject,
    mungers: &[Arc<dyn Munger>],
) -> anyhow::Result<usize> {
    if obj.item().closed {
        return Ok(0);
    }

    let sources = mungers
        .iter()
        .filter_map(|munger| munger.as_stale_comments())
        .collect::<Vec<_>>();
    if sources.is_empty() {
        return Ok(0);
    }

    let comments = obj.list_comments().await?;
    let mut deleted = 0;
    for source in sources {
        for comment in source.stale_comments(obj, &comments) {
            debug!("Deleting stale comment {}", comment.id);
            obj.delete_comment(&comment).await?;
            deleted += 1;
        }
    }
    Ok(deleted)
}
