use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};

use shared::{CommentRepr, IssueEvent, ItemMetadata};

pub mod close_stale;
pub mod sweep;

#[cfg(test)]
pub(crate) mod testing;

pub use close_stale::CloseStale;

/// The view a munger gets of a single pull request or issue.
///
/// Every fetch may fail; a munger treats a failed fetch as "skip this item
/// until the next loop".
#[async_trait]
pub trait MungeObject: Send + Sync {
    fn item(&self) -> &ItemMetadata;

    fn is_pr(&self) -> bool {
        self.item().is_pr()
    }

    fn has_label(&self, name: &str) -> bool {
        self.item().has_label(name)
    }

    async fn list_comments(&self) -> anyhow::Result<Vec<CommentRepr>>;
    async fn list_review_comments(&self) -> anyhow::Result<Vec<CommentRepr>>;
    async fn get_events(&self) -> anyhow::Result<Vec<IssueEvent>>;

    async fn write_comment(&self, text: &str) -> anyhow::Result<()>;
    async fn delete_comment(&self, comment: &CommentRepr) -> anyhow::Result<()>;
    async fn close_pr(&self) -> anyhow::Result<()>;
    async fn close_issue(&self, reason: &str) -> anyhow::Result<()>;
}

/// What a munger did to an item during one loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MungeResult {
    /// The item is out of scope for this munger.
    Skipped,
    Active,
    WarningRemoved,
    Warned,
    WarningRefreshed,
    WarningKept,
    TooLateToWarn,
    Closed,
}

#[async_trait]
pub trait Munger: Send + Sync {
    /// Name usable in `PR_MUNGERS`.
    fn name(&self) -> &'static str;

    /// Platform features that must be offered for the munger to run.
    fn required_features(&self) -> &'static [&'static str] {
        &[]
    }

    /// Extra settings this munger reads on top of the bot configuration.
    fn flags(&self) -> &'static [&'static str] {
        &[]
    }

    fn initialize(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called at the start of every munge loop.
    async fn each_loop(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn munge(&self, obj: &dyn MungeObject, now: DateTime<Utc>)
        -> anyhow::Result<MungeResult>;

    fn as_stale_comments(&self) -> Option<&dyn StaleComments> {
        None
    }
}

/// Lets a munger flag its own obsolete comments for the stale-comment sweep.
pub trait StaleComments: Send + Sync {
    fn is_stale_comment(&self, obj: &dyn MungeObject, comment: &CommentRepr) -> bool;

    fn stale_comments(&self, obj: &dyn MungeObject, comments: &[CommentRepr]) -> Vec<CommentRepr> {
        comments
            .iter()
            .filter(|comment| comment.is_valid() && self.is_stale_comment(obj, comment))
            .cloned()
            .collect()
    }
}

/// Logins whose comments never count as human activity.
#[derive(Debug, Clone)]
pub struct BotIdentity {
    pub bot_name: String,
    pub ci_bot_name: String,
}

impl BotIdentity {
    pub fn new(bot_name: impl Into<String>, ci_bot_name: impl Into<String>) -> Self {
        Self {
            bot_name: bot_name.into(),
            ci_bot_name: ci_bot_name.into(),
        }
    }

    pub fn is_bot(&self, comment: &CommentRepr) -> bool {
        comment.is_authored_by(&self.bot_name) || comment.is_authored_by(&self.ci_bot_name)
    }

    pub fn is_own(&self, comment: &CommentRepr) -> bool {
        comment.is_authored_by(&self.bot_name)
    }
}

#[derive(Default, Clone)]
pub struct MungerRegistry {
    mungers: BTreeMap<&'static str, Arc<dyn Munger>>,
}

impl MungerRegistry {
    /// Registry with every munger this bot ships.
    pub fn with_defaults(identity: BotIdentity) -> anyhow::Result<Self> {
        let mut registry = Self::default();
        registry.register(Arc::new(CloseStale::new(identity)?))?;
        Ok(registry)
    }

    pub fn register(&mut self, munger: Arc<dyn Munger>) -> anyhow::Result<()> {
        let name = munger.name();
        if self.mungers.contains_key(name) {
            anyhow::bail!("Munger {name} is registered twice");
        }
        self.mungers.insert(name, munger);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Munger>> {
        self.mungers.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.mungers.keys().copied()
    }

    /// Picks the requested mungers and initializes them.
    pub fn select(
        &self,
        names: &[String],
        features: &BTreeSet<String>,
    ) -> anyhow::Result<Vec<Arc<dyn Munger>>> {
        let mut selected = Vec::with_capacity(names.len());
        for name in names {
            let munger = self.get(name).ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown munger {name}, available: {}",
                    self.names().collect::<Vec<_>>().join(", ")
                )
            })?;

            if let Some(missing) = munger
                .required_features()
                .iter()
                .find(|feature| !features.contains(**feature))
            {
                anyhow::bail!("Munger {name} requires feature {missing} which is not offered");
            }

            munger.initialize()?;
            debug!("Selected munger {name} with flags {:?}", munger.flags());
            selected.push(munger);
        }
        Ok(selected)
    }
}

/// Runs the stale-comment sweep and then every munger over one item.
#[instrument(skip_all, fields(item = %obj.item().repo_info.full_id))]
pub async fn munge_item(
    obj: &dyn MungeObject,
    mungers: &[Arc<dyn Munger>],
    now: DateTime<Utc>,
) -> Vec<(&'static str, anyhow::Result<MungeResult>)> {
    if let Err(e) = sweep::delete_stale_comments(obj, mungers).await {
        warn!("Failed to sweep stale comments: {e:#}");
    }

    let mut results = Vec::with_capacity(mungers.len());
    for munger in mungers {
        let result = munger.munge(obj, now).await;
        debug!("Munger {} finished with {:?}", munger.name(), result);
        results.push((munger.name(), result));
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mungers::testing::{days_ago, now, FakeItem, Mutation};

    struct NeedsReviewers;

    #[async_trait]
    impl Munger for NeedsReviewers {
        fn name(&self) -> &'static str {
            "needs-reviewers"
        }

        fn required_features(&self) -> &'static [&'static str] {
            &["reviewers"]
        }

        async fn munge(
            &self,
            _obj: &dyn MungeObject,
            _now: DateTime<Utc>,
        ) -> anyhow::Result<MungeResult> {
            Ok(MungeResult::Skipped)
        }
    }

    fn identity() -> BotIdentity {
        BotIdentity::new("bot", "ci-bot")
    }

    #[test]
    fn defaults_contain_close_stale() {
        let registry = MungerRegistry::with_defaults(identity()).unwrap();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["close-stale"]);
    }

    #[test]
    fn register_twice_fails() {
        let mut registry = MungerRegistry::with_defaults(identity()).unwrap();
        let err = registry
            .register(Arc::new(CloseStale::new(identity()).unwrap()))
            .unwrap_err();
        assert!(err.to_string().contains("registered twice"));
    }

    #[test]
    fn select_unknown_munger_fails() {
        let registry = MungerRegistry::with_defaults(identity()).unwrap();
        let err = registry
            .select(&["blunderbuss".to_string()], &BTreeSet::new())
            .err()
            .unwrap();
        assert!(err.to_string().contains("Unknown munger blunderbuss"));
    }

    #[test]
    fn select_checks_required_features() {
        let mut registry = MungerRegistry::default();
        registry.register(Arc::new(NeedsReviewers)).unwrap();
        let names = vec!["needs-reviewers".to_string()];

        assert!(registry.select(&names, &BTreeSet::new()).is_err());

        let features = BTreeSet::from(["reviewers".to_string()]);
        let selected = registry.select(&names, &features).unwrap();
        assert_eq!(selected.len(), 1);
    }

    #[tokio::test]
    async fn munge_item_runs_every_selected_munger() {
        let registry = MungerRegistry::with_defaults(identity()).unwrap();
        let mungers = registry
            .select(&["close-stale".to_string()], &BTreeSet::new())
            .unwrap();
        let item = FakeItem::pr(days_ago(100));

        let results = munge_item(&item, &mungers, now()).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, "close-stale");
        assert_eq!(*results[0].1.as_ref().unwrap(), MungeResult::Closed);
        assert!(item.mutations().contains(&Mutation::ClosedPr));
    }
}
