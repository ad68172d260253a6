use std::collections::BTreeSet;

use serde::Deserialize;

use crate::mungers::close_stale;

fn default_mungers() -> String {
    close_stale::NAME.to_string()
}

fn default_ci_bot_name() -> String {
    "k8s-ci-robot".to_string()
}

fn default_period_minutes() -> u64 {
    30
}

/// Bot settings, read from the environment (and `.env`).
#[derive(Debug, Clone, Deserialize)]
pub struct Env {
    pub github_token: String,
    /// Comma separated `owner/repo` list.
    pub repositories: String,
    #[serde(default = "default_mungers")]
    pub pr_mungers: String,
    #[serde(default = "default_ci_bot_name")]
    pub ci_bot_name: String,
    #[serde(default = "default_period_minutes")]
    pub period_minutes: u64,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub features: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub owner: String,
    pub repo: String,
}

impl std::fmt::Display for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

impl Env {
    pub fn repositories(&self) -> anyhow::Result<Vec<Repository>> {
        let repositories = split_list(&self.repositories)
            .map(|slug| match slug.split_once('/') {
                Some((owner, repo))
                    if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') =>
                {
                    Ok(Repository {
                        owner: owner.to_string(),
                        repo: repo.to_string(),
                    })
                }
                _ => Err(anyhow::anyhow!(
                    "Malformed repository {slug}, expected owner/repo"
                )),
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        if repositories.is_empty() {
            anyhow::bail!("No repositories configured");
        }
        Ok(repositories)
    }

    pub fn mungers(&self) -> Vec<String> {
        split_list(&self.pr_mungers).map(str::to_string).collect()
    }

    pub fn features(&self) -> BTreeSet<String> {
        split_list(&self.features).map(str::to_string).collect()
    }

    pub fn period(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.period_minutes.max(1) * 60)
    }
}
