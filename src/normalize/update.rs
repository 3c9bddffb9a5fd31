//! Freshness check of the local street names mapping table against the
//! copy kept on GitHub.
//!
//! Failures here never stop the pipeline: they are logged and reported as
//! [`UpdateStatus::Unknown`].

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

use crate::config::UpdateCheckConfig;
use crate::error::{ReconcileError, Result};

const GITHUB_API_URL: &str = "https://api.github.com";
const GITHUB_RAW_URL: &str = "https://raw.githubusercontent.com";

/// Outcome of comparing the local table with the remote one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStatus {
    UpToDate,
    Stale {
        local: DateTime<Utc>,
        remote: DateTime<Utc>,
    },
    Unknown,
}

impl UpdateStatus {
    /// Compare the local modification time with the latest remote commit
    pub fn compare(local: Option<DateTime<Utc>>, remote: Option<DateTime<Utc>>) -> Self {
        match (local, remote) {
            (Some(local), Some(remote)) if remote > local => UpdateStatus::Stale { local, remote },
            (Some(_), Some(_)) => UpdateStatus::UpToDate,
            _ => UpdateStatus::Unknown,
        }
    }
}

/// A file in a GitHub repository
#[derive(Debug, Clone)]
pub struct GithubFile {
    pub user: String,
    pub repo: String,
    pub branch: String,
    pub path: String,
}

impl GithubFile {
    pub fn commits_url(&self) -> Result<Url> {
        let base = format!("{}/repos/{}/{}/commits", GITHUB_API_URL, self.user, self.repo);
        Ok(Url::parse_with_params(&base, &[("path", self.path.as_str())])?)
    }

    pub fn raw_url(&self) -> Result<Url> {
        Ok(Url::parse(&format!(
            "{}/{}/{}/{}/{}",
            GITHUB_RAW_URL, self.user, self.repo, self.branch, self.path
        ))?)
    }
}

impl From<&UpdateCheckConfig> for GithubFile {
    fn from(config: &UpdateCheckConfig) -> Self {
        Self {
            user: config.github_user.clone(),
            repo: config.github_repo.clone(),
            branch: config.github_branch.clone(),
            path: config.github_path.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CommitEntry {
    commit: CommitDetails,
}

#[derive(Debug, Deserialize)]
struct CommitDetails {
    committer: CommitSignature,
}

#[derive(Debug, Deserialize)]
struct CommitSignature {
    date: DateTime<Utc>,
}

/// Date of the newest commit in a GitHub commits API response body
pub fn latest_commit_date(body: &str) -> Option<DateTime<Utc>> {
    match serde_json::from_str::<Vec<CommitEntry>>(body) {
        Ok(commits) => commits.first().map(|c| c.commit.committer.date),
        Err(e) => {
            warn!("Error with parsing data from GitHub API: {}", e);
            None
        }
    }
}

pub struct UpdateChecker {
    client: Client,
    file: GithubFile,
}

impl UpdateChecker {
    pub fn new(file: GithubFile) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("addr-reconcile/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { client, file })
    }

    /// Compare the local table at `local_path` with the remote copy.
    pub async fn check(&self, local_path: &Path) -> UpdateStatus {
        let local = match local_modified(local_path) {
            Ok(dt) => Some(dt),
            Err(e) => {
                warn!(
                    "Could not read modification time of {}: {}",
                    local_path.display(),
                    e
                );
                None
            }
        };

        let remote = match self.fetch_latest_commit_date().await {
            Ok(dt) => dt,
            Err(e) => {
                warn!("Error with downloading data from GitHub API: {}", e);
                None
            }
        };

        let status = UpdateStatus::compare(local, remote);
        match status {
            UpdateStatus::UpToDate => info!("Street names mappings are up to date"),
            UpdateStatus::Stale { local, remote } => warn!(
                "Street names mappings are outdated (local: {}, remote: {}); proceeding with local copy",
                local, remote
            ),
            UpdateStatus::Unknown => {
                warn!("Could not check street names mappings for updates; proceeding with local copy")
            }
        }
        status
    }

    async fn fetch_latest_commit_date(&self) -> Result<Option<DateTime<Utc>>> {
        let url = self.file.commits_url()?;
        let response = self.client.get(url.clone()).send().await?;

        if !response.status().is_success() {
            return Err(ReconcileError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let body = response.text().await?;
        Ok(latest_commit_date(&body))
    }

    /// Download the remote table over `dest`
    pub async fn download(&self, dest: &Path) -> Result<()> {
        let url = self.file.raw_url()?;
        info!("Downloading street names mappings from {}", url);

        let response = self.client.get(url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(ReconcileError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let content = response.bytes().await?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(dest, &content).await?;

        info!("Saved street names mappings to {}", dest.display());
        Ok(())
    }
}

fn local_modified(path: &Path) -> std::io::Result<DateTime<Utc>> {
    let modified = std::fs::metadata(path)?.modified()?;
    Ok(DateTime::<Utc>::from(modified))
}
