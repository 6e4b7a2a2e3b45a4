use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use axum::async_trait;

use crate::github::{GithubRepoName, PullRequestNumber};
use crate::labeler::{LabelSet, TrackerClient};

/// In-memory tracker that records every successful `add_labels` call.
#[derive(Default)]
pub struct TestTrackerClient {
    changed_paths: HashMap<u64, BTreeSet<String>>,
    fail_changed_paths: bool,
    rejected_labels: Vec<String>,
    // PR number -> labels of each successful call
    added_labels: Mutex<HashMap<u64, Vec<Vec<String>>>>,
}

impl TestTrackerClient {
    pub fn with_changed_paths(mut self, pr_number: u64, paths: &[&str]) -> Self {
        self.changed_paths
            .insert(pr_number, paths.iter().map(|p| p.to_string()).collect());
        self
    }

    pub fn fail_changed_paths(mut self) -> Self {
        self.fail_changed_paths = true;
        self
    }

    /// Any `add_labels` call containing `label` fails, like GitHub does for invalid labels.
    pub fn reject_label(mut self, label: &str) -> Self {
        self.rejected_labels.push(label.to_string());
        self
    }

    // Getters
    pub fn add_label_calls(&self, pr_number: u64) -> Vec<Vec<String>> {
        self.added_labels
            .lock()
            .unwrap()
            .get(&pr_number)
            .cloned()
            .unwrap_or_default()
    }

    pub fn applied_labels(&self, pr_number: u64) -> LabelSet {
        self.add_label_calls(pr_number).into_iter().flatten().collect()
    }
}

#[async_trait]
impl TrackerClient for TestTrackerClient {
    async fn get_changed_paths(
        &self,
        _repo: &GithubRepoName,
        pr: PullRequestNumber,
    ) -> anyhow::Result<BTreeSet<String>> {
        if self.fail_changed_paths {
            return Err(anyhow::anyhow!("Cannot list files of PR {pr}"));
        }
        Ok(self.changed_paths.get(&pr.0).cloned().unwrap_or_default())
    }

    async fn add_labels(
        &self,
        _repo: &GithubRepoName,
        pr: PullRequestNumber,
        labels: &[String],
    ) -> anyhow::Result<()> {
        if let Some(label) = labels.iter().find(|l| self.rejected_labels.contains(l)) {
            return Err(anyhow::anyhow!("Label `{label}` does not exist"));
        }
        self.added_labels
            .lock()
            .unwrap()
            .entry(pr.0)
            .or_default()
            .push(labels.to_vec());
        Ok(())
    }
}
