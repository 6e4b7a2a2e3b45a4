use std::collections::{BTreeSet, HashSet};
use std::fmt::{Display, Formatter};

use axum::async_trait;
use itertools::Itertools;

use crate::config::LabelerConfig;
use crate::error::ConfigError;
use crate::github::{GithubRepoName, PullRequestNumber};

mod apply;
mod origin;
mod process;
mod rules;

pub use apply::apply_labels;
pub use origin::{
    Origin, OriginAllowList, OriginClassifier, EXTERNAL_LABEL, INTERNAL_LABEL, TRIAGE_LABEL,
};
pub use process::{
    create_labeler_process, handle_pull_request_event, LabelingReport, RuleLaneError,
};
pub use rules::{Rule, RuleMatcher};

/// Provides the tracker operations needed to label a pull request.
/// It is behind a trait to allow easier mocking in tests.
#[async_trait]
pub trait TrackerClient: Send + Sync {
    /// Return the paths of all files touched by the pull request.
    /// A renamed file is reported under both its old and its new path.
    async fn get_changed_paths(
        &self,
        repo: &GithubRepoName,
        pr: PullRequestNumber,
    ) -> anyhow::Result<BTreeSet<String>>;

    /// Add a set of labels to a PR. Adding a label that is already present is a no-op.
    async fn add_labels(
        &self,
        repo: &GithubRepoName,
        pr: PullRequestNumber,
        labels: &[String],
    ) -> anyhow::Result<()>;
}

/// A set of label names. Iteration order is stable (lexicographic), which keeps
/// API calls and logs deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LabelSet(BTreeSet<String>);

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<S: Into<String>>(&mut self, label: S) -> bool {
        self.0.insert(label.into())
    }

    pub fn contains(&self, label: &str) -> bool {
        self.0.contains(label)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|s| s.as_str())
    }

    pub fn union(&self, other: &LabelSet) -> LabelSet {
        self.0.union(&other.0).cloned().collect()
    }

    /// Labels of `self` that are not present in `other`.
    pub fn difference(&self, other: &LabelSet) -> LabelSet {
        self.0.difference(&other.0).cloned().collect()
    }

    pub fn is_disjoint(&self, other: &LabelSet) -> bool {
        self.0.is_disjoint(&other.0)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for LabelSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<String>> Extend<S> for LabelSet {
    fn extend<T: IntoIterator<Item = S>>(&mut self, iter: T) {
        self.0.extend(iter.into_iter().map(Into::into));
    }
}

impl IntoIterator for LabelSet {
    type Item = String;
    type IntoIter = std::collections::btree_set::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl Display for LabelSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.0.iter().map(|l| format!("`{l}`")).join(", "))
    }
}

/// A pull request that was opened or updated.
#[derive(Clone, Debug, PartialEq)]
pub struct PullRequestEvent {
    pub repository: GithubRepoName,
    pub action: String,
    pub pr_number: PullRequestNumber,
    /// Login of the user that triggered the event.
    pub sender: String,
    pub head_branch: String,
    pub base_branch: String,
    /// Labels present on the PR when the event was emitted.
    pub existing_labels: LabelSet,
}

/// Immutable state shared by all handled events, built once from the configuration.
pub struct LabelerContext {
    pub matcher: RuleMatcher,
    pub classifier: OriginClassifier,
    actions: HashSet<String>,
}

impl LabelerContext {
    pub fn new(matcher: RuleMatcher, classifier: OriginClassifier, actions: HashSet<String>) -> Self {
        Self {
            matcher,
            classifier,
            actions,
        }
    }

    /// Compiles the rules and the origin allow-list of a validated configuration.
    pub fn from_config(config: &LabelerConfig) -> Result<Self, ConfigError> {
        let matcher = RuleMatcher::new(&config.rules)?;
        let classifier = OriginClassifier::new(
            config.origin.maintainers.iter().cloned().collect(),
            config.origin.internal_labels.iter().cloned().collect(),
            config.origin.external_labels.iter().cloned().collect(),
        );
        Ok(Self::new(
            matcher,
            classifier,
            config.actions.iter().cloned().collect(),
        ))
    }

    /// Should a pull request event with the given action be labeled?
    pub fn handles_action(&self, action: &str) -> bool {
        self.actions.contains(action)
    }
}
