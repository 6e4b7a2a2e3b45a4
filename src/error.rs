use std::path::PathBuf;

use crate::github::PullRequestNumber;
use crate::labeler::LabelSet;

/// The labeler configuration could not be loaded. Fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Cannot parse configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Rule `{0}` is defined more than once")]
    DuplicateRule(String),
    #[error("Rule `{0}` has no path or branch conditions")]
    RuleWithoutConditions(String),
    #[error("Rule `{0}` does not add any labels")]
    RuleWithoutLabels(String),
    #[error("Rule `{rule}` adds the origin label `{label}`")]
    RuleAddsOriginLabel { rule: String, label: String },
    #[error("Origin labels must be non-empty and disjoint (internal = {internal}, external = {external})")]
    InvalidOriginLabels {
        internal: LabelSet,
        external: LabelSet,
    },
    #[error("Invalid rule pattern: {0}")]
    InvalidPattern(#[from] MatchError),
}

/// The content rules could not be evaluated.
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    #[error("Rule `{rule}` contains invalid glob `{pattern}`: {source}")]
    InvalidGlob {
        rule: String,
        pattern: String,
        source: glob::PatternError,
    },
    #[error("Rule `{rule}` contains invalid branch pattern `{pattern}`: {source}")]
    InvalidBranchPattern {
        rule: String,
        pattern: String,
        source: regex::Error,
    },
    #[error("Cannot load changed files of PR {pr}: {reason}")]
    ChangedPaths {
        pr: PullRequestNumber,
        reason: String,
    },
}

/// The tracker refused or failed to add labels. Already applied labels stay in place.
#[derive(Debug, thiserror::Error)]
#[error("Cannot add label(s) {labels} to PR {pr}: {reason}")]
pub struct ApplyError {
    pub pr: PullRequestNumber,
    pub labels: LabelSet,
    pub reason: String,
}
