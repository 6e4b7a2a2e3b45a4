use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::labeler::{LabelSet, Rule, RuleMatcher, EXTERNAL_LABEL, INTERNAL_LABEL, TRIAGE_LABEL};

pub const CONFIG_FILE_PATH: &str = "pr-labeler.toml";

/// Configuration of the labeler, loaded once at startup from a TOML file.
#[derive(serde::Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct LabelerConfig {
    /// Pull request actions that trigger labeling.
    #[serde(default = "default_actions")]
    pub actions: Vec<String>,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub origin: OriginConfig,
}

#[derive(serde::Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct OriginConfig {
    /// Logins whose pull requests are considered internal.
    #[serde(default)]
    pub maintainers: Vec<String>,
    #[serde(default = "default_internal_labels")]
    pub internal_labels: Vec<String>,
    #[serde(default = "default_external_labels")]
    pub external_labels: Vec<String>,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            maintainers: vec![],
            internal_labels: default_internal_labels(),
            external_labels: default_external_labels(),
        }
    }
}

fn default_actions() -> Vec<String> {
    vec![
        "opened".to_string(),
        "reopened".to_string(),
        "synchronize".to_string(),
    ]
}

fn default_internal_labels() -> Vec<String> {
    vec![INTERNAL_LABEL.to_string()]
}

fn default_external_labels() -> Vec<String> {
    vec![EXTERNAL_LABEL.to_string(), TRIAGE_LABEL.to_string()]
}

impl LabelerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    /// Parses and validates the configuration. `path` is only used for error reporting.
    pub fn parse(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: LabelerConfig = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: PathBuf::from(path),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let internal: LabelSet = self.origin.internal_labels.iter().cloned().collect();
        let external: LabelSet = self.origin.external_labels.iter().cloned().collect();
        if internal.is_empty() || external.is_empty() || !internal.is_disjoint(&external) {
            return Err(ConfigError::InvalidOriginLabels { internal, external });
        }
        let origin_labels = internal.union(&external);

        let mut names = HashSet::new();
        for rule in &self.rules {
            if !names.insert(rule.name.as_str()) {
                return Err(ConfigError::DuplicateRule(rule.name.clone()));
            }
            if !rule.has_conditions() {
                return Err(ConfigError::RuleWithoutConditions(rule.name.clone()));
            }
            if rule.labels.is_empty() {
                return Err(ConfigError::RuleWithoutLabels(rule.name.clone()));
            }
            if let Some(label) = rule.labels.iter().find(|l| origin_labels.contains(l)) {
                return Err(ConfigError::RuleAddsOriginLabel {
                    rule: rule.name.clone(),
                    label: label.clone(),
                });
            }
        }

        // Malformed patterns are rejected at startup rather than on the first event.
        RuleMatcher::new(&self.rules)?;
        Ok(())
    }
}
