use std::collections::HashSet;

use crate::labeler::LabelSet;

pub const INTERNAL_LABEL: &str = "pr/internal";
pub const EXTERNAL_LABEL: &str = "pr/external";
pub const TRIAGE_LABEL: &str = "Triage Required :hospital:";

/// Where a pull request comes from, judged by the identity of its sender.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    /// The sender is a known maintainer (or a maintainer-owned bot).
    Internal,
    /// Everyone else. These PRs need triage.
    External,
}

/// Identities of known maintainers. Membership is an exact, case-sensitive match.
#[derive(Clone, Debug, Default)]
pub struct OriginAllowList(HashSet<String>);

impl OriginAllowList {
    pub fn contains(&self, sender: &str) -> bool {
        self.0.contains(sender)
    }
}

impl<S: Into<String>> FromIterator<S> for OriginAllowList {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug)]
pub struct OriginClassifier {
    allow_list: OriginAllowList,
    internal_labels: LabelSet,
    external_labels: LabelSet,
}

impl OriginClassifier {
    pub fn new(
        allow_list: OriginAllowList,
        internal_labels: LabelSet,
        external_labels: LabelSet,
    ) -> Self {
        Self {
            allow_list,
            internal_labels,
            external_labels,
        }
    }

    /// Uses the default `pr/internal` and `pr/external` + triage labels.
    pub fn with_default_labels(allow_list: OriginAllowList) -> Self {
        Self::new(
            allow_list,
            [INTERNAL_LABEL].into_iter().collect(),
            [EXTERNAL_LABEL, TRIAGE_LABEL].into_iter().collect(),
        )
    }

    pub fn origin(&self, sender: &str) -> Origin {
        if self.allow_list.contains(sender) {
            Origin::Internal
        } else {
            Origin::External
        }
    }

    /// Returns exactly one of the two origin label sets.
    pub fn classify(&self, sender: &str) -> LabelSet {
        match self.origin(sender) {
            Origin::Internal => self.internal_labels.clone(),
            Origin::External => self.external_labels.clone(),
        }
    }

    /// The origin a PR was already classified as, judged by the labels it carries.
    /// External labels win, so a PR that somehow carries both keeps needing triage.
    pub fn existing_origin(&self, labels: &LabelSet) -> Option<Origin> {
        if !labels.is_disjoint(&self.external_labels) {
            Some(Origin::External)
        } else if !labels.is_disjoint(&self.internal_labels) {
            Some(Origin::Internal)
        } else {
            None
        }
    }
}
