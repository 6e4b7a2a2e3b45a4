use crate::labeler::{LabelerContext, OriginClassifier, Rule, RuleMatcher};

pub fn default_maintainers() -> Vec<&'static str> {
    vec!["cofin", "provinzkraut", "dependabot[bot]"]
}

pub fn docs_rule() -> Rule {
    Rule {
        name: "documentation".to_string(),
        paths: vec!["docs/**".to_string()],
        head_branch: vec![],
        base_branch: vec![],
        labels: vec!["documentation".to_string()],
    }
}

pub fn context_with_rules(rules: Vec<Rule>) -> LabelerContext {
    LabelerContext::new(
        RuleMatcher::new(&rules).unwrap(),
        OriginClassifier::with_default_labels(default_maintainers().into_iter().collect()),
        ["opened", "reopened", "synchronize"]
            .into_iter()
            .map(|s| s.to_string())
            .collect(),
    )
}

pub fn test_context() -> LabelerContext {
    context_with_rules(vec![docs_rule()])
}
