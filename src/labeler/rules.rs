use std::collections::BTreeSet;

use glob::{MatchOptions, Pattern};
use regex::Regex;

use crate::error::MatchError;
use crate::labeler::{LabelSet, PullRequestEvent};

/// `*` stays within a path segment, `**` crosses segments and dotfiles are not special.
const GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Prefix of a path pattern that excludes paths instead of including them.
const EXCLUDE_PREFIX: char = '!';

/// A static content rule loaded from the configuration file.
#[derive(serde::Deserialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Rule {
    pub name: String,
    /// Globs matched against the changed paths of the PR. Patterns starting with `!`
    /// exclude the paths they match from this rule.
    #[serde(default)]
    pub paths: Vec<String>,
    /// Regexes matched against the name of the PR head branch.
    #[serde(default)]
    pub head_branch: Vec<String>,
    /// Regexes matched against the name of the PR base branch.
    #[serde(default)]
    pub base_branch: Vec<String>,
    pub labels: Vec<String>,
}

impl Rule {
    pub fn has_conditions(&self) -> bool {
        !self.paths.is_empty() || !self.head_branch.is_empty() || !self.base_branch.is_empty()
    }
}

#[derive(Debug)]
struct CompiledRule {
    name: String,
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
    head_branch: Vec<Regex>,
    base_branch: Vec<Regex>,
    labels: LabelSet,
}

impl CompiledRule {
    fn compile(rule: &Rule) -> Result<Self, MatchError> {
        let mut include = Vec::new();
        let mut exclude = Vec::new();
        for pattern in &rule.paths {
            let (target, glob) = match pattern.strip_prefix(EXCLUDE_PREFIX) {
                Some(glob) => (&mut exclude, glob),
                None => (&mut include, pattern.as_str()),
            };
            let compiled = Pattern::new(glob).map_err(|source| MatchError::InvalidGlob {
                rule: rule.name.clone(),
                pattern: pattern.clone(),
                source,
            })?;
            target.push(compiled);
        }

        let compile_branches = |patterns: &[String]| -> Result<Vec<Regex>, MatchError> {
            patterns
                .iter()
                .map(|pattern| {
                    Regex::new(pattern).map_err(|source| MatchError::InvalidBranchPattern {
                        rule: rule.name.clone(),
                        pattern: pattern.clone(),
                        source,
                    })
                })
                .collect()
        };

        Ok(Self {
            name: rule.name.clone(),
            include,
            exclude,
            head_branch: compile_branches(&rule.head_branch)?,
            base_branch: compile_branches(&rule.base_branch)?,
            labels: rule.labels.iter().cloned().collect(),
        })
    }

    fn has_path_condition(&self) -> bool {
        !self.include.is_empty() || !self.exclude.is_empty()
    }

    /// A rule with only exclusions includes every path it does not exclude.
    fn matches_path(&self, path: &str) -> bool {
        let included = self.include.is_empty()
            || self
                .include
                .iter()
                .any(|pattern| pattern.matches_with(path, GLOB_OPTIONS));
        included
            && !self
                .exclude
                .iter()
                .any(|pattern| pattern.matches_with(path, GLOB_OPTIONS))
    }

    fn matches(&self, event: &PullRequestEvent, changed_paths: &BTreeSet<String>) -> bool {
        let paths_match = !self.has_path_condition()
            || changed_paths.iter().any(|path| self.matches_path(path));
        paths_match
            && matches_branch(&self.head_branch, &event.head_branch)
            && matches_branch(&self.base_branch, &event.base_branch)
    }
}

fn matches_branch(patterns: &[Regex], branch: &str) -> bool {
    patterns.is_empty() || patterns.iter().any(|regex| regex.is_match(branch))
}

/// Evaluates content rules against a pull request.
/// Rules form a set: there is no priority and every matching rule contributes its labels.
#[derive(Debug)]
pub struct RuleMatcher {
    rules: Vec<CompiledRule>,
}

impl RuleMatcher {
    pub fn new(rules: &[Rule]) -> Result<Self, MatchError> {
        let rules = rules
            .iter()
            .map(CompiledRule::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Returns the union of the labels of all rules that match the PR.
    pub fn match_labels(
        &self,
        event: &PullRequestEvent,
        changed_paths: &BTreeSet<String>,
    ) -> LabelSet {
        let mut labels = LabelSet::new();
        for rule in &self.rules {
            if rule.matches(event, changed_paths) {
                tracing::debug!("Rule `{}` matched, adding {}", rule.name, rule.labels);
                labels.extend(rule.labels.iter());
            }
        }
        labels
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use crate::error::MatchError;
    use crate::labeler::{LabelSet, Rule, RuleMatcher};
    use crate::tests::event::pr_event;

    fn rule(name: &str, paths: &[&str], labels: &[&str]) -> Rule {
        Rule {
            name: name.to_string(),
            paths: paths.iter().map(|p| p.to_string()).collect(),
            head_branch: vec![],
            base_branch: vec![],
            labels: labels.iter().map(|l| l.to_string()).collect(),
        }
    }

    fn paths(paths: &[&str]) -> BTreeSet<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    fn match_paths(rules: &[Rule], changed: &[&str]) -> LabelSet {
        RuleMatcher::new(rules)
            .unwrap()
            .match_labels(&pr_event().create(), &paths(changed))
    }

    #[test]
    fn docs_rule_matches_nested_file() {
        let rules = [rule("docs", &["docs/**"], &["documentation"])];
        let labels = match_paths(&rules, &["docs/readme.md"]);
        assert!(labels.contains("documentation"));
    }

    #[test]
    fn empty_rule_set_matches_nothing() {
        assert!(match_paths(&[], &["docs/readme.md", "src/lib.rs"]).is_empty());
    }

    #[test]
    fn empty_changed_paths_match_nothing() {
        let rules = [rule("docs", &["docs/**"], &["documentation"])];
        assert!(match_paths(&rules, &[]).is_empty());
    }

    #[test]
    fn single_star_stays_within_segment() {
        let rules = [rule("top-level-py", &["*.py"], &["python"])];
        assert!(match_paths(&rules, &["setup.py"]).contains("python"));
        assert!(match_paths(&rules, &["advanced_alchemy/base.py"]).is_empty());
    }

    #[test]
    fn double_star_crosses_segments() {
        let rules = [rule("py", &["**/*.py"], &["python"])];
        assert!(match_paths(&rules, &["setup.py"]).contains("python"));
        assert!(match_paths(&rules, &["a/b/c/d.py"]).contains("python"));
    }

    #[test]
    fn matching_is_case_sensitive() {
        let rules = [rule("docs", &["docs/**"], &["documentation"])];
        assert!(match_paths(&rules, &["Docs/readme.md"]).is_empty());
    }

    #[test]
    fn dotfiles_are_matched_by_wildcards() {
        let rules = [rule("ci", &[".github/**"], &["area/ci"])];
        assert!(match_paths(&rules, &[".github/workflows/ci.yml"]).contains("area/ci"));
        let rules = [rule("any", &["**"], &["touched"])];
        assert!(match_paths(&rules, &[".pre-commit-config.yaml"]).contains("touched"));
    }

    #[test]
    fn multiple_rules_contribute() {
        let rules = [
            rule("docs", &["docs/**"], &["documentation"]),
            rule("tests", &["tests/**"], &["tests"]),
            rule("sqlalchemy", &["**/*.py"], &["area/core", "python"]),
        ];
        insta::assert_debug_snapshot!(
            match_paths(&rules, &["docs/index.rst", "tests/unit/test_base.py"]).to_vec(),
            @r###"
        [
            "area/core",
            "documentation",
            "python",
            "tests",
        ]
        "###
        );
    }

    #[test]
    fn exclusion_removes_path_from_rule() {
        let rules = [rule(
            "docs",
            &["docs/**", "!docs/changelog.rst"],
            &["documentation"],
        )];
        assert!(match_paths(&rules, &["docs/changelog.rst"]).is_empty());
        assert!(match_paths(&rules, &["docs/changelog.rst", "docs/usage.rst"])
            .contains("documentation"));
    }

    #[test]
    fn exclusions_only_include_everything_else() {
        let rules = [rule("code", &["!docs/**"], &["code"])];
        assert!(match_paths(&rules, &["docs/usage.rst"]).is_empty());
        assert!(match_paths(&rules, &["src/main.rs"]).contains("code"));
    }

    #[test]
    fn adding_paths_never_removes_labels() {
        let rules = [
            rule("docs", &["docs/**", "!docs/changelog.rst"], &["documentation"]),
            rule("tests", &["tests/**"], &["tests"]),
        ];
        let mut changed = vec!["docs/usage.rst"];
        let before = match_paths(&rules, &changed);
        for extra in ["docs/changelog.rst", "tests/conftest.py", "README.md"] {
            changed.push(extra);
            let after = match_paths(&rules, &changed);
            assert!(before.difference(&after).is_empty());
        }
    }

    #[test]
    fn branch_conditions() {
        let mut release = rule("release", &[], &["release"]);
        release.base_branch = vec!["^v\\d+\\.x$".to_string()];
        let mut deps = rule("deps", &["pyproject.toml"], &["dependencies"]);
        deps.head_branch = vec!["^dependabot/".to_string()];

        let matcher = RuleMatcher::new(&[release, deps]).unwrap();

        let event = pr_event()
            .base_branch("v1.x".to_string())
            .head_branch("dependabot/pip/sqlalchemy-2.0".to_string())
            .create();
        let labels = matcher.match_labels(&event, &paths(&["pyproject.toml"]));
        assert_eq!(labels, ["dependencies", "release"].into_iter().collect());

        let event = pr_event().head_branch("feature".to_string()).create();
        assert!(matcher
            .match_labels(&event, &paths(&["pyproject.toml"]))
            .is_empty());
    }

    #[test]
    fn invalid_glob() {
        let rules = [rule("broken", &["docs/***"], &["documentation"])];
        assert!(matches!(
            RuleMatcher::new(&rules),
            Err(MatchError::InvalidGlob { rule, pattern, .. }) if rule == "broken" && pattern == "docs/***"
        ));
    }

    #[test]
    fn invalid_branch_pattern() {
        let mut broken = rule("broken", &[], &["x"]);
        broken.head_branch = vec!["(".to_string()];
        assert!(matches!(
            RuleMatcher::new(&[broken]),
            Err(MatchError::InvalidBranchPattern { .. })
        ));
    }
}
