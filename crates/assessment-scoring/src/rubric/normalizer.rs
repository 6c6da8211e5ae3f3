use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::evaluation::{EvaluationPolicy, IncompletePolicy};
use super::response::{AxisScore, ResponseSet};
use super::template::{Template, MAX_RUBRIC_LEVEL, MIN_RUBRIC_LEVEL};

/// Kind of problem found while validating a template or a response set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    MalformedTemplate,
    UnknownAxis,
    UnknownFlag,
    ScoreOutOfRange,
    IncompleteResponse,
    WeightDeviation,
    PassingScoreOffBoundary,
}

impl IssueKind {
    pub const fn label(self) -> &'static str {
        match self {
            IssueKind::MalformedTemplate => "malformed_template",
            IssueKind::UnknownAxis => "unknown_axis",
            IssueKind::UnknownFlag => "unknown_flag",
            IssueKind::ScoreOutOfRange => "score_out_of_range",
            IssueKind::IncompleteResponse => "incomplete_response",
            IssueKind::WeightDeviation => "weight_deviation",
            IssueKind::PassingScoreOffBoundary => "passing_score_off_boundary",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Warning,
    Fatal,
}

/// Typed validation finding; the caller decides what to do with warnings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub severity: IssueSeverity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub message: String,
}

impl ValidationIssue {
    pub fn fatal(kind: IssueKind, subject: Option<&str>, message: impl Into<String>) -> Self {
        Self::new(kind, IssueSeverity::Fatal, subject, message)
    }

    pub fn warning(kind: IssueKind, subject: Option<&str>, message: impl Into<String>) -> Self {
        Self::new(kind, IssueSeverity::Warning, subject, message)
    }

    pub fn new(
        kind: IssueKind,
        severity: IssueSeverity,
        subject: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            severity,
            subject: subject.map(str::to_string),
            message: message.into(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity == IssueSeverity::Fatal
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.subject {
            Some(subject) => write!(f, "{} [{}]: {}", self.kind.label(), subject, self.message),
            None => write!(f, "{}: {}", self.kind.label(), self.message),
        }
    }
}

/// Ordered collection of issues produced by one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn push(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    pub fn extend(&mut self, other: ValidationResult) {
        self.issues.extend(other.issues);
    }

    pub fn has_fatal(&self) -> bool {
        self.issues.iter().any(ValidationIssue::is_fatal)
    }

    pub fn is_valid(&self) -> bool {
        !self.has_fatal()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn fatal(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|issue| issue.is_fatal())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|issue| !issue.is_fatal())
    }

    pub fn contains(&self, kind: IssueKind) -> bool {
        self.issues.iter().any(|issue| issue.kind == kind)
    }

    pub fn into_issues(self) -> Vec<ValidationIssue> {
        self.issues
    }
}

fn malformed(result: &mut ValidationResult, subject: Option<&str>, message: String) {
    result.push(ValidationIssue::fatal(
        IssueKind::MalformedTemplate,
        subject,
        message,
    ));
}

/// Check a template's authoring invariants. Never mutates or corrects the template.
pub fn validate_template(template: &Template, policy: &EvaluationPolicy) -> ValidationResult {
    let mut result = ValidationResult::default();

    check_axes(template, policy, &mut result);
    check_flags(template, &mut result);
    check_scoring_config(template, &mut result);

    result
}

fn check_axes(template: &Template, policy: &EvaluationPolicy, result: &mut ValidationResult) {
    if template.axes.is_empty() {
        malformed(result, None, "template defines no axes".to_string());
        return;
    }

    let mut seen = HashSet::new();
    let mut weights_valid = true;

    for axis in &template.axes {
        let code = axis.code.as_str();
        if code.trim().is_empty() {
            malformed(result, None, "axis code must not be empty".to_string());
        } else if !seen.insert(code) {
            malformed(result, Some(code), format!("duplicate axis code '{code}'"));
        }

        if !axis.weight.is_finite() || axis.weight <= 0.0 || axis.weight > 1.0 {
            weights_valid = false;
            malformed(
                result,
                Some(code),
                format!("axis weight {} must be in (0, 1]", axis.weight),
            );
        }

        let missing: Vec<String> = (MIN_RUBRIC_LEVEL..=MAX_RUBRIC_LEVEL)
            .filter(|level| !axis.rubric_levels.contains_key(level))
            .map(|level| level.to_string())
            .collect();
        if !missing.is_empty() {
            malformed(
                result,
                Some(code),
                format!("rubric levels missing: {}", missing.join(", ")),
            );
        }

        let unexpected: Vec<String> = axis
            .rubric_levels
            .keys()
            .filter(|level| !(MIN_RUBRIC_LEVEL..=MAX_RUBRIC_LEVEL).contains(*level))
            .map(|level| level.to_string())
            .collect();
        if !unexpected.is_empty() {
            malformed(
                result,
                Some(code),
                format!("rubric levels outside 1-5: {}", unexpected.join(", ")),
            );
        }
    }

    if weights_valid {
        let sum = template.weight_sum();
        if (sum - 1.0).abs() > policy.weight_epsilon {
            result.push(ValidationIssue::warning(
                IssueKind::WeightDeviation,
                None,
                format!(
                    "axis weights sum to {:.4}, outside 1.0 ± {}; weights are renormalized",
                    sum, policy.weight_epsilon
                ),
            ));
        }
    }
}

fn check_flags(template: &Template, result: &mut ValidationResult) {
    let mut seen = HashSet::new();
    for flag in template.declared_flags() {
        let code = flag.rule.code.as_str();
        if code.trim().is_empty() {
            malformed(
                result,
                None,
                format!("{} code must not be empty", flag.kind.label()),
            );
        } else if !seen.insert(code) {
            malformed(result, Some(code), format!("duplicate flag code '{code}'"));
        }
    }
}

fn check_scoring_config(template: &Template, result: &mut ValidationResult) {
    let config = &template.scoring_config;
    let bands = config.level_thresholds.bands();
    let before = result.issues.len();

    if !config.passing_score.is_finite() || !(0.0..=100.0).contains(&config.passing_score) {
        malformed(
            result,
            None,
            format!("passing score {} must be in [0, 100]", config.passing_score),
        );
    }

    if bands.len() < 2 {
        malformed(
            result,
            None,
            format!("at least 2 bands are required, found {}", bands.len()),
        );
    }

    let mut names = HashSet::new();
    for band in bands {
        let name = band.name.as_str();
        if name.trim().is_empty() {
            malformed(result, None, "band name must not be empty".to_string());
        } else if !names.insert(name) {
            malformed(result, Some(name), format!("duplicate band '{name}'"));
        }

        if !band.min_score.is_finite() || !(0.0..=100.0).contains(&band.min_score) {
            malformed(
                result,
                Some(name),
                format!("band minimum {} must be in [0, 100]", band.min_score),
            );
        }
    }

    for pair in bands.windows(2) {
        if pair[1].min_score <= pair[0].min_score {
            malformed(
                result,
                Some(pair[1].name.as_str()),
                format!(
                    "thresholds must be strictly ascending: '{}' ({}) follows '{}' ({})",
                    pair[1].name, pair[1].min_score, pair[0].name, pair[0].min_score
                ),
            );
        }
    }

    if result.issues.len() > before {
        return;
    }

    if let Some(lowest) = bands.first() {
        if config.passing_score < lowest.min_score {
            malformed(
                result,
                None,
                format!(
                    "passing score {} is below the lowest band boundary {}",
                    config.passing_score, lowest.min_score
                ),
            );
            return;
        }
    }

    let on_boundary = bands
        .iter()
        .any(|band| band.min_score == config.passing_score);
    if !on_boundary {
        let below = bands
            .iter()
            .rev()
            .find(|band| band.min_score <= config.passing_score);
        let above = bands
            .iter()
            .find(|band| band.min_score > config.passing_score);
        let context = match (below, above) {
            (Some(below), Some(above)) => format!(
                "falls inside band '{}' ({}) below '{}' ({})",
                below.name, below.min_score, above.name, above.min_score
            ),
            (Some(below), None) => {
                format!("falls inside top band '{}' ({})", below.name, below.min_score)
            }
            _ => "is not a band boundary".to_string(),
        };
        result.push(ValidationIssue::warning(
            IssueKind::PassingScoreOffBoundary,
            None,
            format!(
                "passing score {} {}; band and pass verdict may disagree",
                config.passing_score, context
            ),
        ));
    }
}

/// Check a response set against a template under the caller's policy.
///
/// Unknown flags are left to the flag engine, which owns flag resolution.
pub fn validate_responses(
    template: &Template,
    responses: &ResponseSet,
    policy: &EvaluationPolicy,
) -> ValidationResult {
    let mut result = ValidationResult::default();

    for (code, score) in &responses.axis_scores {
        if template.axis(code).is_none() {
            result.push(ValidationIssue::new(
                IssueKind::UnknownAxis,
                policy.unknown_codes.severity(),
                Some(code),
                format!("axis '{code}' is not defined by template '{}'", template.id),
            ));
            continue;
        }

        if !score.in_range() {
            let message = match score {
                AxisScore::Raw(value) => {
                    format!("raw score {value} is outside [0, 100]")
                }
                AxisScore::Level(level) => {
                    format!("rubric level {level} is outside [1, 5]")
                }
            };
            result.push(ValidationIssue::fatal(
                IssueKind::ScoreOutOfRange,
                Some(code),
                message,
            ));
        }
    }

    let missing: Vec<&str> = template
        .axes
        .iter()
        .map(|axis| axis.code.as_str())
        .filter(|code| !responses.axis_scores.contains_key(*code))
        .collect();

    if !template.axes.is_empty() && missing.len() == template.axes.len() {
        result.push(ValidationIssue::fatal(
            IssueKind::IncompleteResponse,
            None,
            "no template axis was scored",
        ));
        return result;
    }

    let severity = policy.incomplete.missing_axis_severity();
    for code in missing {
        let message = match policy.incomplete {
            IncompletePolicy::Lenient => {
                "axis not scored; excluded and remaining weights renormalized"
            }
            IncompletePolicy::ZeroFill => "axis not scored; counted as 0",
            IncompletePolicy::Strict => "axis not scored",
        };
        result.push(ValidationIssue::new(
            IssueKind::IncompleteResponse,
            severity,
            Some(code),
            message,
        ));
    }

    result
}
