use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::super::normalizer::{IssueKind, ValidationIssue, ValidationResult};
use super::super::response::ResponseSet;
use super::super::template::{FlagKind, Severity, Template};
use super::config::EvaluationPolicy;

/// Asserted flag resolved against its template declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggeredFlag {
    pub code: String,
    pub severity: Severity,
    pub kind: FlagKind,
}

/// Triggered flags, most severe first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagReport {
    pub triggered: Vec<TriggeredFlag>,
    pub has_critical: bool,
}

impl FlagReport {
    pub fn count(&self, severity: Severity) -> usize {
        self.triggered
            .iter()
            .filter(|flag| flag.severity == severity)
            .count()
    }

    pub fn highest_severity(&self) -> Option<Severity> {
        self.triggered.first().map(|flag| flag.severity)
    }
}

/// Resolve, deduplicate and order the flags a rater asserted.
///
/// Nothing is inferred from text: only codes present in `asserted_flags` can trigger. Unknown
/// codes yield `UnknownFlag` issues whose severity follows `policy.unknown_codes`.
pub fn evaluate_flags(
    template: &Template,
    responses: &ResponseSet,
    policy: &EvaluationPolicy,
) -> (FlagReport, ValidationResult) {
    let mut issues = ValidationResult::default();
    let mut resolved = Vec::new();
    let mut seen = BTreeSet::new();

    for code in &responses.asserted_flags {
        if !seen.insert(code.as_str()) {
            continue;
        }

        match template.flag(code) {
            Some(declared) => resolved.push(declared),
            None => issues.push(ValidationIssue::new(
                IssueKind::UnknownFlag,
                policy.unknown_codes.severity(),
                Some(code),
                format!("flag '{code}' is not declared by template '{}'", template.id),
            )),
        }
    }

    resolved.sort_by(|left, right| {
        right
            .rule
            .severity
            .cmp(&left.rule.severity)
            .then(left.position.cmp(&right.position))
    });

    let triggered: Vec<TriggeredFlag> = resolved
        .into_iter()
        .map(|declared| TriggeredFlag {
            code: declared.rule.code.clone(),
            severity: declared.rule.severity,
            kind: declared.kind,
        })
        .collect();
    let has_critical = triggered
        .iter()
        .any(|flag| flag.severity == Severity::Critical);

    (
        FlagReport {
            triggered,
            has_critical,
        },
        issues,
    )
}
