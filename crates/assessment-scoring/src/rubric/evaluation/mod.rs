mod config;
mod flags;
mod policy;
mod rules;

pub use config::{EvaluationPolicy, IncompletePolicy, UnknownCodePolicy};
pub use flags::{evaluate_flags, FlagReport, TriggeredFlag};
pub use policy::{classify, Band};
pub use rules::{aggregate, round_to_cents, AggregationError, CompositeResult};

use super::normalizer::{
    validate_responses, validate_template, IssueKind, ValidationIssue, ValidationResult,
};
use super::report::{AcceptedReport, EvaluationReport, RejectedReport};
use super::response::ResponseSet;
use super::template::Template;
use tracing::{debug, warn};

/// Stateless evaluator bound to one caller policy.
#[derive(Debug, Clone)]
pub struct EvaluationEngine {
    policy: EvaluationPolicy,
}

impl EvaluationEngine {
    pub fn new(policy: EvaluationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &EvaluationPolicy {
        &self.policy
    }

    pub fn evaluate(&self, template: &Template, responses: &ResponseSet) -> EvaluationReport {
        evaluate(template, responses, &self.policy)
    }
}

/// Validate, aggregate, flag and classify one response set.
///
/// Every issue is collected before deciding; any fatal issue yields a rejected report
/// without a score.
pub fn evaluate(
    template: &Template,
    responses: &ResponseSet,
    policy: &EvaluationPolicy,
) -> EvaluationReport {
    let mut issues = validate_template(template, policy);
    issues.extend(validate_responses(template, responses, policy));

    let (flags, flag_issues) = evaluate_flags(template, responses, policy);
    issues.extend(flag_issues);

    if issues.has_fatal() {
        return reject(template, responses, issues);
    }

    let composite = match aggregate(template, responses, policy.incomplete) {
        Ok(composite) => composite,
        Err(err) => {
            let kind = match err {
                AggregationError::ScoreOutOfRange(_) => IssueKind::ScoreOutOfRange,
                AggregationError::IncompleteResponse(_) | AggregationError::NoScoredAxes => {
                    IssueKind::IncompleteResponse
                }
            };
            issues.push(ValidationIssue::fatal(kind, None, err.to_string()));
            return reject(template, responses, issues);
        }
    };

    let band = classify(&template.scoring_config, composite.raw_composite);

    debug!(
        template = %template.id,
        response_set = %responses.id,
        composite = composite.raw_composite,
        band = %band.name,
        passed = band.passed,
        flags = flags.triggered.len(),
        "evaluation accepted"
    );

    EvaluationReport::Accepted(AcceptedReport {
        template_id: template.id.clone(),
        template_version: template.version.clone(),
        response_set_id: responses.id.clone(),
        composite_score: composite.raw_composite,
        band: band.name,
        passed: band.passed,
        per_axis_contribution: composite.per_axis_contribution,
        weight_sum_used: composite.weight_sum_used,
        flags,
        warnings: issues.into_issues(),
    })
}

fn reject(
    template: &Template,
    responses: &ResponseSet,
    issues: ValidationResult,
) -> EvaluationReport {
    warn!(
        template = %template.id,
        response_set = %responses.id,
        fatal = issues.fatal().count(),
        "evaluation rejected"
    );

    EvaluationReport::Rejected(RejectedReport {
        template_id: template.id.clone(),
        template_version: template.version.clone(),
        response_set_id: responses.id.clone(),
        issues: issues.into_issues(),
    })
}
