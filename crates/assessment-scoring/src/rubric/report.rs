use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::evaluation::{FlagReport, TriggeredFlag};
use super::normalizer::ValidationIssue;
use super::response::ResponseSetId;
use super::template::{TemplateId, TemplateVersion};

/// Scored outcome of an evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedReport {
    pub template_id: TemplateId,
    pub template_version: TemplateVersion,
    pub response_set_id: ResponseSetId,
    pub composite_score: f64,
    pub band: String,
    pub passed: bool,
    pub per_axis_contribution: BTreeMap<String, f64>,
    pub weight_sum_used: f64,
    pub flags: FlagReport,
    pub warnings: Vec<ValidationIssue>,
}

/// Evaluation that could not be scored, with every issue found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedReport {
    pub template_id: TemplateId,
    pub template_version: TemplateVersion,
    pub response_set_id: ResponseSetId,
    pub issues: Vec<ValidationIssue>,
}

/// Immutable result for one (template, response set) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EvaluationReport {
    Accepted(AcceptedReport),
    Rejected(RejectedReport),
}

impl EvaluationReport {
    pub fn is_accepted(&self) -> bool {
        matches!(self, EvaluationReport::Accepted(_))
    }

    pub fn accepted(&self) -> Option<&AcceptedReport> {
        match self {
            EvaluationReport::Accepted(report) => Some(report),
            EvaluationReport::Rejected(_) => None,
        }
    }

    pub fn rejected(&self) -> Option<&RejectedReport> {
        match self {
            EvaluationReport::Accepted(_) => None,
            EvaluationReport::Rejected(report) => Some(report),
        }
    }

    pub fn composite_score(&self) -> Option<f64> {
        self.accepted().map(|report| report.composite_score)
    }

    pub fn status_label(&self) -> &'static str {
        match self {
            EvaluationReport::Accepted(_) => "accepted",
            EvaluationReport::Rejected(_) => "rejected",
        }
    }

    pub fn response_set_id(&self) -> &ResponseSetId {
        match self {
            EvaluationReport::Accepted(report) => &report.response_set_id,
            EvaluationReport::Rejected(report) => &report.response_set_id,
        }
    }

    pub fn summary(&self) -> String {
        match self {
            EvaluationReport::Accepted(report) => {
                let verdict = if report.passed { "passed" } else { "not passed" };
                let flags = match report.flags.triggered.len() {
                    0 => "no flags".to_string(),
                    count if report.flags.has_critical => {
                        format!("{count} flag(s) including critical")
                    }
                    count => format!("{count} flag(s)"),
                };
                format!(
                    "scored {:.2} ({}), {}, {}",
                    report.composite_score, report.band, verdict, flags
                )
            }
            EvaluationReport::Rejected(report) => {
                let reasons: Vec<String> = report
                    .issues
                    .iter()
                    .filter(|issue| issue.is_fatal())
                    .map(ToString::to_string)
                    .collect();
                format!("could not be scored: {}", reasons.join("; "))
            }
        }
    }

    /// Flattened wire view for report consumers.
    pub fn view(&self) -> ReportView {
        match self {
            EvaluationReport::Accepted(report) => ReportView {
                status: "accepted",
                template_id: report.template_id.clone(),
                template_version: report.template_version.clone(),
                response_set_id: report.response_set_id.clone(),
                composite_score: Some(report.composite_score),
                band: Some(report.band.clone()),
                passed: Some(report.passed),
                per_axis_contribution: report.per_axis_contribution.clone(),
                triggered_flags: report.flags.triggered.clone(),
                has_critical: report.flags.has_critical,
                warnings: report.warnings.iter().map(ToString::to_string).collect(),
                issues: Vec::new(),
            },
            EvaluationReport::Rejected(report) => ReportView {
                status: "rejected",
                template_id: report.template_id.clone(),
                template_version: report.template_version.clone(),
                response_set_id: report.response_set_id.clone(),
                composite_score: None,
                band: None,
                passed: None,
                per_axis_contribution: BTreeMap::new(),
                triggered_flags: Vec::new(),
                has_critical: false,
                warnings: report
                    .issues
                    .iter()
                    .filter(|issue| !issue.is_fatal())
                    .map(ToString::to_string)
                    .collect(),
                issues: report.issues.clone(),
            },
        }
    }
}

/// Serialized shape consumed by hosts and persistence collaborators.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportView {
    pub status: &'static str,
    pub template_id: TemplateId,
    pub template_version: TemplateVersion,
    pub response_set_id: ResponseSetId,
    pub composite_score: Option<f64>,
    pub band: Option<String>,
    pub passed: Option<bool>,
    pub per_axis_contribution: BTreeMap<String, f64>,
    pub triggered_flags: Vec<TriggeredFlag>,
    pub has_critical: bool,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<ValidationIssue>,
}
