use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::rubric::repository::{
    EvaluationKey, ReportStore, StoreError, StoredReport, TemplateStore,
};
use crate::rubric::template::{
    AssessmentDomain, Axis, FlagRule, ScoringConfig, Severity, Template, TemplateId,
    TemplateVersion, ThresholdLadder,
};
use crate::rubric::{scoring_router, EvaluationPolicy, ResponseSet, ScoringService};

pub(super) const LEVELS: [&str; 5] = [
    "No evidence",
    "Limited",
    "Adequate",
    "Strong",
    "Exemplary",
];

pub(super) fn two_axis_template() -> Template {
    Template {
        id: TemplateId("balanced-pair".to_string()),
        version: TemplateVersion("v1".to_string()),
        title: Some("Balanced pair".to_string()),
        domain: AssessmentDomain::JobInterview,
        axes: vec![Axis::new("A", 0.5, LEVELS), Axis::new("B", 0.5, LEVELS)],
        red_flags: Vec::new(),
        critical_omission_flags: Vec::new(),
        scoring_config: ScoringConfig {
            passing_score: 60.0,
            level_thresholds: ThresholdLadder::from_pairs(&[
                ("fail", 0.0),
                ("pass", 60.0),
                ("good", 80.0),
            ]),
        },
    }
}

/// Three-axis bridge scenario with red flags and critical omissions.
pub(super) fn bridge_template() -> Template {
    Template {
        id: TemplateId("bridge-watch".to_string()),
        version: TemplateVersion("2024-05".to_string()),
        title: Some("Bridge watch under heavy weather".to_string()),
        domain: AssessmentDomain::MaritimeScenario,
        axes: vec![
            Axis::new("situational_awareness", 0.4, LEVELS).with_label("Situational awareness"),
            Axis::new("decision_making", 0.35, LEVELS).with_label("Decision making"),
            Axis::new("communication", 0.25, LEVELS).with_label("Communication"),
        ],
        red_flags: vec![
            FlagRule::new(
                "ignored_storm_warning",
                Severity::Critical,
                "Continues passage plan after a storm warning",
            ),
            FlagRule::new("no_lookout", Severity::Major, "No lookout posted"),
            FlagRule::new("late_report", Severity::Medium, "Reports to master late"),
        ],
        critical_omission_flags: vec![
            FlagRule::new("no_log_entry", Severity::Medium, "Does not log the decision"),
            FlagRule::new("no_crew_brief", Severity::Critical, "Crew never briefed"),
        ],
        scoring_config: ScoringConfig {
            passing_score: 65.0,
            level_thresholds: ThresholdLadder::from_pairs(&[
                ("unsafe", 0.0),
                ("developing", 50.0),
                ("competent", 65.0),
                ("exemplary", 85.0),
            ]),
        },
    }
}

pub(super) fn responses(id: &str, template: &Template) -> ResponseSet {
    ResponseSet::new(id, template.id.clone())
}

pub(super) fn complete_bridge_responses(id: &str) -> ResponseSet {
    responses(id, &bridge_template())
        .with_level("situational_awareness", 4)
        .with_level("decision_making", 4)
        .with_raw("communication", 70.0)
}

#[derive(Default, Clone)]
pub(super) struct MemoryTemplates {
    templates: Arc<Mutex<HashMap<TemplateId, Template>>>,
}

impl MemoryTemplates {
    pub(super) fn with(templates: impl IntoIterator<Item = Template>) -> Self {
        let store = Self::default();
        for template in templates {
            store.publish(template).expect("publish fixture");
        }
        store
    }
}

impl TemplateStore for MemoryTemplates {
    fn fetch(&self, id: &TemplateId) -> Result<Option<Template>, StoreError> {
        let guard = self.templates.lock().expect("template mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn publish(&self, template: Template) -> Result<(), StoreError> {
        let mut guard = self.templates.lock().expect("template mutex poisoned");
        if let Some(existing) = guard.get(&template.id) {
            if existing.version == template.version {
                return Err(StoreError::Conflict);
            }
        }
        guard.insert(template.id.clone(), template);
        Ok(())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryReports {
    pub(super) reports: Arc<Mutex<HashMap<EvaluationKey, StoredReport>>>,
}

impl MemoryReports {
    pub(super) fn len(&self) -> usize {
        self.reports.lock().expect("report mutex poisoned").len()
    }
}

impl ReportStore for MemoryReports {
    fn fetch(&self, key: &EvaluationKey) -> Result<Option<StoredReport>, StoreError> {
        let guard = self.reports.lock().expect("report mutex poisoned");
        Ok(guard.get(key).cloned())
    }

    fn insert(&self, report: StoredReport) -> Result<StoredReport, StoreError> {
        let mut guard = self.reports.lock().expect("report mutex poisoned");
        if guard.contains_key(&report.key) {
            return Err(StoreError::Conflict);
        }
        guard.insert(report.key.clone(), report.clone());
        Ok(report)
    }
}

/// Store that only ever reports an outage.
pub(super) struct UnavailableReports;

impl ReportStore for UnavailableReports {
    fn fetch(&self, _key: &EvaluationKey) -> Result<Option<StoredReport>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn insert(&self, _report: StoredReport) -> Result<StoredReport, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

/// Store whose inserts always lose the race to a concurrent writer.
#[derive(Default)]
pub(super) struct RacingReports {
    pub(super) winner: Mutex<Option<StoredReport>>,
}

impl ReportStore for RacingReports {
    fn fetch(&self, _key: &EvaluationKey) -> Result<Option<StoredReport>, StoreError> {
        Ok(self.winner.lock().expect("winner mutex poisoned").clone())
    }

    fn insert(&self, report: StoredReport) -> Result<StoredReport, StoreError> {
        *self.winner.lock().expect("winner mutex poisoned") = Some(report);
        Err(StoreError::Conflict)
    }
}

pub(super) fn build_service() -> (
    ScoringService<MemoryTemplates, MemoryReports>,
    Arc<MemoryReports>,
) {
    let templates = Arc::new(MemoryTemplates::with([
        two_axis_template(),
        bridge_template(),
    ]));
    let reports = Arc::new(MemoryReports::default());
    let service = ScoringService::new(templates, reports.clone(), EvaluationPolicy::default());
    (service, reports)
}

pub(super) fn router_with_service(
    service: ScoringService<MemoryTemplates, MemoryReports>,
) -> axum::Router {
    scoring_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
