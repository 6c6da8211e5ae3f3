use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use assessment_scoring::rubric::{
    EvaluationKey, EvaluationPolicy, ReportStore, ResponseSet, ResponseSetImporter,
    ScoringService, Severity, StoreError, StoredReport, Template, TemplateCatalog, TemplateId,
    TemplateStore,
};

#[derive(Default)]
struct Templates(Mutex<HashMap<TemplateId, Template>>);

impl TemplateStore for Templates {
    fn fetch(&self, id: &TemplateId) -> Result<Option<Template>, StoreError> {
        Ok(self.0.lock().expect("templates").get(id).cloned())
    }

    fn publish(&self, template: Template) -> Result<(), StoreError> {
        self.0
            .lock()
            .expect("templates")
            .insert(template.id.clone(), template);
        Ok(())
    }
}

#[derive(Default)]
struct Reports(Mutex<HashMap<EvaluationKey, StoredReport>>);

impl ReportStore for Reports {
    fn fetch(&self, key: &EvaluationKey) -> Result<Option<StoredReport>, StoreError> {
        Ok(self.0.lock().expect("reports").get(key).cloned())
    }

    fn insert(&self, report: StoredReport) -> Result<StoredReport, StoreError> {
        let mut guard = self.0.lock().expect("reports");
        if guard.contains_key(&report.key) {
            return Err(StoreError::Conflict);
        }
        guard.insert(report.key.clone(), report.clone());
        Ok(report)
    }
}

fn demo_service() -> ScoringService<Templates, Reports> {
    let data = include_bytes!("../../../demos/templates.json");
    let templates = TemplateCatalog::from_reader(&data[..]).expect("demo catalog parses");
    let store = Templates::default();
    for template in templates {
        store.publish(template).expect("publish");
    }
    ScoringService::new(
        Arc::new(store),
        Arc::new(Reports::default()),
        EvaluationPolicy::default(),
    )
}

#[test]
fn demo_templates_are_valid() {
    let service = demo_service();
    for id in ["bridge-watch", "barista-interview"] {
        let result = service
            .validate(&TemplateId(id.to_string()))
            .expect("template published");
        assert!(result.is_empty(), "{id}: {:?}", result.issues);
    }
}

#[test]
fn batch_export_scores_every_officer() {
    let service = demo_service();
    let data = include_bytes!("../../../demos/bridge-watch.responses.csv");
    let sets = ResponseSetImporter::from_reader(&data[..], &TemplateId("bridge-watch".into()))
        .expect("batch imports");
    assert_eq!(sets.len(), 4);

    let reports: Vec<_> = sets
        .iter()
        .map(|set| service.evaluate(set).expect("evaluation").report)
        .collect();

    let outcomes: Vec<_> = reports
        .iter()
        .map(|report| {
            let accepted = report.accepted().expect("accepted");
            (
                accepted.response_set_id.0.as_str(),
                accepted.composite_score,
                accepted.band.as_str(),
                accepted.passed,
                accepted.flags.has_critical,
            )
        })
        .collect();

    assert_eq!(
        outcomes,
        vec![
            ("officer-001", 73.75, "competent", true, false),
            ("officer-002", 91.25, "exemplary", true, false),
            ("officer-003", 34.33, "unsafe", false, true),
            ("officer-004", 50.0, "developing", false, true),
        ]
    );

    let partial = reports[2].accepted().expect("accepted");
    assert_eq!(partial.flags.triggered[0].code, "no_crew_brief");
    assert_eq!(partial.flags.triggered[1].severity, Severity::Major);
    assert_eq!(partial.warnings.len(), 1);
}

#[test]
fn json_response_matches_csv_row() {
    let service = demo_service();
    let set: ResponseSet =
        serde_json::from_slice(include_bytes!("../../../demos/officer-002.json"))
            .expect("response json");

    let stored = service.evaluate(&set).expect("evaluation");
    assert_eq!(stored.report.composite_score(), Some(91.25));
    assert_eq!(
        stored.report.summary(),
        "scored 91.25 (exemplary), passed, 1 flag(s)"
    );
}
