use assessment_scoring::config::EngineSettings;
use assessment_scoring::error::AppError;
use assessment_scoring::rubric::{
    EvaluationKey, IncompletePolicy, ReportStore, StoreError, StoredReport, Template,
    TemplateCatalog, TemplateId, TemplateStore, UnknownCodePolicy,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

use crate::demo::builtin_templates;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Latest published version of each template, keyed by id.
#[derive(Default, Clone)]
pub(crate) struct InMemoryTemplateStore {
    templates: Arc<Mutex<HashMap<TemplateId, Template>>>,
}

impl InMemoryTemplateStore {
    pub(crate) fn ids(&self) -> Vec<TemplateId> {
        let guard = self.templates.lock().expect("template mutex poisoned");
        let mut ids: Vec<_> = guard.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl TemplateStore for InMemoryTemplateStore {
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
pub(crate) struct InMemoryReportStore {
    reports: Arc<Mutex<HashMap<EvaluationKey, StoredReport>>>,
}

impl InMemoryReportStore {
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.reports.lock().expect("report mutex poisoned").len()
    }
}

impl ReportStore for InMemoryReportStore {
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

/// Templates from an explicit catalog path, else the configured catalog, else the
/// built-in demo set.
pub(crate) fn load_templates(
    path: Option<&Path>,
    settings: &EngineSettings,
) -> Result<Vec<Template>, AppError> {
    match path.or(settings.template_catalog.as_deref()) {
        Some(path) => {
            let templates = TemplateCatalog::from_path(path)?;
            info!(path = %path.display(), count = templates.len(), "loaded template catalog");
            Ok(templates)
        }
        None => Ok(builtin_templates()),
    }
}

pub(crate) fn template_store(
    templates: Vec<Template>,
) -> Result<InMemoryTemplateStore, AppError> {
    let store = InMemoryTemplateStore::default();
    for template in templates {
        store
            .publish(template)
            .map_err(|err| AppError::Scoring(err.into()))?;
    }
    Ok(store)
}

/// Pick a template by id, or the only one when the catalog holds a single template.
pub(crate) fn select_template(
    templates: &[Template],
    id: Option<&str>,
) -> Result<Template, String> {
    match id {
        Some(id) => templates
            .iter()
            .find(|template| template.id.0 == id)
            .cloned()
            .ok_or_else(|| format!("template '{id}' is not in the catalog")),
        None => match templates {
            [only] => Ok(only.clone()),
            [] => Err("the catalog holds no templates".to_string()),
            _ => {
                let ids: Vec<&str> = templates.iter().map(|t| t.id.0.as_str()).collect();
                Err(format!(
                    "catalog holds several templates ({}); pass --template-id",
                    ids.join(", ")
                ))
            }
        },
    }
}

pub(crate) fn parse_incomplete_policy(raw: &str) -> Result<IncompletePolicy, String> {
    IncompletePolicy::parse(raw)
        .ok_or_else(|| format!("'{raw}' is not one of lenient, zero_fill, strict"))
}

pub(crate) fn parse_unknown_codes(raw: &str) -> Result<UnknownCodePolicy, String> {
    UnknownCodePolicy::parse(raw).ok_or_else(|| format!("'{raw}' is not one of reject, warn"))
}
