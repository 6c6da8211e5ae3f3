use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::evaluation::EvaluationPolicy;
use super::report::EvaluationReport;
use super::response::ResponseSet;
use super::template::{Template, TemplateId, TemplateVersion};

/// Cache identity of a report: template snapshot plus a digest of the scored input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationKey {
    pub template_id: TemplateId,
    pub template_version: TemplateVersion,
    /// SHA-256 over the canonical response set and the policy it was scored under.
    pub input_fingerprint: String,
}

impl EvaluationKey {
    pub fn derive(template: &Template, responses: &ResponseSet, policy: &EvaluationPolicy) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(responses.canonical_json());
        hasher.update(b"\n");
        hasher.update(serde_json::to_vec(policy).unwrap_or_default());

        Self {
            template_id: template.id.clone(),
            template_version: template.version.clone(),
            input_fingerprint: hex::encode(hasher.finalize()),
        }
    }
}

/// Persisted report with its cache key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredReport {
    pub key: EvaluationKey,
    pub report: EvaluationReport,
    pub stored_at: DateTime<Utc>,
}

/// Read side of the versioned template store the host maintains.
pub trait TemplateStore: Send + Sync {
    /// Current published version of a template.
    fn fetch(&self, id: &TemplateId) -> Result<Option<Template>, StoreError>;
    /// Publish a new version; re-publishing an existing `(id, version)` is a conflict.
    fn publish(&self, template: Template) -> Result<(), StoreError>;
}

/// Report persistence; reports are written once and never updated.
pub trait ReportStore: Send + Sync {
    fn fetch(&self, key: &EvaluationKey) -> Result<Option<StoredReport>, StoreError>;
    fn insert(&self, report: StoredReport) -> Result<StoredReport, StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
