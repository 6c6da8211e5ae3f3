use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use super::evaluation::{evaluate, EvaluationEngine, EvaluationPolicy};
use super::normalizer::{validate_template, ValidationResult};
use super::repository::{EvaluationKey, ReportStore, StoreError, StoredReport, TemplateStore};
use super::response::ResponseSet;
use super::template::{Template, TemplateId};

/// Service composing the template store, report store and evaluation engine.
pub struct ScoringService<T, R> {
    templates: Arc<T>,
    reports: Arc<R>,
    engine: Arc<EvaluationEngine>,
}

impl<T, R> ScoringService<T, R>
where
    T: TemplateStore + 'static,
    R: ReportStore + 'static,
{
    pub fn new(templates: Arc<T>, reports: Arc<R>, policy: EvaluationPolicy) -> Self {
        Self {
            templates,
            reports,
            engine: Arc::new(EvaluationEngine::new(policy)),
        }
    }

    pub fn policy(&self) -> &EvaluationPolicy {
        self.engine.policy()
    }

    /// Score a response set under the service's default policy.
    pub fn evaluate(&self, responses: &ResponseSet) -> Result<StoredReport, ScoringServiceError> {
        let policy = *self.engine.policy();
        self.evaluate_with(responses, &policy)
    }

    /// Score a response set under an explicit policy, reusing a cached report when the
    /// same template version, response set and policy were already evaluated.
    pub fn evaluate_with(
        &self,
        responses: &ResponseSet,
        policy: &EvaluationPolicy,
    ) -> Result<StoredReport, ScoringServiceError> {
        if !policy.is_valid() {
            return Err(ScoringServiceError::InvalidPolicy {
                weight_epsilon: policy.weight_epsilon,
            });
        }
        let template = self.template(&responses.template_id)?;
        let key = EvaluationKey::derive(&template, responses, policy);

        if let Some(cached) = self.reports.fetch(&key)? {
            debug!(
                template = %key.template_id,
                response_set = %responses.id,
                "returning cached evaluation report"
            );
            return Ok(cached);
        }

        let report = evaluate(&template, responses, policy);
        let stored = StoredReport {
            key,
            report,
            stored_at: Utc::now(),
        };

        match self.reports.insert(stored.clone()) {
            Ok(stored) => Ok(stored),
            // A concurrent caller stored the identical report first.
            Err(StoreError::Conflict) => match self.reports.fetch(&stored.key)? {
                Some(existing) => Ok(existing),
                None => Err(ScoringServiceError::Store(StoreError::Conflict)),
            },
            Err(other) => Err(other.into()),
        }
    }

    /// Validate a stored template under the service's policy.
    pub fn validate(&self, id: &TemplateId) -> Result<ValidationResult, ScoringServiceError> {
        let template = self.template(id)?;
        Ok(validate_template(&template, self.engine.policy()))
    }

    pub fn template(&self, id: &TemplateId) -> Result<Template, ScoringServiceError> {
        self.templates
            .fetch(id)?
            .ok_or_else(|| ScoringServiceError::TemplateNotFound(id.clone()))
    }

    /// Fetch a previously stored report.
    pub fn report(&self, key: &EvaluationKey) -> Result<StoredReport, ScoringServiceError> {
        self.reports
            .fetch(key)?
            .ok_or(ScoringServiceError::Store(StoreError::NotFound))
    }
}

/// Error raised by the scoring service.
#[derive(Debug, thiserror::Error)]
pub enum ScoringServiceError {
    #[error("template '{0}' not found")]
    TemplateNotFound(TemplateId),
    #[error("weight epsilon must be a non-negative number (found {weight_epsilon})")]
    InvalidPolicy { weight_epsilon: f64 },
    #[error(transparent)]
    Store(#[from] StoreError),
}
