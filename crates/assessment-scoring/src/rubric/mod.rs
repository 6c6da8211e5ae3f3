//! Rubric templates, response sets and the evaluation pipeline.
//!
//! Templates and response sets are validated by the [`normalizer`], scored by the
//! [`evaluation`] engine and persisted as immutable [`report::EvaluationReport`]s through the
//! [`service`]. Loading from files is handled by [`catalog`] (templates) and [`import`]
//! (batch response exports).

pub mod catalog;
pub mod evaluation;
pub mod import;
pub mod normalizer;
pub mod report;
pub mod repository;
pub mod response;
pub mod router;
pub mod service;
pub mod template;

#[cfg(test)]
mod tests;

pub use catalog::{CatalogError, TemplateCatalog};
pub use evaluation::{
    aggregate, classify, evaluate, evaluate_flags, round_to_cents, AggregationError, Band,
    CompositeResult, EvaluationEngine, EvaluationPolicy, FlagReport, IncompletePolicy,
    TriggeredFlag, UnknownCodePolicy,
};
pub use import::{ImportError, ResponseSetImporter};
pub use normalizer::{
    validate_responses, validate_template, IssueKind, IssueSeverity, ValidationIssue,
    ValidationResult,
};
pub use report::{AcceptedReport, EvaluationReport, RejectedReport, ReportView};
pub use repository::{EvaluationKey, ReportStore, StoreError, StoredReport, TemplateStore};
pub use response::{AxisScore, ResponseSet, ResponseSetId};
pub use router::{scoring_router, EvaluationRequest, EvaluationResponse, ValidationResponse};
pub use service::{ScoringService, ScoringServiceError};
pub use template::{
    AssessmentDomain, Axis, BandThreshold, FlagKind, FlagRule, ScoringConfig, Severity, Template,
    TemplateId, TemplateVersion, ThresholdLadder,
};
