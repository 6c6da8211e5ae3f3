use serde::{Deserialize, Serialize};

use super::super::normalizer::IssueSeverity;

/// How axes present in the template but absent from the response are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncompletePolicy {
    /// Exclude missing axes and renormalize the remaining weights.
    #[default]
    Lenient,
    /// Score missing axes as 0. Must be chosen explicitly.
    ZeroFill,
    /// Reject the evaluation.
    Strict,
}

impl IncompletePolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "lenient" => Some(Self::Lenient),
            "zero_fill" | "zero" => Some(Self::ZeroFill),
            "strict" => Some(Self::Strict),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            IncompletePolicy::Lenient => "lenient",
            IncompletePolicy::ZeroFill => "zero_fill",
            IncompletePolicy::Strict => "strict",
        }
    }

    pub(crate) fn missing_axis_severity(self) -> IssueSeverity {
        match self {
            IncompletePolicy::Lenient | IncompletePolicy::ZeroFill => IssueSeverity::Warning,
            IncompletePolicy::Strict => IssueSeverity::Fatal,
        }
    }
}

/// Treatment of axis or flag codes the template does not declare.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownCodePolicy {
    #[default]
    Reject,
    /// Record a warning and ignore the code.
    Warn,
}

impl UnknownCodePolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "reject" | "fatal" => Some(Self::Reject),
            "warn" | "warning" => Some(Self::Warn),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            UnknownCodePolicy::Reject => "reject",
            UnknownCodePolicy::Warn => "warn",
        }
    }

    pub(crate) fn severity(self) -> IssueSeverity {
        match self {
            UnknownCodePolicy::Reject => IssueSeverity::Fatal,
            UnknownCodePolicy::Warn => IssueSeverity::Warning,
        }
    }
}

/// Caller-supplied severity policy for one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationPolicy {
    #[serde(default)]
    pub incomplete: IncompletePolicy,
    #[serde(default)]
    pub unknown_codes: UnknownCodePolicy,
    #[serde(default = "default_weight_epsilon")]
    pub weight_epsilon: f64,
}

fn default_weight_epsilon() -> f64 {
    EvaluationPolicy::DEFAULT_WEIGHT_EPSILON
}

impl EvaluationPolicy {
    pub const DEFAULT_WEIGHT_EPSILON: f64 = 0.01;

    /// Weight tolerances are finite and non-negative.
    pub fn accepts_epsilon(value: f64) -> bool {
        value.is_finite() && value >= 0.0
    }

    pub fn is_valid(&self) -> bool {
        Self::accepts_epsilon(self.weight_epsilon)
    }

    pub fn lenient() -> Self {
        Self::default()
    }

    pub fn strict() -> Self {
        Self {
            incomplete: IncompletePolicy::Strict,
            ..Self::default()
        }
    }

    pub fn with_incomplete(mut self, incomplete: IncompletePolicy) -> Self {
        self.incomplete = incomplete;
        self
    }

    pub fn with_unknown_codes(mut self, unknown_codes: UnknownCodePolicy) -> Self {
        self.unknown_codes = unknown_codes;
        self
    }
}

impl Default for EvaluationPolicy {
    fn default() -> Self {
        Self {
            incomplete: IncompletePolicy::Lenient,
            unknown_codes: UnknownCodePolicy::Reject,
            weight_epsilon: Self::DEFAULT_WEIGHT_EPSILON,
        }
    }
}
