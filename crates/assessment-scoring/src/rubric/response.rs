use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::template::{TemplateId, MAX_RUBRIC_LEVEL, MIN_RUBRIC_LEVEL};

/// Identifier of the evaluation instance that owns a response set.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResponseSetId(pub String);

impl fmt::Display for ResponseSetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Score captured for one axis: a raw 0–100 value or a 1–5 rubric level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisScore {
    Raw(f64),
    /// Kept wide so out-of-scale levels reach validation instead of failing to parse.
    Level(i64),
}

impl AxisScore {
    pub fn in_range(self) -> bool {
        match self {
            AxisScore::Raw(value) => value.is_finite() && (0.0..=100.0).contains(&value),
            AxisScore::Level(level) => {
                (i64::from(MIN_RUBRIC_LEVEL)..=i64::from(MAX_RUBRIC_LEVEL)).contains(&level)
            }
        }
    }

    /// Score on the 0–100 scale; rubric levels map linearly via `(level - 1) / 4 * 100`.
    pub fn normalized(self) -> f64 {
        match self {
            AxisScore::Raw(value) => value,
            AxisScore::Level(level) => {
                let span = f64::from(MAX_RUBRIC_LEVEL - MIN_RUBRIC_LEVEL);
                (level - i64::from(MIN_RUBRIC_LEVEL)) as f64 / span * 100.0
            }
        }
    }
}

impl fmt::Display for AxisScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisScore::Raw(value) => write!(f, "{value}"),
            AxisScore::Level(level) => write!(f, "level {level}"),
        }
    }
}

/// Scores and asserted flags collected for one assessment instance.
///
/// A submitted set is never edited; re-scoring takes a new set with a new id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSet {
    pub id: ResponseSetId,
    pub template_id: TemplateId,
    #[serde(default)]
    pub axis_scores: BTreeMap<String, AxisScore>,
    #[serde(default)]
    pub asserted_flags: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CanonicalResponseSet<'a> {
    id: &'a ResponseSetId,
    template_id: &'a TemplateId,
    axis_scores: &'a BTreeMap<String, AxisScore>,
    asserted_flags: BTreeSet<&'a str>,
}

impl ResponseSet {
    pub fn new(id: impl Into<String>, template_id: TemplateId) -> Self {
        Self {
            id: ResponseSetId(id.into()),
            template_id,
            axis_scores: BTreeMap::new(),
            asserted_flags: Vec::new(),
        }
    }

    pub fn with_level(mut self, axis: impl Into<String>, level: i64) -> Self {
        self.axis_scores.insert(axis.into(), AxisScore::Level(level));
        self
    }

    pub fn with_raw(mut self, axis: impl Into<String>, score: f64) -> Self {
        self.axis_scores.insert(axis.into(), AxisScore::Raw(score));
        self
    }

    pub fn with_flag(mut self, code: impl Into<String>) -> Self {
        self.asserted_flags.push(code.into());
        self
    }

    /// Canonical JSON of the set: flag order and duplicates do not change the result.
    pub fn canonical_json(&self) -> Vec<u8> {
        let canonical = CanonicalResponseSet {
            id: &self.id,
            template_id: &self.template_id,
            axis_scores: &self.axis_scores,
            asserted_flags: self.asserted_flags.iter().map(String::as_str).collect(),
        };
        // Strings, string-keyed maps and floats always encode; non-finite floats become null.
        serde_json::to_vec(&canonical).unwrap_or_default()
    }

    /// SHA-256 hex digest of [`ResponseSet::canonical_json`].
    pub fn fingerprint(&self) -> String {
        hex::encode(Sha256::digest(self.canonical_json()))
    }
}
