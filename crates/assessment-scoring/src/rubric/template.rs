use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Opaque identifier of a published template.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TemplateId(pub String);

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque version label; a published `(id, version)` pair never changes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TemplateVersion(pub String);

impl fmt::Display for TemplateVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Assessment family a template was authored for. Display only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentDomain {
    JobInterview,
    MaritimeScenario,
    RetailInterview,
    CultureSurvey,
    #[default]
    Other,
}

impl AssessmentDomain {
    pub const fn label(self) -> &'static str {
        match self {
            AssessmentDomain::JobInterview => "job_interview",
            AssessmentDomain::MaritimeScenario => "maritime_scenario",
            AssessmentDomain::RetailInterview => "retail_interview",
            AssessmentDomain::CultureSurvey => "culture_survey",
            AssessmentDomain::Other => "other",
        }
    }
}

/// Lowest and highest rubric level an axis defines.
pub const MIN_RUBRIC_LEVEL: u8 = 1;
pub const MAX_RUBRIC_LEVEL: u8 = 5;

/// Weighted dimension of an assessment with its 1–5 rubric descriptors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Axis {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub weight: f64,
    #[serde(default)]
    pub rubric_levels: BTreeMap<u8, String>,
}

impl Axis {
    pub fn new(code: impl Into<String>, weight: f64, levels: [&str; 5]) -> Self {
        let rubric_levels = (MIN_RUBRIC_LEVEL..=MAX_RUBRIC_LEVEL)
            .zip(levels)
            .map(|(level, description)| (level, description.to_string()))
            .collect();

        Self {
            code: code.into(),
            label: None,
            weight,
            rubric_levels,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn descriptor(&self, level: u8) -> Option<&str> {
        self.rubric_levels.get(&level).map(String::as_str)
    }
}

/// Flag severity with a total order: `Low < Medium < Major < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    Major,
    Critical,
}

impl Severity {
    pub const fn label(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::Major => "major",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "major" | "high" => Ok(Severity::Major),
            "critical" => Ok(Severity::Critical),
            other => Err(format!("unknown severity '{other}'")),
        }
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// Whether a flag records a bad behavior or a missing expected one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FlagKind {
    RedFlag,
    CriticalOmission,
}

impl FlagKind {
    pub const fn label(self) -> &'static str {
        match self {
            FlagKind::RedFlag => "redFlag",
            FlagKind::CriticalOmission => "criticalOmission",
        }
    }
}

/// Human-authored flag rule. The trigger text is never interpreted by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagRule {
    pub code: String,
    pub severity: Severity,
    #[serde(default)]
    pub trigger_description: String,
}

impl FlagRule {
    pub fn new(code: impl Into<String>, severity: Severity, trigger: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            severity,
            trigger_description: trigger.into(),
        }
    }
}

/// Flag rule resolved against the template it was declared in.
#[derive(Debug, Clone, Copy)]
pub struct DeclaredFlag<'a> {
    pub rule: &'a FlagRule,
    pub kind: FlagKind,
    /// Position across red flags followed by critical omissions.
    pub position: usize,
}

/// Named band and the minimum composite score that enters it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BandThreshold {
    pub name: String,
    pub min_score: f64,
}

/// Band ladder in authoring order. Serialized as a JSON object whose key order is kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThresholdLadder(Vec<BandThreshold>);

impl ThresholdLadder {
    pub fn new(bands: Vec<BandThreshold>) -> Self {
        Self(bands)
    }

    pub fn from_pairs(pairs: &[(&str, f64)]) -> Self {
        Self(
            pairs
                .iter()
                .map(|(name, min_score)| BandThreshold {
                    name: (*name).to_string(),
                    min_score: *min_score,
                })
                .collect(),
        )
    }

    pub fn bands(&self) -> &[BandThreshold] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn lowest(&self) -> Option<&BandThreshold> {
        self.0
            .iter()
            .min_by(|left, right| left.min_score.total_cmp(&right.min_score))
    }
}

impl Serialize for ThresholdLadder {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for band in &self.0 {
            map.serialize_entry(&band.name, &band.min_score)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ThresholdLadder {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct LadderVisitor;

        impl<'de> Visitor<'de> for LadderVisitor {
            type Value = ThresholdLadder;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object of band name to minimum score, or a list of bands")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut bands = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, min_score)) = access.next_entry::<String, f64>()? {
                    bands.push(BandThreshold { name, min_score });
                }
                Ok(ThresholdLadder(bands))
            }

            fn visit_seq<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut bands = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some(band) = access.next_element::<BandThreshold>()? {
                    bands.push(band);
                }
                Ok(ThresholdLadder(bands))
            }
        }

        deserializer.deserialize_any(LadderVisitor)
    }
}

/// Pass gate and band ladder; the two are authored independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringConfig {
    pub passing_score: f64,
    pub level_thresholds: ThresholdLadder,
}

/// Immutable description of what an assessment evaluates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: TemplateId,
    pub version: TemplateVersion,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub domain: AssessmentDomain,
    pub axes: Vec<Axis>,
    #[serde(default)]
    pub red_flags: Vec<FlagRule>,
    #[serde(default)]
    pub critical_omission_flags: Vec<FlagRule>,
    pub scoring_config: ScoringConfig,
}

impl Template {
    pub fn axis(&self, code: &str) -> Option<&Axis> {
        self.axes.iter().find(|axis| axis.code == code)
    }

    /// Red flags then critical omissions, in declaration order.
    pub fn declared_flags(&self) -> impl Iterator<Item = DeclaredFlag<'_>> {
        let red = self
            .red_flags
            .iter()
            .map(|rule| (rule, FlagKind::RedFlag));
        let omissions = self
            .critical_omission_flags
            .iter()
            .map(|rule| (rule, FlagKind::CriticalOmission));

        red.chain(omissions)
            .enumerate()
            .map(|(position, (rule, kind))| DeclaredFlag {
                rule,
                kind,
                position,
            })
    }

    pub fn flag(&self, code: &str) -> Option<DeclaredFlag<'_>> {
        self.declared_flags().find(|flag| flag.rule.code == code)
    }

    pub fn weight_sum(&self) -> f64 {
        self.axes.iter().map(|axis| axis.weight).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_parses_aliases_case_insensitively() {
        assert_eq!("HIGH".parse::<Severity>(), Ok(Severity::Major));
        assert_eq!(" Critical ".parse::<Severity>(), Ok(Severity::Critical));
        assert!("urgent".parse::<Severity>().is_err());
        assert!(Severity::Critical > Severity::Major);
        assert!(Severity::Medium > Severity::Low);
    }

    #[test]
    fn ladder_keeps_document_order() {
        let ladder: ThresholdLadder =
            serde_json::from_str(r#"{"good": 80, "fail": 0, "pass": 60}"#).expect("ladder");
        let names: Vec<_> = ladder.bands().iter().map(|band| band.name.as_str()).collect();
        assert_eq!(names, vec!["good", "fail", "pass"]);
        assert_eq!(ladder.lowest().map(|band| band.name.as_str()), Some("fail"));

        let encoded = serde_json::to_string(&ladder).expect("encode");
        assert_eq!(encoded, r#"{"good":80.0,"fail":0.0,"pass":60.0}"#);
    }

    #[test]
    fn ladder_accepts_band_list() {
        let ladder: ThresholdLadder = serde_json::from_str(
            r#"[{"name": "developing", "minScore": 0}, {"name": "proficient", "minScore": 70}]"#,
        )
        .expect("ladder");
        assert_eq!(ladder.len(), 2);
        assert_eq!(ladder.bands()[1].min_score, 70.0);
    }

    #[test]
    fn declared_flags_number_red_flags_before_omissions() {
        let template = Template {
            id: TemplateId("t".to_string()),
            version: TemplateVersion("1".to_string()),
            title: None,
            domain: AssessmentDomain::MaritimeScenario,
            axes: Vec::new(),
            red_flags: vec![FlagRule::new("rf", Severity::Low, "")],
            critical_omission_flags: vec![FlagRule::new("co", Severity::Critical, "")],
            scoring_config: ScoringConfig {
                passing_score: 0.0,
                level_thresholds: ThresholdLadder::default(),
            },
        };

        let omission = template.flag("co").expect("declared");
        assert_eq!(omission.kind, FlagKind::CriticalOmission);
        assert_eq!(omission.position, 1);
        assert!(template.flag("missing").is_none());
    }
}
