use serde::{Deserialize, Serialize};

use super::super::template::ScoringConfig;

/// Named performance band plus the independent pass verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Band {
    pub name: String,
    pub passed: bool,
}

/// Map a composite score onto the template's ladder.
///
/// Bands are `[min, next.min)`; a boundary score belongs to the higher band. Scores below
/// the lowest minimum fall into the lowest band. `passed` compares against the passing
/// score only and is never reconciled with the band.
pub fn classify(config: &ScoringConfig, composite: f64) -> Band {
    let bands = config.level_thresholds.bands();
    let name = bands
        .iter()
        .rev()
        .find(|band| band.min_score <= composite)
        .or_else(|| config.level_thresholds.lowest())
        .map(|band| band.name.clone())
        .unwrap_or_default();

    Band {
        name,
        passed: composite >= config.passing_score,
    }
}
