use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::super::response::ResponseSet;
use super::super::template::Template;
use super::config::IncompletePolicy;

/// Weighted composite before classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeResult {
    /// Rounded to cents, half to even.
    pub raw_composite: f64,
    /// Points each included axis adds to the composite, rounded to cents.
    pub per_axis_contribution: BTreeMap<String, f64>,
    /// Sum of the template weights of the included axes, before renormalization.
    pub weight_sum_used: f64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AggregationError {
    #[error("axes not scored under strict policy: {}", .0.join(", "))]
    IncompleteResponse(Vec<String>),
    #[error("no template axis was scored")]
    NoScoredAxes,
    #[error("axis '{0}' score is out of range")]
    ScoreOutOfRange(String),
}

/// Round to two decimals, ties to even, so results are reproducible across platforms.
///
/// Ties are decided on the shortest decimal form of `value` rather than its binary
/// expansion, so `1.015` and `2.675` both round to the even cent.
pub fn round_to_cents(value: f64) -> f64 {
    if !value.is_finite() || value == 0.0 {
        return value;
    }

    let text = format!("{:e}", value.abs());
    let Some((mantissa, exponent)) = text.split_once('e') else {
        return value;
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return value;
    };
    let digits: Vec<u8> = mantissa
        .bytes()
        .filter(u8::is_ascii_digit)
        .map(|digit| digit - b'0')
        .collect();

    // Digits at or above the hundredths place.
    let kept = exponent + 3;
    if kept >= digits.len() as i32 {
        return value;
    }
    if kept < 0 {
        return 0.0_f64.copysign(value);
    }

    let (whole, rest) = digits.split_at(kept as usize);
    let mut cents = whole
        .iter()
        .fold(0_u64, |acc, digit| acc * 10 + u64::from(*digit));
    let round_up = match rest.first().copied() {
        Some(digit) if digit > 5 => true,
        Some(5) => rest[1..].iter().any(|digit| *digit != 0) || cents % 2 == 1,
        _ => false,
    };
    if round_up {
        cents += 1;
    }
    (cents as f64 / 100.0).copysign(value)
}

/// Weighted average of the scored axes on a 0–100 scale.
///
/// Axes the template does not declare are ignored; missing axes are handled per `incomplete`.
pub fn aggregate(
    template: &Template,
    responses: &ResponseSet,
    incomplete: IncompletePolicy,
) -> Result<CompositeResult, AggregationError> {
    let mut included = Vec::with_capacity(template.axes.len());
    let mut missing = Vec::new();

    for axis in &template.axes {
        match responses.axis_scores.get(&axis.code) {
            Some(score) if !score.in_range() => {
                return Err(AggregationError::ScoreOutOfRange(axis.code.clone()));
            }
            Some(score) => included.push((axis, score.normalized())),
            None => match incomplete {
                IncompletePolicy::Lenient => {}
                IncompletePolicy::ZeroFill => included.push((axis, 0.0)),
                IncompletePolicy::Strict => missing.push(axis.code.clone()),
            },
        }
    }

    if !missing.is_empty() {
        return Err(AggregationError::IncompleteResponse(missing));
    }

    let weight_sum_used: f64 = included.iter().map(|(axis, _)| axis.weight).sum();
    let scored = included
        .iter()
        .any(|(axis, _)| responses.axis_scores.contains_key(&axis.code));
    if !scored || weight_sum_used <= 0.0 {
        return Err(AggregationError::NoScoredAxes);
    }

    let mut composite = 0.0;
    let mut per_axis_contribution = BTreeMap::new();
    for (axis, score) in included {
        let contribution = axis.weight / weight_sum_used * score;
        composite += contribution;
        per_axis_contribution.insert(axis.code.clone(), round_to_cents(contribution));
    }

    Ok(CompositeResult {
        raw_composite: round_to_cents(composite.clamp(0.0, 100.0)),
        per_axis_contribution,
        weight_sum_used,
    })
}
