//! Weighted rubric evaluation for assessment templates.
//!
//! Templates describe weighted axes, rubric levels, flag rules and a band ladder; response
//! sets carry per-axis scores and asserted flags. The [`rubric`] module validates both,
//! computes the composite, classifies it and assembles an immutable report.

pub mod config;
pub mod error;
pub mod rubric;
pub mod telemetry;
