//! Rainfall-based flood risk classification.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FloodRisk {
    Low,
    Moderate,
    High,
}

impl std::fmt::Display for FloodRisk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Moderate => write!(f, "Moderate"),
            Self::High => write!(f, "High"),
        }
    }
}

/// Strict lower bounds (mm) for each risk level. A reading must exceed the bound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FloodThresholds {
    pub high_now_mm: f64,
    pub high_last_hour_mm: f64,
    pub moderate_now_mm: f64,
    pub moderate_last_hour_mm: f64,
}

impl Default for FloodThresholds {
    fn default() -> Self {
        Self {
            high_now_mm: 10.0,
            high_last_hour_mm: 30.0,
            moderate_now_mm: 5.0,
            moderate_last_hour_mm: 15.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FloodRiskOptions {
    /// Return `None` instead of `Low` when the inputs cannot support a verdict.
    pub allow_null: bool,
    /// Minutes of data behind the last-hour figure, if known.
    pub coverage_minutes: Option<u32>,
    /// Coverage below this gates the estimate. Zero disables gating.
    pub min_coverage_minutes: u32,
    pub thresholds: FloodThresholds,
}

impl FloodRiskOptions {
    pub fn allow_null(mut self) -> Self {
        self.allow_null = true;
        self
    }

    pub fn with_coverage(mut self, minutes: u32) -> Self {
        self.coverage_minutes = Some(minutes);
        self
    }

    pub fn with_min_coverage(mut self, minutes: u32) -> Self {
        self.min_coverage_minutes = minutes;
        self
    }

    pub fn with_thresholds(mut self, thresholds: FloodThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }
}

/// Classifies flood risk from the latest 5-minute rainfall and the
/// last-hour accumulation.
///
/// Low coverage short-circuits to `Low` (or `None` with `allow_null`).
/// Otherwise missing values count as zero, except that both missing with
/// `allow_null` yields `None` ("unknown" rather than "safe").
pub fn estimate_flood_risk(
    rainfall_now: Option<f64>,
    last_hour: Option<f64>,
    opts: &FloodRiskOptions,
) -> Option<FloodRisk> {
    let unknown = if opts.allow_null {
        None
    } else {
        Some(FloodRisk::Low)
    };

    if let Some(coverage) = opts.coverage_minutes {
        if coverage < opts.min_coverage_minutes {
            return unknown;
        }
    }

    let now = rainfall_now.filter(|v| v.is_finite());
    let hour = last_hour.filter(|v| v.is_finite());
    if now.is_none() && hour.is_none() {
        return unknown;
    }

    let now = now.unwrap_or(0.0);
    let hour = hour.unwrap_or(0.0);
    let t = &opts.thresholds;
    if now > t.high_now_mm || hour > t.high_last_hour_mm {
        Some(FloodRisk::High)
    } else if now > t.moderate_now_mm || hour > t.moderate_last_hour_mm {
        Some(FloodRisk::Moderate)
    } else {
        Some(FloodRisk::Low)
    }
}
