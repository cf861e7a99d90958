use serde::Serialize;

use super::error::SimulationError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationParameters {
    pub mean_return: f64,
    pub volatility: f64,
    pub starting_wealth: f64,
    pub periods: usize,
    pub trial_count: usize,
}

impl SimulationParameters {
    // Counts are truncated toward zero: 12.9 months runs 12.
    pub fn new(
        mean_return: f64,
        volatility: f64,
        starting_wealth: f64,
        periods: f64,
        trial_count: f64,
    ) -> Result<Self, SimulationError> {
        let params = Self {
            mean_return,
            volatility,
            starting_wealth,
            periods: truncate_count("periods", periods, 0.0)?,
            trial_count: truncate_count("trial_count", trial_count, 1.0)?,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), SimulationError> {
        if !self.mean_return.is_finite() {
            return Err(SimulationError::invalid("mean_return", "must be finite"));
        }
        if !self.volatility.is_finite() || self.volatility < 0.0 {
            return Err(SimulationError::invalid(
                "volatility",
                "must be finite and >= 0",
            ));
        }
        if !self.starting_wealth.is_finite() || self.starting_wealth <= 0.0 {
            return Err(SimulationError::invalid(
                "starting_wealth",
                "must be finite and > 0",
            ));
        }
        if self.trial_count < 1 {
            return Err(SimulationError::invalid("trial_count", "must be >= 1"));
        }
        Ok(())
    }
}

fn truncate_count(name: &'static str, value: f64, min: f64) -> Result<usize, SimulationError> {
    if !value.is_finite() {
        return Err(SimulationError::invalid(name, "must be finite"));
    }
    let truncated = value.trunc();
    if truncated < min {
        let reason = if min > 0.0 { "must be >= 1" } else { "must be >= 0" };
        return Err(SimulationError::invalid(name, reason));
    }
    if truncated > usize::MAX as f64 {
        return Err(SimulationError::invalid(name, "is too large"));
    }
    Ok(truncated as usize)
}

pub type WealthPath = Vec<f64>;

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    pub final_wealths: Vec<f64>,
    pub sample_path: WealthPath,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStatistics {
    pub mean: f64,
    pub median: f64,
    pub standard_deviation: f64,
    pub minimum: f64,
    pub maximum: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Histogram {
    pub bin_edges: Vec<f64>,
    pub counts: Vec<u64>,
}
