use super::error::SimulationError;
use super::types::{Histogram, SummaryStatistics};

pub fn summarize(values: &[f64]) -> Result<SummaryStatistics, SimulationError> {
    if values.is_empty() {
        return Err(SimulationError::EmptyInput);
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    Ok(SummaryStatistics {
        mean,
        median: percentile_sorted(&sorted, 50.0),
        standard_deviation: variance.sqrt(),
        minimum: sorted[0],
        maximum: sorted[sorted.len() - 1],
    })
}

pub fn percentile(values: &[f64], p: f64) -> Result<f64, SimulationError> {
    if values.is_empty() {
        return Err(SimulationError::EmptyInput);
    }
    if !(0.0..=100.0).contains(&p) {
        return Err(SimulationError::invalid("percentile", "must be between 0 and 100"));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    Ok(percentile_sorted(&sorted, p))
}

fn percentile_sorted(values: &[f64], p: f64) -> f64 {
    let n = values.len();
    if n == 1 {
        return values[0];
    }

    let rank = (p / 100.0) * (n as f64 - 1.0);
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;

    if lower == upper {
        values[lower]
    } else {
        let w = rank - lower as f64;
        values[lower] * (1.0 - w) + values[upper] * w
    }
}

pub fn histogram(values: &[f64], bins: usize) -> Result<Histogram, SimulationError> {
    if bins == 0 {
        return Err(SimulationError::invalid("bins", "must be >= 1"));
    }
    if values.is_empty() {
        return Err(SimulationError::EmptyInput);
    }

    let (mut lo, mut hi) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    // Single distinct value: widen so bins have non-zero width.
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }

    let width = (hi - lo) / bins as f64;
    let bin_edges = (0..=bins)
        .map(|i| if i == bins { hi } else { lo + width * i as f64 })
        .collect::<Vec<_>>();

    let mut counts = vec![0_u64; bins];
    for &v in values {
        let idx = (((v - lo) / width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }

    Ok(Histogram { bin_edges, counts })
}
