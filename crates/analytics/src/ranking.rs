use serde::{Deserialize, Serialize};

/// Whether a larger raw value of a metric is preferable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricDirection {
    HigherIsBetter,
    /// Values are negated before rescaling (volatility, drawdown magnitude).
    LowerIsBetter,
}

/// Rescales values linearly onto `[0, 1]`, min to 0 and max to 1.
///
/// If every value is equal the result is all ones.
pub fn normalize_minmax(values: &[f64]) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min == max {
        return vec![1.0; values.len()];
    }
    values.iter().map(|v| (v - min) / (max - min)).collect()
}

/// [`normalize_minmax`] over the defined values only; undefined stays undefined.
pub fn normalize_minmax_defined(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let defined: Vec<f64> = values.iter().flatten().copied().collect();
    let mut rescaled = normalize_minmax(&defined).into_iter();
    values
        .iter()
        .map(|v| v.and_then(|_| rescaled.next()))
        .collect()
}

/// Scores a metric across instruments so that 1 always means "best".
pub fn score(values: &[Option<f64>], direction: MetricDirection) -> Vec<Option<f64>> {
    match direction {
        MetricDirection::HigherIsBetter => normalize_minmax_defined(values),
        MetricDirection::LowerIsBetter => {
            let inverted: Vec<Option<f64>> = values.iter().map(|v| v.map(|v| -v)).collect();
            normalize_minmax_defined(&inverted)
        }
    }
}
