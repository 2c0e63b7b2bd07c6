//! Trailing-window estimators shared by the metrics.
//!
//! A window is a count of observations. The output is index-aligned with the
//! input: position `i` summarizes `values[i + 1 - window..=i]` and is `None`
//! when that range is incomplete or contains an undefined value.

/// Standard deviations at or below this are treated as zero.
pub(crate) const EPSILON: f64 = 1e-12;

/// Applies `f` to every full trailing window of defined values.
pub fn rolling_apply<F>(values: &[Option<f64>], window: usize, f: F) -> Vec<Option<f64>>
where
    F: Fn(&[f64]) -> Option<f64>,
{
    if window == 0 {
        return vec![None; values.len()];
    }

    let mut buffer = Vec::with_capacity(window);
    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                return None;
            }
            buffer.clear();
            for value in &values[i + 1 - window..=i] {
                buffer.push((*value)?);
            }
            f(&buffer).filter(|v| v.is_finite())
        })
        .collect()
}

/// Applies `f` to every full trailing window of paired values.
///
/// The output follows the length of `left`; positions past the end of `right`
/// count as undefined.
pub fn rolling_apply_pairs<F>(
    left: &[Option<f64>],
    right: &[Option<f64>],
    window: usize,
    f: F,
) -> Vec<Option<f64>>
where
    F: Fn(&[f64], &[f64]) -> Option<f64>,
{
    if window == 0 {
        return vec![None; left.len()];
    }

    let mut xs = Vec::with_capacity(window);
    let mut ys = Vec::with_capacity(window);
    (0..left.len())
        .map(|i| {
            if i + 1 < window {
                return None;
            }
            xs.clear();
            ys.clear();
            for j in i + 1 - window..=i {
                xs.push(left[j]?);
                ys.push(right.get(j).copied().flatten()?);
            }
            f(&xs, &ys).filter(|v| v.is_finite())
        })
        .collect()
}

pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    rolling_apply(values, window, mean)
}

/// Rolling sample standard deviation (ddof = 1).
pub fn rolling_std(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    rolling_apply(values, window, std_dev)
}

pub(crate) fn mean(xs: &[f64]) -> Option<f64> {
    if xs.is_empty() {
        return None;
    }
    Some(xs.iter().sum::<f64>() / xs.len() as f64)
}

/// Sample variance; undefined below two observations.
pub(crate) fn variance(xs: &[f64]) -> Option<f64> {
    covariance(xs, xs)
}

pub(crate) fn std_dev(xs: &[f64]) -> Option<f64> {
    variance(xs).map(|v| v.max(0.0).sqrt())
}

/// Sample covariance of two equally long slices.
pub(crate) fn covariance(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len();
    if n < 2 || ys.len() != n {
        return None;
    }
    let mean_x = mean(xs)?;
    let mean_y = mean(ys)?;
    let sum: f64 = xs
        .iter()
        .zip(ys)
        .map(|(x, y)| (x - mean_x) * (y - mean_y))
        .sum();
    Some(sum / (n - 1) as f64)
}

/// Divides two optional values, leaving the result undefined for a (near) zero divisor.
pub(crate) fn safe_div(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d.abs() > EPSILON => Some(n / d).filter(|v| v.is_finite()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn defined(xs: &[f64]) -> Vec<Option<f64>> {
        xs.iter().copied().map(Some).collect()
    }

    #[test]
    fn leading_positions_are_undefined() {
        let means = rolling_mean(&defined(&[1.0, 2.0, 3.0, 4.0]), 3);
        assert_eq!(means, vec![None, None, Some(2.0), Some(3.0)]);
    }

    #[test]
    fn a_gap_poisons_every_window_that_contains_it() {
        let values = vec![Some(1.0), Some(2.0), None, Some(4.0), Some(5.0), Some(6.0)];
        let means = rolling_mean(&values, 2);
        assert_eq!(means, vec![None, Some(1.5), None, None, Some(4.5), Some(5.5)]);
    }

    #[test]
    fn std_is_sample_standard_deviation() {
        let stds = rolling_std(&defined(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), 8);
        // Population std is 2.0; the sample estimator divides by n - 1.
        assert_abs_diff_eq!(stds[7].unwrap(), (32.0f64 / 7.0).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn window_of_one_has_no_dispersion_estimate() {
        assert_eq!(rolling_std(&defined(&[1.0, 2.0]), 1), vec![None, None]);
    }

    #[test]
    fn zero_window_is_all_undefined() {
        assert_eq!(rolling_mean(&defined(&[1.0, 2.0]), 0), vec![None, None]);
    }

    #[test]
    fn pairs_past_the_shorter_input_are_undefined() {
        let left = defined(&[1.0, 2.0, 3.0]);
        let right = defined(&[1.0, 2.0]);
        let cov = rolling_apply_pairs(&left, &right, 2, covariance);
        assert_eq!(cov.len(), 3);
        assert_abs_diff_eq!(cov[1].unwrap(), 0.5, epsilon = 1e-12);
        assert_eq!(cov[2], None);
    }

    #[test]
    fn safe_div_rejects_zero_denominator() {
        assert_eq!(safe_div(Some(1.0), Some(0.0)), None);
        assert_eq!(safe_div(Some(1.0), None), None);
        assert_eq!(safe_div(Some(1.0), Some(2.0)), Some(0.5));
    }
}
