use crate::rolling::{covariance, rolling_apply_pairs, rolling_mean, rolling_std, safe_div, variance};
use crate::series::TimeSeries;

/// Rolling annualized volatility: sample std over `window` returns × √window.
pub fn volatility(returns: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let scale = (window as f64).sqrt();
    rolling_std(returns, window)
        .into_iter()
        .map(|std| std.map(|s| s * scale))
        .collect()
}

/// Rolling annualized Sharpe ratio.
///
/// The annual `risk_free_rate` is spread evenly over the window, the mean
/// excess return is re-annualized by `window` and divided by the rolling
/// volatility of the raw returns.
pub fn sharpe(returns: &[Option<f64>], risk_free_rate: f64, window: usize) -> Vec<Option<f64>> {
    let numerators = annualized_excess_mean(returns, risk_free_rate, window);
    let denominators = volatility(returns, window);
    numerators
        .into_iter()
        .zip(denominators)
        .map(|(n, d)| safe_div(n, d))
        .collect()
}

/// Rolling annualized Sortino ratio.
///
/// Same numerator as [`sharpe`]; the denominator only sees downside: every
/// non-negative return counts as zero before the rolling std is taken. A window
/// without a negative return has no downside deviation and is undefined.
pub fn sortino(returns: &[Option<f64>], risk_free_rate: f64, window: usize) -> Vec<Option<f64>> {
    let numerators = annualized_excess_mean(returns, risk_free_rate, window);
    let downside: Vec<Option<f64>> = returns.iter().map(|r| r.map(|r| r.min(0.0))).collect();
    let denominators = volatility(&downside, window);
    numerators
        .into_iter()
        .zip(denominators)
        .map(|(n, d)| safe_div(n, d))
        .collect()
}

fn annualized_excess_mean(
    returns: &[Option<f64>],
    risk_free_rate: f64,
    window: usize,
) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; returns.len()];
    }
    let per_period = risk_free_rate / window as f64;
    let excess: Vec<Option<f64>> = returns.iter().map(|r| r.map(|r| r - per_period)).collect();
    rolling_mean(&excess, window)
        .into_iter()
        .map(|m| m.map(|m| m * window as f64))
        .collect()
}

/// Drawdown at every position against the expanding (all-history) peak.
pub fn drawdowns(prices: &[f64]) -> Vec<Option<f64>> {
    let mut peak = f64::NEG_INFINITY;
    prices
        .iter()
        .map(|&price| {
            if !price.is_finite() {
                return None;
            }
            peak = peak.max(price);
            (peak > 0.0).then(|| price / peak - 1.0)
        })
        .collect()
}

/// The deepest drawdown of the whole series. Always `<= 0`; `None` when empty.
pub fn max_drawdown(prices: &[f64]) -> Option<f64> {
    drawdowns(prices).into_iter().flatten().reduce(f64::min)
}

/// Rolling beta: covariance with the market over the market's variance.
///
/// The inputs must already be aligned position by position.
pub fn beta(returns: &[Option<f64>], market_returns: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    rolling_apply_pairs(returns, market_returns, window, |xs, ys| {
        safe_div(covariance(xs, ys), variance(ys))
    })
}

/// Rolling annualized tracking error: std of `r - b` over `window` × √window.
///
/// The inputs must already be aligned position by position.
pub fn tracking_error(
    returns: &[Option<f64>],
    benchmark_returns: &[Option<f64>],
    window: usize,
) -> Vec<Option<f64>> {
    let active: Vec<Option<f64>> = returns
        .iter()
        .enumerate()
        .map(|(i, r)| Some(r.as_ref()? - benchmark_returns.get(i).copied().flatten()?))
        .collect();
    volatility(&active, window)
}

/// [`beta`] on the instrument's dates, with market returns looked up by date.
pub fn beta_by_date(returns: &TimeSeries, market_returns: &TimeSeries, window: usize) -> TimeSeries {
    let market = market_returns.reindex(returns.dates());
    returns.with_values(beta(returns.values(), &market, window))
}

/// [`tracking_error`] on the instrument's dates, with benchmark returns looked up by date.
pub fn tracking_error_by_date(
    returns: &TimeSeries,
    benchmark_returns: &TimeSeries,
    window: usize,
) -> TimeSeries {
    let benchmark = benchmark_returns.reindex(returns.dates());
    returns.with_values(tracking_error(returns.values(), &benchmark, window))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::returns;
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;
    use core_types::PriceSeries;

    fn defined(xs: &[f64]) -> Vec<Option<f64>> {
        xs.iter().copied().map(Some).collect()
    }

    #[test]
    fn constant_prices_have_zero_volatility_and_no_sharpe() {
        let r = returns(&[50.0; 10]);
        assert!(r.iter().flatten().all(|r| *r == 0.0));

        let vol = volatility(&r, 5);
        assert_eq!(vol[..5], [None; 5]);
        assert!(vol[5..].iter().all(|v| *v == Some(0.0)));

        assert!(sharpe(&r, 0.02, 5).iter().all(Option::is_none));
        assert!(sortino(&r, 0.02, 5).iter().all(Option::is_none));
    }

    #[test]
    fn volatility_annualizes_with_the_window() {
        let r = defined(&[0.01, -0.02, 0.03, 0.0]);
        let vol = volatility(&r, 4);
        let m = 0.005;
        let sample_std =
            ([0.01, -0.02, 0.03, 0.0].iter().map(|x: &f64| (x - m).powi(2)).sum::<f64>() / 3.0).sqrt();
        assert_abs_diff_eq!(vol[3].unwrap(), sample_std * 2.0, epsilon = 1e-12);
    }

    #[test]
    fn shorter_history_than_window_is_all_undefined() {
        let r = returns(&[1.0, 1.1, 1.2]);
        assert!(volatility(&r, 252).iter().all(Option::is_none));
        assert!(sharpe(&r, 0.02, 252).iter().all(Option::is_none));
    }

    #[test]
    fn sharpe_matches_hand_computation() {
        let r = defined(&[0.01, 0.02, -0.01, 0.03]);
        let window = 4;
        let rf = 0.04;
        let mean_excess = (0.01 + 0.02 - 0.01 + 0.03) / 4.0 - rf / 4.0;
        let m = 0.0125;
        let std = ([0.01, 0.02, -0.01, 0.03].iter().map(|x: &f64| (x - m).powi(2)).sum::<f64>() / 3.0).sqrt();
        let expected = (mean_excess * 4.0) / (std * 2.0);
        assert_abs_diff_eq!(sharpe(&r, rf, window)[3].unwrap(), expected, epsilon = 1e-12);
    }

    #[test]
    fn sortino_uses_downside_deviation_only() {
        let r = defined(&[0.02, -0.01, 0.03, -0.02]);
        let downside = [0.0, -0.01, 0.0, -0.02];
        let m = -0.0075;
        let downside_std = (downside.iter().map(|x: &f64| (x - m).powi(2)).sum::<f64>() / 3.0).sqrt();
        let mean_excess = (0.02 - 0.01 + 0.03 - 0.02) / 4.0;
        let expected = (mean_excess * 4.0) / (downside_std * 2.0);
        assert_abs_diff_eq!(sortino(&r, 0.0, 4)[3].unwrap(), expected, epsilon = 1e-12);
    }

    #[test]
    fn sortino_without_losses_is_undefined() {
        let r = defined(&[0.01, 0.02, 0.0, 0.03]);
        assert_eq!(sortino(&r, 0.02, 4)[3], None);
        assert!(sharpe(&r, 0.02, 4)[3].is_some());
    }

    #[test]
    fn drawdown_scenarios() {
        assert_eq!(max_drawdown(&[100.0, 110.0, 121.0]), Some(0.0));
        assert_abs_diff_eq!(max_drawdown(&[100.0, 90.0, 99.0]).unwrap(), -0.10, epsilon = 1e-12);
        assert_eq!(max_drawdown(&[]), None);
    }

    #[test]
    fn drawdown_uses_the_expanding_peak() {
        let dd = drawdowns(&[100.0, 120.0, 60.0, 110.0, 130.0, 117.0]);
        assert_abs_diff_eq!(dd[2].unwrap(), -0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(dd[3].unwrap(), 110.0 / 120.0 - 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(dd[5].unwrap(), -0.1, epsilon = 1e-12);
        assert!(dd.iter().flatten().all(|d| *d <= 0.0));
        assert_abs_diff_eq!(max_drawdown(&[100.0, 120.0, 60.0, 110.0, 130.0, 117.0]).unwrap(), -0.5, epsilon = 1e-12);
    }

    #[test]
    fn beta_of_a_scaled_market_is_the_scale() {
        let market = defined(&[0.01, -0.02, 0.015, 0.005, -0.01]);
        let levered: Vec<Option<f64>> = market.iter().map(|m| m.map(|m| 2.0 * m)).collect();
        let b = beta(&levered, &market, 3);
        assert_eq!(b[..2], [None, None]);
        for value in &b[2..] {
            assert_abs_diff_eq!(value.unwrap(), 2.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn beta_against_a_flat_market_is_undefined() {
        let b = beta(&defined(&[0.01, 0.02, 0.03]), &defined(&[0.0, 0.0, 0.0]), 3);
        assert_eq!(b, vec![None, None, None]);
    }

    #[test]
    fn tracking_error_of_identical_series_is_zero() {
        let r = defined(&[0.01, -0.02, 0.015, 0.005]);
        let te = tracking_error(&r, &r, 2);
        assert_eq!(te[0], None);
        assert!(te[1..].iter().all(|v| *v == Some(0.0)));
    }

    #[test]
    fn tracking_error_matches_hand_computation() {
        let r = defined(&[0.01, -0.02, 0.03]);
        let b = defined(&[0.0, 0.01, 0.01]);
        // Active returns [0.01, -0.03, 0.02]: sample std sqrt(7e-4), times sqrt(3).
        let te = tracking_error(&r, &b, 3);
        assert_eq!(te[..2], [None, None]);
        assert_abs_diff_eq!(te[2].unwrap(), 0.045825756949558, epsilon = 1e-12);
        assert_abs_diff_eq!(te[2].unwrap(), (7e-4f64).sqrt() * 3f64.sqrt(), epsilon = 1e-12);
    }

    fn dated(days: &[u32], values: &[f64]) -> TimeSeries {
        let d = |day: u32| NaiveDate::from_ymd_opt(2024, 5, day).unwrap();
        let prices =
            PriceSeries::from_closes("T", days.iter().zip(values).map(|(day, v)| (d(*day), *v)))
                .unwrap();
        TimeSeries::from_prices(&prices)
    }

    #[test]
    fn date_aware_beta_leaves_missing_market_dates_undefined() {
        let etf = dated(&[1, 2, 3, 4, 5], &[0.01, 0.02, -0.01, 0.03, 0.01]);
        // No market observation on the 3rd.
        let market = dated(&[1, 2, 4, 5], &[0.01, 0.02, 0.03, 0.01]);

        let b = beta_by_date(&etf, &market, 2);
        assert_eq!(b.dates(), etf.dates());
        assert!(b.values()[1].is_some());
        assert_eq!(b.values()[2], None);
        assert_eq!(b.values()[3], None);
        assert_abs_diff_eq!(b.values()[4].unwrap(), 1.0, epsilon = 1e-9);

        let te = tracking_error_by_date(&etf, &market, 2);
        assert_eq!(te.values()[2], None);
        assert_eq!(te.values()[4], Some(0.0));
    }
}
