use analytics::{BenchmarkReport, ComparisonReport, InstrumentSummary, MetricParams};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};
use core_types::InstrumentMetadata;

const INSUFFICIENT: &str = "insufficient data";

fn percent(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}%", v * 100.0),
        None => INSUFFICIENT.to_string(),
    }
}

fn ratio(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.2}"),
        None => INSUFFICIENT.to_string(),
    }
}

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn right(text: String) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

pub fn print_summary(
    summary: &InstrumentSummary,
    params: MetricParams,
    benchmark: Option<&BenchmarkReport>,
) {
    let range = match (summary.first_date, summary.last_date) {
        (Some(first), Some(last)) => format!("{first} to {last}"),
        _ => "-".to_string(),
    };
    println!("{}", summary.metadata.label());
    if !summary.metadata.theme.is_empty() {
        println!("Theme: {}", summary.metadata.theme);
    }
    println!(
        "{range} ({} observations, window {} days, risk-free rate {})",
        summary.observations,
        params.window,
        percent(Some(params.risk_free_rate))
    );

    let mut table = new_table();
    table.set_header(vec!["Metric", "Value"]);
    table.add_row(vec![Cell::new("Total return"), right(percent(summary.total_return))]);
    table.add_row(vec![Cell::new("Annualized return"), right(percent(summary.annualized_return))]);
    table.add_row(vec![
        Cell::new("Annualized volatility"),
        right(percent(summary.annualized_volatility)),
    ]);
    table.add_row(vec![Cell::new("Sharpe ratio"), right(ratio(summary.sharpe_ratio))]);
    table.add_row(vec![Cell::new("Sortino ratio"), right(ratio(summary.sortino_ratio))]);
    table.add_row(vec![Cell::new("Max drawdown"), right(percent(summary.max_drawdown))]);

    if let Some(report) = benchmark {
        table.add_row(vec![
            Cell::new(format!("Beta vs {}", report.benchmark)),
            right(ratio(report.beta)),
        ]);
        table.add_row(vec![
            Cell::new(format!("Tracking error vs {}", report.benchmark)),
            right(percent(report.tracking_error)),
        ]);
    }
    println!("{table}");
}

pub fn print_comparison(report: &ComparisonReport) {
    let mut metrics = new_table();
    metrics.set_header(vec![
        "ETF",
        "Annualized return",
        "Volatility",
        "Sharpe",
        "Sortino",
        "Max drawdown",
    ]);
    for s in &report.summaries {
        metrics.add_row(vec![
            Cell::new(s.metadata.label()),
            right(percent(s.annualized_return)),
            right(percent(s.annualized_volatility)),
            right(ratio(s.sharpe_ratio)),
            right(ratio(s.sortino_ratio)),
            right(percent(s.max_drawdown)),
        ]);
    }
    println!("Metrics");
    println!("{metrics}");

    let mut performance = new_table();
    performance.set_header(vec!["ETF", "Base 100 (last)", "Risk (ann.)", "Return (ann.)"]);
    for point in &report.risk_return {
        let last = report
            .normalized
            .column(&point.ticker)
            .and_then(|values| values.last().copied().flatten());
        performance.add_row(vec![
            Cell::new(&point.label),
            right(ratio(last)),
            right(percent(point.annualized_volatility)),
            right(percent(point.annualized_return)),
        ]);
    }
    match (report.normalized.dates.first(), report.normalized.dates.last()) {
        (Some(first), Some(last)) => println!("Performance (common dates {first} to {last})"),
        _ => println!("Performance (no common dates)"),
    }
    println!("{performance}");

    if report.correlation.len() >= 2 {
        let mut correlation = new_table();
        let mut header = vec![String::new()];
        header.extend(report.correlation.tickers.iter().cloned());
        correlation.set_header(header);
        for (ticker, row) in report.correlation.tickers.iter().zip(&report.correlation.values) {
            let mut cells = vec![Cell::new(ticker)];
            cells.extend(row.iter().map(|v| right(ratio(*v))));
            correlation.add_row(cells);
        }
        println!("Return correlation");
        println!("{correlation}");
    }

    let mut radar = new_table();
    radar.set_header(vec!["ETF", "Return", "Low volatility", "Sharpe", "Sortino", "Low drawdown"]);
    for scores in &report.radar {
        radar.add_row(vec![
            Cell::new(&scores.label),
            right(ratio(scores.annualized_return)),
            right(ratio(scores.volatility)),
            right(ratio(scores.sharpe_ratio)),
            right(ratio(scores.sortino_ratio)),
            right(ratio(scores.max_drawdown)),
        ]);
    }
    println!("Relative scores (1 = best of the selection)");
    println!("{radar}");
}

pub fn print_instruments(instruments: &[InstrumentMetadata]) {
    let mut table = new_table();
    table.set_header(vec!["Ticker", "Name", "Theme"]);
    for instrument in instruments {
        table.add_row(vec![&instrument.ticker, &instrument.name, &instrument.theme]);
    }
    println!("{table}");
}
