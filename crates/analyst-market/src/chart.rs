//! SVG chart rendering

use crate::error::{MarketError, Result};
use crate::types::PriceBar;
use plotters::prelude::*;
use std::path::Path;

const SIZE: (u32, u32) = (1200, 600);

/// One named line on a chart
#[derive(Debug, Clone)]
pub struct Series {
    pub label: String,
    pub values: Vec<f64>,
}

fn chart_err<E: std::fmt::Display>(err: E) -> MarketError {
    MarketError::Chart(err.to_string())
}

/// Value range with a margin, widened when flat
fn y_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let (min, max) = values.fold(None, |acc: Option<(f64, f64)>, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })?;
    let pad = ((max - min) * 0.05).max(1.0);
    Some((min - pad, max + pad))
}

/// Line chart of closing prices
pub fn render_price_chart(path: &Path, title: &str, bars: &[PriceBar]) -> Result<()> {
    let dates: Vec<String> = bars.iter().map(|b| b.date.format("%Y-%m-%d").to_string()).collect();
    let series = Series {
        label: "Close".to_string(),
        values: bars.iter().map(|b| b.close).collect(),
    };
    draw(path, title, "Price ($)", &dates, &[series], false)
}

/// Overlaid lines of percentage change from each series' first value
pub fn render_comparison_chart(path: &Path, title: &str, dates: &[String], series: &[Series]) -> Result<()> {
    let normalized: Vec<Series> = series
        .iter()
        .map(|s| Series {
            label: s.label.clone(),
            values: percent_change(&s.values),
        })
        .collect();
    draw(path, title, "Change (%)", dates, &normalized, true)
}

/// `(v / first - 1) * 100` for each value
pub fn percent_change(values: &[f64]) -> Vec<f64> {
    match values.first() {
        Some(&first) if first != 0.0 => values.iter().map(|v| (v / first - 1.0) * 100.0).collect(),
        _ => vec![0.0; values.len()],
    }
}

fn draw(
    path: &Path,
    title: &str,
    y_desc: &str,
    dates: &[String],
    series: &[Series],
    zero_line: bool,
) -> Result<()> {
    let longest = series.iter().map(|s| s.values.len()).max().unwrap_or(0);
    if longest == 0 {
        return Err(MarketError::Chart(format!("no data to plot for '{title}'")));
    }
    let (y_min, y_max) = y_range(series.iter().flat_map(|s| s.values.iter().copied()))
        .ok_or_else(|| MarketError::Chart("empty series".to_string()))?;
    let x_max = (longest.saturating_sub(1)).max(1) as f64;

    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(chart_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(0f64..x_max, y_min..y_max)
        .map_err(chart_err)?;

    let date_label = |x: &f64| {
        dates
            .get(x.round().max(0.0) as usize)
            .cloned()
            .unwrap_or_default()
    };
    chart
        .configure_mesh()
        .x_desc("Date")
        .y_desc(y_desc)
        .x_labels(8)
        .x_label_formatter(&date_label)
        .draw()
        .map_err(chart_err)?;

    if zero_line {
        chart
            .draw_series(LineSeries::new(
                [(0.0, 0.0), (x_max, 0.0)],
                BLACK.mix(0.3).stroke_width(1),
            ))
            .map_err(chart_err)?;
    }

    for (index, s) in series.iter().enumerate() {
        let style = Palette99::pick(index).stroke_width(2);
        chart
            .draw_series(LineSeries::new(
                s.values.iter().enumerate().map(|(i, v)| (i as f64, *v)),
                style,
            ))
            .map_err(chart_err)?
            .label(s.label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(chart_err)?;

    root.present().map_err(chart_err)?;
    Ok(())
}
