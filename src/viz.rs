//! Bar charts of the dashboard views using Plotters

use std::fs;
use std::path::{Path, PathBuf};

use plotters::coord::Shift;
use plotters::prelude::*;
use tracing::info;

use crate::aggregate::CategoryCount;
use crate::error::Result;
use crate::report::{category_label, Dashboard};
use crate::rfm::RfmRecord;

/// First bar of every chart
const HIGHLIGHT: RGBColor = RGBColor(0x72, 0xBC, 0xD4);
/// Remaining bars
const MUTED: RGBColor = RGBColor(0xD3, 0xD3, 0xD3);

const MAX_LABEL_CHARS: usize = 24;

pub const CITY_CHART: &str = "top_cities.png";
pub const CATEGORY_CHART: &str = "categories.png";
pub const RATING_CHART: &str = "ratings.png";
pub const RFM_CHART: &str = "rfm.png";

/// Labelled values drawn as one bar each, in the given order
struct Bars {
    title: String,
    label_desc: String,
    value_desc: String,
    labels: Vec<String>,
    values: Vec<f64>,
}

fn bar_color(index: usize) -> RGBColor {
    if index == 0 {
        HIGHLIGHT
    } else {
        MUTED
    }
}

/// Upper end of the value axis, with headroom above the tallest bar
fn value_axis_max(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(0.0, f64::max);
    if max > 0.0 {
        max * 1.1
    } else {
        1.0
    }
}

/// Label of the bar centred on `position`; blank between bars
fn label_at(labels: &[String], position: f64) -> String {
    let index = position.round();
    if (position - index).abs() > 1e-6 || index < 0.0 {
        return String::new();
    }
    labels.get(index as usize).cloned().unwrap_or_default()
}

fn truncate_label(label: &str) -> String {
    if label.chars().count() <= MAX_LABEL_CHARS {
        label.to_string()
    } else {
        let head: String = label.chars().take(MAX_LABEL_CHARS - 1).collect();
        format!("{head}…")
    }
}

fn draw_columns<DB: DrawingBackend>(area: &DrawingArea<DB, Shift>, bars: &Bars) -> Result<()> {
    let slots = bars.values.len().max(1);

    let mut chart = ChartBuilder::on(area)
        .caption(&bars.title, ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(
            -0.5f64..(slots as f64 - 0.5),
            0f64..value_axis_max(&bars.values),
        )?;

    let formatter = |x: &f64| label_at(&bars.labels, *x);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(slots)
        .x_label_formatter(&formatter)
        .x_desc(bars.label_desc.as_str())
        .y_desc(bars.value_desc.as_str())
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    chart.draw_series(bars.values.iter().enumerate().map(|(i, &value)| {
        let x = i as f64;
        Rectangle::new([(x - 0.4, 0.0), (x + 0.4, value)], bar_color(i).filled())
    }))?;

    Ok(())
}

/// Horizontal bars, first entry on top
fn draw_rows<DB: DrawingBackend>(area: &DrawingArea<DB, Shift>, bars: &Bars) -> Result<()> {
    let slots = bars.values.len().max(1);
    let top = slots as f64 - 1.0;

    let mut chart = ChartBuilder::on(area)
        .caption(&bars.title, ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(200)
        .build_cartesian_2d(0f64..value_axis_max(&bars.values), -0.5f64..(top + 0.5))?;

    let formatter = |y: &f64| label_at(&bars.labels, top - *y);
    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(slots)
        .y_label_formatter(&formatter)
        .x_desc(bars.value_desc.as_str())
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    chart.draw_series(bars.values.iter().enumerate().map(|(i, &value)| {
        let y = top - i as f64;
        Rectangle::new([(0.0, y - 0.4), (value, y + 0.4)], bar_color(i).filled())
    }))?;

    Ok(())
}

/// Bar chart of the cities with the most customers
pub fn create_city_chart(dashboard: &Dashboard, output_path: &Path) -> Result<()> {
    let root = BitMapBackend::new(output_path, (1000, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    draw_columns(
        &root,
        &Bars {
            title: format!("Top {} Customer Cities", dashboard.top_cities.len()),
            label_desc: "Customer City".to_string(),
            value_desc: "Number of Customers".to_string(),
            labels: dashboard
                .top_cities
                .iter()
                .map(|c| truncate_label(&c.city))
                .collect(),
            values: dashboard
                .top_cities
                .iter()
                .map(|c| c.customers as f64)
                .collect(),
        },
    )?;

    root.present()?;
    Ok(())
}

/// Best selling categories on the left, worst selling on the right
pub fn create_category_chart(dashboard: &Dashboard, output_path: &Path) -> Result<()> {
    let root = BitMapBackend::new(output_path, (1600, 600)).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled("most and least sold products", ("sans-serif", 28))?;
    let panels = root.split_evenly((1, 2));

    let panel = |title: &str, rows: &[CategoryCount]| Bars {
        title: title.to_string(),
        label_desc: String::new(),
        value_desc: "Order items".to_string(),
        labels: rows.iter().map(|r| truncate_label(category_label(r))).collect(),
        values: rows.iter().map(|r| r.orders as f64).collect(),
    };

    draw_rows(
        &panels[0],
        &panel("products with the highest sales", dashboard.best_selling.as_slice()),
    )?;
    draw_rows(
        &panels[1],
        &panel("products with the lowest sales", dashboard.worst_selling.as_slice()),
    )?;

    root.present()?;
    Ok(())
}

/// Review score frequencies, most common score first
pub fn create_rating_chart(dashboard: &Dashboard, output_path: &Path) -> Result<()> {
    let root = BitMapBackend::new(output_path, (1000, 500)).into_drawing_area();
    root.fill(&WHITE)?;

    let ratings = &dashboard.ratings;
    draw_columns(
        &root,
        &Bars {
            title: format!("Rating customers for service (average {:.2})", ratings.mean),
            label_desc: "Rating".to_string(),
            value_desc: "Customer".to_string(),
            labels: ratings.counts.iter().map(|r| r.score.to_string()).collect(),
            values: ratings.counts.iter().map(|r| r.count as f64).collect(),
        },
    )?;

    root.present()?;
    Ok(())
}

/// Best customers by recency, frequency and monetary value, side by side
pub fn create_rfm_chart(dashboard: &Dashboard, output_path: &Path) -> Result<()> {
    let root = BitMapBackend::new(output_path, (1800, 600)).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled("Best Customer Based on RFM Parameters", ("sans-serif", 28))?;
    let panels = root.split_evenly((1, 3));

    let customers = |records: &[RfmRecord]| -> Vec<String> {
        records.iter().map(|r| truncate_label(&r.customer_id)).collect()
    };

    draw_columns(
        &panels[0],
        &Bars {
            title: "By Recency (Day)".to_string(),
            label_desc: "customer".to_string(),
            value_desc: String::new(),
            labels: customers(dashboard.most_recent.as_slice()),
            values: dashboard.most_recent.iter().map(|r| r.recency as f64).collect(),
        },
    )?;
    draw_columns(
        &panels[1],
        &Bars {
            title: "By Frequency".to_string(),
            label_desc: "customer".to_string(),
            value_desc: String::new(),
            labels: customers(dashboard.most_frequent.as_slice()),
            values: dashboard.most_frequent.iter().map(|r| r.frequency as f64).collect(),
        },
    )?;
    draw_columns(
        &panels[2],
        &Bars {
            title: "By Monetary".to_string(),
            label_desc: "customer".to_string(),
            value_desc: String::new(),
            labels: customers(dashboard.highest_monetary.as_slice()),
            values: dashboard.highest_monetary.iter().map(|r| r.monetary).collect(),
        },
    )?;

    root.present()?;
    Ok(())
}

/// Write every chart of the dashboard into `output_dir`
///
/// # Returns
/// * Paths of the written PNG files
pub fn generate_dashboard_charts(dashboard: &Dashboard, output_dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir)?;

    let charts: [(&str, fn(&Dashboard, &Path) -> Result<()>); 4] = [
        (CITY_CHART, create_city_chart),
        (CATEGORY_CHART, create_category_chart),
        (RATING_CHART, create_rating_chart),
        (RFM_CHART, create_rfm_chart),
    ];

    let mut written = Vec::with_capacity(charts.len());
    for (file_name, draw) in charts {
        let path = output_dir.join(file_name);
        draw(dashboard, &path)?;
        info!(path = %path.display(), "chart saved");
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::{empty_table, sample_table};
    use crate::report::DashboardOptions;
    use tempfile::tempdir;

    #[test]
    fn test_bar_colors() {
        assert_eq!(bar_color(0), HIGHLIGHT);
        assert_eq!(bar_color(1), MUTED);
        assert_eq!(bar_color(4), MUTED);
    }

    #[test]
    fn test_value_axis_max() {
        assert_eq!(value_axis_max(&[]), 1.0);
        assert_eq!(value_axis_max(&[0.0, 0.0]), 1.0);
        assert!((value_axis_max(&[10.0, 4.0]) - 11.0).abs() < 1e-9);
    }

    #[test]
    fn test_label_at() {
        let labels = vec!["a".to_string(), "b".to_string()];
        assert_eq!(label_at(&labels, 0.0), "a");
        assert_eq!(label_at(&labels, 1.0), "b");
        assert_eq!(label_at(&labels, 0.5), "");
        assert_eq!(label_at(&labels, 2.0), "");
        assert_eq!(label_at(&labels, -1.0), "");
    }

    #[test]
    fn test_truncate_label() {
        assert_eq!(truncate_label("toys"), "toys");
        let long = "construction_tools_construction";
        let truncated = truncate_label(long);
        assert_eq!(truncated.chars().count(), MAX_LABEL_CHARS);
        assert!(truncated.ends_with('…'));
    }

    // Text layout needs a sans-serif system font
    #[test]
    #[ignore = "requires system fonts"]
    fn test_generate_dashboard_charts() {
        let dashboard = Dashboard::build(&sample_table(), &DashboardOptions::default()).unwrap();
        let temp_dir = tempdir().unwrap();

        let written = generate_dashboard_charts(&dashboard, temp_dir.path()).unwrap();
        assert_eq!(written.len(), 4);
        assert!(written.iter().all(|path| path.exists()));
    }

    #[test]
    #[ignore = "requires system fonts"]
    fn test_empty_dashboard_charts() {
        let dashboard = Dashboard::build(&empty_table(), &DashboardOptions::default()).unwrap();
        let temp_dir = tempdir().unwrap();

        let written = generate_dashboard_charts(&dashboard, temp_dir.path()).unwrap();
        assert!(written.iter().all(|path| path.exists()));
    }
}
