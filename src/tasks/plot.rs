use crate::env::Env;
use crate::tasks::results::MetricKind;
use anyhow::{Context, Result};
use csv::ReaderBuilder;
use log::info;
use plotters::prelude::*;
use std::fs;
use std::path::Path;

const CHART_SIZE: (u32, u32) = (1000, 600);
const TITLE_FONT_SIZE: i32 = 28;
const LABEL_FONT_SIZE: i32 = 16;

fn bar_color(metric: &MetricKind) -> RGBColor {
    match metric {
        MetricKind::Latency => RGBColor(70, 130, 180),
        MetricKind::Throughput => RGBColor(60, 179, 113),
    }
}

/// Render the bar chart for one exported CSV slice: cardinality on the x
/// axis, the metric as bar height. A missing or empty slice is skipped with
/// a notice rather than failing, so the plot phase can be re-run on whatever
/// slices exist.
pub fn render_bar_chart(
    metric: &MetricKind,
    users: u32,
    duration: u32,
    output_dir: &Path,
) -> Result<()> {
    let csv_path = metric.slice_csv_path(output_dir, users, duration);
    if !csv_path.exists() {
        info!(
            "{}(plot): file not found: {}",
            Env::SYS_NAME,
            csv_path.display()
        );
        return Ok(());
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_path(&csv_path)
        .with_context(|| {
            format!(
                "{}(plot): failed to open aggregated file: {}",
                Env::SYS_NAME,
                csv_path.display()
            )
        })?;

    // a configuration whose requests all failed has no mean; it is written
    // to the CSV as an empty field and carries no bar
    let mut bars: Vec<(u32, f64)> = Vec::new();
    for record in reader.records() {
        let record = record?;
        let (_users, cardinality, value): (u32, u32, Option<f64>) = record.deserialize(None)?;
        match value {
            Some(value) if !value.is_nan() => bars.push((cardinality, value)),
            _ => continue,
        }
    }

    if bars.is_empty() {
        info!(
            "{}(plot): no data rows in {}, skipping chart",
            Env::SYS_NAME,
            csv_path.display()
        );
        return Ok(());
    }

    let plot_path = metric.chart_path(output_dir, users, duration);
    if let Some(parent) = plot_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut y_max = bars.iter().map(|(_, value)| *value).fold(0.0f64, f64::max);
    if y_max <= 0.0 {
        y_max = 1.0;
    }
    let num_bars = bars.len() as i32;

    let root = BitMapBackend::new(&plot_path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            metric.chart_title(users),
            ("sans-serif", TITLE_FONT_SIZE).into_font(),
        )
        .x_label_area_size(70)
        .y_label_area_size(70)
        .margin(10)
        .build_cartesian_2d((0..num_bars).into_segmented(), 0f64..y_max * 1.1)?;

    let x_labels: Vec<String> = bars.iter().map(|(card, _)| card.to_string()).collect();
    chart
        .configure_mesh()
        .x_desc("Cardinality")
        .y_desc(metric.axis_label())
        .axis_desc_style(("sans-serif", LABEL_FONT_SIZE + 2).into_font())
        .disable_x_mesh()
        .x_labels(bars.len())
        .x_label_formatter(&|segment| match segment {
            SegmentValue::CenterOf(idx) if *idx >= 0 && (*idx as usize) < x_labels.len() => {
                x_labels[*idx as usize].clone()
            }
            _ => String::new(),
        })
        .x_label_style(
            ("sans-serif", LABEL_FONT_SIZE)
                .into_font()
                .transform(FontTransform::Rotate90),
        )
        .y_label_style(("sans-serif", LABEL_FONT_SIZE).into_font())
        .draw()?;

    let style = ShapeStyle {
        color: bar_color(metric).into(),
        filled: true,
        stroke_width: 1,
    };
    chart.draw_series(bars.iter().enumerate().map(|(idx, (_, value))| {
        let idx = idx as i32;
        let mut bar = Rectangle::new(
            [
                (SegmentValue::Exact(idx), 0.0),
                (SegmentValue::Exact(idx + 1), *value),
            ],
            style,
        );
        bar.set_margin(0, 0, 8, 8);
        bar
    }))?;

    root.present().with_context(|| {
        format!(
            "{}(plot): failed to write plot: {}",
            Env::SYS_NAME,
            plot_path.display()
        )
    })?;
    info!(
        "{}(plot): plot saved to {}",
        Env::SYS_NAME,
        plot_path.display()
    );
    Ok(())
}
