use crate::env::Env;
use crate::tasks::plot;
use crate::tasks::results::{self, AnalysisArgs, MetricKind};
use anyhow::{Context, Result};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct LatencyRecord {
    #[serde(rename = "Latency (Deci-milliseconds)")]
    latency_deci_ms: f64,
    #[serde(rename = "Failure")]
    failure: u32,
}

#[derive(Debug)]
pub struct Latency {}

impl Latency {
    /// Mean latency in milliseconds over the successful requests of one
    /// result file. The raw column is in deci-milliseconds. A file with no
    /// successful request yields NaN, which flows through the aggregation
    /// and is dropped again at plot time.
    pub fn summarize_file(csv_file: &Path) -> Result<f64> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .from_path(csv_file)
            .with_context(|| {
                format!(
                    "{}(latency): failed to open result file: {}",
                    Env::SYS_NAME,
                    csv_file.display()
                )
            })?;

        let mut total_ms = 0.0;
        let mut count: u64 = 0;
        for result in reader.deserialize() {
            let record: LatencyRecord = result.with_context(|| {
                format!(
                    "{}(latency): malformed record in {}",
                    Env::SYS_NAME,
                    csv_file.display()
                )
            })?;

            if record.failure != 0 {
                continue;
            }
            total_ms += record.latency_deci_ms / 10.0;
            count += 1;
        }

        if count == 0 {
            return Ok(f64::NAN);
        }
        Ok(total_ms / count as f64)
    }

    /// Aggregate all result files for each configured duration and export one
    /// CSV slice per configured user count.
    pub fn aggregate_and_export(args: &AnalysisArgs) -> Result<()> {
        for &duration in &args.duration {
            let summaries =
                results::collect_summaries(&args.results_dir, duration, Self::summarize_file)?;
            let table = results::aggregate(&summaries);

            for &users in &args.users {
                results::export_user_slice(
                    &table,
                    &MetricKind::Latency,
                    users,
                    duration,
                    &args.output_dir,
                )?;
            }
        }
        Ok(())
    }

    /// Render one bar chart per exported CSV slice. Slices that were never
    /// exported are skipped with a notice.
    pub fn plot(args: &AnalysisArgs) -> Result<()> {
        for &duration in &args.duration {
            for &users in &args.users {
                plot::render_bar_chart(&MetricKind::Latency, users, duration, &args.output_dir)?;
            }
        }
        Ok(())
    }

    pub fn run(args: &AnalysisArgs) -> Result<()> {
        Self::aggregate_and_export(args)?;
        Self::plot(args)
    }
}
