use crate::env::Env;
use crate::tasks::plot;
use crate::tasks::results::{self, AnalysisArgs, MetricKind};
use anyhow::{Context, Result};
use csv::ReaderBuilder;
use std::path::Path;

#[derive(Debug)]
pub struct Throughput {}

impl Throughput {
    /// Requests per second for one result file: the number of data rows
    /// divided by the nominal run duration. The duration comes from
    /// configuration, not from the file, and failed requests count too.
    pub fn summarize_file(csv_file: &Path, duration: u32) -> Result<f64> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .from_path(csv_file)
            .with_context(|| {
                format!(
                    "{}(throughput): failed to open result file: {}",
                    Env::SYS_NAME,
                    csv_file.display()
                )
            })?;

        let mut total_requests: u64 = 0;
        for record in reader.records() {
            record.with_context(|| {
                format!(
                    "{}(throughput): malformed record in {}",
                    Env::SYS_NAME,
                    csv_file.display()
                )
            })?;
            total_requests += 1;
        }

        Ok(total_requests as f64 / duration as f64)
    }

    /// Aggregate all result files for each configured duration and export one
    /// CSV slice per configured user count.
    pub fn aggregate_and_export(args: &AnalysisArgs) -> Result<()> {
        for &duration in &args.duration {
            let summaries = results::collect_summaries(&args.results_dir, duration, |csv_file| {
                Self::summarize_file(csv_file, duration)
            })?;
            let table = results::aggregate(&summaries);

            for &users in &args.users {
                results::export_user_slice(
                    &table,
                    &MetricKind::Throughput,
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
                plot::render_bar_chart(&MetricKind::Throughput, users, duration, &args.output_dir)?;
            }
        }
        Ok(())
    }

    pub fn run(args: &AnalysisArgs) -> Result<()> {
        Self::aggregate_and_export(args)?;
        Self::plot(args)
    }
}
