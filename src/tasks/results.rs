use crate::env::Env;
use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use log::{info, warn};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, ValueEnum, PartialEq, Eq)]
pub enum MetricKind {
    Latency,
    Throughput,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricKind::Latency => write!(f, "latency"),
            MetricKind::Throughput => write!(f, "throughput"),
        }
    }
}

impl MetricKind {
    pub fn column_name(&self) -> &'static str {
        match self {
            MetricKind::Latency => "MeanLatencyMs",
            MetricKind::Throughput => "Throughput",
        }
    }

    pub fn axis_label(&self) -> &'static str {
        match self {
            MetricKind::Latency => "Mean Latency (ms)",
            MetricKind::Throughput => "Throughput (requests/sec)",
        }
    }

    pub fn chart_title(&self, users: u32) -> String {
        match self {
            MetricKind::Latency => format!("Mean Latency vs. Cardinality for {users} Users"),
            MetricKind::Throughput => format!("Mean Throughput vs. Cardinality for {users} Users"),
        }
    }

    /// Path of the aggregated CSV slice for one (users, duration) pair.
    pub fn slice_csv_path(&self, output_dir: &Path, users: u32, duration: u32) -> PathBuf {
        Env::metric_root(output_dir, &self.to_string())
            .join(format!("aggregated_{self}_data_{users}users_{duration}s.csv"))
    }

    /// Path of the rendered chart for one (users, duration) pair.
    pub fn chart_path(&self, output_dir: &Path, users: u32, duration: u32) -> PathBuf {
        Env::metric_root(output_dir, &self.to_string())
            .join(format!("mean_{self}_{users}users_{duration}s.png"))
    }
}

#[derive(Debug, Args)]
pub struct AnalysisArgs {
    /// Directory holding the raw benchmark result CSVs
    #[arg(long, default_value = Env::DEFAULT_RESULTS_DIR)]
    pub results_dir: PathBuf,
    /// Concurrent user counts to report on
    #[arg(long, num_args = 1.., default_values_t = Env::DEFAULT_USER_CONFIGS)]
    pub users: Vec<u32>,
    /// Run durations (seconds) to process
    #[arg(long, num_args = 1.., default_values_t = Env::DEFAULT_DURATIONS_SECS)]
    pub duration: Vec<u32>,
    /// Directory the aggregated CSVs and charts are written under
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,
}

/// Run parameters embedded in a result file's name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct RunParams {
    pub users: u32,
    pub cardinality: u32,
}

/// One scalar metric computed from a single result file.
#[derive(Clone, Copy, Debug)]
pub struct FileSummary {
    pub params: RunParams,
    pub metric: f64,
}

/// Whether a file name matches
/// `query_benchmark_results_-1reqs_{duration}secs_*users_*card_*.csv`:
/// the duration-specific prefix, then a `users_` token followed by a
/// `card_` token, in that order.
fn is_result_file_name(file_name: &str, prefix: &str) -> bool {
    let rest = match file_name
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_suffix(".csv"))
    {
        Some(rest) => rest,
        None => return false,
    };

    match rest.find("users_") {
        Some(idx) => rest[idx + "users_".len()..].contains("card_"),
        None => false,
    }
}

/// Collect the result files for one run duration. Non-recursive; zero
/// matches is not an error, a missing results directory is.
pub fn find_result_files(results_dir: &Path, duration: u32) -> Result<Vec<PathBuf>> {
    let prefix = Env::result_file_prefix(duration);

    let mut csv_files = Vec::new();
    let entries = fs::read_dir(results_dir).with_context(|| {
        format!(
            "{}(results): failed to read results directory: {}",
            Env::SYS_NAME,
            results_dir.display()
        )
    })?;
    for entry in entries {
        let entry = entry?;
        if !entry.path().is_file() {
            continue;
        }
        match entry.file_name().to_str() {
            Some(name) if is_result_file_name(name, &prefix) => {
                csv_files.push(entry.path());
            }
            _ => continue,
        }
    }

    // read_dir order is platform-dependent; sort so repeated runs see the
    // same file sequence
    csv_files.sort();
    Ok(csv_files)
}

/// Extract the user count and cardinality from a result file name. The name
/// is split on `_` and scanned for the first token containing `users` and the
/// first containing `card`. Returns `None` when either token is missing or
/// does not hold an integer; callers skip such files.
pub fn parse_run_params(path: &Path) -> Option<RunParams> {
    let file_name = path.file_name()?.to_str()?;
    let file_name = file_name.strip_suffix(".csv").unwrap_or(file_name);

    let mut users = None;
    let mut cardinality = None;
    for token in file_name.split('_') {
        if users.is_none() && token.contains("users") {
            users = token.replace("users", "").parse::<u32>().ok();
        } else if cardinality.is_none() && token.contains("card") {
            cardinality = token.replace("card", "").parse::<u32>().ok();
        }
    }

    match (users, cardinality) {
        (Some(users), Some(cardinality)) => Some(RunParams { users, cardinality }),
        _ => None,
    }
}

/// Summarize every result file for one duration with the given per-file
/// metric function. Files with unparsable names are skipped with a warning.
pub fn collect_summaries<F>(
    results_dir: &Path,
    duration: u32,
    summarize: F,
) -> Result<Vec<FileSummary>>
where
    F: Fn(&Path) -> Result<f64>,
{
    let csv_files = find_result_files(results_dir, duration)?;
    if csv_files.is_empty() {
        warn!(
            "{}(results): no result files for {duration}s runs under {}",
            Env::SYS_NAME,
            results_dir.display()
        );
    }

    let mut summaries = Vec::new();
    for csv_file in &csv_files {
        let params = match parse_run_params(csv_file) {
            Some(params) => params,
            None => {
                warn!(
                    "{}(results): skipping file with unparsable name: {}",
                    Env::SYS_NAME,
                    csv_file.display()
                );
                continue;
            }
        };

        summaries.push(FileSummary {
            params,
            metric: summarize(csv_file)?,
        });
    }

    Ok(summaries)
}

/// Group the per-file summaries by (users, cardinality) and average the
/// metric within each group. Repeated runs of the same configuration thus
/// collapse into one row. NaN summaries (runs with no successful request)
/// are left out of the average; the group mean is NaN only when no member
/// carries a value. BTreeMap keeps the output ordered by key.
pub fn aggregate(summaries: &[FileSummary]) -> BTreeMap<RunParams, f64> {
    let mut groups: BTreeMap<RunParams, Vec<f64>> = BTreeMap::new();
    for summary in summaries {
        groups.entry(summary.params).or_default().push(summary.metric);
    }

    groups
        .into_iter()
        .map(|(params, metrics)| {
            let valid: Vec<f64> = metrics.into_iter().filter(|m| !m.is_nan()).collect();
            let mean = if valid.is_empty() {
                f64::NAN
            } else {
                valid.iter().sum::<f64>() / valid.len() as f64
            };
            (params, mean)
        })
        .collect()
}

/// Write the rows of the aggregated table matching one user count to its own
/// CSV. An empty slice still produces a header-only file. Any previous file
/// of the same name is overwritten.
pub fn export_user_slice(
    table: &BTreeMap<RunParams, f64>,
    metric: &MetricKind,
    users: u32,
    duration: u32,
    output_dir: &Path,
) -> Result<PathBuf> {
    let csv_path = metric.slice_csv_path(output_dir, users, duration);
    if let Some(parent) = csv_path.parent() {
        fs::create_dir_all(parent).with_context(|| {
            format!(
                "{}(results): failed to create output directory: {}",
                Env::SYS_NAME,
                parent.display()
            )
        })?;
    }

    let mut writer = csv::Writer::from_path(&csv_path).with_context(|| {
        format!(
            "{}(results): failed to open output file: {}",
            Env::SYS_NAME,
            csv_path.display()
        )
    })?;
    writer.write_record(["Users", "Cardinality", metric.column_name()])?;
    for (params, value) in table.iter().filter(|(params, _)| params.users == users) {
        // a NaN mean (no successful request in the group) becomes an empty
        // field, the way dataframe tooling writes missing values
        let metric_field = if value.is_nan() {
            String::new()
        } else {
            value.to_string()
        };
        writer.write_record([
            params.users.to_string(),
            params.cardinality.to_string(),
            metric_field,
        ])?;
    }
    writer.flush()?;

    info!(
        "{}(results): aggregated {metric} data for {users} users saved to {}",
        Env::SYS_NAME,
        csv_path.display()
    );
    Ok(csv_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    #[test]
    fn parses_users_and_cardinality_from_file_name() {
        let path = Path::new("query_benchmark_results_-1reqs_600secs_25users_100card_run3.csv");
        let params = parse_run_params(path).unwrap();
        assert_eq!(params.users, 25);
        assert_eq!(params.cardinality, 100);
    }

    #[test]
    fn rejects_file_name_without_users_token() {
        let path = Path::new("query_benchmark_results_-1reqs_600secs_100card_run3.csv");
        assert!(parse_run_params(path).is_none());
    }

    #[test]
    fn rejects_file_name_with_non_numeric_cardinality() {
        let path = Path::new("query_benchmark_results_-1reqs_600secs_1users_bogus-card_x.csv");
        assert!(parse_run_params(path).is_none());
    }

    #[test]
    fn aggregate_ignores_nan_members_unless_group_has_nothing_else() {
        let mixed = RunParams {
            users: 1,
            cardinality: 10,
        };
        let all_nan = RunParams {
            users: 1,
            cardinality: 100,
        };
        let summaries = vec![
            FileSummary {
                params: mixed,
                metric: 25.0,
            },
            FileSummary {
                params: mixed,
                metric: f64::NAN,
            },
            FileSummary {
                params: all_nan,
                metric: f64::NAN,
            },
        ];

        let table = aggregate(&summaries);
        assert_eq!(table[&mixed], 25.0);
        assert!(table[&all_nan].is_nan());
    }

    #[test]
    fn aggregate_averages_repeated_configurations() {
        let params = RunParams {
            users: 1,
            cardinality: 10,
        };
        let other = RunParams {
            users: 25,
            cardinality: 10,
        };
        let summaries = vec![
            FileSummary {
                params,
                metric: 25.0,
            },
            FileSummary {
                params,
                metric: 20.0,
            },
            FileSummary {
                params: other,
                metric: 7.0,
            },
        ];

        let table = aggregate(&summaries);
        assert_eq!(table.len(), 2);
        assert_eq!(table[&params], 22.5);
        assert_eq!(table[&other], 7.0);
    }

    #[test]
    fn find_result_files_filters_on_duration_prefix() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "query_benchmark_results_-1reqs_600secs_1users_10card_a.csv",
            "query_benchmark_results_-1reqs_300secs_1users_10card_a.csv",
            "unrelated.csv",
            "query_benchmark_results_-1reqs_600secs_1users_10card_b.txt",
        ] {
            File::create(dir.path().join(name)).unwrap();
        }

        let files = find_result_files(dir.path(), 600).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0]
            .file_name()
            .unwrap()
            .to_str()
            .unwrap()
            .contains("600secs"));
    }

    #[test]
    fn find_result_files_requires_users_then_card_tokens() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            // tokens in the wrong order
            "query_benchmark_results_-1reqs_600secs_10card_5users_x.csv",
            // no trailing segment after the card token
            "query_benchmark_results_-1reqs_600secs_1users_10card.csv",
            // card token missing entirely
            "query_benchmark_results_-1reqs_600secs_1users_x.csv",
            "query_benchmark_results_-1reqs_600secs_5users_10card_x.csv",
        ] {
            File::create(dir.path().join(name)).unwrap();
        }

        let files = find_result_files(dir.path(), 600).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0]
            .file_name()
            .unwrap()
            .to_str()
            .unwrap()
            .contains("5users_10card_x"));
    }

    #[test]
    fn find_result_files_with_no_matches_is_empty_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let files = find_result_files(dir.path(), 600).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn export_with_no_matching_users_writes_header_only_csv() {
        let dir = tempfile::tempdir().unwrap();
        let table = BTreeMap::from([(
            RunParams {
                users: 1,
                cardinality: 10,
            },
            22.5,
        )]);

        let path =
            export_user_slice(&table, &MetricKind::Latency, 50, 600, dir.path()).unwrap();
        let contents = fs::read_to_string(path).unwrap();
        assert_eq!(contents, "Users,Cardinality,MeanLatencyMs\n");
    }

    #[test]
    fn export_writes_nan_mean_as_empty_field() {
        let dir = tempfile::tempdir().unwrap();
        let table = BTreeMap::from([
            (
                RunParams {
                    users: 1,
                    cardinality: 10,
                },
                f64::NAN,
            ),
            (
                RunParams {
                    users: 1,
                    cardinality: 100,
                },
                40.25,
            ),
        ]);

        let path = export_user_slice(&table, &MetricKind::Latency, 1, 600, dir.path()).unwrap();
        let contents = fs::read_to_string(path).unwrap();
        assert_eq!(contents, "Users,Cardinality,MeanLatencyMs\n1,10,\n1,100,40.25\n");
    }

    #[test]
    fn export_is_byte_identical_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let table = BTreeMap::from([
            (
                RunParams {
                    users: 1,
                    cardinality: 10,
                },
                22.5,
            ),
            (
                RunParams {
                    users: 1,
                    cardinality: 100,
                },
                40.25,
            ),
        ]);

        let path = export_user_slice(&table, &MetricKind::Latency, 1, 600, dir.path()).unwrap();
        let first = fs::read_to_string(&path).unwrap();
        export_user_slice(&table, &MetricKind::Latency, 1, 600, dir.path()).unwrap();
        let second = fs::read_to_string(&path).unwrap();

        assert_eq!(first, second);
        assert_eq!(
            first,
            "Users,Cardinality,MeanLatencyMs\n1,10,22.5\n1,100,40.25\n"
        );
    }

    #[test]
    fn collect_summaries_skips_unparsable_names() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir
            .path()
            .join("query_benchmark_results_-1reqs_600secs_1users_10card_a.csv");
        // matches the file pattern but the user count is not an integer
        let bad = dir
            .path()
            .join("query_benchmark_results_-1reqs_600secs_xusers_10card_a.csv");
        for path in [&good, &bad] {
            let mut file = File::create(path).unwrap();
            writeln!(file, "Latency (Deci-milliseconds),Failure").unwrap();
        }

        let summaries = collect_summaries(dir.path(), 600, |_| Ok(1.0)).unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(
            summaries[0].params,
            RunParams {
                users: 1,
                cardinality: 10
            }
        );
    }
}
