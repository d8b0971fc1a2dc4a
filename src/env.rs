use std::path::{Path, PathBuf};

pub struct Env {}

impl Env {
    pub const SYS_NAME: &'static str = "qbench";

    /// Where the load generator drops its raw result CSVs.
    pub const DEFAULT_RESULTS_DIR: &'static str = "../terraform-aws/results";

    /// Concurrent user counts we report on.
    pub const DEFAULT_USER_CONFIGS: [u32; 3] = [1, 25, 50];

    /// Run durations (in seconds) of the two benchmark scenarios.
    pub const DEFAULT_DURATIONS_SECS: [u32; 2] = [600, 300];

    /// Filename prefix shared by every result file of a given duration.
    pub fn result_file_prefix(duration_secs: u32) -> String {
        format!("query_benchmark_results_-1reqs_{duration_secs}secs_")
    }

    /// Per-metric output directory, e.g. `<out>/latency`.
    pub fn metric_root(output_dir: &Path, metric_name: &str) -> PathBuf {
        let mut path = output_dir.to_path_buf();
        path.push(metric_name);
        path
    }
}
