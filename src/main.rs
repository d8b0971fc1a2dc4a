use clap::{Parser, Subcommand};
use qbench_report::tasks::latency::Latency;
use qbench_report::tasks::results::{AnalysisArgs, MetricKind};
use qbench_report::tasks::throughput::Throughput;

#[derive(Parser)]
struct Cli {
    // The name of the task to execute
    #[clap(subcommand)]
    task: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Aggregate per-run mean latencies and plot them per user count
    Latency(AnalysisArgs),
    /// Aggregate per-run throughput and plot it per user count
    Throughput(AnalysisArgs),
    /// Run both the latency and the throughput pipeline
    All(AnalysisArgs),
    /// Re-render the charts from previously exported CSVs, without
    /// re-aggregating the raw results
    Plot {
        #[arg(long, value_enum)]
        metric: MetricKind,
        #[command(flatten)]
        args: AnalysisArgs,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match &cli.task {
        Command::Latency(args) => Latency::run(args)?,
        Command::Throughput(args) => Throughput::run(args)?,
        Command::All(args) => {
            Latency::run(args)?;
            Throughput::run(args)?;
        }
        Command::Plot { metric, args } => match metric {
            MetricKind::Latency => Latency::plot(args)?,
            MetricKind::Throughput => Throughput::plot(args)?,
        },
    }

    Ok(())
}
