//! dispatchq CLI — run the dispatch simulation.

use clap::{Args, Parser, Subcommand};
use dispatchq::config::{Config, DispatchConfig};
use dispatchq::coordinator::{Coordinator, RunSummary};
use dispatchq::event::TracingReporter;
use dispatchq::simulator::SleepSimulator;
use dispatchq::telemetry::{TelemetryConfig, init_telemetry};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "dispatchq", about = "Bounded task dispatch with deadline-bounded submission")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run producers and workers until every producer reaches its target
    Run {
        #[command(flatten)]
        overrides: Overrides,
        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the effective dispatch configuration as TOML
    Config {
        #[command(flatten)]
        overrides: Overrides,
    },
}

#[derive(Args)]
struct Overrides {
    /// Dispatch TOML file (defaults to $DISPATCHQ_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Worker names, comma separated
    #[arg(long, value_delimiter = ',')]
    workers: Option<Vec<String>>,
    /// Producer names, comma separated
    #[arg(long, value_delimiter = ',')]
    producers: Option<Vec<String>>,
    /// Queue capacity
    #[arg(long)]
    capacity: Option<usize>,
    /// Successful cycles per producer
    #[arg(long)]
    target: Option<u32>,
    /// Submission deadline in milliseconds (0 waits forever)
    #[arg(long)]
    deadline_ms: Option<u64>,
    /// Milliseconds per simulated time unit
    #[arg(long)]
    time_unit_ms: Option<u64>,
}

impl Overrides {
    fn resolve(self, config: &Config) -> anyhow::Result<DispatchConfig> {
        let mut dispatch = match self.config {
            Some(path) => DispatchConfig::load(&path)?,
            None => config.dispatch()?,
        };
        if let Some(workers) = self.workers {
            dispatch.workers = workers;
        }
        if let Some(producers) = self.producers {
            dispatch.producers = producers;
        }
        if let Some(capacity) = self.capacity {
            dispatch.capacity = capacity;
        }
        if let Some(target) = self.target {
            dispatch.target = target;
        }
        if let Some(deadline_ms) = self.deadline_ms {
            dispatch.deadline_ms = deadline_ms;
        }
        if let Some(time_unit_ms) = self.time_unit_ms {
            dispatch.time_unit_ms = time_unit_ms;
        }
        dispatch.validate()?;
        Ok(dispatch)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Command::Run { overrides, json } => {
            let dispatch = overrides.resolve(&config)?;
            cmd_run(&config, dispatch, json).await
        }
        Command::Config { overrides } => {
            let dispatch = overrides.resolve(&config)?;
            print!("{}", dispatch.to_toml_string()?);
            Ok(())
        }
    }
}

async fn cmd_run(config: &Config, dispatch: DispatchConfig, json: bool) -> anyhow::Result<()> {
    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "dispatchq".to_string(),
        log_level: config.log_level.clone(),
    })?;

    let simulator = SleepSimulator::new(dispatch.time_unit());
    let coordinator = Coordinator::new(dispatch, simulator, Arc::new(TracingReporter));

    let shutdown = coordinator.shutdown_handle();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        shutdown.cancel();
    });

    let summary = coordinator.run().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("{:<12}  {:>9}  {:>9}", "PRODUCER", "COMPLETED", "ABANDONED");
    println!("{}", "-".repeat(34));
    for report in &summary.producers {
        println!(
            "{:<12}  {:>9}  {:>9}",
            report.producer, report.completed, report.abandoned
        );
    }

    println!();
    println!("{:<12}  {:>9}", "WORKER", "SERVICED");
    println!("{}", "-".repeat(23));
    for (worker, serviced) in &summary.workers {
        println!("{worker:<12}  {serviced:>9}");
    }

    println!(
        "\n{} completed, {} abandoned in {:.1}s",
        summary.completed,
        summary.abandoned,
        summary.elapsed_ms as f64 / 1000.0
    );
}
