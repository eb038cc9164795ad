use std::net::Ipv4Addr;

use anyhow::{bail, Context as _, Result};
use clap::{Parser, Subcommand};
use courier::jobs::{Broker, JobRegistry, Worker};
use courier::mail::{SendEmailJob, SmtpMailer, WorkerContext};
use courier::routes::{self, Context};
use courier::{AppConfig, LogSink};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "courier", about = "Queue email jobs over HTTP and serve the audit log")]
struct Cli {
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    verbosity: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP front end
    Serve {
        /// Leave job processing to `courier worker` processes
        #[arg(long, default_value_t = false)]
        no_worker: bool,
    },
    /// Run a queue worker
    Worker {
        /// Process the jobs already queued, then exit
        #[arg(long, default_value_t = false)]
        drain: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbosity);

    let config = AppConfig::load().context("loading configuration from the environment")?;
    tracing::debug!(?config, "configuration loaded");

    let broker = Broker::from_url(&config.broker_url, &config.queue_name, config.broker_timeout())
        .context("configuring the broker")?;
    let sink = LogSink::new(&config.log_path);

    match cli.command {
        Commands::Serve { no_worker } => {
            if no_worker && !broker.is_external() {
                bail!("--no-worker needs an external broker, but BROKER_URL is `memory`");
            }
            let worker = if no_worker {
                None
            } else {
                Some(build_worker(&config, broker.clone(), sink.clone())?.start())
            };

            let ctx = Context { queue: broker, sink };
            let served = courier::serve((Ipv4Addr::UNSPECIFIED, config.port), routes::router(ctx)).await;

            // Jobs taken off the queue still get their log entry before exit.
            if let Some(worker) = worker {
                worker.shutdown().await;
            }
            served.context("error running HTTP server")?;
        }
        Commands::Worker { drain } => {
            if !broker.is_external() {
                bail!("a standalone worker needs an external broker, but BROKER_URL is `memory`");
            }
            let worker = build_worker(&config, broker, sink)?;

            if drain {
                let drained = worker.drain().await.context("draining the queue")?;
                tracing::info!(completed = drained.completed, failed = drained.failed, "queue drained");
            } else {
                let handle = worker.start();
                courier::shutdown_signal().await;
                handle.shutdown().await;
            }
        }
    }
    Ok(())
}

fn init_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}

fn build_worker(
    config: &AppConfig,
    broker: Broker,
    sink: LogSink,
) -> Result<Worker<Broker, WorkerContext>> {
    let mailer =
        SmtpMailer::from_config(config.mailer_config()).context("configuring the SMTP mailer")?;
    tracing::info!(
        host = %config.smtp_host,
        port = config.smtp_port,
        from = %mailer.from_address(),
        "mailer ready"
    );

    let ctx = WorkerContext {
        mailer,
        sender: config.email_address.clone(),
        sink,
    };
    let registry = JobRegistry::new().register::<SendEmailJob<WorkerContext>>();
    tracing::debug!(job_types = ?registry.job_types().collect::<Vec<_>>(), "registered jobs");

    Ok(Worker::new(broker, registry, ctx).concurrency(config.worker_concurrency))
}
