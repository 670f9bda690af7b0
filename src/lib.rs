pub mod commands;
pub mod config;
pub mod dashboard;
pub mod errors;
pub mod export;
pub mod metrics;
pub mod models;
pub mod scheduler;
pub mod source;
pub mod timestamps;
pub mod trend;
pub mod view;

use crate::commands::{execute, parse_command, ConsoleCommand};
use crate::config::AppSettings;
use crate::dashboard::DashboardCore;
use crate::scheduler::{RefreshScheduler, RefreshTask, TaskFuture, TokioScheduler};
use crate::source::WebhookSource;
use anyhow::Context;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_appender::non_blocking::WorkerGuard;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

pub fn run() -> anyhow::Result<()> {
    let settings = AppSettings::from_env()?;
    std::fs::create_dir_all(&settings.data_dir)
        .with_context(|| format!("creating data dir {}", settings.data_dir.display()))?;
    init_tracing(&settings.data_dir, &settings.log_level).map_err(anyhow::Error::msg)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;
    runtime.block_on(serve(settings))
}

async fn serve(settings: AppSettings) -> anyhow::Result<()> {
    let source = Arc::new(WebhookSource::new(&settings)?);
    tracing::info!(endpoint = source.endpoint(), "starting dashboard");

    let refresh_interval = settings.refresh_interval;
    let core = DashboardCore::new(source, settings);

    let task: RefreshTask = Arc::new({
        let core = core.clone();
        move || -> TaskFuture {
            let core = core.clone();
            Box::pin(async move { core.refresh().await.map(|_| ()) })
        }
    });
    let schedule = TokioScheduler.schedule("dashboard-refresh", refresh_interval, task);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{}", commands::HELP);
    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => line.context("reading console input")?,
        };
        let Some(line) = line else {
            break;
        };

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(message) => {
                eprintln!("{}", message);
                continue;
            }
        };
        if command == ConsoleCommand::Quit {
            break;
        }
        match execute(&core, &schedule, command).await {
            Ok(output) => println!("{}", output),
            Err(message) => eprintln!("{}", message),
        }
    }

    schedule.cancel();
    tracing::info!("dashboard stopped");
    Ok(())
}

fn init_tracing(data_dir: &Path, default_level: &str) -> Result<(), String> {
    let log_dir = data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).map_err(|error| error.to_string())?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "dashboard.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    let filter = tracing_subscriber::EnvFilter::try_from_env("RUST_LOG")
        .or_else(|_| tracing_subscriber::EnvFilter::try_from_env("LOG_LEVEL"))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| error.to_string())
}
