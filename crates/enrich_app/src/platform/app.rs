use std::io::IsTerminal;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use enrich_engine::{
    AlwaysResume, AlwaysStartFresh, AnthropicEnricher, BatchController, JsonDirectorySink,
    ResumePolicy,
};
use enrich_logging::{enrich_error, enrich_info, enrich_warn};
use tokio_util::sync::CancellationToken;

use super::cli::{Cli, ResumeMode};
use super::config::{AppConfig, Invocation};
use super::console::ConsoleSink;
use super::logging;
use super::prompt::StdinResumePrompt;

const EXIT_FATAL: u8 = 1;
const EXIT_CONFIG: u8 = 2;
const EXIT_SIGINT: i32 = 130;

pub async fn run_app() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = match AppConfig::from_cli(&cli, |key| std::env::var(key).ok()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Configuration error: {err:#}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    logging::initialize(config.log, config.log_level);
    enrich_info!("batch-enrich {} starting", env!("CARGO_PKG_VERSION"));

    let enricher = match AnthropicEnricher::new(config.enrich.clone()) {
        Ok(enricher) => enricher,
        Err(err) => {
            enrich_error!("Invalid enrichment settings: {err}");
            eprintln!("Configuration error: {err}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let controller = BatchController::new(
        config.controller.clone(),
        Arc::new(enricher),
        Arc::new(JsonDirectorySink::new(config.output_dir.clone())),
    )
    .with_resume_policy(resume_policy(config.resume))
    .with_events(Arc::new(ConsoleSink::new(config.retry_command())))
    .with_cancellation(cancel);

    let result = match &config.invocation {
        Invocation::Run { input } => controller.run(input).await,
        Invocation::Retry => controller.retry().await,
    };

    match result {
        Ok(report) => {
            enrich_info!(
                "Run ended in phase {} ({} of {} completed)",
                report.phase,
                report.summary.completed,
                report.summary.total
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            enrich_error!("Run aborted: {err}");
            eprintln!("Error: {err}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}

fn resume_policy(mode: Option<ResumeMode>) -> Arc<dyn ResumePolicy> {
    let mode = mode.unwrap_or(if std::io::stdin().is_terminal() {
        ResumeMode::Ask
    } else {
        ResumeMode::Yes
    });
    match mode {
        ResumeMode::Ask => Arc::new(StdinResumePrompt),
        ResumeMode::Yes => Arc::new(AlwaysResume),
        ResumeMode::No => Arc::new(AlwaysStartFresh),
    }
}

/// First Ctrl-C stops between items; a second one exits immediately.
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            enrich_warn!("Could not listen for Ctrl-C");
            return;
        }
        enrich_warn!("Interrupt received, stopping after the current item");
        eprintln!("\nStopping after the current item (Ctrl-C again to quit now)...");
        cancel.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            enrich_error!("Second interrupt, exiting without a final save");
            std::process::exit(EXIT_SIGINT);
        }
    });
}
