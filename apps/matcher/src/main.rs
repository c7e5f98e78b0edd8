mod cli;
mod config;
mod documents;
mod errors;
mod llm_client;
mod matching;
mod retrieval;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::Cli;
use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::matching::pipeline::run_match;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging; stdout is reserved for the run summary
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting skill matcher v{}", env!("CARGO_PKG_VERSION"));

    let llm = LlmClient::new(config.gateway_config()).context("Failed to build LLM client")?;
    info!("LLM client initialized (model: {})", llm.model());

    let embedder = config.embedder().context("Failed to build embedder")?;
    info!("Embedder initialized ({})", embedder.name());

    let job = cli.into_job(&config);
    info!(
        cv = %job.cv_path.display(),
        jd = %job.jd_path.display(),
        "Matching CV against job description"
    );

    let report = run_match(&job, Arc::new(llm), embedder)
        .await
        .context("Skill matching failed")?;

    println!(
        "Overall match: {:.1}% ({} missing required skills) -> {}",
        report.overall.match_score_percent,
        report.overall.missing_required_skills.len(),
        job.out_path.display()
    );

    Ok(())
}
