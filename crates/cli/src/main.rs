// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! agyc - multi-account task orchestrator

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};

use agyc_core::OrchestratorConfig;

#[derive(Parser)]
#[command(name = "agyc", version, about = "Multi-account task orchestrator")]
struct Cli {
    /// Path to the orchestrator's JSON or YAML configuration file
    #[arg(long, value_name = "PATH")]
    config: PathBuf,

    /// Log rendering: human-readable or newline-delimited JSON
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// Load and validate configuration, print a summary, and exit
    #[arg(long)]
    check_config: bool,
}

#[derive(Copy, Clone, Debug, Default, ValueEnum)]
enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.check_config {
        let config = OrchestratorConfig::load(&cli.config)?;
        println!(
            "config ok: {} account(s), routing={:?}, listening on {}:{}",
            config.accounts.len(),
            config.dispatcher.routing,
            config.server.host,
            config.server.port,
        );
        return Ok(());
    }

    init_tracing(cli.log_format);

    agyc_server::serve(&cli.config).await?;
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Pretty => subscriber.init(),
        LogFormat::Json => subscriber.json().init(),
    }
}
