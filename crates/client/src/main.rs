// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use sockline::command;
use sockline::config::{Command, Config};
use sockline::host::ConsoleHost;

#[tokio::main]
async fn main() {
    let config = Config::parse();

    if let Err(e) = config.validate() {
        eprintln!("error: {e}");
        std::process::exit(2);
    }

    init_tracing(&config);

    match run(config).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("fatal: {e:#}");
            std::process::exit(1);
        }
    }
}

fn init_tracing(config: &Config) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    // Logs go to stderr; stdout carries responses and frames.
    match config.log_format.as_str() {
        "json" => {
            fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).json().init();
        }
        _ => {
            fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
        }
    }
}

async fn run(config: Config) -> anyhow::Result<i32> {
    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, shutting down");
                shutdown.cancel();
            }
        });
    }

    let host = Arc::new(ConsoleHost);
    match config.command {
        Command::Send { ref action, .. } => {
            let message = config.message()?;
            match command::send(&config, host, action, message, shutdown).await {
                Ok(reply) => {
                    println!("{reply}");
                    Ok(0)
                }
                Err(e) => {
                    error!("{e:#}");
                    Ok(1)
                }
            }
        }
        Command::Listen => {
            let print = |line: String| println!("{line}");
            let sessions = command::listen(&config, host, shutdown, print).await?;
            info!(sessions, "listener stopped");
            Ok(0)
        }
    }
}
