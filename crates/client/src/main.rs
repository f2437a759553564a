// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use clap::Parser;
use tracing::{error, warn};

use uxa_client::config::Config;
use uxa_client::{FileTokenStore, HttpClient, SessionEvent};

#[tokio::main]
async fn main() {
    let config = Config::parse();

    if let Err(e) = config.validate() {
        eprintln!("error: {e}");
        std::process::exit(2);
    }

    init_tracing(&config);
    let _ = rustls::crypto::ring::default_provider().install_default();

    match run(config).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("fatal: {e:#}");
            eprintln!("error: {e:#}");
            std::process::exit(1);
        }
    }
}

fn init_tracing(config: &Config) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));

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
    let path = config.token_path();
    let store = Arc::new(FileTokenStore::open(&path)?);
    let client = HttpClient::connect(&config.settings(), store);

    let mut events = client.subscribe();
    tokio::spawn(async move {
        while let Ok(SessionEvent::Ended { reason }) = events.recv().await {
            warn!(reason = reason.as_deref().unwrap_or("-"), "session ended, stored tokens cleared");
        }
    });

    Ok(uxa_client::command::run(&config.command, &client).await)
}
