use std::time::Duration;

use clap::Parser;
use error::AppError;
use indicatif::MultiProgress;
use reel_engine::{DownloaderConfig, ProxyAuth, ProxyConfig, ProxyType};
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;
use tracing_subscriber::fmt::writer::MakeWriterExt;

mod cli;
mod commands;
mod error;
mod utils;

use cli::{CliArgs, Command, HttpArgs};

fn main() {
    if let Err(e) = bootstrap() {
        eprintln!("Error: {e}");
        // Log the full error for debugging
        error!(error = ?e, "Application failed");
        std::process::exit(1);
    }
}

#[tokio::main]
async fn bootstrap() -> Result<(), AppError> {
    // AWS credentials and region may live in a .env file next to the binary
    dotenvy::dotenv().ok();

    // Parse command-line arguments
    let args = CliArgs::parse();

    // Setup logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open("reel.log")?;

    let multi_writer = MakeWriterExt::and(std::io::stdout, log_file);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(multi_writer)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| AppError::Initialization(e.to_string()))?;

    info!("reel {} - HLS window and byte-range fetcher", env!("CARGO_PKG_VERSION"));

    // Log HTTP timeout settings
    info!(
        "HTTP timeout configuration: overall={}s, connect={}s, read={}s",
        args.http.timeout, args.http.connect_timeout, args.http.read_timeout
    );

    let download_config = build_downloader_config(&args.http)?;
    let multi = MultiProgress::new();

    match args.command {
        Command::Fetch(fetch) => {
            commands::fetch::run(fetch, &args.http, download_config, &multi, args.show_progress)
                .await
        }
        Command::Mux(mux) => {
            commands::mux::run(mux, &args.http, download_config, &multi, args.show_progress).await
        }
    }
}

/// Client configuration shared by every command.
fn build_downloader_config(http: &HttpArgs) -> Result<DownloaderConfig, AppError> {
    let builder = DownloaderConfig::builder()
        .timeouts(
            Duration::from_secs(http.timeout),
            Duration::from_secs(http.connect_timeout),
            Duration::from_secs(http.read_timeout),
        )
        .accept_invalid_certs(http.insecure);

    if http.insecure {
        info!("TLS certificate verification disabled (--insecure)");
    }

    let builder = if http.no_proxy {
        info!("All proxy settings disabled (--no-proxy flag)");
        builder.direct()
    } else if let Some(proxy_url) = http.proxy.as_ref() {
        let proxy_type = http
            .proxy_type
            .parse::<ProxyType>()
            .map_err(AppError::InvalidInput)?;

        // Credentials only count when both halves are given
        let auth = match (&http.proxy_user, &http.proxy_pass) {
            (Some(username), Some(password)) => Some(ProxyAuth {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        };

        info!(
            proxy_url = %proxy_url,
            proxy_type = ?proxy_type,
            has_auth = auth.is_some(),
            "Using explicit proxy configuration for downloads"
        );

        builder.proxy(ProxyConfig {
            url: proxy_url.clone(),
            proxy_type,
            auth,
        })
    } else {
        builder
    };

    Ok(builder.build())
}
