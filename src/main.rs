//! CLI entry point for the content resolver.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use content_resolver::{
    ContentResolver, DirectoryAttachmentCreator, LogWarnings, ResolverOptions,
};
use tracing::{debug, info};

mod app_config;
mod cli;

use app_config::{FileConfig, load_config};
use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // stdout carries the JSON result
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let loaded = load_config(args.config.as_deref())?;
    if loaded.config.is_some() {
        debug!(path = ?loaded.path, "loaded config file");
    }
    let options = build_options(&args, &loaded.config_or_default());
    debug!(?options, "resolver options");

    let resolver = ContentResolver::new(options);
    let page = resolver
        .resolve(&args.url)
        .await
        .with_context(|| format!("Failed to resolve '{}'", args.url))?;

    info!(url = %page.url(), "resolution complete");
    let json = serde_json::to_string_pretty(&page).context("Failed to serialize page")?;
    println!("{json}");
    Ok(())
}

/// Merges CLI flags over file config over library defaults.
fn build_options(args: &Args, file: &FileConfig) -> ResolverOptions {
    let mut builder = ResolverOptions::builder().warning_sink(Arc::new(LogWarnings));

    if let Some(user_agent) = args.user_agent.clone().or_else(|| file.user_agent.clone()) {
        builder = builder.user_agent(user_agent);
    }
    if let Some(timeout_secs) = args.timeout.or(file.timeout_secs) {
        builder = builder.timeout(Duration::from_secs(timeout_secs));
    }

    let detect_redirects = !args.no_redirects && file.detect_redirects.unwrap_or(true);
    let parse_metadata = !args.no_metadata && file.parse_metadata.unwrap_or(true);
    builder = builder
        .redirect_policy(detect_redirects)
        .metadata_policy(parse_metadata)
        .download_error_policy(
            args.stop_on_download_error || file.stop_on_download_error.unwrap_or(false),
        );

    if let Some(dir) = args.download_dir.clone().or_else(|| file.download_dir.clone()) {
        let auto_extension = !args.no_auto_extension && file.auto_extension.unwrap_or(true);
        builder = builder.attachment_creator(Arc::new(
            DirectoryAttachmentCreator::new(dir).with_auto_extension(auto_extension),
        ));
    }

    builder.build()
}
