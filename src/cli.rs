//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Resolve one URL into classified content.
///
/// HTML is parsed for a meta-refresh redirect and meta tags; anything else is
/// downloaded (when a download directory is configured) and its file type
/// sniffed. The result is printed as JSON.
#[derive(Parser, Debug)]
#[command(name = "resolve")]
#[command(author, version, about)]
pub struct Args {
    /// URL to resolve
    pub url: String,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Config file to read instead of the default location
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Download non-HTML content into this directory
    #[arg(short = 'd', long, value_name = "DIR")]
    pub download_dir: Option<PathBuf>,

    /// Keep the initial file name instead of renaming to the sniffed extension
    #[arg(long)]
    pub no_auto_extension: bool,

    /// Do not collect HTML meta tags
    #[arg(long)]
    pub no_metadata: bool,

    /// Do not look for HTML meta-refresh redirects
    #[arg(long)]
    pub no_redirects: bool,

    /// Request timeout in seconds (1-3600)
    #[arg(short = 't', long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub timeout: Option<u64>,

    /// User-Agent header to send
    #[arg(long, value_name = "UA")]
    pub user_agent: Option<String>,

    /// Fail instead of warning when the download fails
    #[arg(long)]
    pub stop_on_download_error: bool,
}
