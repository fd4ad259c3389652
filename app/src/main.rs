mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use gallery_core::DepthBudget;
use gallery_core::log::{FileSink, LogConfig, LogLevel};

/// List the media a gallery client would see at a location.
#[derive(Parser, Debug, Clone)]
#[command(name = "gallery", version = gallery_core::version())]
pub struct Args {
    /// Directory holding the storage tree.
    pub root: PathBuf,

    /// Location relative to the virtual root, percent-encoded as a client sends it.
    #[arg(short, long, default_value = "")]
    pub location: String,

    /// Tree path of the virtual root, e.g. the target of a share link.
    #[arg(long, default_value = "")]
    pub share: String,

    /// Principal the request runs as.
    #[arg(short, long)]
    pub user: Option<String>,

    #[arg(long, requires = "user")]
    pub display_name: Option<String>,

    /// Comma separated client features.
    #[arg(long, default_value = "")]
    pub features: String,

    /// Semicolon separated MIME types. Defaults to the configured list.
    #[arg(long)]
    pub media_types: Option<String>,

    /// Album etag the client already holds.
    #[arg(long)]
    pub etag: Option<String>,

    /// Levels to descend below the folder; -1 walks everything.
    #[arg(short, long, allow_negative_numbers = true, value_parser = parse_depth)]
    pub depth: Option<DepthBudget>,

    /// Configuration file. Defaults to the platform config directory.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Also write logs to rolling files in this directory.
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Raise console verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

fn parse_depth(raw: &str) -> Result<DepthBudget, String> {
    let levels: i32 = raw.parse().map_err(|err| format!("{raw:?} is not a number: {err}"))?;
    DepthBudget::new(levels).ok_or_else(|| format!("depth must be -1 or more, got {levels}"))
}

fn main() -> ExitCode {
    let args = Args::parse();

    let console_level = match args.verbose {
        0 => LogLevel::WARN,
        1 => LogLevel::INFO,
        2 => LogLevel::DEBUG,
        _ => LogLevel::TRACE,
    };
    let mut log_config = LogConfig::console(console_level);
    if let Some(dir) = &args.log_dir {
        log_config = log_config.with_file_sink(FileSink::new(dir));
    }
    if let Err(err) = gallery_core::log::init(log_config) {
        eprintln!("failed to initialise logging: {err:#}");
    }

    match commands::files(&args) {
        Ok(reply) => {
            let status = reply.exit_code();
            match serde_json::to_string_pretty(&reply) {
                Ok(json) => println!("{json}"),
                Err(err) => {
                    eprintln!("failed to serialize response: {err}");
                    return ExitCode::FAILURE;
                }
            }
            status
        }
        Err(err) => {
            tracing::error!("{err:#}");
            eprintln!("gallery: {err:#}");
            ExitCode::from(2)
        }
    }
}
