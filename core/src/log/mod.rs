//! Tracing bootstrap for the gallery engine and its shells.
//!
//! Output always goes to stderr so stdout stays free for responses. A rolling file sink is
//! added when [`LogConfig::file_sink`] names a directory. [`init`] may be called more than
//! once; only the first call installs anything.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::SystemTime;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::Rotation;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, filter::LevelFilter, util::SubscriberInitExt};

const ENV_FILTER_VARS: [&str; 2] = ["GALLERY_LOG", "RUST_LOG"];

static LOG_HANDLE: OnceLock<LogHandle> = OnceLock::new();

pub use tracing_subscriber::filter::LevelFilter as LogLevel;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum LogRolling {
    Hourly,
    Daily,
    Never,
}

impl From<LogRolling> for Rotation {
    fn from(rolling: LogRolling) -> Self {
        match rolling {
            LogRolling::Hourly => Rotation::HOURLY,
            LogRolling::Daily => Rotation::DAILY,
            LogRolling::Never => Rotation::NEVER,
        }
    }
}

/// Rolling file sink settings.
#[derive(Debug, Clone)]
pub struct FileSink {
    pub directory: PathBuf,
    /// Log files are named `<prefix>.<date>.log`.
    pub prefix: String,
    /// Rolled files kept on startup. `None` keeps everything.
    pub retention: Option<usize>,
    pub level: LevelFilter,
    pub rolling: LogRolling,
}

impl FileSink {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            prefix: "gallery".to_string(),
            retention: Some(7),
            level: LevelFilter::DEBUG,
            rolling: LogRolling::Daily,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub console_level: LevelFilter,
    pub file_sink: Option<FileSink>,
    /// Forward `log` crate records into `tracing`.
    pub capture_log: bool,
    /// Filter directive such as `gallery_core=debug`. Falls back to `GALLERY_LOG`, then
    /// `RUST_LOG`.
    pub env_filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            console_level: LevelFilter::WARN,
            file_sink: None,
            capture_log: true,
            env_filter: None,
        }
    }
}

impl LogConfig {
    /// Console logging at `level` plus nothing else.
    pub fn console(level: LevelFilter) -> Self {
        Self { console_level: level, ..Self::default() }
    }

    pub fn with_file_sink(mut self, sink: FileSink) -> Self {
        self.file_sink = Some(sink);
        self
    }

    pub fn with_env_filter(mut self, directive: impl Into<String>) -> Self {
        self.env_filter = Some(directive.into());
        self
    }

    fn directive(&self) -> String {
        self.env_filter
            .clone()
            .or_else(|| ENV_FILTER_VARS.iter().find_map(|var| std::env::var(var).ok()))
            .filter(|directive| !directive.trim().is_empty())
            .unwrap_or_else(|| "info".to_string())
    }

    fn max_level(&self) -> LevelFilter {
        let file_level = self.file_sink.as_ref().map_or(LevelFilter::OFF, |sink| sink.level);
        self.console_level.max(file_level)
    }
}

/// Keeps the file writer flushing for as long as the process lives.
#[derive(Debug)]
pub struct LogHandle {
    _guard: Option<WorkerGuard>,
    directory: Option<PathBuf>,
}

impl LogHandle {
    /// Directory of the file sink, if one was installed.
    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }
}

/// Install the global subscriber. Later calls return the first handle and ignore `config`.
pub fn init(config: LogConfig) -> Result<&'static LogHandle> {
    if let Some(handle) = LOG_HANDLE.get() {
        return Ok(handle);
    }
    let handle = setup(config)?;
    Ok(LOG_HANDLE.get_or_init(|| handle))
}

fn setup(config: LogConfig) -> Result<LogHandle> {
    if config.capture_log {
        let max_level = log_level(config.max_level());
        let _ = tracing_log::LogTracer::builder().with_max_level(max_level).init();
    }

    let env_filter =
        EnvFilter::try_new(config.directive()).context("parsing log filter directive")?;
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(config.console_level);

    let (file_output, guard, directory) = match &config.file_sink {
        Some(sink) => {
            let (writer, guard) = file_writer(sink)?;
            (Some((writer, sink.level)), Some(guard), Some(sink.directory.clone()))
        }
        None => (None, None, None),
    };
    let file_layer = file_output.map(|(writer, level)| {
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(writer)
            .with_file(true)
            .with_line_number(true)
            .with_filter(level)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|err| anyhow::anyhow!(err))?;

    Ok(LogHandle { _guard: guard, directory })
}

fn file_writer(sink: &FileSink) -> Result<(NonBlocking, WorkerGuard)> {
    fs::create_dir_all(&sink.directory)
        .with_context(|| format!("creating log directory at {}", sink.directory.display()))?;
    if let Some(retention) = sink.retention.filter(|retention| *retention > 0) {
        prune_old_logs(&sink.directory, &sink.prefix, retention)
            .context("applying log retention policy")?;
    }

    let appender = tracing_appender::rolling::Builder::new()
        .rotation(sink.rolling.into())
        .filename_prefix(&sink.prefix)
        .filename_suffix("log")
        .build(&sink.directory)
        .context("creating rolling log appender")?;
    Ok(tracing_appender::non_blocking(appender))
}

fn log_level(level: LevelFilter) -> log::LevelFilter {
    match level {
        LevelFilter::OFF => log::LevelFilter::Off,
        LevelFilter::ERROR => log::LevelFilter::Error,
        LevelFilter::WARN => log::LevelFilter::Warn,
        LevelFilter::INFO => log::LevelFilter::Info,
        LevelFilter::DEBUG => log::LevelFilter::Debug,
        LevelFilter::TRACE => log::LevelFilter::Trace,
    }
}

fn prune_old_logs(dir: &Path, prefix: &str, retention: usize) -> Result<()> {
    let mut logs: Vec<(PathBuf, SystemTime)> = fs::read_dir(dir)
        .with_context(|| format!("reading log directory at {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let meta = entry.metadata().ok().filter(|meta| meta.is_file())?;
            let path = entry.path();
            has_prefix(&path, prefix)
                .then(|| (path, meta.modified().unwrap_or(SystemTime::UNIX_EPOCH)))
        })
        .collect();
    if logs.len() <= retention {
        return Ok(());
    }

    logs.sort_by_key(|(_, modified)| *modified);
    let excess = logs.len() - retention;
    for (path, _) in logs.into_iter().take(excess) {
        let _ = fs::remove_file(&path);
    }
    Ok(())
}

fn has_prefix(path: &Path, prefix: &str) -> bool {
    path.file_name().and_then(OsStr::to_str).is_some_and(|name| name.starts_with(prefix))
}

/// `logs` inside the platform data directory, or the temp dir when there is none.
pub fn default_log_directory() -> PathBuf {
    match directories::ProjectDirs::from("org", "Gallery", "gallery") {
        Some(dirs) => dirs.data_dir().join("logs"),
        None => std::env::temp_dir().join("gallery-logs"),
    }
}
