//! # Log sinks
//!
//! The service logs through `tracing`. [`LogRegistry`] owns the subscriber
//! pipeline: four named sinks, each behind its own reloadable level filter, so
//! levels can be changed while the server runs.
//!
//! | sink             | writer                | records            |
//! |------------------|-----------------------|--------------------|
//! | `console`        | stdout                | application        |
//! | `project`        | `{log_dir}/project.log` | application      |
//! | `access_console` | stdout                | access             |
//! | `access_file`    | `{log_dir}/access.log`  | access           |
//!
//! Access records are those emitted under the `tower_http`, `sqlx`,
//! `sea_orm` and `access` targets. A sink without a level is switched off.

use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fmt,
    fs::{self, File, OpenOptions},
    io,
    path::{Path, PathBuf},
    str::FromStr,
    sync::{Mutex, PoisonError},
};
use tracing_subscriber::{
    Layer, Registry,
    filter::{LevelFilter, Targets},
    layer::{Layered, SubscriberExt},
    reload,
    util::{SubscriberInitExt, TryInitError},
};
use utoipa::ToSchema;

const ACCESS_TARGETS: [&str; 4] = ["tower_http", "sqlx", "sea_orm", "access"];

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("cannot open log file {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("cannot reload log filter: {0}")]
    Reload(#[from] reload::Error),
    #[error("a global subscriber is already installed: {0}")]
    Init(#[from] TryInitError),
    #[error("unknown log level `{0}`")]
    UnknownLevel(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    /// Reported at INFO
    Success,
    Warning,
    Error,
    /// Reported at ERROR
    Critical,
}

impl LogLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Success => "SUCCESS",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        }
    }

    #[must_use]
    pub fn filter(self) -> LevelFilter {
        match self {
            Self::Trace => LevelFilter::TRACE,
            Self::Debug => LevelFilter::DEBUG,
            Self::Info | Self::Success => LevelFilter::INFO,
            Self::Warning => LevelFilter::WARN,
            Self::Error | Self::Critical => LevelFilter::ERROR,
        }
    }

    /// Parse a sink level where `NONE` (or an empty value) switches the sink off.
    pub fn parse_optional(raw: &str) -> Result<Option<Self>, LogError> {
        let raw = raw.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case("none") {
            return Ok(None);
        }
        raw.parse().map(Some)
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_uppercase().as_str() {
            "TRACE" => Self::Trace,
            "DEBUG" => Self::Debug,
            "INFO" => Self::Info,
            "SUCCESS" => Self::Success,
            "WARN" | "WARNING" => Self::Warning,
            "ERROR" => Self::Error,
            "CRITICAL" => Self::Critical,
            _ => return Err(LogError::UnknownLevel(s.to_string())),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum SinkKind {
    Console,
    Project,
    AccessConsole,
    AccessFile,
}

impl SinkKind {
    pub const ALL: [Self; 4] = [
        Self::Console,
        Self::Project,
        Self::AccessConsole,
        Self::AccessFile,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Console => "console",
            Self::Project => "project",
            Self::AccessConsole => "access_console",
            Self::AccessFile => "access_file",
        }
    }

    fn is_access(self) -> bool {
        matches!(self, Self::AccessConsole | Self::AccessFile)
    }

    fn file_name(self) -> Option<&'static str> {
        match self {
            Self::Project => Some("project.log"),
            Self::AccessFile => Some("access.log"),
            Self::Console | Self::AccessConsole => None,
        }
    }
}

/// Level of every sink; `None` is a sink that is switched off.
///
/// Also the body of the logger configuration endpoint, where `None` leaves
/// a sink unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LogLevels {
    #[serde(default)]
    pub console: Option<LogLevel>,
    #[serde(default)]
    pub project: Option<LogLevel>,
    #[serde(default)]
    pub access_console: Option<LogLevel>,
    #[serde(default)]
    pub access_file: Option<LogLevel>,
}

impl LogLevels {
    #[must_use]
    pub fn get(&self, sink: SinkKind) -> Option<LogLevel> {
        match sink {
            SinkKind::Console => self.console,
            SinkKind::Project => self.project,
            SinkKind::AccessConsole => self.access_console,
            SinkKind::AccessFile => self.access_file,
        }
    }

    pub fn set(&mut self, sink: SinkKind, level: Option<LogLevel>) {
        let slot = match sink {
            SinkKind::Console => &mut self.console,
            SinkKind::Project => &mut self.project,
            SinkKind::AccessConsole => &mut self.access_console,
            SinkKind::AccessFile => &mut self.access_file,
        };
        *slot = level;
    }
}

#[derive(Clone, Debug, Default)]
pub struct LogConfig {
    pub levels: LogLevels,
    /// Directory of the file sinks; without one they discard their records.
    pub log_dir: Option<PathBuf>,
}

type SinkHandle = reload::Handle<Targets, Registry>;
type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Subscriber built by [`LogRegistry::build`]
pub type LogSubscriber = Layered<Vec<BoxedLayer>, Registry>;

fn sink_filter(sink: SinkKind, level: Option<LogLevel>) -> Targets {
    let level = level.map_or(LevelFilter::OFF, LogLevel::filter);
    if sink.is_access() {
        Targets::new().with_targets(ACCESS_TARGETS.map(|target| (target, level)))
    } else {
        Targets::new()
            .with_default(level)
            .with_targets(ACCESS_TARGETS.map(|target| (target, LevelFilter::OFF)))
    }
}

fn open_log_file(dir: &Path, name: &str) -> Result<File, LogError> {
    let path = dir.join(name);
    fs::create_dir_all(dir)
        .and_then(|()| OpenOptions::new().create(true).append(true).open(&path))
        .map_err(|source| LogError::Io { path, source })
}

fn sink_layer(
    sink: SinkKind,
    filter: reload::Layer<Targets, Registry>,
    log_dir: Option<&Path>,
) -> Result<BoxedLayer, LogError> {
    let layer = match (sink.file_name(), log_dir) {
        (None, _) => tracing_subscriber::fmt::layer()
            .with_writer(io::stdout)
            .with_filter(filter)
            .boxed(),
        (Some(name), Some(dir)) => tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(Mutex::new(open_log_file(dir, name)?))
            .with_filter(filter)
            .boxed(),
        (Some(_), None) => tracing_subscriber::fmt::layer()
            .with_writer(io::sink)
            .with_filter(filter)
            .boxed(),
    };
    Ok(layer)
}

/// Named log sinks with levels that can be changed at runtime.
///
/// Create one at startup with [`LogRegistry::init`], share it with whatever
/// reconfigures logging, and call [`LogRegistry::shutdown`] before exit.
pub struct LogRegistry {
    handles: BTreeMap<SinkKind, SinkHandle>,
    levels: Mutex<LogLevels>,
}

impl LogRegistry {
    /// Build the sinks and their subscriber without installing it.
    pub fn build(config: &LogConfig) -> Result<(Self, LogSubscriber), LogError> {
        let mut handles = BTreeMap::new();
        let mut layers = Vec::with_capacity(SinkKind::ALL.len());
        for sink in SinkKind::ALL {
            let (filter, handle) = reload::Layer::new(sink_filter(sink, config.levels.get(sink)));
            layers.push(sink_layer(sink, filter, config.log_dir.as_deref())?);
            handles.insert(sink, handle);
        }

        let registry = Self {
            handles,
            levels: Mutex::new(config.levels.clone()),
        };
        Ok((registry, Registry::default().with(layers)))
    }

    /// Build the sinks and install them as the global subscriber, also
    /// forwarding `log` records.
    pub fn init(config: &LogConfig) -> Result<Self, LogError> {
        let (registry, subscriber) = Self::build(config)?;
        subscriber.try_init()?;
        tracing::info!(levels = ?registry.levels(), "loggers initialised");
        Ok(registry)
    }

    #[must_use]
    pub fn levels(&self) -> LogLevels {
        self.levels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the level of one sink; `None` switches it off.
    pub fn set_level(&self, sink: SinkKind, level: Option<LogLevel>) -> Result<(), LogError> {
        let old = {
            let mut levels = self.levels.lock().unwrap_or_else(PoisonError::into_inner);
            let old = levels.get(sink);
            if old == level {
                return Ok(());
            }
            if let Some(handle) = self.handles.get(&sink) {
                handle.reload(sink_filter(sink, level))?;
            }
            levels.set(sink, level);
            old
        };

        if let Some(old) = old {
            tracing::warn!(sink = sink.name(), level = %old, "removed log sink");
        }
        if let Some(level) = level {
            tracing::info!(sink = sink.name(), level = %level, "added log sink");
        }
        Ok(())
    }

    /// Apply every level set in `changes`, returning the resulting table.
    pub fn apply(&self, changes: &LogLevels) -> Result<LogLevels, LogError> {
        for sink in SinkKind::ALL {
            if let Some(level) = changes.get(sink) {
                self.set_level(sink, Some(level))?;
            }
        }
        Ok(self.levels())
    }

    /// Switch every sink off.
    pub fn shutdown(&self) -> Result<(), LogError> {
        tracing::info!("shutting down loggers");
        for sink in SinkKind::ALL {
            if let Some(handle) = self.handles.get(&sink) {
                handle.reload(sink_filter(sink, None))?;
            }
        }
        *self.levels.lock().unwrap_or_else(PoisonError::into_inner) = LogLevels::default();
        Ok(())
    }
}
