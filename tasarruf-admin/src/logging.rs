use log::LevelFilter;
use simplelog::*;
use std::fs::File;
use std::path::PathBuf;
use std::sync::OnceLock;

/// Logging configuration for the admin console
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Master switch to enable/disable all logging
    pub enabled: bool,
    /// Path to the log file
    pub log_file: PathBuf,
    /// Whether to clear the log file on startup
    pub clear_on_startup: bool,
    /// Feature flags for specific logging categories
    pub features: LogFeatures,
    /// Overall log level
    pub level: LevelFilter,
}

/// Feature flags for specific logging categories
#[derive(Debug, Clone, Copy)]
pub struct LogFeatures {
    /// Outbound requests, retries and responses
    pub api_calls: bool,
    /// Token establish/invalidate
    pub session: bool,
    /// Plan/category association edits
    pub associations: bool,
    /// Debounced search dispatch and stale drops
    pub search: bool,
}

static FEATURES: OnceLock<LogFeatures> = OnceLock::new();

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_file: PathBuf::from("tasarruf_admin.log"),
            clear_on_startup: false,
            features: LogFeatures::default(),
            level: LevelFilter::Info,
        }
    }
}

impl Default for LogFeatures {
    fn default() -> Self {
        Self {
            api_calls: true,
            session: true,
            associations: true,
            search: true,
        }
    }
}

impl LogConfig {
    /// Create a new log configuration with all features disabled
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Create a verbose log configuration (all features enabled)
    pub fn verbose() -> Self {
        Self {
            enabled: true,
            level: LevelFilter::Trace,
            features: LogFeatures::default(),
            ..Default::default()
        }
    }
}

/// Category switches in effect. All categories are on until `init_logging`
/// says otherwise; the logger's level still applies.
pub fn features() -> LogFeatures {
    FEATURES.get().copied().unwrap_or_default()
}

/// Initialize the logging system with the given configuration
pub fn init_logging(config: &LogConfig) -> anyhow::Result<()> {
    let _ = FEATURES.set(if config.enabled {
        config.features
    } else {
        LogFeatures {
            api_calls: false,
            session: false,
            associations: false,
            search: false,
        }
    });

    if !config.enabled {
        let _ = WriteLogger::init(LevelFilter::Off, Config::default(), std::io::sink());
        return Ok(());
    }

    if config.clear_on_startup {
        let _ = File::create(&config.log_file)?;
    }

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)?;

    let log_config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_time_offset_to_local()
        .unwrap_or_else(|builder| builder)
        .build();

    WriteLogger::init(config.level, log_config, log_file)?;

    log::info!("Logging initialized: file={}, level={:?}", config.log_file.display(), config.level);
    log::debug!("Log features: {:?}", config.features);

    Ok(())
}

/// Macro for logging outbound API calls
#[macro_export]
macro_rules! log_api_call {
    ($($arg:tt)*) => {
        if $crate::logging::features().api_calls {
            log::debug!(target: "api_calls", $($arg)*);
        }
    };
}

/// Macro for logging session lifecycle changes
#[macro_export]
macro_rules! log_session {
    ($($arg:tt)*) => {
        if $crate::logging::features().session {
            log::info!(target: "session", $($arg)*);
        }
    };
}

/// Macro for logging association edits
#[macro_export]
macro_rules! log_association {
    ($($arg:tt)*) => {
        if $crate::logging::features().associations {
            log::debug!(target: "associations", $($arg)*);
        }
    };
}

/// Macro for logging search dispatch
#[macro_export]
macro_rules! log_search {
    ($($arg:tt)*) => {
        if $crate::logging::features().search {
            log::debug!(target: "search", $($arg)*);
        }
    };
}
