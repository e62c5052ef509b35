use std::sync::{Arc, OnceLock};

/// A sink for the crate's log output, implemented by the embedding app.
///
/// Exported through `UniFFI` so a Swift or Kotlin host can route frame and
/// connector diagnostics into its own logging.
///
/// ```rust
/// use loginkit_core::logger::{LogLevel, Logger};
///
/// struct StdoutLogger;
///
/// impl Logger for StdoutLogger {
///     fn log(&self, level: LogLevel, message: String) {
///         println!("[{level:?}] {message}");
///     }
/// }
/// ```
///
/// Install it once with [`set_logger`].
#[uniffi::export(with_foreign)]
pub trait Logger: Sync + Send {
    /// Receives one formatted record.
    fn log(&self, level: LogLevel, message: String);
}

/// Severity of a forwarded record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum LogLevel {
    /// Very detailed tracing, such as every render.
    Trace,
    /// Handshake and call traffic.
    Debug,
    /// Progress messages.
    Info,
    /// Recoverable oddities, such as a stale wallet-list update.
    Warn,
    /// Failures, including fatal protocol errors.
    Error,
}

impl From<log::Level> for LogLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Self::Error,
            log::Level::Warn => Self::Warn,
            log::Level::Info => Self::Info,
            log::Level::Debug => Self::Debug,
            log::Level::Trace => Self::Trace,
        }
    }
}

static LOGGER_INSTANCE: OnceLock<Arc<dyn Logger>> = OnceLock::new();

/// Bridges the `log` facade to the installed [`Logger`].
struct ForeignLogger;

/// Debug and trace records are only forwarded from this crate; dependencies
/// are too chatty at those levels.
fn should_forward(metadata: &log::Metadata) -> bool {
    let verbose = matches!(metadata.level(), log::Level::Debug | log::Level::Trace);
    !verbose || metadata.target().starts_with("loginkit")
}

impl log::Log for ForeignLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        should_forward(metadata)
    }

    fn log(&self, record: &log::Record) {
        if !should_forward(record.metadata()) {
            return;
        }
        if let Some(logger) = LOGGER_INSTANCE.get() {
            logger.log(record.level().into(), record.args().to_string());
        } else {
            eprintln!("loginkit logger not set: {}", record.args());
        }
    }

    fn flush(&self) {}
}

/// Installs the host's logger and routes the `log` facade to it.
///
/// Only the first call has any effect.
#[uniffi::export]
pub fn set_logger(logger: Arc<dyn Logger>) {
    if LOGGER_INSTANCE.set(logger).is_err() {
        eprintln!("loginkit logger already set");
        return;
    }

    static LOGGER: ForeignLogger = ForeignLogger;
    if let Err(e) = log::set_logger(&LOGGER) {
        eprintln!("failed to install loginkit logger: {e}");
        return;
    }
    log::set_max_level(log::LevelFilter::Trace);
}
