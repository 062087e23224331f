use std::cell::RefCell;
use std::{sync::Arc, sync::OnceLock};

thread_local! {
    static THREAD_LOG_CONTEXT: RefCell<Option<String>> = const { RefCell::new(None) };
}

tokio::task_local! {
    /// Task-local logging context, set by the `migrator_export` proc macro for async functions.
    pub static LOG_CONTEXT: RefCell<Option<String>>;
}

/// Trait representing a logger that can log messages at various levels.
///
/// This trait should be implemented by any logger that wants to receive log messages.
/// It is exported via `UniFFI` for use in foreign languages.
///
/// # Examples
///
/// ```rust
/// use authmigrator::primitives::logger::{Logger, LogLevel};
///
/// struct MyLogger;
///
/// impl Logger for MyLogger {
///     fn log(&self, level: LogLevel, message: String) {
///         println!("[{:?}] {}", level, message);
///     }
/// }
/// ```
///
/// ## swift
///
/// ```swift
/// class AuthMigratorLoggerBridge: AuthMigrator.Logger {
///     static let shared = AuthMigratorLoggerBridge()
///
///     func log(level: AuthMigrator.LogLevel, message: String) {
///         Log.log(level.toCoreLevel(), message)
///     }
/// }
///
/// AuthMigrator.setLogger(logger: AuthMigratorLoggerBridge.shared) // Call this only once!!!
/// ```
#[uniffi::export(with_foreign)]
pub trait Logger: Sync + Send {
    /// Logs a message at the specified log level.
    fn log(&self, level: LogLevel, message: String);
}

/// Enumeration of possible log levels.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum LogLevel {
    /// Designates very low priority, often extremely detailed messages.
    Trace,
    /// Designates lower priority debugging information.
    Debug,
    /// Designates informational messages that highlight the progress of the application.
    Info,
    /// Designates potentially harmful situations.
    Warn,
    /// Designates error events that might still allow the application to continue running.
    Error,
}

/// A logger that forwards log messages to a user-provided `Logger` implementation.
///
/// This struct implements the `log::Log` trait and integrates with the Rust `log` crate.
struct ForeignLogger;

impl log::Log for ForeignLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        let is_record_from_authmigrator = record
            .module_path()
            .is_some_and(|module_path| module_path.starts_with("authmigrator"));

        let is_debug_or_trace_level =
            record.level() == log::Level::Debug || record.level() == log::Level::Trace;

        // Debug/trace noise from dependencies is not forwarded.
        if is_debug_or_trace_level && !is_record_from_authmigrator {
            return;
        }

        if let Some(logger) = LOGGER_INSTANCE.get() {
            logger.log(log_level(record.level()), format!("{}", record.args()));
        } else {
            eprintln!("Logger not set: {}", record.args());
        }
    }

    fn flush(&self) {}
}

/// Converts a `log::Level` to a `LogLevel`.
const fn log_level(level: log::Level) -> LogLevel {
    match level {
        log::Level::Error => LogLevel::Error,
        log::Level::Warn => LogLevel::Warn,
        log::Level::Info => LogLevel::Info,
        log::Level::Debug => LogLevel::Debug,
        log::Level::Trace => LogLevel::Trace,
    }
}

/// A global instance of the user-provided logger.
static LOGGER_INSTANCE: OnceLock<Arc<dyn Logger>> = OnceLock::new();

/// Sets the global logger.
///
/// Only the first logger is kept; later calls return `false` and are otherwise ignored.
#[allow(clippy::module_name_repetitions)]
#[uniffi::export]
pub fn set_logger(logger: Arc<dyn Logger>) -> bool {
    if LOGGER_INSTANCE.set(logger).is_err() {
        eprintln!("Logger already set");
        return false;
    }

    if let Err(e) = init_logger() {
        eprintln!("Failed to install logger: {e}");
        return false;
    }
    true
}

/// Installs `ForeignLogger` as the `log` facade's logger.
///
/// # Errors
///
/// Returns a `log::SetLoggerError` if another logger was already installed.
fn init_logger() -> Result<(), log::SetLoggerError> {
    static LOGGER: ForeignLogger = ForeignLogger;
    log::set_logger(&LOGGER)?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}

/// Logs a trace-level message with automatic context prefixing
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => {
        if let Some(ctx) = $crate::primitives::logger::get_context() {
            log::trace!("{} {}", ctx, format_args!($($arg)*))
        } else {
            log::trace!($($arg)*)
        }
    };
}

/// Logs a debug-level message with automatic context prefixing
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        if let Some(ctx) = $crate::primitives::logger::get_context() {
            log::debug!("{} {}", ctx, format_args!($($arg)*))
        } else {
            log::debug!($($arg)*)
        }
    };
}

/// Logs an info-level message with automatic context prefixing
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        if let Some(ctx) = $crate::primitives::logger::get_context() {
            log::info!("{} {}", ctx, format_args!($($arg)*))
        } else {
            log::info!($($arg)*)
        }
    };
}

/// Logs a warning-level message with automatic context prefixing
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        if let Some(ctx) = $crate::primitives::logger::get_context() {
            log::warn!("{} {}", ctx, format_args!($($arg)*))
        } else {
            log::warn!($($arg)*)
        }
    };
}

/// Logs an error-level message with automatic context prefixing
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        if let Some(ctx) = $crate::primitives::logger::get_context() {
            log::error!("{} {}", ctx, format_args!($($arg)*))
        } else {
            log::error!($($arg)*)
        }
    };
}

/// Tracks which backing storage a [`LogContext`] used, so `Drop` restores the correct one.
enum LogContextStorage {
    TaskLocal,
    ThreadLocal,
}

/// A scope guard that sets a logging context and automatically restores the previous one
/// when dropped.
///
/// # Examples
///
/// ```rust
/// use authmigrator::primitives::logger::{get_context, LogContext};
///
/// {
///     let _ctx = LogContext::new("AuthMigrator");
///     assert_eq!(get_context().as_deref(), Some("[AuthMigrator][AuthMigrator]"));
/// }
/// assert_eq!(get_context(), None);
/// ```
pub struct LogContext {
    previous: Option<String>,
    storage: LogContextStorage,
}

impl LogContext {
    /// Creates a new logging context scope.
    #[must_use]
    pub fn new(module: &str) -> Self {
        let new_context = Some(format!("[AuthMigrator][{module}]"));

        // Prefer task_local (persists across .await points); fall back to thread_local for sync code.
        match LOG_CONTEXT.try_with(|ctx| ctx.replace(new_context.clone())) {
            Ok(previous) => Self {
                previous,
                storage: LogContextStorage::TaskLocal,
            },
            Err(_) => Self {
                previous: THREAD_LOG_CONTEXT.with(|ctx| ctx.replace(new_context)),
                storage: LogContextStorage::ThreadLocal,
            },
        }
    }
}

impl Drop for LogContext {
    fn drop(&mut self) {
        match self.storage {
            LogContextStorage::TaskLocal => {
                let _ = LOG_CONTEXT.try_with(|ctx| {
                    (*ctx.borrow_mut()).clone_from(&self.previous);
                });
            }
            LogContextStorage::ThreadLocal => {
                THREAD_LOG_CONTEXT.with(|ctx| {
                    (*ctx.borrow_mut()).clone_from(&self.previous);
                });
            }
        }
    }
}

/// Gets the current logging context, if any.
#[must_use]
pub fn get_context() -> Option<String> {
    LOG_CONTEXT
        .try_with(|ctx| ctx.borrow().clone())
        .unwrap_or_else(|_| THREAD_LOG_CONTEXT.with(|ctx| ctx.borrow().clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_contexts_restore_previous() {
        let outer = LogContext::new("AuthMigrator");
        {
            let _inner = LogContext::new("LegacyCredentialStore");
            assert_eq!(
                get_context().as_deref(),
                Some("[AuthMigrator][LegacyCredentialStore]")
            );
        }
        assert_eq!(get_context().as_deref(), Some("[AuthMigrator][AuthMigrator]"));
        drop(outer);
        assert_eq!(get_context(), None);
    }

    #[tokio::test]
    async fn test_task_local_context_survives_await() {
        LOG_CONTEXT
            .scope(RefCell::new(None), async {
                let _ctx = LogContext::new("ExchangeClient");
                tokio::task::yield_now().await;
                assert_eq!(
                    get_context().as_deref(),
                    Some("[AuthMigrator][ExchangeClient]")
                );
            })
            .await;
    }

    #[test]
    fn test_log_level_mapping() {
        assert_eq!(log_level(log::Level::Error), LogLevel::Error);
        assert_eq!(log_level(log::Level::Warn), LogLevel::Warn);
        assert_eq!(log_level(log::Level::Trace), LogLevel::Trace);
    }
}
