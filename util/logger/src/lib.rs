//! Structured logging for the fault-injection harness.
//!
//! Thin wrapper around the `log` facade and an `env_logger` backend, in the style of the
//! teacher's `ckb-logger` (facade) / `ckb-logger-service` (backend) split. The harness's own
//! modules log through the re-exported macros; `init`/`init_silent` install the backend once,
//! at process start, and return a guard that keeps the backend alive for the process lifetime.

pub use log::{debug, error, info, trace, warn};

use fault_injector_error::ExitCode;
use once_cell::sync::OnceCell;
use std::io::Write;

static INIT: OnceCell<()> = OnceCell::new();

/// Backend configuration, filled in from the campaign configuration or hard-coded defaults for
/// sibling-mode trials.
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Default filter applied when the override env var (see [`init`]) is unset.
    pub default_filter: String,
    /// When true, suppress all log output. Used in sibling mode so stdout remains reserved for
    /// the harness's own trial log fragment rather than being interleaved with diagnostics.
    pub silent: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        LoggerConfig {
            default_filter: "info".to_owned(),
            silent: false,
        }
    }
}

/// RAII guard returned by [`init`]/[`init_silent`]. Holding it keeps the backend registered;
/// `main` is expected to keep it alive for the whole run.
pub struct LoggerInitGuard {
    _private: (),
}

impl Drop for LoggerInitGuard {
    fn drop(&mut self) {
        let _ = std::io::stderr().flush();
    }
}

/// Initialize the logging backend.
///
/// `env_var`, when given, names an environment variable whose value overrides
/// `config.default_filter` (e.g. `FAULT_INJECTOR_LOG=debug`), matching `ckb-logger-service`'s
/// `init(Some("CKB_LOG"), ...)` convention.
pub fn init(env_var: Option<&str>, config: LoggerConfig) -> Result<LoggerInitGuard, ExitCode> {
    if config.silent {
        return init_silent();
    }

    let mut builder = env_logger::Builder::new();
    let filter = env_var
        .and_then(|name| std::env::var(name).ok())
        .unwrap_or(config.default_filter.clone());
    builder.parse_filters(&filter);
    builder.format_timestamp_millis();

    if INIT.set(()).is_err() {
        // Already initialized in this process; treat as success (tests call init repeatedly).
        return Ok(LoggerInitGuard { _private: () });
    }

    if builder.try_init().is_err() {
        // A global logger was installed by someone else first (e.g. `env_logger::init()` in a
        // doctest harness); not fatal, the harness simply logs through whatever is installed.
    }

    Ok(LoggerInitGuard { _private: () })
}

/// Initialize a logger that discards everything, for sibling-mode trial processes where stdout
/// must stay reserved for the simulator's transcript.
pub fn init_silent() -> Result<LoggerInitGuard, ExitCode> {
    if INIT.set(()).is_ok() {
        let mut builder = env_logger::Builder::new();
        builder.filter_level(log::LevelFilter::Off);
        let _ = builder.try_init();
    }
    Ok(LoggerInitGuard { _private: () })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_is_info() {
        assert_eq!(LoggerConfig::default().default_filter, "info");
    }

    #[test]
    fn init_silent_does_not_panic() {
        let _guard = init_silent().expect("init_silent should not fail");
    }
}
