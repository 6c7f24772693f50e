//! Tracing setup.
//!
//! Not part of the coordination design (`spec.md` says so explicitly), but
//! every component logs through `tracing` the way the teacher crate does, so
//! it needs somewhere to be wired up. Follows the teacher's `logging.rs`:
//! a stdout layer always on, plus an optional rotating file layer and a
//! text/JSON format switch, both controlled by environment variables rather
//! than `AppConfig` so logging can be reconfigured without touching the
//! YAML file.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initializes the global tracing subscriber. The returned [`WorkerGuard`],
/// when present, must be kept alive for the process lifetime, dropping it
/// flushes and detaches the non-blocking file writer, exactly like the
/// teacher's own rotation setup.
#[must_use = "dropping the WorkerGuard stops the file writer from flushing"]
pub fn init_logging() -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("TICKETGATE_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);

    match std::env::var("TICKETGATE_LOG_DIR") {
        Ok(dir) => {
            let file_appender = tracing_appender::rolling::daily(&dir, "ticketgate.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

            if json {
                registry
                    .with(fmt::layer().json().with_target(false))
                    .with(file_layer.json())
                    .init();
            } else {
                registry
                    .with(fmt::layer().with_target(false))
                    .with(file_layer)
                    .init();
            }
            Some(guard)
        }
        Err(_) => {
            if json {
                registry.with(fmt::layer().json().with_target(false)).init();
            } else {
                registry.with(fmt::layer().with_target(false)).init();
            }
            None
        }
    }
}
