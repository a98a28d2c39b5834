//! Structured logging setup (§4.10). The library crate only ever emits
//! `tracing` events and never installs a subscriber itself; this module is
//! the one place in the workspace that does, matching the teacher pack's
//! `oxidized` binary convention of owning the subscriber at the entry point.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Environment variable consulted for the log level, falling back to the
/// config file's `log_level` and finally to `info`.
const LOG_ENV_VAR: &str = "SCRATCHC_LOG";

/// Installs a `fmt` subscriber writing to stderr so stdout stays reserved
/// for the packager's own success message. `config_level` is the
/// `scratchc.toml` override, used only when `SCRATCHC_LOG` is unset.
///
/// The writer is wrapped in `tracing_appender::non_blocking`, the same
/// decoupling `oxidized` uses for its own log sink, so a slow or piped
/// stderr consumer never stalls compilation; the returned guard must be
/// held for the process's lifetime or buffered events are dropped on exit.
pub fn init(config_level: Option<&str>) -> WorkerGuard {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_new(config_level.unwrap_or("info")))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(writer).init();
    guard
}
