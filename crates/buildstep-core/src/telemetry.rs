//! Log output for step runs: an `EnvFilter` over either human-readable or
//! JSON lines on stderr, installed by [`init_tracing`].

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialise the global tracing subscriber.
///
/// * `json` emits newline-delimited JSON log lines for the log collector.
/// * `level` is the verbosity used when `RUST_LOG` is not set.
///
/// Logs go to stderr so a step's own stdout stays clean. Returns `false` when
/// a subscriber was already installed, in which case nothing changes.
pub fn init_tracing(json: bool, level: Level) -> bool {
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let (plain, json) = if json {
        (None, Some(fmt::layer().json().with_writer(std::io::stderr)))
    } else {
        (Some(fmt::layer().with_target(false).with_writer(std::io::stderr)), None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(plain)
        .with(json)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_tracing_only_installs_once() {
        init_tracing(false, Level::INFO);
        assert!(!init_tracing(true, Level::DEBUG));
    }
}
