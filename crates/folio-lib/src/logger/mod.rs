use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::{fmt, EnvFilter};

static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Initialize the tracing subscriber with timestamp, level, and structured fields.
///
/// `RUST_LOG` wins when set; otherwise `debug` selects DEBUG over WARN so
/// normal CLI output is not interleaved with request logs.
pub fn init(debug: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if debug {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    let _ = fmt()
        .with_env_filter(filter)
        .with_timer(fmt::time::SystemTime)
        .with_level(true)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Set the global verbose mode flag.
pub fn set_verbose(enabled: bool) {
    VERBOSE.store(enabled, Ordering::SeqCst);
}

/// Check whether verbose mode is currently enabled.
pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}
