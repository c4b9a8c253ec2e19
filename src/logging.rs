//! Optional structured logging.
//!
//! With the `logging` feature the crate-internal macros forward to `tracing`;
//! without it they expand to nothing, so the hot paths carry no cost.

#[cfg(feature = "logging")]
macro_rules! log_trace {
    ($($arg:tt)*) => { tracing::trace!($($arg)*) };
}

#[cfg(not(feature = "logging"))]
macro_rules! log_trace {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "logging")]
macro_rules! log_debug {
    ($($arg:tt)*) => { tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "logging"))]
macro_rules! log_debug {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "logging")]
macro_rules! log_warn {
    ($($arg:tt)*) => { tracing::warn!($($arg)*) };
}

#[cfg(not(feature = "logging"))]
macro_rules! log_warn {
    ($($arg:tt)*) => {};
}

pub(crate) use log_debug;
pub(crate) use log_trace;
pub(crate) use log_warn;

/// Install a `tracing-subscriber` formatter.
///
/// `RUST_LOG` wins when set; otherwise `default_filter` is used. Calling this
/// more than once is harmless.
#[cfg(feature = "logging")]
pub fn init_logging(default_filter: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// No-op without the `logging` feature.
#[cfg(not(feature = "logging"))]
pub fn init_logging(_default_filter: &str) {}
