//! Logging utilities and link log redirection

pub use log::{debug, error, info, trace, warn};

/// Log target used for diagnostics emitted by the link itself
pub const LINK_TARGET: &str = "render_stream::link";

/// Initialize the logging system from `RUST_LOG`
pub fn init() {
    env_logger::init();
}

/// Initialize logging with a default level, still overridable by `RUST_LOG`
pub fn init_with_level(level: log::LevelFilter) {
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

/// Callbacks the link calls with its own diagnostic output
#[derive(Debug, Clone, Copy)]
pub struct LinkLogger {
    /// Regular messages
    pub default: fn(&str),
    /// Verbose messages
    pub verbose: fn(&str),
    /// Error messages
    pub error: fn(&str),
}

fn link_log_default(message: &str) {
    log::info!(target: LINK_TARGET, "{}", message.trim_end());
}

fn link_log_verbose(message: &str) {
    log::trace!(target: LINK_TARGET, "{}", message.trim_end());
}

fn link_log_error(message: &str) {
    log::error!(target: LINK_TARGET, "{}", message.trim_end());
}

/// Build the callback set that routes link diagnostics into the `log` facade
pub const fn link_logger() -> LinkLogger {
    LinkLogger {
        default: link_log_default,
        verbose: link_log_verbose,
        error: link_log_error,
    }
}
