//! Logging initialization

/// Initialize the logging system.
///
/// Uses env_logger with a default filter level of `info`.
/// Override with the RUST_LOG environment variable.
pub fn init() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}
