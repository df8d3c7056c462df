//! Logging macros gated by a module-level `ENABLE_LOGS` switch, for hot paths
//! such as the sampling loop that would otherwise flood the log.
//!
//! ```ignore
//! const ENABLE_LOGS: bool = true;
//! use crate::{log_error, log_info, log_warn};
//!
//! log_info!("sampling loop started");
//! ```

/// `log::info!` when the calling module's `ENABLE_LOGS` is true.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

/// `log::warn!` when the calling module's `ENABLE_LOGS` is true.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

/// `log::error!` when the calling module's `ENABLE_LOGS` is true.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}
