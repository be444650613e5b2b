//! Emoji-tagged log lines for the simulator's human-facing output

/// Emoji prefixes for the simulator's log categories
pub struct LogEmoji;

impl LogEmoji {
    pub const SUCCESS: &'static str = "✅";
    pub const ERROR: &'static str = "❌";
    pub const WARNING: &'static str = "⚠️";
    pub const POOL: &'static str = "🏊";
    pub const SWAP: &'static str = "🔄";
    pub const TOKEN: &'static str = "🪙";
    pub const CONFIG: &'static str = "⚙️";
}

#[macro_export]
macro_rules! log_success {
    ($($arg:tt)*) => {
        tracing::info!("{} {}", $crate::logging::LogEmoji::SUCCESS, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        tracing::error!("{} {}", $crate::logging::LogEmoji::ERROR, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warning {
    ($($arg:tt)*) => {
        tracing::warn!("{} {}", $crate::logging::LogEmoji::WARNING, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_pool {
    ($($arg:tt)*) => {
        tracing::info!("{} {}", $crate::logging::LogEmoji::POOL, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_swap {
    ($($arg:tt)*) => {
        tracing::info!("{} {}", $crate::logging::LogEmoji::SWAP, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_token {
    ($($arg:tt)*) => {
        tracing::debug!("{} {}", $crate::logging::LogEmoji::TOKEN, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_config {
    ($($arg:tt)*) => {
        tracing::info!("{} {}", $crate::logging::LogEmoji::CONFIG, format!($($arg)*))
    };
}
