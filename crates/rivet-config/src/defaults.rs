use crate::mode::LogFormat;

/// Default log filter expression used by the daemon.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default ceiling on a single frame body: 16 MiB.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// Default ceiling on one `Content-Length` header line: 8 KiB.
pub const DEFAULT_MAX_HEADER_LINE_BYTES: usize = 8 * 1024;

/// Default scratch capacity kept per handler between dispatches: 64 KiB.
pub const DEFAULT_SCRATCH_RETAIN_BYTES: usize = 64 * 1024;

/// Default log filter expression used by the daemon.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Default logging format for the daemon.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Compact
}
