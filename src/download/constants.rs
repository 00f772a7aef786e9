//! Constants for the download module.

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default whole-request timeout (5 minutes).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Suffix of a file that is still being written.
pub const PARTIAL_SUFFIX: &str = ".part";
