/// API path prefix
pub const API_PREFIX: &str = "/v1";

/// Default sliding window, in seconds
pub const DEFAULT_WINDOW_SECS: u64 = 15 * 60;
