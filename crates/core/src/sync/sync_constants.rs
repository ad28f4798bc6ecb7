//! Timing constants for the realtime sync layer.

use std::time::Duration;

/// Window after a local write during which a change event of the same kind
/// is presumed to be this client's own echo.
pub const ECHO_DEBOUNCE_WINDOW_MS: u64 = 1_000;

/// Fixed delay before a full re-subscription after a channel failure.
pub const RECONNECT_DELAY_MS: u64 = 5_000;

pub fn echo_debounce_window() -> Duration {
    Duration::from_millis(ECHO_DEBOUNCE_WINDOW_MS)
}

pub fn reconnect_delay() -> Duration {
    Duration::from_millis(RECONNECT_DELAY_MS)
}
