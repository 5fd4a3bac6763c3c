use super::constants::{BASE_TICK_MS, MIN_TICK_MS, TICK_STEP_MS};
use std::time::Duration;

/// Higher levels tick faster, never below `MIN_TICK_MS`.
pub fn tick_interval(level: u32) -> Duration {
    let steps = u64::from(level.saturating_sub(1));
    let millis = BASE_TICK_MS
        .saturating_sub(steps * TICK_STEP_MS)
        .max(MIN_TICK_MS);
    Duration::from_millis(millis)
}
