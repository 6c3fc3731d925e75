use std::time::Duration;

const BASE_DELAY_MS: u64 = 250;
const MAX_DELAY_MS: u64 = 4_000;

/// Exponential backoff delay for the given 0-based retry attempt.
pub(crate) fn delay(attempt: usize) -> Duration {
    let shift = attempt.min(6) as u32;
    let ms = BASE_DELAY_MS.saturating_mul(1 << shift);
    Duration::from_millis(ms.min(MAX_DELAY_MS))
}
