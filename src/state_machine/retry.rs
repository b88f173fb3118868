use std::time::Duration;

/// Attempts beyond this exhaust retries and dead-letter the candidate to
/// `FAILED` with `RETRY_EXHAUSTED` (§4.1).
pub const MAX_RETRIES: u32 = 5;

const BASE_DELAY: Duration = Duration::from_millis(500);
const MAX_DELAY: Duration = Duration::from_secs(60);

/// Exponential backoff capped at `MAX_DELAY`, matching the doubling used
/// elsewhere in this codebase's retry helpers.
pub fn backoff_delay(retry_count: u32) -> Duration {
    let multiplier = 2_u32.saturating_pow(retry_count.min(16));
    BASE_DELAY
        .saturating_mul(multiplier)
        .min(MAX_DELAY)
}

pub fn retries_exhausted(retry_count: u32) -> bool {
    retry_count >= MAX_RETRIES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_until_the_cap() {
        assert_eq!(backoff_delay(0), Duration::from_millis(500));
        assert_eq!(backoff_delay(1), Duration::from_millis(1000));
        assert_eq!(backoff_delay(2), Duration::from_millis(2000));
        assert_eq!(backoff_delay(20), MAX_DELAY);
    }

    #[test]
    fn retries_exhaust_at_the_configured_max() {
        assert!(!retries_exhausted(MAX_RETRIES - 1));
        assert!(retries_exhausted(MAX_RETRIES));
    }
}
