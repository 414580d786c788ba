//! Sync scheduling and retry policy helpers.
//!
//! Pure functions: the scheduler and the lifecycle driver consult them but
//! they hold no state of their own.

use crate::config::{ConnectorConfig, ConnectorStatus, SyncFrequency};
use chrono::{DateTime, Duration, Utc};

/// Error-message phrases that must never be retried, matched
/// case-insensitively as substrings.
const NON_RETRYABLE: [&str; 4] = [
    "authentication failed",
    "invalid credentials",
    "insufficient permissions",
    "not found",
];

/// Computes when the next sync is due for the given frequency.
///
/// `Realtime` returns now. All other frequencies add a fixed offset to now;
/// `_last_sync` is accepted but not consulted — the offset is always computed
/// from the current instant, not from the previous sync.
pub fn next_sync_time(frequency: SyncFrequency, _last_sync: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match frequency {
        SyncFrequency::Realtime => now,
        SyncFrequency::FiveMinutes => now + Duration::minutes(5),
        SyncFrequency::FifteenMinutes => now + Duration::minutes(15),
        SyncFrequency::ThirtyMinutes => now + Duration::minutes(30),
        SyncFrequency::Hourly => now + Duration::hours(1),
        SyncFrequency::Daily => now + Duration::days(1),
        SyncFrequency::Weekly => now + Duration::days(7),
    }
}

/// Decides whether a failed sync should be attempted again.
///
/// Returns `false` once the retry budget is spent, regardless of the error,
/// and `false` for errors on the non-retryable denylist (auth and permission
/// failures, missing resources). Everything else is considered transient.
pub fn should_retry(error: &str, retry_count: u32, max_retries: u32) -> bool {
    if retry_count >= max_retries {
        return false;
    }
    let message = error.to_lowercase();
    !NON_RETRYABLE.iter().any(|phrase| message.contains(phrase))
}

/// True when an active, connected connector's next sync is due at `now`.
///
/// A connector that has never synced (no `next_sync`) is due immediately.
pub fn due_for_sync(config: &ConnectorConfig, now: DateTime<Utc>) -> bool {
    config.is_active
        && config.status == ConnectorStatus::Connected
        && config.next_sync.map_or(true, |due| due <= now)
}
