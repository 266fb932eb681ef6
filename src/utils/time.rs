use chrono::{DateTime, Duration, Utc};

/// Get current UTC timestamp
pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

/// Convert timestamp to human readable format
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Upper bound for configured durations (a thousand years).
pub const MAX_DURATION_SECONDS: u64 = 365_000 * 86_400;

/// Convert a std duration into a chrono duration, saturating at
/// `MAX_DURATION_SECONDS`.
pub fn to_chrono(duration: std::time::Duration) -> Duration {
    Duration::from_std(duration.min(std::time::Duration::from_secs(MAX_DURATION_SECONDS)))
        .unwrap_or_else(|_| Duration::seconds(MAX_DURATION_SECONDS as i64))
}

/// Whole seconds as a chrono duration, saturating like `to_chrono`.
pub fn seconds(secs: u64) -> Duration {
    to_chrono(std::time::Duration::from_secs(secs))
}

/// `start + duration`, saturating at the maximum representable time.
pub fn expiry_after(start: DateTime<Utc>, duration: std::time::Duration) -> DateTime<Utc> {
    start
        .checked_add_signed(to_chrono(duration))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Seconds left until `deadline`, zero once it has passed.
pub fn seconds_until(deadline: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (deadline - now).num_seconds().max(0)
}
