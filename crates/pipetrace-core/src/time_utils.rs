use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::warn;

// ── System timezone detection ─────────────────────────────────────────────────

/// Detect the IANA timezone name of the running system.
///
/// Falls back to `"UTC"` if detection fails.
pub fn get_system_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

// ── TimestampFormatter ────────────────────────────────────────────────────────

/// Renders producer epoch-millisecond timestamps in a display timezone.
#[derive(Debug, Clone)]
pub struct TimestampFormatter {
    tz: Tz,
}

impl TimestampFormatter {
    /// Create a formatter for the given IANA timezone name.
    ///
    /// Unrecognised names fall back to UTC with a warning.
    pub fn new(tz_name: &str) -> Self {
        let tz = tz_name.parse::<Tz>().unwrap_or_else(|_| {
            warn!(
                "TimestampFormatter: unrecognised timezone \"{}\", falling back to UTC",
                tz_name
            );
            Tz::UTC
        });
        Self { tz }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// `HH:MM:SS.mmm` in the display timezone, or `"?"` when out of range.
    pub fn clock(&self, epoch_ms: u64) -> String {
        match to_utc(epoch_ms) {
            Some(dt) => dt.with_timezone(&self.tz).format("%H:%M:%S%.3f").to_string(),
            None => "?".to_string(),
        }
    }

    /// Full RFC 3339 rendering with millisecond precision.
    pub fn full(&self, epoch_ms: u64) -> String {
        match to_utc(epoch_ms) {
            Some(dt) => dt
                .with_timezone(&self.tz)
                .to_rfc3339_opts(chrono::SecondsFormat::Millis, false),
            None => "?".to_string(),
        }
    }
}

impl Default for TimestampFormatter {
    fn default() -> Self {
        Self { tz: Tz::UTC }
    }
}

/// Convert epoch milliseconds to a UTC datetime.
pub fn to_utc(epoch_ms: u64) -> Option<DateTime<Utc>> {
    let ms = i64::try_from(epoch_ms).ok()?;
    DateTime::<Utc>::from_timestamp_millis(ms)
}

/// Signed gap between two producer timestamps, formatted as `+12ms` / `-3ms`.
pub fn format_delta_ms(from_ms: u64, to_ms: u64) -> String {
    if to_ms >= from_ms {
        format!("+{}ms", to_ms - from_ms)
    } else {
        format!("-{}ms", from_ms - to_ms)
    }
}
