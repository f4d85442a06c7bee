//! Canonical "now" snapshots and elapsed-time math
//!
//! Every time-relative computation in the subsystem goes through one
//! `TimeContext` or `Elapsed` value so that a single call never mixes
//! two readings of the wall clock.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Coarse bucket of the day, derived from the UTC hour.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    Night,
    Morning,
    Afternoon,
    Evening,
}

impl TimeOfDay {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            0..=5 => TimeOfDay::Night,
            6..=11 => TimeOfDay::Morning,
            12..=17 => TimeOfDay::Afternoon,
            _ => TimeOfDay::Evening,
        }
    }
}

/// Immutable snapshot of "now" in all the derived forms the agent needs.
/// Produced fresh on every call and never cached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeContext {
    pub timestamp_ms: i64,
    pub iso: String,
    pub readable: String,
    pub day_of_week: String,
    pub time_of_day: TimeOfDay,
}

impl TimeContext {
    pub fn now() -> Self {
        Self::at(Utc::now())
    }

    /// Snapshot a specific instant. Used by tests that need a fixed clock.
    pub fn at(instant: DateTime<Utc>) -> Self {
        Self {
            timestamp_ms: instant.timestamp_millis(),
            iso: instant.to_rfc3339(),
            readable: instant.format("%A, %d %b %Y, %H:%M").to_string(),
            day_of_week: instant.format("%A").to_string(),
            time_of_day: TimeOfDay::from_hour(instant.hour()),
        }
    }
}

/// Elapsed wall-clock duration since some past instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Elapsed {
    pub millis: i64,
    pub seconds: i64,
    pub minutes: i64,
    pub hours: i64,
    pub human_readable: String,
}

impl Elapsed {
    pub fn since_ms(past_ms: i64) -> Self {
        Self::between_ms(past_ms, Utc::now().timestamp_millis())
    }

    /// Elapsed time between two epoch-millisecond readings.
    /// A past instant in the future clamps to zero.
    pub fn between_ms(past_ms: i64, now_ms: i64) -> Self {
        let millis = (now_ms - past_ms).max(0);
        let seconds = millis / 1000;
        let minutes = seconds / 60;
        let hours = minutes / 60;
        Self {
            millis,
            seconds,
            minutes,
            hours,
            human_readable: describe_duration(seconds),
        }
    }
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("1 {unit}")
    } else {
        format!("{count} {unit}s")
    }
}

/// Coarse natural-language description of an elapsed duration.
/// Tiers are monotonic: a longer duration never reads as shorter.
fn describe_duration(seconds: i64) -> String {
    if seconds < 5 {
        return "just now".to_string();
    }
    if seconds < 60 {
        return "a few seconds".to_string();
    }
    let minutes = seconds / 60;
    if minutes < 60 {
        return plural(minutes, "minute");
    }
    let hours = minutes / 60;
    if hours < 24 {
        let rem = minutes % 60;
        if rem == 0 {
            return plural(hours, "hour");
        }
        return format!("{} {}", plural(hours, "hour"), plural(rem, "minute"));
    }
    plural(hours / 24, "day")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn time_of_day_buckets() {
        assert_eq!(TimeOfDay::from_hour(0), TimeOfDay::Night);
        assert_eq!(TimeOfDay::from_hour(5), TimeOfDay::Night);
        assert_eq!(TimeOfDay::from_hour(6), TimeOfDay::Morning);
        assert_eq!(TimeOfDay::from_hour(11), TimeOfDay::Morning);
        assert_eq!(TimeOfDay::from_hour(12), TimeOfDay::Afternoon);
        assert_eq!(TimeOfDay::from_hour(17), TimeOfDay::Afternoon);
        assert_eq!(TimeOfDay::from_hour(18), TimeOfDay::Evening);
        assert_eq!(TimeOfDay::from_hour(23), TimeOfDay::Evening);
    }

    #[test]
    fn context_at_fixed_instant() {
        let instant = Utc.with_ymd_and_hms(2026, 8, 29, 14, 3, 0).unwrap();
        let ctx = TimeContext::at(instant);
        assert_eq!(ctx.timestamp_ms, instant.timestamp_millis());
        assert_eq!(ctx.day_of_week, "Saturday");
        assert_eq!(ctx.time_of_day, TimeOfDay::Afternoon);
        assert!(ctx.iso.starts_with("2026-08-29T14:03:00"));
        assert_eq!(ctx.readable, "Saturday, 29 Aug 2026, 14:03");
    }

    #[test]
    fn elapsed_numeric_fields() {
        let e = Elapsed::between_ms(0, 3_725_000);
        assert_eq!(e.millis, 3_725_000);
        assert_eq!(e.seconds, 3725);
        assert_eq!(e.minutes, 62);
        assert_eq!(e.hours, 1);
    }

    #[test]
    fn elapsed_clamps_future_instants() {
        let e = Elapsed::between_ms(10_000, 5_000);
        assert_eq!(e.millis, 0);
        assert_eq!(e.human_readable, "just now");
    }

    #[test]
    fn human_readable_tiers() {
        assert_eq!(describe_duration(2), "just now");
        assert_eq!(describe_duration(30), "a few seconds");
        assert_eq!(describe_duration(60), "1 minute");
        assert_eq!(describe_duration(180), "3 minutes");
        assert_eq!(describe_duration(3600), "1 hour");
        assert_eq!(describe_duration(3725), "1 hour 2 minutes");
        assert_eq!(describe_duration(86_400 * 2), "2 days");
    }

    #[test]
    fn human_readable_is_monotonic_at_tier_boundaries() {
        // Sampling around every boundary: the tier index never goes down.
        let tier = |s: i64| match describe_duration(s) {
            d if d == "just now" => 0,
            d if d == "a few seconds" => 1,
            d if d.contains("minute") && !d.contains("hour") => 2,
            d if d.contains("hour") => 3,
            _ => 4,
        };
        let samples = [0, 4, 5, 59, 60, 3599, 3600, 86_399, 86_400, 172_800];
        for pair in samples.windows(2) {
            assert!(tier(pair[0]) <= tier(pair[1]), "tier dropped at {pair:?}");
        }
    }
}
