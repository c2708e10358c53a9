//! `on.stop-after`: a deadline after which the workflow no longer runs.
//!
//! Relative deadlines (`+7d`, `+12h`, `+1d12h`) are resolved against the
//! compile clock. To keep recompiles byte-identical the resolved deadline is
//! read back from the previous lock file and reused unless a refresh is
//! requested.

use crate::error::{CompileError, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use std::sync::LazyLock;

/// Env var carrying the resolved deadline in the generated workflow.
pub const STOP_TIME_ENV: &str = "GH_AW_STOP_TIME";

const STOP_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static RELATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+(?:(\d+)w)?(?:(\d+)d)?(?:(\d+)h)?(?:(\d+)m)?$").expect("Invalid relative stop time regex")
});

static PREVIOUS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*GH_AW_STOP_TIME:\s*['"]?([^'"\n]+?)['"]?\s*$"#)
        .expect("Invalid stop time lock file regex")
});

/// Resolve a `stop-after` value to an absolute UTC time, formatted.
pub fn resolve(spec: &str, now: DateTime<Utc>) -> Result<String> {
    let spec = spec.trim();

    if let Some(captures) = RELATIVE.captures(spec) {
        let duration = relative_duration(&captures).ok_or_else(|| invalid(spec))?;
        if duration <= Duration::zero() {
            return Err(invalid(spec));
        }
        if duration < Duration::hours(1) {
            return Err(CompileError::configuration(format!(
                "stop-after '{}' must be at least one hour",
                spec
            )));
        }
        let deadline = now.checked_add_signed(duration).ok_or_else(|| invalid(spec))?;
        return Ok(deadline.format(STOP_TIME_FORMAT).to_string());
    }

    parse_absolute(spec)
        .map(|time| time.format(STOP_TIME_FORMAT).to_string())
        .ok_or_else(|| invalid(spec))
}

/// The deadline recorded in a previously generated lock file, if any.
pub fn previous(lock_contents: &str) -> Option<String> {
    PREVIOUS
        .captures(lock_contents)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Pick the deadline to emit.
///
/// Absolute specs always resolve the same way. Relative specs reuse the
/// previous deadline when one exists and `refresh` is off.
pub fn select(
    spec: &str,
    previous_lock: Option<&str>,
    refresh: bool,
    now: DateTime<Utc>,
) -> Result<String> {
    let resolved = resolve(spec, now)?;
    if refresh || !spec.trim_start().starts_with('+') {
        return Ok(resolved);
    }
    Ok(previous_lock.and_then(previous).unwrap_or(resolved))
}

/// Sum of the `w`/`d`/`h`/`m` parts, or `None` when any part is out of range.
fn relative_duration(captures: &regex::Captures<'_>) -> Option<Duration> {
    let units: [fn(i64) -> Option<Duration>; 4] = [
        Duration::try_weeks,
        Duration::try_days,
        Duration::try_hours,
        Duration::try_minutes,
    ];
    let mut total = Duration::zero();
    for (index, unit) in units.into_iter().enumerate() {
        let Some(part) = captures.get(index + 1) else {
            continue;
        };
        let amount = part.as_str().parse::<i64>().ok()?;
        total = total.checked_add(&unit(amount)?)?;
    }
    Some(total)
}

fn parse_absolute(spec: &str) -> Option<NaiveDateTime> {
    if let Ok(time) = DateTime::parse_from_rfc3339(spec) {
        return Some(time.with_timezone(&Utc).naive_utc());
    }
    for format in [STOP_TIME_FORMAT, "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(time) = NaiveDateTime::parse_from_str(spec, format) {
            return Some(time);
        }
    }
    NaiveDate::parse_from_str(spec, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

fn invalid(spec: &str) -> CompileError {
    CompileError::configuration(format!(
        "invalid stop-after '{}'; use a relative time like '+7d' or '+12h', or a date like '2025-12-31'",
        spec
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_relative_deadlines() {
        assert_eq!(resolve("+7d", now()).unwrap(), "2025-01-08 12:00:00");
        assert_eq!(resolve("+1d12h", now()).unwrap(), "2025-01-03 00:00:00");
        assert_eq!(resolve("+2w", now()).unwrap(), "2025-01-15 12:00:00");
    }

    #[test]
    fn test_absolute_deadlines() {
        assert_eq!(resolve("2025-06-30", now()).unwrap(), "2025-06-30 00:00:00");
        assert_eq!(
            resolve("2025-06-30 08:30:00", now()).unwrap(),
            "2025-06-30 08:30:00"
        );
        assert_eq!(
            resolve("2025-06-30T08:30:00+02:00", now()).unwrap(),
            "2025-06-30 06:30:00"
        );
    }

    #[test]
    fn test_invalid_deadlines() {
        assert!(resolve("soon", now()).is_err());
        assert!(resolve("+", now()).is_err());
        assert!(resolve("+30m", now()).is_err());
    }

    #[test]
    fn test_out_of_range_relative_deadline_is_an_error() {
        for spec in ["+999999999d", "+99999999999999999999w", "+9223372036854775807m"] {
            let err = resolve(spec, now()).unwrap_err();
            assert!(matches!(err, CompileError::Configuration { .. }), "{spec}");
            assert!(err.to_string().contains("invalid stop-after"), "{spec}");
        }
    }

    #[test]
    fn test_previous_deadline_is_read_back() {
        let lock = "jobs:\n  activation:\n    env:\n      GH_AW_STOP_TIME: '2025-01-08 12:00:00'\n";
        assert_eq!(previous(lock).as_deref(), Some("2025-01-08 12:00:00"));
        assert_eq!(previous("name: x\n"), None);
    }

    #[test]
    fn test_relative_spec_reuses_previous_deadline() {
        let lock = "      GH_AW_STOP_TIME: '2024-12-30 00:00:00'\n";
        assert_eq!(
            select("+7d", Some(lock), false, now()).unwrap(),
            "2024-12-30 00:00:00"
        );
        assert_eq!(
            select("+7d", Some(lock), true, now()).unwrap(),
            "2025-01-08 12:00:00"
        );
        assert_eq!(select("+7d", None, false, now()).unwrap(), "2025-01-08 12:00:00");
    }

    #[test]
    fn test_absolute_spec_ignores_previous_deadline() {
        let lock = "      GH_AW_STOP_TIME: '2024-12-30 00:00:00'\n";
        assert_eq!(
            select("2025-02-01", Some(lock), false, now()).unwrap(),
            "2025-02-01 00:00:00"
        );
    }
}
