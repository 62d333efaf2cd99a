//! Temporal constraint expressions
//!
//! A temporal constraint restricts a component to a time range. Each bound
//! is one of:
//! - `*` - now
//! - `*-N<unit>` - relative to now, unit is `s`, `m`, `h` or `d`
//! - an absolute UTC timestamp (RFC 3339, `YYYY-MM-DD HH:MM:SS[.fff]` or `YYYY-MM-DD`)
//!
//! Groups forward the raw expressions; components that honor constraints
//! parse them with [`TemporalConstraint::parse`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};

use crate::ContractError;

/// One bound of a temporal constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeExpression {
    /// `*`
    Now,
    /// `*-N<unit>`
    Relative(TimeDelta),
    /// Fixed instant
    Absolute(DateTime<Utc>),
}

impl TimeExpression {
    /// Resolve against a reference instant
    pub fn resolve(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::Now => now,
            Self::Relative(offset) => now - *offset,
            Self::Absolute(at) => *at,
        }
    }
}

impl FromStr for TimeExpression {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if s == "*" {
            return Ok(Self::Now);
        }

        if let Some(rest) = s.strip_prefix('*') {
            return parse_relative(rest.trim())
                .map(Self::Relative)
                .ok_or_else(|| invalid(s));
        }

        if let Ok(at) = DateTime::parse_from_rfc3339(s) {
            return Ok(Self::Absolute(at.with_timezone(&Utc)));
        }

        for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
            if let Ok(at) = NaiveDateTime::parse_from_str(s, format) {
                return Ok(Self::Absolute(at.and_utc()));
            }
        }

        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|at| Self::Absolute(at.and_utc()))
            .ok_or_else(|| invalid(s))
    }
}

impl fmt::Display for TimeExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Now => f.write_str("*"),
            Self::Relative(offset) => write!(f, "*-{}s", offset.num_seconds()),
            Self::Absolute(at) => write!(f, "{}", at.format("%Y-%m-%d %H:%M:%S%.3f")),
        }
    }
}

// "-5m" -> 5 minutes
fn parse_relative(rest: &str) -> Option<TimeDelta> {
    let rest = rest.strip_prefix('-')?.trim();
    let unit = rest.chars().last()?;
    let amount: i64 = rest[..rest.len() - unit.len_utf8()].trim().parse().ok()?;
    if amount < 0 {
        return None;
    }

    match unit.to_ascii_lowercase() {
        's' => TimeDelta::try_seconds(amount),
        'm' => TimeDelta::try_minutes(amount),
        'h' => TimeDelta::try_hours(amount),
        'd' => TimeDelta::try_days(amount),
        _ => None,
    }
}

fn invalid(expression: &str) -> ContractError {
    ContractError::config_validation(
        "temporal_constraint",
        format!("unrecognized time expression \"{expression}\""),
    )
}

/// Parsed temporal constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemporalConstraint {
    pub start: TimeExpression,
    pub stop: TimeExpression,
    pub parameters: String,
}

impl TemporalConstraint {
    /// Parse a start/stop pair
    ///
    /// Returns `Ok(None)` when both bounds are absent or empty (the
    /// constraint is cancelled). A single missing bound defaults to `*`.
    pub fn parse(
        start: Option<&str>,
        stop: Option<&str>,
        parameters: &str,
    ) -> Result<Option<Self>, ContractError> {
        let start = start.map(str::trim).filter(|s| !s.is_empty());
        let stop = stop.map(str::trim).filter(|s| !s.is_empty());

        if start.is_none() && stop.is_none() {
            return Ok(None);
        }

        let start = start.map_or(Ok(TimeExpression::Now), str::parse)?;
        let stop = stop.map_or(Ok(TimeExpression::Now), str::parse)?;

        Ok(Some(Self {
            start,
            stop,
            parameters: parameters.to_string(),
        }))
    }

    /// Resolve both bounds against `now`
    ///
    /// # Errors
    /// `ConfigValidation` when the range is inverted.
    pub fn window(
        &self,
        now: DateTime<Utc>,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>), ContractError> {
        let start = self.start.resolve(now);
        let stop = self.stop.resolve(now);
        if start > stop {
            return Err(ContractError::config_validation(
                "temporal_constraint",
                format!("start time {start} is after stop time {stop}"),
            ));
        }
        Ok((start, stop))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_empty_bounds_cancel() {
        assert_eq!(TemporalConstraint::parse(None, None, "").unwrap(), None);
        assert_eq!(
            TemporalConstraint::parse(Some(""), Some("  "), "").unwrap(),
            None
        );
    }

    #[test]
    fn test_relative_expression() {
        let c = TemporalConstraint::parse(Some("*-5m"), Some("*"), "rate=30")
            .unwrap()
            .unwrap();
        let (start, stop) = c.window(now()).unwrap();
        assert_eq!(stop - start, TimeDelta::try_minutes(5).unwrap());
        assert_eq!(c.parameters, "rate=30");
    }

    #[test]
    fn test_absolute_formats() {
        let a: TimeExpression = "2024-03-01 10:30:00".parse().unwrap();
        let b: TimeExpression = "2024-03-01T10:30:00Z".parse().unwrap();
        assert_eq!(a, b);

        let d: TimeExpression = "2024-03-01".parse().unwrap();
        assert_eq!(d.resolve(now()), Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_missing_stop_defaults_to_now() {
        let c = TemporalConstraint::parse(Some("*-1h"), None, "")
            .unwrap()
            .unwrap();
        assert_eq!(c.stop, TimeExpression::Now);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!("*-5w".parse::<TimeExpression>().is_err());
        assert!("yesterday".parse::<TimeExpression>().is_err());
        assert!(TemporalConstraint::parse(Some("*+3s"), None, "").is_err());
    }

    #[test]
    fn test_inverted_window_rejected() {
        let c = TemporalConstraint::parse(Some("*"), Some("*-1d"), "")
            .unwrap()
            .unwrap();
        assert!(c.window(now()).is_err());
    }
}
