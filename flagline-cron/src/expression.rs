//! Cron expression parsing and evaluation.

use crate::error::{CronError, CronResult};
use chrono::{DateTime, TimeZone, Utc};
use cron::Schedule;
use std::str::FromStr;

/// Parsed five-field cron expression.
#[derive(Debug, Clone)]
pub struct CronExpression {
    schedule: Schedule,
    expression: String,
}

impl CronExpression {
    /// Parse a cron expression.
    ///
    /// Supports the standard cron format with 5 fields:
    /// - Minute (0-59)
    /// - Hour (0-23)
    /// - Day of month (1-31)
    /// - Month (1-12 or JAN-DEC)
    /// - Day of week (0-7 or SUN-SAT, Sunday = 0 or 7)
    ///
    /// The `@hourly`, `@daily`, `@weekly`, `@monthly` and `@yearly` shorthands are
    /// accepted as well.
    ///
    /// # Examples
    ///
    /// ```
    /// use flagline_cron::CronExpression;
    ///
    /// // Every ten minutes
    /// let expr = CronExpression::parse("*/10 * * * *").unwrap();
    ///
    /// // Every weekday at 9 AM
    /// let expr = CronExpression::parse("0 9 * * 1-5").unwrap();
    ///
    /// // Every Monday at 9 AM
    /// let expr = CronExpression::parse("0 9 * * MON").unwrap();
    /// ```
    pub fn parse(expression: &str) -> CronResult<Self> {
        let normalized = normalize(expression)?;
        let schedule = Schedule::from_str(&normalized)
            .map_err(|e| CronError::invalid(format!("{}: {}", expression.trim(), e)))?;

        Ok(Self {
            schedule,
            expression: expression.trim().to_string(),
        })
    }

    /// Get the next firing strictly after the given time, computed in the time's zone.
    pub fn next_after<Z: TimeZone>(&self, after: &DateTime<Z>) -> Option<DateTime<Z>> {
        self.schedule.after(after).next()
    }

    /// Iterate firings strictly after `after`, evaluating the calendar fields in `tz`.
    ///
    /// The iterator is unbounded for most expressions; callers cap it.
    pub fn occurrences_after<'a, Z>(
        &'a self,
        after: DateTime<Utc>,
        tz: &Z,
    ) -> impl Iterator<Item = DateTime<Utc>> + 'a
    where
        Z: TimeZone + 'a,
    {
        self.schedule
            .after(&after.with_timezone(tz))
            .map(|t| t.with_timezone(&Utc))
    }

    /// Latest firing at or before `at`, searching no further back than `horizon`.
    ///
    /// Returns `None` when no firing falls inside `(horizon, at]`, or when more than
    /// `limit` firings had to be skipped to reach `at`.
    pub fn latest_at_or_before<Z: TimeZone>(
        &self,
        at: DateTime<Utc>,
        horizon: DateTime<Utc>,
        tz: &Z,
        limit: usize,
    ) -> Option<DateTime<Utc>> {
        let mut latest = None;
        for (skipped, firing) in self.occurrences_after(horizon, tz).enumerate() {
            if firing > at {
                return latest;
            }
            if skipped == limit {
                return None;
            }
            latest = Some(firing);
        }
        latest
    }

    /// Get the expression string as it was written.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Check if the expression fires at exactly the given instant.
    pub fn matches(&self, time: DateTime<Utc>) -> bool {
        self.schedule.includes(time)
    }
}

impl FromStr for CronExpression {
    type Err = CronError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for CronExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.expression)
    }
}

/// Translate a five-field expression to the seconds-first, Sunday-is-1 form the
/// `cron` crate parses.
fn normalize(expression: &str) -> CronResult<String> {
    let trimmed = expression.trim();
    if trimmed.starts_with('@') {
        return Ok(trimmed.to_string());
    }

    let fields: Vec<&str> = trimmed.split_whitespace().collect();
    let [minute, hour, day_of_month, month, day_of_week] = fields.as_slice() else {
        return Err(CronError::invalid(format!(
            "{}: expected 5 fields, found {}",
            trimmed,
            fields.len()
        )));
    };

    Ok(format!(
        "0 {} {} {} {} {}",
        minute,
        hour,
        day_of_month,
        month,
        translate_day_of_week(day_of_week)?
    ))
}

fn translate_day_of_week(field: &str) -> CronResult<String> {
    let mut items = Vec::new();

    for item in field.split(',') {
        let (range, step) = match item.split_once('/') {
            Some((range, step)) => (range, Some(step)),
            None => (item, None),
        };

        let translated = if range == "*" || range == "?" {
            vec![range.to_string()]
        } else if let Some((lo, hi)) = range.split_once('-') {
            match (day_number(lo)?, day_number(hi)?) {
                (Some(lo), Some(hi)) => translate_day_range(lo, hi, step.is_some(), item)?,
                _ => vec![range.to_string()],
            }
        } else {
            match day_number(range)? {
                Some(day) => vec![shift_day(day).to_string()],
                None => vec![range.to_string()],
            }
        };

        match step {
            Some(step) if translated.len() == 1 => {
                items.push(format!("{}/{}", translated[0], step));
            }
            Some(_) => return Err(CronError::unsupported_day_of_week(item)),
            None => items.extend(translated),
        }
    }

    Ok(items.join(","))
}

/// Parse a numeric day; `None` for names like `MON`.
fn day_number(token: &str) -> CronResult<Option<u8>> {
    if !token.bytes().all(|b| b.is_ascii_digit()) || token.is_empty() {
        return Ok(None);
    }

    match token.parse::<u8>() {
        Ok(day) if day <= 7 => Ok(Some(day)),
        _ => Err(CronError::unsupported_day_of_week(token)),
    }
}

/// 0-7 (Sunday = 0 or 7) to 1-7 (Sunday = 1).
fn shift_day(day: u8) -> u8 {
    day % 7 + 1
}

fn translate_day_range(lo: u8, hi: u8, stepped: bool, item: &str) -> CronResult<Vec<String>> {
    if lo > hi {
        return Err(CronError::unsupported_day_of_week(item));
    }

    if hi < 7 || lo == 0 {
        // 0-7 covers the whole week
        let hi = if hi == 7 { 6 } else { hi };
        return Ok(vec![format!("{}-{}", shift_day(lo), shift_day(hi))]);
    }

    // Range ending on Sunday wraps around in the target numbering
    if stepped {
        return Err(CronError::unsupported_day_of_week(item));
    }
    if lo == 7 {
        return Ok(vec![shift_day(7).to_string()]);
    }
    Ok(vec![format!("{}-7", shift_day(lo)), shift_day(7).to_string()])
}

/// Common cron expression presets.
pub struct CronPresets;

impl CronPresets {
    /// Every minute
    pub const EVERY_MINUTE: &'static str = "* * * * *";

    /// Every 5 minutes
    pub const EVERY_5_MINUTES: &'static str = "*/5 * * * *";

    /// Every 15 minutes
    pub const EVERY_15_MINUTES: &'static str = "*/15 * * * *";

    /// Every hour
    pub const EVERY_HOUR: &'static str = "0 * * * *";

    /// Every day at midnight
    pub const DAILY: &'static str = "0 0 * * *";

    /// Every week on Sunday at midnight
    pub const WEEKLY: &'static str = "0 0 * * 0";

    /// Every month on the 1st at midnight
    pub const MONTHLY: &'static str = "0 0 1 * *";

    /// Every weekday (Monday-Friday) at 9 AM
    pub const WEEKDAYS_9AM: &'static str = "0 9 * * 1-5";

    /// Every weekend (Saturday-Sunday) at 10 AM
    pub const WEEKENDS_10AM: &'static str = "0 10 * * 6,0";
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike, Weekday};
    use chrono_tz::Tz;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_parse_valid_expression() {
        assert!(CronExpression::parse("*/10 * * * *").is_ok());
        assert!(CronExpression::parse("  0 9 * * MON-FRI ").is_ok());
        assert!(CronExpression::parse("@daily").is_ok());
    }

    #[test]
    fn test_parse_invalid_expression() {
        assert!(CronExpression::parse("invalid").is_err());
        assert!(CronExpression::parse("0 * * * * *").is_err());
        assert!(CronExpression::parse("61 * * * *").is_err());
        assert!(CronExpression::parse("0 0 * * 9").is_err());
    }

    #[test]
    fn test_normalize_prefixes_seconds() {
        assert_eq!(normalize("*/10 * * * *").unwrap(), "0 */10 * * * *");
    }

    #[test]
    fn test_day_of_week_translation() {
        assert_eq!(translate_day_of_week("0").unwrap(), "1");
        assert_eq!(translate_day_of_week("7").unwrap(), "1");
        assert_eq!(translate_day_of_week("1-5").unwrap(), "2-6");
        assert_eq!(translate_day_of_week("0-6").unwrap(), "1-7");
        assert_eq!(translate_day_of_week("0-7").unwrap(), "1-7");
        assert_eq!(translate_day_of_week("5-7").unwrap(), "6-7,1");
        assert_eq!(translate_day_of_week("6,0").unwrap(), "7,1");
        assert_eq!(translate_day_of_week("*/2").unwrap(), "*/2");
        assert_eq!(translate_day_of_week("1/2").unwrap(), "2/2");
        assert_eq!(translate_day_of_week("MON-FRI").unwrap(), "MON-FRI");
        assert!(translate_day_of_week("5-7/2").is_err());
        assert!(translate_day_of_week("5-1").is_err());
    }

    #[test]
    fn test_weekday_firings_follow_standard_numbering() {
        let expr = CronExpression::parse(CronPresets::WEEKDAYS_9AM).unwrap();
        // 2024-06-01 is a Saturday
        let mut firings = expr.occurrences_after(utc("2024-06-01T00:00:00Z"), &Utc);
        let first = firings.next().unwrap();
        assert_eq!(first.weekday(), Weekday::Mon);
        assert_eq!(first.hour(), 9);

        let sunday = CronExpression::parse("0 12 * * 0").unwrap();
        let next = sunday.next_after(&utc("2024-06-01T00:00:00Z")).unwrap();
        assert_eq!(next.weekday(), Weekday::Sun);
    }

    #[test]
    fn test_occurrences_are_strictly_after() {
        let expr = CronExpression::parse("*/10 * * * *").unwrap();
        let firings: Vec<_> = expr
            .occurrences_after(utc("2024-01-01T12:00:00Z"), &Utc)
            .take(3)
            .collect();

        assert_eq!(
            firings,
            vec![
                utc("2024-01-01T12:10:00Z"),
                utc("2024-01-01T12:20:00Z"),
                utc("2024-01-01T12:30:00Z"),
            ]
        );
    }

    #[test]
    fn test_occurrences_in_timezone() {
        let expr = CronExpression::parse(CronPresets::DAILY).unwrap();
        let berlin: Tz = "Europe/Berlin".parse().unwrap();
        let first = expr
            .occurrences_after(utc("2024-01-10T12:00:00Z"), &berlin)
            .next()
            .unwrap();

        // Midnight in Berlin (UTC+1 in winter)
        assert_eq!(first, utc("2024-01-10T23:00:00Z"));
    }

    #[test]
    fn test_latest_at_or_before() {
        let expr = CronExpression::parse("*/10 * * * *").unwrap();
        let at = utc("2024-01-01T12:03:00Z");

        let latest = expr.latest_at_or_before(at, utc("2024-01-01T11:58:00Z"), &Utc, 100);
        assert_eq!(latest, Some(utc("2024-01-01T12:00:00Z")));

        let none = expr.latest_at_or_before(at, utc("2024-01-01T12:01:00Z"), &Utc, 100);
        assert_eq!(none, None);

        let exact = expr.latest_at_or_before(
            utc("2024-01-01T12:10:00Z"),
            utc("2024-01-01T12:05:00Z"),
            &Utc,
            100,
        );
        assert_eq!(exact, Some(utc("2024-01-01T12:10:00Z")));
    }

    #[test]
    fn test_latest_at_or_before_gives_up_past_limit() {
        let expr = CronExpression::parse("*/10 * * * *").unwrap();
        let at = utc("2024-01-01T12:03:00Z");
        let horizon = utc("2024-01-01T11:00:00Z");

        // Six firings (11:10 through 12:00) lie inside the search range
        assert_eq!(
            expr.latest_at_or_before(at, horizon, &Utc, 6),
            Some(utc("2024-01-01T12:00:00Z"))
        );
        assert_eq!(expr.latest_at_or_before(at, horizon, &Utc, 5), None);
        assert_eq!(expr.latest_at_or_before(at, horizon, &Utc, 0), None);
    }

    #[test]
    fn test_presets() {
        for preset in [
            CronPresets::EVERY_MINUTE,
            CronPresets::EVERY_5_MINUTES,
            CronPresets::EVERY_15_MINUTES,
            CronPresets::EVERY_HOUR,
            CronPresets::DAILY,
            CronPresets::WEEKLY,
            CronPresets::MONTHLY,
            CronPresets::WEEKDAYS_9AM,
            CronPresets::WEEKENDS_10AM,
        ] {
            assert!(CronExpression::parse(preset).is_ok(), "{preset}");
        }
    }

    #[test]
    fn test_matches() {
        let expr = CronExpression::parse("30 * * * *").unwrap();
        assert!(expr.matches(utc("2024-01-01T05:30:00Z")));
        assert!(!expr.matches(utc("2024-01-01T05:31:00Z")));
    }
}
