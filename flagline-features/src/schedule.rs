//! Feature schedules and point-in-time schedule state.
//!
//! A schedule is either a one-shot window (`starts_at`/`ends_at`) or a recurring
//! window opened by each cron firing for `cron_duration_secs`. Outside every active
//! window a feature sits at its baseline.

use crate::flag::Feature;
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use flagline_cron::{CronExpression, CronResult, resolve_timezone};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// What a schedule does while active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleAction {
    Enable,
    Disable,
}

impl ScheduleAction {
    /// Feature state while the schedule is active.
    pub fn enables(self) -> bool {
        self == Self::Enable
    }
}

/// One-shot or recurring schedule attached to a feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchedule {
    /// Schedule ID
    pub id: Uuid,

    /// Start of a one-shot window, or of the recurrence
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,

    /// End of a one-shot window, or of the recurrence
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,

    /// Five-field cron expression for recurring schedules
    #[serde(default)]
    pub cron_expr: Option<String>,

    /// How long each cron occurrence stays active
    #[serde(default)]
    pub cron_duration_secs: Option<i64>,

    /// IANA zone the cron fields are interpreted in
    #[serde(default)]
    pub timezone: Option<String>,

    /// Feature state while the schedule is active
    pub action: ScheduleAction,
}

impl FeatureSchedule {
    /// Create a one-shot window
    pub fn one_shot(
        action: ScheduleAction,
        starts_at: Option<DateTime<Utc>>,
        ends_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            starts_at,
            ends_at,
            cron_expr: None,
            cron_duration_secs: None,
            timezone: None,
            action,
        }
    }

    /// Create a recurring schedule
    pub fn recurring(
        action: ScheduleAction,
        cron_expr: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            cron_expr: Some(cron_expr.into()),
            cron_duration_secs: Some(duration.num_seconds()),
            ..Self::one_shot(action, None, None)
        }
    }

    /// Bound a recurring schedule's activity
    pub fn between(
        mut self,
        starts_at: Option<DateTime<Utc>>,
        ends_at: Option<DateTime<Utc>>,
    ) -> Self {
        self.starts_at = starts_at;
        self.ends_at = ends_at;
        self
    }

    /// Set the cron timezone
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }

    /// Check if the schedule is cron-driven
    pub fn is_recurring(&self) -> bool {
        self.cron_expr.is_some()
    }

    /// Occurrence length; `None` unless positive and representable.
    pub fn cron_duration(&self) -> Option<Duration> {
        self.cron_duration_secs
            .filter(|secs| *secs > 0)
            .and_then(Duration::try_seconds)
    }

    /// Parse the cron expression, if any
    pub fn parse_cron(&self) -> Option<CronResult<CronExpression>> {
        self.cron_expr.as_deref().map(CronExpression::parse)
    }

    /// Zone the cron fields are read in, falling back to `fallback`.
    pub fn zone(&self, fallback: Tz) -> Tz {
        resolve_timezone(self.timezone.as_deref(), fallback)
    }

    /// First instant the recurrence may fire.
    pub fn effective_start(&self, feature_created_at: DateTime<Utc>) -> DateTime<Utc> {
        self.starts_at.unwrap_or(feature_created_at)
    }

    /// Whether a one-shot window covers `at` (`[starts_at, ends_at)`).
    pub fn window_contains(&self, at: DateTime<Utc>) -> bool {
        self.starts_at.is_none_or(|start| start <= at) && self.ends_at.is_none_or(|end| at < end)
    }
}

/// Latest firing that started an occurrence still running at `at`.
///
/// Only firings at or after `effective_start` count.
pub(crate) fn occurrence_active_at(
    cron: &CronExpression,
    at: DateTime<Utc>,
    duration: Duration,
    effective_start: DateTime<Utc>,
    tz: &Tz,
    limit: usize,
) -> Option<DateTime<Utc>> {
    let floor = effective_start
        .checked_sub_signed(Duration::nanoseconds(1))
        .unwrap_or(effective_start);
    let horizon = at
        .checked_sub_signed(duration)
        .map_or(floor, |earliest| earliest.max(floor));

    cron.latest_at_or_before(at, horizon, tz, limit)
        .filter(|firing| occurrence_end(*firing, duration).is_none_or(|end| end > at))
}

/// End of the occurrence fired at `firing`; `None` when it lies past the last
/// representable instant, i.e. the occurrence never ends.
pub(crate) fn occurrence_end(firing: DateTime<Utc>, duration: Duration) -> Option<DateTime<Utc>> {
    firing.checked_add_signed(duration)
}

/// Feature state outside every active window.
///
/// Enable-type schedules imply the feature is off by default; Disable-type schedules
/// imply it is on. With a mix the baseline is on only if every schedule disables.
pub fn baseline(schedules: &[FeatureSchedule]) -> bool {
    !schedules.is_empty()
        && schedules
            .iter()
            .all(|schedule| schedule.action == ScheduleAction::Disable)
}

/// Whether a single schedule is active at `at`.
///
/// Malformed cron expressions and non-positive durations are never active.
pub fn schedule_active_at(
    schedule: &FeatureSchedule,
    feature_created_at: DateTime<Utc>,
    at: DateTime<Utc>,
    fallback_tz: Tz,
    limit: usize,
) -> bool {
    let Some(parsed) = schedule.parse_cron() else {
        return schedule.window_contains(at);
    };

    let cron = match parsed {
        Ok(cron) => cron,
        Err(e) => {
            debug!(schedule = %schedule.id, error = %e, "Ignoring schedule with invalid cron");
            return false;
        }
    };
    let Some(duration) = schedule.cron_duration() else {
        return false;
    };

    let start = schedule.effective_start(feature_created_at);
    if at < start || schedule.ends_at.is_some_and(|end| at >= end) {
        return false;
    }

    occurrence_active_at(&cron, at, duration, start, &schedule.zone(fallback_tz), limit).is_some()
}

/// Point-in-time feature state with schedules applied.
///
/// The master switch wins; without schedules the manual state applies. Otherwise the
/// last-listed active schedule decides, falling back to the baseline.
pub fn schedule_state_at(
    feature: &Feature,
    at: DateTime<Utc>,
    fallback_tz: Tz,
    limit: usize,
) -> bool {
    if !feature.enabled {
        return false;
    }
    if feature.schedules.is_empty() {
        return feature.enabled;
    }

    feature
        .schedules
        .iter()
        .rev()
        .find(|schedule| schedule_active_at(schedule, feature.created_at, at, fallback_tz, limit))
        .map(|schedule| schedule.action.enables())
        .unwrap_or_else(|| baseline(&feature.schedules))
}
