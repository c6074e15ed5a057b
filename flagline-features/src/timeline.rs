//! Schedule timelines.
//!
//! Expands a feature's one-shot and recurring schedules into the ordered list of
//! state changes across a window. The boundary events at `from` and `to` come from
//! [`schedule_state_at`], so the timeline and point-in-time evaluation agree.

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::flag::Feature;
use crate::schedule::{
    FeatureSchedule, baseline, occurrence_active_at, occurrence_end, schedule_state_at,
};
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use flagline_cron::resolve_timezone;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Point where the evaluated state of a feature changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEvent {
    /// Instant of the change
    pub time: DateTime<Utc>,
    /// State from this instant on
    pub enabled: bool,
}

impl TimelineEvent {
    /// Create a new event
    pub fn new(time: DateTime<Utc>, enabled: bool) -> Self {
        Self { time, enabled }
    }
}

/// Builds schedule timelines for features.
#[derive(Debug, Clone, Default)]
pub struct TimelineBuilder {
    config: EngineConfig,
}

/// Per-request state shared by the schedule expansions.
struct Window<'a> {
    feature: &'a Feature,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    zone: Tz,
    baseline: bool,
    limit: usize,
}

impl TimelineBuilder {
    /// Create a builder with the given configuration
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Get the configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Build the timeline of `feature` over `[from, to]`.
    ///
    /// `timezone` is the request's IANA zone, used for schedules that name none. The
    /// result always starts with an event at `from` and ends with one at `to`; in
    /// between are the transitions, sorted by time. Events at the same instant keep
    /// the order they were produced in (schedules in list order).
    pub fn build(
        &self,
        feature: &Feature,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        timezone: Option<&str>,
    ) -> EngineResult<Vec<TimelineEvent>> {
        if to < from {
            return Err(EngineError::InvalidWindow { from, to });
        }

        if !feature.enabled {
            return Ok(vec![TimelineEvent::new(from, false), TimelineEvent::new(to, false)]);
        }

        if feature.schedules.is_empty() {
            return Ok(vec![
                TimelineEvent::new(from, feature.enabled),
                TimelineEvent::new(to, feature.enabled),
            ]);
        }

        let window = Window {
            feature,
            from,
            to,
            zone: resolve_timezone(timezone, self.config.timezone()),
            baseline: baseline(&feature.schedules),
            limit: self.config.max_cron_occurrences,
        };

        let mut events = vec![TimelineEvent::new(
            from,
            schedule_state_at(feature, from, window.zone, window.limit),
        )];

        for schedule in &feature.schedules {
            if schedule.is_recurring() {
                expand_recurring(&window, schedule, &mut events);
            } else {
                expand_one_shot(&window, schedule, &mut events);
            }
        }

        events.push(TimelineEvent::new(
            to,
            schedule_state_at(feature, to, window.zone, window.limit),
        ));

        // Stable: ties keep production order
        events.sort_by_key(|event| event.time);

        debug!(
            feature = %feature.key,
            from = %from,
            to = %to,
            events = events.len(),
            "Built schedule timeline"
        );

        Ok(events)
    }
}

fn inside(window: &Window<'_>, time: DateTime<Utc>) -> bool {
    window.from < time && time < window.to
}

fn expand_one_shot(
    window: &Window<'_>,
    schedule: &FeatureSchedule,
    events: &mut Vec<TimelineEvent>,
) {
    if let (Some(start), Some(end)) = (schedule.starts_at, schedule.ends_at)
        && end <= start
    {
        debug!(schedule = %schedule.id, "Skipping empty schedule window");
        return;
    }

    if let Some(start) = schedule.starts_at
        && inside(window, start)
    {
        events.push(TimelineEvent::new(start, schedule.action.enables()));
    }

    if let Some(end) = schedule.ends_at
        && inside(window, end)
    {
        events.push(TimelineEvent::new(end, window.baseline));
    }
}

fn expand_recurring(
    window: &Window<'_>,
    schedule: &FeatureSchedule,
    events: &mut Vec<TimelineEvent>,
) {
    let Some(duration) = schedule.cron_duration() else {
        debug!(
            schedule = %schedule.id,
            "Skipping recurring schedule without a positive, representable duration"
        );
        return;
    };

    let cron = match schedule.parse_cron() {
        Some(Ok(cron)) => cron,
        Some(Err(e)) => {
            warn!(
                feature = %window.feature.key,
                schedule = %schedule.id,
                error = %e,
                "Skipping schedule with invalid cron expression"
            );
            return;
        }
        None => return,
    };

    let zone = schedule.zone(window.zone);
    let start = schedule.effective_start(window.feature.created_at);
    let lo = window.from.max(start);
    let hi = schedule.ends_at.map_or(window.to, |end| end.min(window.to));
    if lo >= hi {
        return;
    }

    let on = schedule.action.enables();

    // An occurrence already running at `from` still has to end inside the window
    if lo == window.from
        && let Some(firing) = occurrence_active_at(&cron, lo, duration, start, &zone, window.limit)
        && let Some(end) = occurrence_end(firing, duration)
        && end < hi
    {
        events.push(TimelineEvent::new(end, window.baseline));
    }

    // Firings at `from` itself are covered by the boundary event
    let after = if lo > window.from {
        lo - Duration::nanoseconds(1)
    } else {
        lo
    };

    let mut emitted = 0usize;
    for firing in cron.occurrences_after(after, &zone) {
        if firing >= hi {
            break;
        }
        if emitted == window.limit {
            debug!(
                feature = %window.feature.key,
                schedule = %schedule.id,
                limit = window.limit,
                "Cron occurrence cap reached; timeline truncated"
            );
            break;
        }
        emitted += 1;

        events.push(TimelineEvent::new(firing, on));
        if let Some(end) = occurrence_end(firing, duration)
            && end < hi
        {
            events.push(TimelineEvent::new(end, window.baseline));
        }
    }

    // The recurrence's own end cuts a running occurrence short
    if hi < window.to
        && let Some(firing) = occurrence_active_at(
            &cron,
            hi - Duration::nanoseconds(1),
            duration,
            start,
            &zone,
            window.limit,
        )
        && occurrence_end(firing, duration).is_none_or(|end| end >= hi)
    {
        events.push(TimelineEvent::new(hi, window.baseline));
    }
}
