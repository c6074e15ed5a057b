//! Feature Flags for Flagline
//!
//! Evaluation engine for project-scoped feature flags: targeting rules,
//! deterministic percentage rollout, and schedule timelines.
//!
//! # Features
//!
//! - 🚀 **Feature Flags** - Master switch plus boolean and multivariant kinds
//! - 🎯 **Targeting Rules** - Prioritized rules over nested condition groups
//! - 🎲 **Gradual Rollout** - Stable hashing into percentage buckets
//! - ⏰ **Schedules** - One-shot windows and cron-recurring windows
//! - 📈 **Timelines** - Every on/off transition across a time range
//!
//! # Quick Start
//!
//! ```
//! use flagline_features::*;
//! use std::sync::Arc;
//! use uuid::Uuid;
//!
//! let project = Uuid::new_v4();
//! let snapshot = Snapshot::from_features(vec![Feature::boolean(project, "new-ui")]);
//! let holder = Arc::new(SnapshotHolder::new(snapshot));
//! let evaluator = Evaluator::new(holder, EngineConfig::default());
//!
//! let context = EvaluationContext::new().with_user_id("user-123");
//! let (value, enabled, found) = evaluator.evaluate(project, "new-ui", &context).into_parts();
//!
//! assert_eq!((value.as_str(), enabled, found), ("true", true, true));
//! ```
//!
//! # Targeting Rules
//!
//! ```
//! use flagline_features::*;
//! use uuid::Uuid;
//!
//! let beta = FlagVariant::new("beta", 0);
//!
//! // Assign internal users to the beta variant
//! let rule = Rule::assign(1, beta.id).with_conditions(Expression::condition(
//!     "email",
//!     Operator::Regex,
//!     "@company\\.com$",
//! ));
//!
//! let feature = Feature::multivariant(Uuid::new_v4(), "checkout", "stable", vec![beta])
//!     .with_rule(rule);
//! ```
//!
//! # Timelines
//!
//! ```
//! use chrono::{Duration, TimeZone, Utc};
//! use flagline_features::*;
//! use uuid::Uuid;
//!
//! // On for five minutes every ten minutes
//! let feature = Feature::boolean(Uuid::new_v4(), "pulse")
//!     .with_created_at(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
//!     .with_schedule(FeatureSchedule::recurring(
//!         ScheduleAction::Enable,
//!         "*/10 * * * *",
//!         Duration::minutes(5),
//!     ));
//!
//! let from = Utc.with_ymd_and_hms(2024, 1, 1, 11, 59, 0).unwrap();
//! let to = Utc.with_ymd_and_hms(2024, 1, 1, 12, 29, 0).unwrap();
//! let events = TimelineBuilder::default().build(&feature, from, to, None).unwrap();
//!
//! assert_eq!(events.len(), 8);
//! ```

pub mod bucket;
pub mod coerce;
pub mod condition;
pub mod config;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod flag;
pub mod schedule;
pub mod snapshot;
pub mod timeline;

pub use bucket::{bucket, pick_variant, pick_variant_name, stable_hash};
pub use condition::{Condition, ConditionGroup, Expression, GroupOperator, Operator};
pub use config::EngineConfig;
pub use context::EvaluationContext;
pub use error::{EngineError, EngineResult};
pub use evaluator::{Evaluation, EvaluationReason, Evaluator};
pub use flag::{Feature, FeatureKind, FlagVariant, Rule, RuleAction};
pub use schedule::{FeatureSchedule, ScheduleAction, baseline, schedule_state_at};
pub use snapshot::{Snapshot, SnapshotHolder};
pub use timeline::{TimelineBuilder, TimelineEvent};
