//! Cron expressions for Flagline schedules.
//!
//! Provides the recurring-schedule half of the timeline engine:
//! - ⏰ Standard five-field cron expressions
//! - 🌍 Timezone-aware occurrence enumeration (IANA names via `chrono-tz`)
//! - 🔙 Look-back for the occurrence active at a given instant
//!
//! ## Quick Start
//!
//! ```
//! use flagline_cron::CronExpression;
//!
//! // Every ten minutes
//! let expr = CronExpression::parse("*/10 * * * *").unwrap();
//!
//! let now = chrono::Utc::now();
//! let next = expr.next_after(&now);
//!
//! assert!(next.is_some());
//! assert!(next.unwrap() > now);
//! ```
//!
//! ## Occurrences in a Timezone
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use flagline_cron::{CronExpression, CronPresets, parse_timezone};
//!
//! let daily = CronExpression::parse(CronPresets::DAILY).unwrap();
//! let tokyo = parse_timezone("Asia/Tokyo").unwrap();
//! let from = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
//!
//! let firings: Vec<_> = daily.occurrences_after(from, &tokyo).take(2).collect();
//! assert_eq!(firings[0], Utc.with_ymd_and_hms(2024, 3, 1, 15, 0, 0).unwrap());
//! ```

pub mod error;
pub mod expression;
pub mod timezone;

pub use error::{CronError, CronResult};
pub use expression::{CronExpression, CronPresets};
pub use timezone::{parse_timezone, resolve_timezone};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{CronError, CronResult};
    pub use crate::expression::{CronExpression, CronPresets};
    pub use crate::timezone::{parse_timezone, resolve_timezone};
}
