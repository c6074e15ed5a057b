//! IANA timezone resolution.

use crate::error::{CronError, CronResult};
use chrono_tz::Tz;
use tracing::warn;

/// Parse an IANA timezone name (e.g. `Europe/Berlin`).
///
/// Surrounding whitespace is ignored. An empty name is rejected.
pub fn parse_timezone(name: &str) -> CronResult<Tz> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CronError::InvalidTimezone("empty timezone name".to_string()));
    }

    name.parse::<Tz>()
        .map_err(|_| CronError::InvalidTimezone(name.to_string()))
}

/// Resolve an optional timezone name, falling back to `fallback` when the name is
/// absent or cannot be loaded.
pub fn resolve_timezone(name: Option<&str>, fallback: Tz) -> Tz {
    match name {
        None => fallback,
        Some(name) if name.trim().is_empty() => fallback,
        Some(name) => match parse_timezone(name) {
            Ok(tz) => tz,
            Err(e) => {
                warn!(
                    timezone = %name,
                    fallback = %fallback,
                    error = %e,
                    "Falling back to default timezone"
                );
                fallback
            }
        },
    }
}
