//! Display formatting for profile fields.

use chrono::{DateTime, NaiveDate};

/// Render a server date as `DD.MM.YYYY`.
///
/// Accepts RFC 3339 timestamps and plain `YYYY-MM-DD` dates. Anything else is
/// shown as received; a missing date renders as an empty string.
pub fn format_date(raw: Option<&str>) -> String {
  let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
    return String::new();
  };

  if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
    return ts.date_naive().format("%d.%m.%Y").to_string();
  }
  if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
    return date.format("%d.%m.%Y").to_string();
  }
  raw.to_string()
}
