//! Attendance windows — the time bucket that deduplicates attendance.
//!
//! The granularity is an explicit configuration choice: one record per
//! student per link per UTC calendar day, or one per student per link over
//! the link's whole lifetime (for links that represent a single session).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// How attendance records are bucketed for deduplication.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum WindowPolicy {
  /// One record per (student, link) per UTC calendar day.
  #[default]
  Daily,
  /// One record per (student, link), ever.
  PerLink,
}

/// A window key; part of the ledger's uniqueness tuple and stored verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttendanceWindow(pub String);

impl WindowPolicy {
  pub fn window_at(&self, now: DateTime<Utc>) -> AttendanceWindow {
    match self {
      WindowPolicy::Daily => AttendanceWindow::for_day(now.date_naive()),
      WindowPolicy::PerLink => AttendanceWindow("link".to_string()),
    }
  }
}

impl AttendanceWindow {
  pub fn for_day(day: NaiveDate) -> Self {
    Self(day.format("%Y-%m-%d").to_string())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl std::fmt::Display for AttendanceWindow {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  #[test]
  fn daily_windows_differ_across_days() {
    let d1 = Utc.with_ymd_and_hms(2026, 8, 30, 23, 59, 59).unwrap();
    let d2 = Utc.with_ymd_and_hms(2026, 8, 31, 0, 0, 1).unwrap();
    assert_ne!(WindowPolicy::Daily.window_at(d1), WindowPolicy::Daily.window_at(d2));
    assert_eq!(WindowPolicy::Daily.window_at(d1).as_str(), "2026-08-30");
  }

  #[test]
  fn daily_window_is_stable_within_a_day() {
    let morning = Utc.with_ymd_and_hms(2026, 8, 30, 8, 0, 0).unwrap();
    let evening = Utc.with_ymd_and_hms(2026, 8, 30, 20, 0, 0).unwrap();
    assert_eq!(
      WindowPolicy::Daily.window_at(morning),
      WindowPolicy::Daily.window_at(evening)
    );
  }

  #[test]
  fn per_link_window_never_changes() {
    let d1 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let d2 = Utc.with_ymd_and_hms(2027, 6, 15, 12, 0, 0).unwrap();
    assert_eq!(
      WindowPolicy::PerLink.window_at(d1),
      WindowPolicy::PerLink.window_at(d2)
    );
  }
}
