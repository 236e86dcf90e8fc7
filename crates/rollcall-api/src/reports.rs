//! Admin read models over the attendance ledger.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET` | `/dashboard/stats` | Totals for the instructor dashboard |
//! | `GET` | `/reports/window?date=YYYY-MM-DD` | Per-group present lists |

use axum::{
  Json,
  extract::{Query, State},
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use rollcall_core::{
  store::{DashboardStats, GroupAttendanceReport, RollcallStore},
  window::AttendanceWindow,
};

use crate::{
  AppState,
  auth::Authenticated,
  error::{ApiError, store_err},
};

/// `GET /dashboard/stats`
pub async fn stats<S>(
  _: Authenticated,
  State(state): State<AppState<S>>,
) -> Result<Json<DashboardStats>, ApiError>
where
  S: RollcallStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let window = state.window.window_at(Utc::now());
  let stats = state
    .store
    .dashboard_stats(window)
    .await
    .map_err(store_err)?;
  Ok(Json(stats))
}

#[derive(Debug, Deserialize)]
pub struct ReportParams {
  /// Calendar day to report on; defaults to the current window.
  pub date: Option<NaiveDate>,
}

/// `GET /reports/window[?date=YYYY-MM-DD]`
pub async fn window<S>(
  _: Authenticated,
  State(state): State<AppState<S>>,
  Query(params): Query<ReportParams>,
) -> Result<Json<Vec<GroupAttendanceReport>>, ApiError>
where
  S: RollcallStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let window = match params.date {
    Some(day) => AttendanceWindow::for_day(day),
    None => state.window.window_at(Utc::now()),
  };
  let report = state
    .store
    .window_report(window)
    .await
    .map_err(store_err)?;
  Ok(Json(report))
}
