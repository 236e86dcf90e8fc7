//! The `RollcallStore` trait and read-model types.
//!
//! The trait is implemented by storage backends (e.g. `rollcall-store-sqlite`).
//! The API layer depends on this abstraction, not on any concrete backend.
//! There is no shared mutable collection anywhere: every operation is an
//! explicit read or write against the backend.

use std::future::Future;

use serde::Serialize;
use uuid::Uuid;

use crate::{
  ledger::{LedgerInsert, NewAttendanceRecord},
  link::{AttendanceLink, LinkStatus, NewLink},
  roster::{Group, NewGroup, NewStudent, RosterEntry, Student},
  window::AttendanceWindow,
};

// ─── Read models ─────────────────────────────────────────────────────────────

/// Canonical per-group listing row: the group plus its roster size and how
/// many members are marked present in the requested window.
#[derive(Debug, Clone, Serialize)]
pub struct GroupSummary {
  #[serde(flatten)]
  pub group:         Group,
  pub student_count: u64,
  pub present_count: u64,
}

/// Instructor dashboard totals.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
  pub total_groups:      u64,
  pub total_students:    u64,
  pub active_links:      u64,
  pub present_in_window: u64,
}

/// One group's slice of the per-window attendance report.
#[derive(Debug, Clone, Serialize)]
pub struct GroupAttendanceReport {
  pub group_id:         Uuid,
  pub group_name:       String,
  pub total_students:   u64,
  pub present_count:    u64,
  pub present_students: Vec<PresentStudent>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PresentStudent {
  pub display_name: String,
  pub external_id:  String,
  pub email:        String,
  pub phone:        String,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a rollcall storage backend.
///
/// The attendance table is append-only: [`insert_attendance`] is the only
/// write path, and it is an atomic insert-if-absent on the
/// `(student_id, link_id, window)` uniqueness key — the sole point of truth
/// for deduplication.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (tokio with `axum`).
///
/// [`insert_attendance`]: RollcallStore::insert_attendance
pub trait RollcallStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Groups ────────────────────────────────────────────────────────────

  /// Create and persist a new group.
  fn add_group(
    &self,
    input: NewGroup,
  ) -> impl Future<Output = Result<Group, Self::Error>> + Send + '_;

  /// Retrieve a group by id. Returns `None` if not found.
  fn get_group(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Group>, Self::Error>> + Send + '_;

  /// List every group with roster and presence counts for `window`.
  fn group_summaries(
    &self,
    window: AttendanceWindow,
  ) -> impl Future<Output = Result<Vec<GroupSummary>, Self::Error>> + Send + '_;

  // ── Links ─────────────────────────────────────────────────────────────

  /// Persist a link allocated at group setup.
  fn add_link(
    &self,
    input: NewLink,
  ) -> impl Future<Output = Result<AttendanceLink, Self::Error>> + Send + '_;

  /// Look up a link by its bearer token. Pure read; returns `None` when the
  /// token is unknown.
  fn find_link<'a>(
    &'a self,
    token: &'a str,
  ) -> impl Future<Output = Result<Option<AttendanceLink>, Self::Error>> + Send + 'a;

  /// Administrative status change (revocation, manual expiry). Returns
  /// `false` if the link does not exist. Never called by the pipeline.
  fn set_link_status(
    &self,
    id:     Uuid,
    status: LinkStatus,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Students ──────────────────────────────────────────────────────────

  /// Enroll a student together with their embeddings, atomically.
  fn enroll_student(
    &self,
    input: NewStudent,
  ) -> impl Future<Output = Result<Student, Self::Error>> + Send + '_;

  /// Find a student in a group by their institution-issued id. Used to
  /// reject duplicate registrations.
  fn find_student_by_external_id<'a>(
    &'a self,
    group_id:    Uuid,
    external_id: &'a str,
  ) -> impl Future<Output = Result<Option<Student>, Self::Error>> + Send + 'a;

  /// A read-only roster snapshot for one identification call: every student
  /// in the group with all of their enrolled embeddings.
  fn roster(
    &self,
    group_id: Uuid,
  ) -> impl Future<Output = Result<Vec<RosterEntry>, Self::Error>> + Send + '_;

  // ── Attendance ledger ─────────────────────────────────────────────────

  /// Atomic insert-if-absent on `(student_id, link_id, window)`. Under N
  /// concurrent calls for the same key, exactly one observes
  /// [`LedgerInsert::Fresh`]; the rest observe [`LedgerInsert::Duplicate`].
  fn insert_attendance(
    &self,
    input: NewAttendanceRecord,
  ) -> impl Future<Output = Result<LedgerInsert, Self::Error>> + Send + '_;

  // ── Reads for the dashboard collaborator ──────────────────────────────

  /// Per-group present lists for `window`. Read-only over the ledger.
  fn window_report(
    &self,
    window: AttendanceWindow,
  ) -> impl Future<Output = Result<Vec<GroupAttendanceReport>, Self::Error>> + Send + '_;

  /// Dashboard totals, with presence counted in `window`.
  fn dashboard_stats(
    &self,
    window: AttendanceWindow,
  ) -> impl Future<Output = Result<DashboardStats, Self::Error>> + Send + '_;
}
