//! The attendance ledger confirmation step.
//!
//! [`confirm`] composes session consumption with the ledger's atomic
//! insert-if-absent. Session consumption alone cannot deduplicate: two scans
//! of the same face produce two distinct sessions, and both must collapse to
//! one record. The storage-layer uniqueness key is the sole point of truth.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  error::{Error, Result},
  session::SessionStore,
  store::RollcallStore,
  window::{AttendanceWindow, WindowPolicy},
};

// ─── Records ─────────────────────────────────────────────────────────────────

/// A durable attendance record. Immutable once written; uniquely identified
/// by `(student_id, link_id, window)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceRecord {
  pub record_id:   Uuid,
  pub student_id:  Uuid,
  pub link_id:     Uuid,
  pub window:      AttendanceWindow,
  pub recorded_at: DateTime<Utc>,
}

/// Input for the ledger's insert-if-absent.
#[derive(Debug, Clone)]
pub struct NewAttendanceRecord {
  pub student_id: Uuid,
  pub link_id:    Uuid,
  pub window:     AttendanceWindow,
}

/// Outcome of one insert attempt against the uniqueness key.
#[derive(Debug, Clone)]
pub enum LedgerInsert {
  /// No record existed; this call wrote it.
  Fresh(AttendanceRecord),
  /// A record for this key already existed (prior or concurrently racing
  /// confirmation). Nothing was written.
  Duplicate,
}

/// What the client is told. `AlreadyMarked` is a successful idempotent
/// outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confirmation {
  Marked,
  AlreadyMarked,
}

impl From<LedgerInsert> for Confirmation {
  fn from(insert: LedgerInsert) -> Self {
    match insert {
      LedgerInsert::Fresh(_) => Confirmation::Marked,
      LedgerInsert::Duplicate => Confirmation::AlreadyMarked,
    }
  }
}

// ─── Confirmation pipeline ───────────────────────────────────────────────────

/// Confirm one identification attempt: consume the session, compute the
/// attendance window at `now`, and insert-if-absent into the ledger.
///
/// Session errors propagate untouched. A storage fault on the insert is
/// retried once — the insert is idempotent under the uniqueness key — and a
/// second fault surfaces as [`Error::Storage`]. No path through here can
/// leave two records for the same `(student, link, window)`.
pub async fn confirm<S: RollcallStore>(
  sessions:   &SessionStore,
  store:      &S,
  policy:     WindowPolicy,
  session_id: Uuid,
  student_id: Uuid,
  now:        DateTime<Utc>,
) -> Result<Confirmation> {
  let selection = sessions.consume(session_id, student_id, now)?;

  let input = NewAttendanceRecord {
    student_id,
    link_id: selection.link_id,
    window:  policy.window_at(now),
  };

  match store.insert_attendance(input.clone()).await {
    Ok(outcome) => Ok(outcome.into()),
    Err(_) => match store.insert_attendance(input).await {
      Ok(outcome) => Ok(outcome.into()),
      Err(e) => Err(Error::Storage(Box::new(e))),
    },
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::{
    collections::HashSet,
    sync::{
      Arc, Mutex,
      atomic::{AtomicUsize, Ordering},
    },
  };

  use chrono::Duration;

  use crate::{
    link::{AttendanceLink, LinkStatus, NewLink},
    matcher::Candidate,
    roster::{Group, NewGroup, NewStudent, RosterEntry, Student},
    store::{
      DashboardStats, GroupAttendanceReport, GroupSummary, RollcallStore,
    },
  };

  /// In-memory ledger with an injectable fault budget; every other store
  /// method is unreachable from `confirm`.
  #[derive(Default)]
  struct MemLedger {
    rows:       Mutex<HashSet<(Uuid, Uuid, String)>>,
    fail_next:  AtomicUsize,
    insert_ops: AtomicUsize,
  }

  impl MemLedger {
    fn failing(times: usize) -> Self {
      let ledger = Self::default();
      ledger.fail_next.store(times, Ordering::SeqCst);
      ledger
    }
  }

  impl RollcallStore for MemLedger {
    type Error = std::io::Error;

    async fn add_group(&self, _: NewGroup) -> Result<Group, Self::Error> {
      unimplemented!()
    }
    async fn get_group(&self, _: Uuid) -> Result<Option<Group>, Self::Error> {
      unimplemented!()
    }
    async fn group_summaries(
      &self,
      _: AttendanceWindow,
    ) -> Result<Vec<GroupSummary>, Self::Error> {
      unimplemented!()
    }
    async fn add_link(&self, _: NewLink) -> Result<AttendanceLink, Self::Error> {
      unimplemented!()
    }
    async fn find_link(&self, _: &str) -> Result<Option<AttendanceLink>, Self::Error> {
      unimplemented!()
    }
    async fn set_link_status(&self, _: Uuid, _: LinkStatus) -> Result<bool, Self::Error> {
      unimplemented!()
    }
    async fn enroll_student(&self, _: NewStudent) -> Result<Student, Self::Error> {
      unimplemented!()
    }
    async fn find_student_by_external_id(
      &self,
      _: Uuid,
      _: &str,
    ) -> Result<Option<Student>, Self::Error> {
      unimplemented!()
    }
    async fn roster(&self, _: Uuid) -> Result<Vec<RosterEntry>, Self::Error> {
      unimplemented!()
    }

    async fn insert_attendance(
      &self,
      input: NewAttendanceRecord,
    ) -> Result<LedgerInsert, Self::Error> {
      self.insert_ops.fetch_add(1, Ordering::SeqCst);
      if self
        .fail_next
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
      {
        return Err(std::io::Error::other("injected storage fault"));
      }

      let key = (input.student_id, input.link_id, input.window.0.clone());
      let mut rows = self.rows.lock().unwrap();
      if rows.insert(key) {
        Ok(LedgerInsert::Fresh(AttendanceRecord {
          record_id:   Uuid::new_v4(),
          student_id:  input.student_id,
          link_id:     input.link_id,
          window:      input.window,
          recorded_at: Utc::now(),
        }))
      } else {
        Ok(LedgerInsert::Duplicate)
      }
    }

    async fn window_report(
      &self,
      _: AttendanceWindow,
    ) -> Result<Vec<GroupAttendanceReport>, Self::Error> {
      unimplemented!()
    }
    async fn dashboard_stats(
      &self,
      _: AttendanceWindow,
    ) -> Result<DashboardStats, Self::Error> {
      unimplemented!()
    }
  }

  fn sessions() -> SessionStore {
    SessionStore::new(Duration::seconds(180))
  }

  fn candidate(student_id: Uuid) -> Candidate {
    Candidate { student_id, display_name: "S1".into(), score: 0.92 }
  }

  #[tokio::test]
  async fn first_confirm_marks_second_is_already_marked() {
    let store = MemLedger::default();
    let sess = sessions();
    let now = Utc::now();
    let student = Uuid::new_v4();
    let link = Uuid::new_v4();

    let s1 = sess.create(link, Uuid::new_v4(), vec![candidate(student)], now);
    let r1 = confirm(&sess, &store, WindowPolicy::Daily, s1, student, now)
      .await
      .unwrap();
    assert_eq!(r1, Confirmation::Marked);

    // A second scan of the same face: new session, same identity, same day.
    let s2 = sess.create(link, Uuid::new_v4(), vec![candidate(student)], now);
    let r2 = confirm(&sess, &store, WindowPolicy::Daily, s2, student, now)
      .await
      .unwrap();
    assert_eq!(r2, Confirmation::AlreadyMarked);

    assert_eq!(store.rows.lock().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn expired_session_fails_before_touching_the_ledger() {
    let store = MemLedger::default();
    let sess = sessions();
    let created = Utc::now();
    let student = Uuid::new_v4();

    let id = sess.create(Uuid::new_v4(), Uuid::new_v4(), vec![candidate(student)], created);
    let later = created + Duration::seconds(300);

    let result =
      confirm(&sess, &store, WindowPolicy::Daily, id, student, later).await;
    assert!(matches!(result, Err(Error::SessionExpired)));
    assert_eq!(store.insert_ops.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn invalid_selection_propagates_and_writes_nothing() {
    let store = MemLedger::default();
    let sess = sessions();
    let now = Utc::now();

    let id = sess.create(
      Uuid::new_v4(),
      Uuid::new_v4(),
      vec![candidate(Uuid::new_v4())],
      now,
    );
    let result =
      confirm(&sess, &store, WindowPolicy::Daily, id, Uuid::new_v4(), now).await;
    assert!(matches!(result, Err(Error::InvalidSelection)));
    assert_eq!(store.insert_ops.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn one_storage_fault_is_retried_and_succeeds() {
    let store = MemLedger::failing(1);
    let sess = sessions();
    let now = Utc::now();
    let student = Uuid::new_v4();

    let id = sess.create(Uuid::new_v4(), Uuid::new_v4(), vec![candidate(student)], now);
    let result = confirm(&sess, &store, WindowPolicy::Daily, id, student, now)
      .await
      .unwrap();
    assert_eq!(result, Confirmation::Marked);
    assert_eq!(store.insert_ops.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn persistent_storage_fault_surfaces_after_one_retry() {
    let store = MemLedger::failing(2);
    let sess = sessions();
    let now = Utc::now();
    let student = Uuid::new_v4();

    let id = sess.create(Uuid::new_v4(), Uuid::new_v4(), vec![candidate(student)], now);
    let result =
      confirm(&sess, &store, WindowPolicy::Daily, id, student, now).await;
    assert!(matches!(result, Err(Error::Storage(_))));
    assert_eq!(store.insert_ops.load(Ordering::SeqCst), 2);
    assert!(store.rows.lock().unwrap().is_empty());
  }

  #[tokio::test]
  async fn n_concurrent_confirms_yield_exactly_one_marked() {
    let store = Arc::new(MemLedger::default());
    let sess = Arc::new(sessions());
    let now = Utc::now();
    let student = Uuid::new_v4();
    let link = Uuid::new_v4();

    // N distinct sessions resolving to the same (student, link, window).
    let ids: Vec<Uuid> = (0..8)
      .map(|_| sess.create(link, Uuid::new_v4(), vec![candidate(student)], now))
      .collect();

    let handles: Vec<_> = ids
      .into_iter()
      .map(|id| {
        let store = Arc::clone(&store);
        let sess = Arc::clone(&sess);
        tokio::spawn(async move {
          confirm(&*sess, &*store, WindowPolicy::Daily, id, student, now)
            .await
            .unwrap()
        })
      })
      .collect();

    let mut marked = 0;
    let mut already = 0;
    for h in handles {
      match h.await.unwrap() {
        Confirmation::Marked => marked += 1,
        Confirmation::AlreadyMarked => already += 1,
      }
    }
    assert_eq!(marked, 1);
    assert_eq!(already, 7);
    assert_eq!(store.rows.lock().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn per_link_policy_deduplicates_across_days() {
    let store = MemLedger::default();
    let sess = sessions();
    let student = Uuid::new_v4();
    let link = Uuid::new_v4();

    let day1 = Utc::now();
    let s1 = sess.create(link, Uuid::new_v4(), vec![candidate(student)], day1);
    let r1 = confirm(&sess, &store, WindowPolicy::PerLink, s1, student, day1)
      .await
      .unwrap();
    assert_eq!(r1, Confirmation::Marked);

    let day2 = day1 + Duration::days(1);
    let s2 = sess.create(link, Uuid::new_v4(), vec![candidate(student)], day2);
    let r2 = confirm(&sess, &store, WindowPolicy::PerLink, s2, student, day2)
      .await
      .unwrap();
    assert_eq!(r2, Confirmation::AlreadyMarked);
  }

  #[tokio::test]
  async fn daily_policy_allows_a_fresh_record_the_next_day() {
    let store = MemLedger::default();
    let sess = sessions();
    let student = Uuid::new_v4();
    let link = Uuid::new_v4();

    let day1 = Utc::now();
    let s1 = sess.create(link, Uuid::new_v4(), vec![candidate(student)], day1);
    confirm(&sess, &store, WindowPolicy::Daily, s1, student, day1)
      .await
      .unwrap();

    let day2 = day1 + Duration::days(1);
    let s2 = sess.create(link, Uuid::new_v4(), vec![candidate(student)], day2);
    let r2 = confirm(&sess, &store, WindowPolicy::Daily, s2, student, day2)
      .await
      .unwrap();
    assert_eq!(r2, Confirmation::Marked);
    assert_eq!(store.rows.lock().unwrap().len(), 2);
  }
}
