//! The disambiguation session store.
//!
//! A session holds the result of one identification attempt — the ordered
//! candidate list and the link it was created under — until the client picks
//! a candidate or the TTL lapses. Sessions are single-use: consumption is one
//! atomic transition under the store's lock, so two concurrent consumes of
//! the same session can never both succeed.
//!
//! Expired entries are reclaimed lazily on creation and by the server's
//! periodic [`SessionStore::sweep`], keeping the map bounded. An abandoned
//! client simply leaves its session to expire; no explicit cancel exists.

use std::{collections::HashMap, sync::Mutex};

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::{error::Error, matcher::Candidate};

// ─── Session record ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct DisambiguationSession {
  pub session_id: Uuid,
  pub link_id:    Uuid,
  pub group_id:   Uuid,
  pub candidates: Vec<Candidate>,
  pub created_at: DateTime<Utc>,
  pub expires_at: DateTime<Utc>,
  consumed:       bool,
}

impl DisambiguationSession {
  fn expired(&self, now: DateTime<Utc>) -> bool {
    now >= self.expires_at
  }
}

/// What a successful consume hands to the ledger step.
#[derive(Debug, Clone)]
pub struct Selection {
  pub link_id:   Uuid,
  pub group_id:  Uuid,
  pub candidate: Candidate,
}

// ─── Store ───────────────────────────────────────────────────────────────────

pub struct SessionStore {
  ttl:   Duration,
  inner: Mutex<HashMap<Uuid, DisambiguationSession>>,
}

impl SessionStore {
  pub fn new(ttl: Duration) -> Self {
    Self { ttl, inner: Mutex::new(HashMap::new()) }
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, DisambiguationSession>> {
    // Recover from a poisoned lock; the map holds only plain data.
    self.inner.lock().unwrap_or_else(|e| e.into_inner())
  }

  /// Allocate a session for one identification attempt. Reclaims any entry
  /// whose TTL has lapsed while holding the lock, so growth stays bounded by
  /// the number of in-flight attempts.
  pub fn create(
    &self,
    link_id:    Uuid,
    group_id:   Uuid,
    candidates: Vec<Candidate>,
    now:        DateTime<Utc>,
  ) -> Uuid {
    let mut map = self.lock();
    map.retain(|_, s| !s.expired(now));

    let session_id = Uuid::new_v4();
    map.insert(session_id, DisambiguationSession {
      session_id,
      link_id,
      group_id,
      candidates,
      created_at: now,
      expires_at: now + self.ttl,
      consumed: false,
    });
    session_id
  }

  /// Atomically consume a session for `student_id`.
  ///
  /// Missing, lapsed, and already-consumed sessions all surface as
  /// [`Error::SessionExpired`]. A `student_id` outside the candidate set is
  /// [`Error::InvalidSelection`] and leaves the session pending.
  pub fn consume(
    &self,
    session_id: Uuid,
    student_id: Uuid,
    now:        DateTime<Utc>,
  ) -> Result<Selection, Error> {
    let mut map = self.lock();

    let Some(session) = map.get_mut(&session_id) else {
      return Err(Error::SessionExpired);
    };
    if session.expired(now) {
      map.remove(&session_id);
      return Err(Error::SessionExpired);
    }
    if session.consumed {
      return Err(Error::SessionExpired);
    }

    let Some(candidate) = session
      .candidates
      .iter()
      .find(|c| c.student_id == student_id)
      .cloned()
    else {
      return Err(Error::InvalidSelection);
    };

    session.consumed = true;
    Ok(Selection {
      link_id:  session.link_id,
      group_id: session.group_id,
      candidate,
    })
  }

  /// Drop every lapsed session; returns how many were removed. Run
  /// periodically by the server alongside the lazy reclaim in [`create`].
  ///
  /// [`create`]: SessionStore::create
  pub fn sweep(&self, now: DateTime<Utc>) -> usize {
    let mut map = self.lock();
    let before = map.len();
    map.retain(|_, s| !s.expired(now));
    before - map.len()
  }

  pub fn len(&self) -> usize {
    self.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.lock().is_empty()
  }
}
