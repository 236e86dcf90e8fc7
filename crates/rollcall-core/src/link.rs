//! Attendance links — bearer tokens scoping a flow to one group and purpose.
//!
//! Links are created at group setup and mutated only by external
//! administrative action; the pipeline itself never writes them. Resolution
//! is a pure lookup performed once per identification attempt, before any
//! biometric work.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  error::{Error, LinkRejection},
  roster::Group,
  store::RollcallStore,
};

// ─── Types ───────────────────────────────────────────────────────────────────

/// What a link admits: student self-registration or attendance marking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
  Registration,
  Attendance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
  Active,
  Expired,
  Revoked,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceLink {
  pub link_id:    Uuid,
  pub group_id:   Uuid,
  /// URL-safe bearer token; unique across all links.
  pub token:      String,
  pub kind:       LinkKind,
  pub status:     LinkStatus,
  pub expires_at: Option<DateTime<Utc>>,
  pub created_at: DateTime<Utc>,
}

/// Input for persisting a link at group setup.
#[derive(Debug, Clone)]
pub struct NewLink {
  pub group_id:   Uuid,
  pub token:      String,
  pub kind:       LinkKind,
  pub expires_at: Option<DateTime<Utc>>,
}

impl AttendanceLink {
  /// Check status and expiry against `now`. An `Active` link whose
  /// `expires_at` has passed counts as expired even before any
  /// administrative status update lands.
  pub fn validate(&self, now: DateTime<Utc>) -> Result<(), LinkRejection> {
    match self.status {
      LinkStatus::Revoked => Err(LinkRejection::Revoked),
      LinkStatus::Expired => Err(LinkRejection::Expired),
      LinkStatus::Active => {
        if let Some(at) = self.expires_at
          && at <= now
        {
          return Err(LinkRejection::Expired);
        }
        Ok(())
      }
    }
  }
}

// ─── Resolution ──────────────────────────────────────────────────────────────

/// Resolve a presented token to its link and owning group, enforcing kind,
/// status, and expiry. A kind mismatch reports `NotFound` so a token leaks
/// nothing about its purpose.
pub async fn resolve<S: RollcallStore>(
  store: &S,
  token: &str,
  kind:  LinkKind,
  now:   DateTime<Utc>,
) -> Result<(AttendanceLink, Group), Error> {
  let link = store
    .find_link(token)
    .await
    .map_err(|e| Error::Storage(Box::new(e)))?
    .ok_or(LinkRejection::NotFound)?;

  if link.kind != kind {
    return Err(LinkRejection::NotFound.into());
  }
  link.validate(now)?;

  let group = store
    .get_group(link.group_id)
    .await
    .map_err(|e| Error::Storage(Box::new(e)))?
    .ok_or(LinkRejection::NotFound)?;

  Ok((link, group))
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Duration;

  fn link(status: LinkStatus, expires_at: Option<DateTime<Utc>>) -> AttendanceLink {
    AttendanceLink {
      link_id: Uuid::new_v4(),
      group_id: Uuid::new_v4(),
      token: "abc123".into(),
      kind: LinkKind::Attendance,
      status,
      expires_at,
      created_at: Utc::now(),
    }
  }

  #[test]
  fn active_link_without_expiry_validates() {
    assert!(link(LinkStatus::Active, None).validate(Utc::now()).is_ok());
  }

  #[test]
  fn active_link_before_expiry_validates() {
    let now = Utc::now();
    let l = link(LinkStatus::Active, Some(now + Duration::hours(1)));
    assert!(l.validate(now).is_ok());
  }

  #[test]
  fn active_link_past_expiry_is_expired() {
    let now = Utc::now();
    let l = link(LinkStatus::Active, Some(now - Duration::seconds(1)));
    assert_eq!(l.validate(now), Err(LinkRejection::Expired));
  }

  #[test]
  fn revoked_link_is_rejected_regardless_of_expiry() {
    let now = Utc::now();
    let l = link(LinkStatus::Revoked, Some(now + Duration::hours(1)));
    assert_eq!(l.validate(now), Err(LinkRejection::Revoked));
  }

  #[test]
  fn administratively_expired_link_is_rejected() {
    let l = link(LinkStatus::Expired, None);
    assert_eq!(l.validate(Utc::now()), Err(LinkRejection::Expired));
  }
}
