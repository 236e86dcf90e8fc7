//! Conversions between domain types and their SQLite column encodings.
//!
//! Everything is TEXT: UUIDs as hyphenated strings, timestamps as RFC 3339
//! UTC, embeddings as JSON float arrays.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use rollcall_core::{
  link::{AttendanceLink, LinkKind, LinkStatus},
  roster::{Embedding, Group, Student},
};

use crate::{Error, Result};

// ─── Scalar encoders ─────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String {
  id.to_string()
}

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339()
}

pub fn parse_uuid(raw: &str) -> Result<Uuid> {
  Uuid::parse_str(raw).map_err(Error::Uuid)
}

pub fn parse_dt(raw: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(raw)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(format!("{raw:?}: {e}")))
}

pub fn encode_link_kind(kind: LinkKind) -> &'static str {
  match kind {
    LinkKind::Registration => "registration",
    LinkKind::Attendance => "attendance",
  }
}

pub fn parse_link_kind(raw: &str) -> Result<LinkKind> {
  match raw {
    "registration" => Ok(LinkKind::Registration),
    "attendance" => Ok(LinkKind::Attendance),
    other => Err(Error::UnknownLinkKind(other.to_string())),
  }
}

pub fn encode_link_status(status: LinkStatus) -> &'static str {
  match status {
    LinkStatus::Active => "active",
    LinkStatus::Expired => "expired",
    LinkStatus::Revoked => "revoked",
  }
}

pub fn parse_link_status(raw: &str) -> Result<LinkStatus> {
  match raw {
    "active" => Ok(LinkStatus::Active),
    "expired" => Ok(LinkStatus::Expired),
    "revoked" => Ok(LinkStatus::Revoked),
    other => Err(Error::UnknownLinkStatus(other.to_string())),
  }
}

pub fn encode_embedding(embedding: &Embedding) -> Result<String> {
  Ok(serde_json::to_string(&embedding.values)?)
}

pub fn parse_embedding(raw: &str) -> Result<Embedding> {
  Ok(Embedding::new(serde_json::from_str(raw)?))
}

// ─── Raw row types ───────────────────────────────────────────────────────────

/// A `groups` row as read from SQLite, before decoding.
pub struct RawGroup {
  pub group_id:    String,
  pub name:        String,
  pub description: Option<String>,
  pub department:  String,
  pub class_name:  String,
  pub section:     String,
  pub created_at:  String,
}

impl RawGroup {
  pub fn into_group(self) -> Result<Group> {
    Ok(Group {
      group_id:    parse_uuid(&self.group_id)?,
      name:        self.name,
      description: self.description,
      department:  self.department,
      class_name:  self.class_name,
      section:     self.section,
      created_at:  parse_dt(&self.created_at)?,
    })
  }
}

/// A `links` row as read from SQLite.
pub struct RawLink {
  pub link_id:    String,
  pub group_id:   String,
  pub token:      String,
  pub kind:       String,
  pub status:     String,
  pub expires_at: Option<String>,
  pub created_at: String,
}

impl RawLink {
  pub fn into_link(self) -> Result<AttendanceLink> {
    Ok(AttendanceLink {
      link_id:    parse_uuid(&self.link_id)?,
      group_id:   parse_uuid(&self.group_id)?,
      token:      self.token,
      kind:       parse_link_kind(&self.kind)?,
      status:     parse_link_status(&self.status)?,
      expires_at: self.expires_at.as_deref().map(parse_dt).transpose()?,
      created_at: parse_dt(&self.created_at)?,
    })
  }
}

/// A `students` row as read from SQLite.
pub struct RawStudent {
  pub student_id:   String,
  pub group_id:     String,
  pub display_name: String,
  pub email:        String,
  pub external_id:  String,
  pub department:   String,
  pub phone:        String,
  pub created_at:   String,
}

impl RawStudent {
  pub fn into_student(self) -> Result<Student> {
    Ok(Student {
      student_id:   parse_uuid(&self.student_id)?,
      group_id:     parse_uuid(&self.group_id)?,
      display_name: self.display_name,
      email:        self.email,
      external_id:  self.external_id,
      department:   self.department,
      phone:        self.phone,
      created_at:   parse_dt(&self.created_at)?,
    })
  }
}
