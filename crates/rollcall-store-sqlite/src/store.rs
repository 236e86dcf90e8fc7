//! [`SqliteStore`] — the SQLite implementation of [`RollcallStore`].

use std::{collections::HashMap, path::Path};

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use rollcall_core::{
  ledger::{AttendanceRecord, LedgerInsert, NewAttendanceRecord},
  link::{AttendanceLink, LinkStatus, NewLink},
  roster::{Group, NewGroup, NewStudent, RosterEntry, Student},
  store::{
    DashboardStats, GroupAttendanceReport, GroupSummary, PresentStudent,
    RollcallStore,
  },
  window::AttendanceWindow,
};

use crate::{
  Error, Result,
  encode::{
    RawGroup, RawLink, RawStudent, encode_dt, encode_embedding,
    encode_link_kind, encode_link_status, encode_uuid, parse_embedding,
    parse_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A rollcall store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── RollcallStore impl ──────────────────────────────────────────────────────

impl RollcallStore for SqliteStore {
  type Error = Error;

  // ── Groups ────────────────────────────────────────────────────────────────

  async fn add_group(&self, input: NewGroup) -> Result<Group> {
    let group = Group {
      group_id:    Uuid::new_v4(),
      name:        input.name,
      description: input.description,
      department:  input.department,
      class_name:  input.class_name,
      section:     input.section,
      created_at:  Utc::now(),
    };

    let id_str = encode_uuid(group.group_id);
    let at_str = encode_dt(group.created_at);
    let row    = group.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO groups (
             group_id, name, description, department, class_name, section,
             created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            id_str,
            row.name,
            row.description,
            row.department,
            row.class_name,
            row.section,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(group)
  }

  async fn get_group(&self, id: Uuid) -> Result<Option<Group>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawGroup> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT group_id, name, description, department, class_name,
                    section, created_at
             FROM groups WHERE group_id = ?1",
            rusqlite::params![id_str],
            |row| {
              Ok(RawGroup {
                group_id:    row.get(0)?,
                name:        row.get(1)?,
                description: row.get(2)?,
                department:  row.get(3)?,
                class_name:  row.get(4)?,
                section:     row.get(5)?,
                created_at:  row.get(6)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawGroup::into_group).transpose()
  }

  async fn group_summaries(
    &self,
    window: AttendanceWindow,
  ) -> Result<Vec<GroupSummary>> {
    let window_str = window.0;

    let raws: Vec<(RawGroup, u64, u64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT
             g.group_id, g.name, g.description, g.department, g.class_name,
             g.section, g.created_at,
             (SELECT COUNT(*) FROM students s
               WHERE s.group_id = g.group_id) AS student_count,
             (SELECT COUNT(DISTINCT a.student_id) FROM attendance a
                JOIN students s2 ON s2.student_id = a.student_id
               WHERE s2.group_id = g.group_id
                 AND a.att_window = ?1) AS present_count
           FROM groups g
           ORDER BY g.created_at",
        )?;

        let rows = stmt
          .query_map(rusqlite::params![window_str], |row| {
            Ok((
              RawGroup {
                group_id:    row.get(0)?,
                name:        row.get(1)?,
                description: row.get(2)?,
                department:  row.get(3)?,
                class_name:  row.get(4)?,
                section:     row.get(5)?,
                created_at:  row.get(6)?,
              },
              row.get::<_, u64>(7)?,
              row.get::<_, u64>(8)?,
            ))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|(raw, student_count, present_count)| {
        Ok(GroupSummary {
          group: raw.into_group()?,
          student_count,
          present_count,
        })
      })
      .collect()
  }

  // ── Links ─────────────────────────────────────────────────────────────────

  async fn add_link(&self, input: NewLink) -> Result<AttendanceLink> {
    let link = AttendanceLink {
      link_id:    Uuid::new_v4(),
      group_id:   input.group_id,
      token:      input.token,
      kind:       input.kind,
      status:     LinkStatus::Active,
      expires_at: input.expires_at,
      created_at: Utc::now(),
    };

    let link_id_str  = encode_uuid(link.link_id);
    let group_id_str = encode_uuid(link.group_id);
    let token        = link.token.clone();
    let kind_str     = encode_link_kind(link.kind).to_owned();
    let status_str   = encode_link_status(link.status).to_owned();
    let expires_str  = link.expires_at.map(encode_dt);
    let created_str  = encode_dt(link.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO links (
             link_id, group_id, token, kind, status, expires_at, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            link_id_str,
            group_id_str,
            token,
            kind_str,
            status_str,
            expires_str,
            created_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(link)
  }

  async fn find_link(&self, token: &str) -> Result<Option<AttendanceLink>> {
    let token = token.to_owned();

    let raw: Option<RawLink> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT link_id, group_id, token, kind, status, expires_at,
                    created_at
             FROM links WHERE token = ?1",
            rusqlite::params![token],
            |row| {
              Ok(RawLink {
                link_id:    row.get(0)?,
                group_id:   row.get(1)?,
                token:      row.get(2)?,
                kind:       row.get(3)?,
                status:     row.get(4)?,
                expires_at: row.get(5)?,
                created_at: row.get(6)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawLink::into_link).transpose()
  }

  async fn set_link_status(&self, id: Uuid, status: LinkStatus) -> Result<bool> {
    let id_str     = encode_uuid(id);
    let status_str = encode_link_status(status).to_owned();

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE links SET status = ?2 WHERE link_id = ?1",
          rusqlite::params![id_str, status_str],
        )?)
      })
      .await?;

    Ok(changed > 0)
  }

  // ── Students ──────────────────────────────────────────────────────────────

  async fn enroll_student(&self, input: NewStudent) -> Result<Student> {
    let student = Student {
      student_id:   Uuid::new_v4(),
      group_id:     input.group_id,
      display_name: input.display_name,
      email:        input.email,
      external_id:  input.external_id,
      department:   input.department,
      phone:        input.phone,
      created_at:   Utc::now(),
    };

    let student_id_str = encode_uuid(student.student_id);
    let group_id_str   = encode_uuid(student.group_id);
    let created_str    = encode_dt(student.created_at);
    let row            = student.clone();

    // Pre-encode embeddings so the transaction closure stays infallible
    // apart from SQLite itself.
    let embedding_rows: Vec<(String, String)> = input
      .embeddings
      .iter()
      .map(|e| Ok((encode_uuid(Uuid::new_v4()), encode_embedding(e)?)))
      .collect::<Result<_>>()?;

    // Student row and embedding rows commit together or not at all.
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO students (
             student_id, group_id, display_name, email, external_id,
             department, phone, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            student_id_str,
            group_id_str,
            row.display_name,
            row.email,
            row.external_id,
            row.department,
            row.phone,
            created_str,
          ],
        )?;
        for (embedding_id, vector_json) in &embedding_rows {
          tx.execute(
            "INSERT INTO embeddings (
               embedding_id, student_id, vector_json, enrolled_at
             ) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
              embedding_id,
              student_id_str,
              vector_json,
              created_str,
            ],
          )?;
        }
        tx.commit()?;
        Ok(())
      })
      .await?;

    Ok(student)
  }

  async fn find_student_by_external_id(
    &self,
    group_id:    Uuid,
    external_id: &str,
  ) -> Result<Option<Student>> {
    let group_id_str = encode_uuid(group_id);
    let external_id  = external_id.to_owned();

    let raw: Option<RawStudent> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT student_id, group_id, display_name, email, external_id,
                    department, phone, created_at
             FROM students WHERE group_id = ?1 AND external_id = ?2",
            rusqlite::params![group_id_str, external_id],
            |row| {
              Ok(RawStudent {
                student_id:   row.get(0)?,
                group_id:     row.get(1)?,
                display_name: row.get(2)?,
                email:        row.get(3)?,
                external_id:  row.get(4)?,
                department:   row.get(5)?,
                phone:        row.get(6)?,
                created_at:   row.get(7)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawStudent::into_student).transpose()
  }

  async fn roster(&self, group_id: Uuid) -> Result<Vec<RosterEntry>> {
    let group_id_str = encode_uuid(group_id);

    let rows: Vec<(String, String, Option<String>)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT s.student_id, s.display_name, e.vector_json
           FROM students s
           LEFT JOIN embeddings e ON e.student_id = s.student_id
           WHERE s.group_id = ?1
           ORDER BY s.student_id, e.enrolled_at",
        )?;

        let rows = stmt
          .query_map(rusqlite::params![group_id_str], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
      })
      .await?;

    // Fold the joined rows into one entry per student, preserving order.
    let mut entries: Vec<RosterEntry> = Vec::new();
    for (student_id_str, display_name, vector_json) in rows {
      let student_id = parse_uuid(&student_id_str)?;
      let embedding =
        vector_json.as_deref().map(parse_embedding).transpose()?;
      match entries.last_mut() {
        Some(entry) if entry.student_id == student_id => {
          entry.embeddings.extend(embedding);
        }
        _ => entries.push(RosterEntry {
          student_id,
          display_name,
          embeddings: embedding.into_iter().collect(),
        }),
      }
    }

    Ok(entries)
  }

  // ── Attendance ledger ─────────────────────────────────────────────────────

  async fn insert_attendance(
    &self,
    input: NewAttendanceRecord,
  ) -> Result<LedgerInsert> {
    let record = AttendanceRecord {
      record_id:   Uuid::new_v4(),
      student_id:  input.student_id,
      link_id:     input.link_id,
      window:      input.window,
      recorded_at: Utc::now(),
    };

    let record_id_str  = encode_uuid(record.record_id);
    let student_id_str = encode_uuid(record.student_id);
    let link_id_str    = encode_uuid(record.link_id);
    let window_str     = record.window.0.clone();
    let at_str         = encode_dt(record.recorded_at);

    let inserted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT INTO attendance (
             record_id, student_id, link_id, att_window, recorded_at
           ) VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT (student_id, link_id, att_window) DO NOTHING",
          rusqlite::params![
            record_id_str,
            student_id_str,
            link_id_str,
            window_str,
            at_str,
          ],
        )?)
      })
      .await?;

    if inserted == 1 {
      Ok(LedgerInsert::Fresh(record))
    } else {
      Ok(LedgerInsert::Duplicate)
    }
  }

  // ── Reads for the dashboard collaborator ──────────────────────────────────

  async fn window_report(
    &self,
    window: AttendanceWindow,
  ) -> Result<Vec<GroupAttendanceReport>> {
    let window_str = window.0;

    let (groups, present): (
      Vec<(String, String, u64)>,
      Vec<(String, String, String, String, String)>,
    ) = self
      .conn
      .call(move |conn| {
        let mut group_stmt = conn.prepare(
          "SELECT g.group_id, g.name,
                 (SELECT COUNT(*) FROM students s
                   WHERE s.group_id = g.group_id) AS total_students
           FROM groups g
           ORDER BY g.created_at",
        )?;
        let groups = group_stmt
          .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut present_stmt = conn.prepare(
          "SELECT DISTINCT s.group_id, s.display_name, s.external_id,
                  s.email, s.phone
           FROM attendance a
           JOIN students s ON s.student_id = a.student_id
           WHERE a.att_window = ?1
           ORDER BY s.group_id, s.display_name",
        )?;
        let present = present_stmt
          .query_map(rusqlite::params![window_str], |row| {
            Ok((
              row.get(0)?,
              row.get(1)?,
              row.get(2)?,
              row.get(3)?,
              row.get(4)?,
            ))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((groups, present))
      })
      .await?;

    let mut by_group: HashMap<String, Vec<PresentStudent>> = HashMap::new();
    for (group_id, display_name, external_id, email, phone) in present {
      by_group.entry(group_id).or_default().push(PresentStudent {
        display_name,
        external_id,
        email,
        phone,
      });
    }

    groups
      .into_iter()
      .map(|(group_id_str, group_name, total_students)| {
        let present_students =
          by_group.remove(&group_id_str).unwrap_or_default();
        Ok(GroupAttendanceReport {
          group_id: parse_uuid(&group_id_str)?,
          group_name,
          total_students,
          present_count: present_students.len() as u64,
          present_students,
        })
      })
      .collect()
  }

  async fn dashboard_stats(
    &self,
    window: AttendanceWindow,
  ) -> Result<DashboardStats> {
    let window_str = window.0;

    let stats = self
      .conn
      .call(move |conn| {
        let total_groups: u64 =
          conn.query_row("SELECT COUNT(*) FROM groups", [], |r| r.get(0))?;
        let total_students: u64 =
          conn.query_row("SELECT COUNT(*) FROM students", [], |r| r.get(0))?;
        let active_links: u64 = conn.query_row(
          "SELECT COUNT(*) FROM links WHERE status = 'active'",
          [],
          |r| r.get(0),
        )?;
        let present_in_window: u64 = conn.query_row(
          "SELECT COUNT(DISTINCT student_id) FROM attendance
           WHERE att_window = ?1",
          rusqlite::params![window_str],
          |r| r.get(0),
        )?;

        Ok(DashboardStats {
          total_groups,
          total_students,
          active_links,
          present_in_window,
        })
      })
      .await?;

    Ok(stats)
  }
}
