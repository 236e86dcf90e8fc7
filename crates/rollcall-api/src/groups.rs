//! Admin handlers for `/groups`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/groups` | Creates the group plus its two links |
//! | `GET`  | `/groups` | Canonical summaries for the current window |

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use rand_core::{OsRng, RngCore as _};
use serde::{Deserialize, Serialize};

use rollcall_core::{
  link::{AttendanceLink, LinkKind, NewLink},
  roster::{Group, NewGroup},
  store::{GroupSummary, RollcallStore},
};

use crate::{
  AppState,
  auth::Authenticated,
  error::{ApiError, store_err},
};

// ─── Create ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub name:        String,
  pub description: Option<String>,
  pub department:  String,
  pub class_name:  String,
  pub section:     String,
}

#[derive(Debug, Serialize)]
pub struct GroupCreated {
  pub group:        Group,
  pub registration: AttendanceLink,
  pub attendance:   AttendanceLink,
}

/// `POST /groups` — creates the group and allocates its registration and
/// attendance links with fresh random tokens.
pub async fn create<S>(
  _: Authenticated,
  State(state): State<AppState<S>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RollcallStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let group = state
    .store
    .add_group(NewGroup {
      name:        body.name,
      description: body.description,
      department:  body.department,
      class_name:  body.class_name,
      section:     body.section,
    })
    .await
    .map_err(store_err)?;

  let registration = state
    .store
    .add_link(NewLink {
      group_id:   group.group_id,
      token:      generate_token(),
      kind:       LinkKind::Registration,
      expires_at: None,
    })
    .await
    .map_err(store_err)?;

  let attendance = state
    .store
    .add_link(NewLink {
      group_id:   group.group_id,
      token:      generate_token(),
      kind:       LinkKind::Attendance,
      expires_at: None,
    })
    .await
    .map_err(store_err)?;

  tracing::info!(group_id = %group.group_id, name = %group.name, "group created");

  Ok((
    StatusCode::CREATED,
    Json(GroupCreated { group, registration, attendance }),
  ))
}

// ─── List ────────────────────────────────────────────────────────────────────

/// `GET /groups` — summaries with roster size and presence in the current
/// window.
pub async fn list<S>(
  _: Authenticated,
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<GroupSummary>>, ApiError>
where
  S: RollcallStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let window = state.window.window_at(Utc::now());
  let summaries = state
    .store
    .group_summaries(window)
    .await
    .map_err(store_err)?;
  Ok(Json(summaries))
}

// ─── Token generation ────────────────────────────────────────────────────────

/// A 16-byte URL-safe random bearer token.
fn generate_token() -> String {
  let mut bytes = [0u8; 16];
  OsRng.fill_bytes(&mut bytes);
  URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn generated_tokens_are_url_safe_and_distinct() {
    let a = generate_token();
    let b = generate_token();
    assert_ne!(a, b);
    assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    // 16 bytes → 22 base64 characters without padding.
    assert_eq!(a.len(), 22);
  }
}
