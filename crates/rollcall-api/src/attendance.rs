//! Handlers for the identify → confirm pipeline.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/attendance/{token}/identify` | Body: `{"image": "<base64>"}` |
//! | `POST` | `/attendance/confirm` | Body: `{"session_id", "student_id"}` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use rollcall_core::{
  ledger::{self, Confirmation},
  link::{self, LinkKind},
  store::RollcallStore,
};

use crate::{AppState, error::{ApiError, store_err}};

// ─── Identify ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct IdentifyBody {
  /// Base64 image payload, optionally a full `data:` URL.
  pub image: String,
}

#[derive(Debug, Serialize)]
pub struct MatchedStudent {
  pub student_id:   Uuid,
  pub display_name: String,
}

#[derive(Debug, Serialize)]
pub struct IdentifyResponse {
  pub session_id:       Uuid,
  pub matched_students: Vec<MatchedStudent>,
}

/// `POST /attendance/{token}/identify`
///
/// Validates the link before any biometric work, extracts an embedding off
/// the async runtime, ranks it against the group's roster snapshot, and
/// opens a disambiguation session. On `LinkInvalid` or `NoMatch` no session
/// is created.
pub async fn identify<S>(
  State(state): State<AppState<S>>,
  Path(token): Path<String>,
  Json(body): Json<IdentifyBody>,
) -> Result<Json<IdentifyResponse>, ApiError>
where
  S: RollcallStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let now = Utc::now();
  let (link, group) =
    link::resolve(&*state.store, &token, LinkKind::Attendance, now).await?;

  let image = decode_image(&body.image)?;
  let extractor = Arc::clone(&state.extractor);
  let probe = tokio::task::spawn_blocking(move || extractor.extract(&image))
    .await
    .map_err(store_err)??;

  let roster = state
    .store
    .roster(group.group_id)
    .await
    .map_err(store_err)?;
  let candidates = state.matcher.rank(&probe, &roster)?;

  let matched_students = candidates
    .iter()
    .map(|c| MatchedStudent {
      student_id:   c.student_id,
      display_name: c.display_name.clone(),
    })
    .collect();

  let session_id =
    state
      .sessions
      .create(link.link_id, group.group_id, candidates, now);

  tracing::debug!(
    %session_id,
    group_id = %group.group_id,
    "identification session created"
  );

  Ok(Json(IdentifyResponse { session_id, matched_students }))
}

// ─── Confirm ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ConfirmBody {
  pub session_id: Uuid,
  pub student_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ConfirmResponse {
  pub status: Confirmation,
}

/// `POST /attendance/confirm`
pub async fn confirm<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<ConfirmBody>,
) -> Result<Json<ConfirmResponse>, ApiError>
where
  S: RollcallStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let status = ledger::confirm(
    &state.sessions,
    &*state.store,
    state.window,
    body.session_id,
    body.student_id,
    Utc::now(),
  )
  .await?;

  tracing::info!(student_id = %body.student_id, ?status, "attendance confirmed");
  Ok(Json(ConfirmResponse { status }))
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Decode a base64 image payload, with or without a `data:*;base64,` prefix.
pub fn decode_image(payload: &str) -> Result<Vec<u8>, ApiError> {
  let encoded = match payload.split_once(',') {
    Some((prefix, rest)) if prefix.starts_with("data:") => rest,
    _ => payload,
  };
  B64
    .decode(encoded.trim())
    .map_err(|_| ApiError::BadRequest("image is not valid base64".to_string()))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn decode_image_accepts_bare_base64() {
    let encoded = B64.encode(b"hello");
    assert_eq!(decode_image(&encoded).unwrap(), b"hello");
  }

  #[test]
  fn decode_image_accepts_data_urls() {
    let payload = format!("data:image/png;base64,{}", B64.encode(b"hello"));
    assert_eq!(decode_image(&payload).unwrap(), b"hello");
  }

  #[test]
  fn decode_image_rejects_garbage() {
    assert!(decode_image("not base64 at all!!!").is_err());
  }
}
