//! Link resolution and administrative revocation.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/links/{token}` | Public: what page should this token show? |
//! | `POST` | `/links/{id}/revoke` | Admin-only status mutation |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use rollcall_core::{
  error::LinkRejection,
  link::{LinkKind, LinkStatus},
  store::RollcallStore,
};

use crate::{
  AppState,
  auth::Authenticated,
  error::{ApiError, store_err},
};

// ─── Resolve ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct LinkInfo {
  pub group_name: String,
  pub kind:       LinkKind,
}

/// `GET /links/{token}` — tells the capture page which group and flow the
/// token belongs to. Either link kind resolves here; expiry and revocation
/// are enforced exactly as in the pipeline.
pub async fn resolve_one<S>(
  State(state): State<AppState<S>>,
  Path(token): Path<String>,
) -> Result<Json<LinkInfo>, ApiError>
where
  S: RollcallStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let link = state
    .store
    .find_link(&token)
    .await
    .map_err(store_err)?
    .ok_or(ApiError::LinkInvalid(LinkRejection::NotFound))?;

  link.validate(Utc::now()).map_err(ApiError::LinkInvalid)?;

  let group = state
    .store
    .get_group(link.group_id)
    .await
    .map_err(store_err)?
    .ok_or(ApiError::LinkInvalid(LinkRejection::NotFound))?;

  Ok(Json(LinkInfo { group_name: group.name, kind: link.kind }))
}

// ─── Revoke ──────────────────────────────────────────────────────────────────

/// `POST /links/{id}/revoke` — the external administrative mutation path;
/// the pipeline itself never changes link status.
pub async fn revoke<S>(
  _: Authenticated,
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: RollcallStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let found = state
    .store
    .set_link_status(id, LinkStatus::Revoked)
    .await
    .map_err(store_err)?;
  if !found {
    return Err(ApiError::NotFound(format!("link {id} not found")));
  }

  tracing::info!(link_id = %id, "link revoked");
  Ok(StatusCode::NO_CONTENT)
}
