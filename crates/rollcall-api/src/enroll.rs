//! Handler for student self-registration through a registration link.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/register/{token}` | Body: [`RegisterBody`]; returns 201 + student |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;

use rollcall_core::{
  link::{self, LinkKind},
  matcher::{EmbeddingExtractor, ExtractError},
  roster::{Embedding, NewStudent},
  store::RollcallStore,
};

use crate::{
  AppState,
  attendance::decode_image,
  error::{ApiError, store_err},
};

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
  pub name:       String,
  pub email:      String,
  /// Institution-issued student id, unique within the group.
  pub student_id: String,
  pub department: String,
  pub phone:      String,
  /// Base64 capture images; at least one must contain a detectable face.
  pub images:     Vec<String>,
}

/// `POST /register/{token}` — registration-kind links only.
///
/// Images with no detectable face are skipped, matching how multi-shot
/// capture works in practice; the registration fails only when none of them
/// yields an embedding. The student row and all embeddings are committed in
/// one store transaction.
pub async fn register<S>(
  State(state): State<AppState<S>>,
  Path(token): Path<String>,
  Json(body): Json<RegisterBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RollcallStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let now = Utc::now();
  let (_link, group) =
    link::resolve(&*state.store, &token, LinkKind::Registration, now).await?;

  if body.images.is_empty() {
    return Err(ApiError::BadRequest("at least one image is required".into()));
  }

  let existing = state
    .store
    .find_student_by_external_id(group.group_id, &body.student_id)
    .await
    .map_err(store_err)?;
  if existing.is_some() {
    return Err(ApiError::Conflict(
      "student already registered in this group".into(),
    ));
  }

  let images: Vec<Vec<u8>> = body
    .images
    .iter()
    .map(|payload| decode_image(payload))
    .collect::<Result<_, _>>()?;

  let extractor = Arc::clone(&state.extractor);
  let embeddings =
    tokio::task::spawn_blocking(move || extract_all(&*extractor, &images))
      .await
      .map_err(store_err)??;

  let student = state
    .store
    .enroll_student(NewStudent {
      group_id:     group.group_id,
      display_name: body.name,
      email:        body.email,
      external_id:  body.student_id,
      department:   body.department,
      phone:        body.phone,
      embeddings,
    })
    .await
    .map_err(store_err)?;

  tracing::info!(
    student_id = %student.student_id,
    group_id = %group.group_id,
    "student registered"
  );

  Ok((StatusCode::CREATED, Json(student)))
}

/// Extract embeddings from every image, skipping `NoFace`.
fn extract_all(
  extractor: &dyn EmbeddingExtractor,
  images:    &[Vec<u8>],
) -> Result<Vec<Embedding>, ApiError> {
  let mut embeddings = Vec::with_capacity(images.len());
  for image in images {
    match extractor.extract(image) {
      Ok(embedding) => embeddings.push(embedding),
      Err(ExtractError::NoFace) => continue,
      Err(e @ ExtractError::Failed(_)) => return Err(e.into()),
    }
  }
  if embeddings.is_empty() {
    return Err(ApiError::BadRequest("no face found in images".into()));
  }
  Ok(embeddings)
}
