//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Error bodies are `{"error": <code>, "detail": <text>}` with codes drawn
//! from the pipeline taxonomy. `AlreadyMarked` is deliberately absent — it
//! is a successful confirmation outcome, not an error.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use rollcall_core::{Error as CoreError, error::LinkRejection, matcher::ExtractError};

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("link invalid: {0}")]
  LinkInvalid(LinkRejection),

  #[error("no face match above threshold")]
  NoMatch,

  #[error("session expired or already used")]
  SessionExpired,

  #[error("selected student is not among the offered candidates")]
  InvalidSelection,

  #[error("unauthorized")]
  Unauthorized,

  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  /// Transient storage fault surfaced by the confirmation pipeline after
  /// its single internal retry.
  #[error("storage temporarily unavailable")]
  Unavailable,

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<CoreError> for ApiError {
  fn from(e: CoreError) -> Self {
    match e {
      CoreError::LinkInvalid(r) => ApiError::LinkInvalid(r),
      CoreError::NoMatch => ApiError::NoMatch,
      CoreError::SessionExpired => ApiError::SessionExpired,
      CoreError::InvalidSelection => ApiError::InvalidSelection,
      CoreError::Storage(_) => ApiError::Unavailable,
    }
  }
}

impl From<ExtractError> for ApiError {
  fn from(e: ExtractError) -> Self {
    match e {
      // A face the model cannot find is a failed match; the client retries
      // capture.
      ExtractError::NoFace => ApiError::NoMatch,
      ExtractError::Failed(m) => {
        ApiError::BadRequest(format!("image processing failed: {m}"))
      }
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, code, detail) = match &self {
      ApiError::LinkInvalid(r) => {
        (StatusCode::NOT_FOUND, "LinkInvalid", r.to_string())
      }
      ApiError::NoMatch => {
        (StatusCode::NOT_FOUND, "NoMatch", self.to_string())
      }
      ApiError::SessionExpired => {
        (StatusCode::GONE, "SessionExpired", self.to_string())
      }
      ApiError::InvalidSelection => (
        StatusCode::UNPROCESSABLE_ENTITY,
        "InvalidSelection",
        self.to_string(),
      ),
      ApiError::Unauthorized => {
        (StatusCode::UNAUTHORIZED, "Unauthorized", self.to_string())
      }
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, "NotFound", m.clone()),
      ApiError::BadRequest(m) => {
        (StatusCode::BAD_REQUEST, "BadRequest", m.clone())
      }
      ApiError::Conflict(m) => (StatusCode::CONFLICT, "Conflict", m.clone()),
      ApiError::Unavailable => (
        StatusCode::SERVICE_UNAVAILABLE,
        "StorageFailure",
        self.to_string(),
      ),
      ApiError::Store(e) => (
        StatusCode::INTERNAL_SERVER_ERROR,
        "StorageFailure",
        e.to_string(),
      ),
    };

    let mut res =
      (status, Json(json!({ "error": code, "detail": detail }))).into_response();
    if matches!(self, ApiError::Unauthorized) {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"rollcall\""),
      );
    }
    res
  }
}

/// Box a backend error into [`ApiError::Store`].
pub fn store_err<E>(e: E) -> ApiError
where
  E: std::error::Error + Send + Sync + 'static,
{
  ApiError::Store(Box::new(e))
}
