//! HTTP layer for Rollcall.
//!
//! Exposes an axum [`Router`] over any [`RollcallStore`]:
//!
//! | Method | Path | Auth | Purpose |
//! |--------|------|------|---------|
//! | `GET`  | `/links/{token}` | token | Resolve a shared link |
//! | `POST` | `/register/{token}` | token | Register a student with captures |
//! | `POST` | `/attendance/{token}/identify` | token | Open a disambiguation session |
//! | `POST` | `/attendance/confirm` | token | Consume a session, mark attendance |
//! | `POST` | `/groups` | basic | Create a group and its links |
//! | `GET`  | `/groups` | basic | Group summaries |
//! | `POST` | `/links/{id}/revoke` | basic | Revoke a link |
//! | `GET`  | `/dashboard/stats` | basic | Dashboard totals |
//! | `GET`  | `/reports/window` | basic | Per-group presence report |

pub mod attendance;
pub mod auth;
pub mod enroll;
pub mod error;
pub mod extract;
pub mod groups;
pub mod links;
pub mod reports;

pub use error::ApiError;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{get, post},
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use rollcall_core::{
  matcher::{EmbeddingExtractor, MatchPolicy},
  session::SessionStore,
  store::RollcallStore,
  window::WindowPolicy,
};

use auth::AuthConfig;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:               String,
  pub port:               u16,
  pub store_path:         PathBuf,
  pub auth_username:      String,
  pub auth_password_hash: String,
  #[serde(default = "default_threshold")]
  pub match_threshold:    f32,
  #[serde(default = "default_max_candidates")]
  pub max_candidates:     usize,
  #[serde(default = "default_session_ttl_secs")]
  pub session_ttl_secs:   i64,
  #[serde(default)]
  pub window_policy:      WindowPolicy,
  #[serde(default)]
  pub extractor:          ExtractorConfig,
}

fn default_threshold() -> f32 {
  MatchPolicy::default().threshold
}

fn default_max_candidates() -> usize {
  MatchPolicy::default().max_candidates
}

fn default_session_ttl_secs() -> i64 {
  300
}

/// Which embedding extractor the server runs.
#[derive(Deserialize, Clone, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractorConfig {
  /// Clients compute descriptors and upload them as JSON float arrays.
  #[default]
  ClientDescriptor,
  /// An external command receives the raw image on stdin and prints a JSON
  /// float array (or `null`) on stdout.
  Command { argv: Vec<String> },
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: RollcallStore> {
  pub store:     Arc<S>,
  pub sessions:  Arc<SessionStore>,
  pub extractor: Arc<dyn EmbeddingExtractor>,
  pub matcher:   MatchPolicy,
  pub window:    WindowPolicy,
  pub auth:      Arc<AuthConfig>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build an axum [`Router`] for the attendance server.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: RollcallStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  Router::new()
    .route("/links/{token}",                get(links::resolve_one::<S>))
    .route("/register/{token}",             post(enroll::register::<S>))
    .route("/attendance/{token}/identify",  post(attendance::identify::<S>))
    .route("/attendance/confirm",           post(attendance::confirm::<S>))
    .route("/groups",                       get(groups::list::<S>).post(groups::create::<S>))
    .route("/links/{id}/revoke",            post(links::revoke::<S>))
    .route("/dashboard/stats",              get(reports::stats::<S>))
    .route("/reports/window",               get(reports::window::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────
