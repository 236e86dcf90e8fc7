//! Error taxonomy for the attendance pipeline.
//!
//! Every variant is terminal for the current identification attempt and is
//! surfaced verbatim to the caller; nothing here is silently retried except
//! the single internal retry the ledger performs on a storage fault.

use thiserror::Error;

/// Why a presented link token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LinkRejection {
  #[error("not_found")]
  NotFound,
  #[error("expired")]
  Expired,
  #[error("revoked")]
  Revoked,
}

#[derive(Debug, Error)]
pub enum Error {
  /// The presented token does not resolve to a usable link.
  #[error("link invalid: {0}")]
  LinkInvalid(#[from] LinkRejection),

  /// No enrolled face scored at or above the configured threshold.
  #[error("no face match above threshold")]
  NoMatch,

  /// The disambiguation session is missing, past its TTL, or already
  /// consumed — the client must restart identification.
  #[error("session expired or already used")]
  SessionExpired,

  /// The selected student is not among the offered candidates. A protocol
  /// violation; never retried automatically.
  #[error("selected student is not among the offered candidates")]
  InvalidSelection,

  /// Transient infrastructure fault, distinct from the business errors
  /// above. Surfaced only after the ledger's single internal retry.
  #[error("storage failure: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
