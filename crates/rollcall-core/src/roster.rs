//! Groups, students, and enrolled face embeddings.
//!
//! A group owns a roster of students; each student carries one or more
//! enrolled embeddings. The embedding model itself is opaque to this crate —
//! see [`crate::matcher::EmbeddingExtractor`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Groups ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
  pub group_id:    Uuid,
  pub name:        String,
  pub description: Option<String>,
  pub department:  String,
  pub class_name:  String,
  pub section:     String,
  pub created_at:  DateTime<Utc>,
}

/// Input for creating a group. Link tokens are allocated by the caller at
/// group setup and stored separately — see [`crate::link::NewLink`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewGroup {
  pub name:        String,
  pub description: Option<String>,
  pub department:  String,
  pub class_name:  String,
  pub section:     String,
}

// ─── Students ────────────────────────────────────────────────────────────────

/// A roster member. `external_id` is the institution-issued student id the
/// person registered with; it is unique within a group, not globally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
  pub student_id:   Uuid,
  pub group_id:     Uuid,
  pub display_name: String,
  pub email:        String,
  pub external_id:  String,
  pub department:   String,
  pub phone:        String,
  pub created_at:   DateTime<Utc>,
}

/// Input for enrolling a student, including the embeddings extracted from
/// their registration images. The store applies the student row and all
/// embedding rows in one transaction so a concurrent match never sees a
/// partially-enrolled student.
#[derive(Debug, Clone, Deserialize)]
pub struct NewStudent {
  pub group_id:     Uuid,
  pub display_name: String,
  pub email:        String,
  pub external_id:  String,
  pub department:   String,
  pub phone:        String,
  pub embeddings:   Vec<Embedding>,
}

// ─── Embeddings ──────────────────────────────────────────────────────────────

/// A face feature vector produced by the (opaque) embedding model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
  pub values: Vec<f32>,
}

impl Embedding {
  pub fn new(values: Vec<f32>) -> Self {
    Self { values }
  }

  /// Cosine similarity in `[-1, 1]`. Dimension mismatch and zero-norm
  /// vectors score `0.0`, which the match threshold then filters out.
  pub fn similarity(&self, other: &Embedding) -> f32 {
    if self.values.len() != other.values.len() || self.values.is_empty() {
      return 0.0;
    }
    let dot: f32 = self
      .values
      .iter()
      .zip(&other.values)
      .map(|(a, b)| a * b)
      .sum();
    let norm_a: f32 = self.values.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = other.values.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
      return 0.0;
    }
    dot / (norm_a * norm_b)
  }
}

/// One roster member as seen by the matcher: identity plus every enrolled
/// embedding. A `Vec<RosterEntry>` is the read-only roster snapshot for one
/// identification call.
#[derive(Debug, Clone)]
pub struct RosterEntry {
  pub student_id:   Uuid,
  pub display_name: String,
  pub embeddings:   Vec<Embedding>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn similarity_of_identical_vectors_is_one() {
    let e = Embedding::new(vec![0.3, -0.4, 0.5]);
    assert!((e.similarity(&e) - 1.0).abs() < 1e-6);
  }

  #[test]
  fn similarity_of_orthogonal_vectors_is_zero() {
    let a = Embedding::new(vec![1.0, 0.0]);
    let b = Embedding::new(vec![0.0, 1.0]);
    assert!(a.similarity(&b).abs() < 1e-6);
  }

  #[test]
  fn similarity_is_scale_invariant() {
    let a = Embedding::new(vec![1.0, 2.0, 3.0]);
    let b = Embedding::new(vec![10.0, 20.0, 30.0]);
    assert!((a.similarity(&b) - 1.0).abs() < 1e-6);
  }

  #[test]
  fn dimension_mismatch_scores_zero() {
    let a = Embedding::new(vec![1.0, 0.0]);
    let b = Embedding::new(vec![1.0, 0.0, 0.0]);
    assert_eq!(a.similarity(&b), 0.0);
  }

  #[test]
  fn zero_norm_scores_zero() {
    let a = Embedding::new(vec![0.0, 0.0]);
    let b = Embedding::new(vec![1.0, 0.0]);
    assert_eq!(a.similarity(&b), 0.0);
  }
}
