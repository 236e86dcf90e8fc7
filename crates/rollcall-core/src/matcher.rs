//! Candidate ranking over a roster snapshot.
//!
//! The matcher is stateless: it scores a probe embedding against every
//! enrolled embedding in a group's roster and returns an ordered, bounded
//! candidate list. Independent identification calls can run in parallel;
//! nothing here mutates shared state.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
  error::Error,
  roster::{Embedding, RosterEntry},
};

// ─── Extraction seam ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ExtractError {
  #[error("no face detected in image")]
  NoFace,
  #[error("embedding extraction failed: {0}")]
  Failed(String),
}

/// The opaque image → feature-vector capability. Implementations may shell
/// out to an external model process or accept client-computed descriptors;
/// the pipeline only requires that extraction happens before any session or
/// ledger lock is taken.
pub trait EmbeddingExtractor: Send + Sync {
  fn extract(&self, image: &[u8]) -> Result<Embedding, ExtractError>;
}

// ─── Ranking ─────────────────────────────────────────────────────────────────

/// A tentative, unconfirmed match offered to the client for disambiguation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
  pub student_id:   Uuid,
  pub display_name: String,
  pub score:        f32,
}

/// Threshold and truncation policy for candidate lists.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchPolicy {
  /// Minimum cosine similarity for a student to be offered at all.
  pub threshold:      f32,
  /// Upper bound on the candidate list, bounding the disambiguation UI.
  pub max_candidates: usize,
}

impl Default for MatchPolicy {
  fn default() -> Self {
    Self { threshold: 0.75, max_candidates: 5 }
  }
}

impl MatchPolicy {
  /// Rank the roster against `probe`: each student scores their best
  /// enrolled embedding; scores below the threshold are dropped; the rest
  /// are sorted descending by score, ties broken by ascending `student_id`
  /// for determinism, then truncated to `max_candidates`.
  ///
  /// Fails with [`Error::NoMatch`] when nothing survives the filter.
  pub fn rank(
    &self,
    probe:  &Embedding,
    roster: &[RosterEntry],
  ) -> Result<Vec<Candidate>, Error> {
    let mut candidates: Vec<Candidate> = roster
      .iter()
      .filter_map(|entry| {
        let best = entry
          .embeddings
          .iter()
          .map(|enrolled| probe.similarity(enrolled))
          .fold(f32::NEG_INFINITY, f32::max);
        (best >= self.threshold).then(|| Candidate {
          student_id:   entry.student_id,
          display_name: entry.display_name.clone(),
          score:        best,
        })
      })
      .collect();

    candidates.sort_by(|a, b| {
      b.score
        .total_cmp(&a.score)
        .then_with(|| a.student_id.cmp(&b.student_id))
    });
    candidates.truncate(self.max_candidates);

    if candidates.is_empty() {
      return Err(Error::NoMatch);
    }
    Ok(candidates)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn entry(student_id: Uuid, name: &str, vectors: &[&[f32]]) -> RosterEntry {
    RosterEntry {
      student_id,
      display_name: name.to_string(),
      embeddings: vectors
        .iter()
        .map(|v| Embedding::new(v.to_vec()))
        .collect(),
    }
  }

  fn policy() -> MatchPolicy {
    MatchPolicy { threshold: 0.75, max_candidates: 5 }
  }

  #[test]
  fn scores_below_threshold_are_dropped() {
    let probe = Embedding::new(vec![1.0, 0.0, 0.0]);
    let roster = vec![
      entry(Uuid::new_v4(), "S1", &[&[1.0, 0.0, 0.0]]),
      // cos = 0.6, below 0.75
      entry(Uuid::new_v4(), "S2", &[&[0.6, 0.8, 0.0]]),
    ];

    let candidates = policy().rank(&probe, &roster).unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].display_name, "S1");
    assert!(candidates.iter().all(|c| c.score >= 0.75));
  }

  #[test]
  fn candidates_are_sorted_descending_by_score() {
    let probe = Embedding::new(vec![1.0, 0.0, 0.0]);
    let roster = vec![
      entry(Uuid::new_v4(), "S2", &[&[0.81, 0.586, 0.0]]),
      entry(Uuid::new_v4(), "S1", &[&[0.92, 0.392, 0.0]]),
    ];

    let candidates = policy().rank(&probe, &roster).unwrap();
    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].display_name, "S1");
    assert_eq!(candidates[1].display_name, "S2");
    assert!(candidates[0].score >= candidates[1].score);
  }

  #[test]
  fn equal_scores_tie_break_on_ascending_student_id() {
    let low  = Uuid::from_u128(1);
    let high = Uuid::from_u128(2);
    let probe = Embedding::new(vec![1.0, 0.0]);
    let roster = vec![
      entry(high, "B", &[&[1.0, 0.0]]),
      entry(low, "A", &[&[2.0, 0.0]]), // same cosine after normalisation
    ];

    let candidates = policy().rank(&probe, &roster).unwrap();
    assert_eq!(candidates[0].student_id, low);
    assert_eq!(candidates[1].student_id, high);
  }

  #[test]
  fn list_is_truncated_to_max_candidates() {
    let probe = Embedding::new(vec![1.0, 0.0]);
    let roster: Vec<RosterEntry> = (0..8)
      .map(|i| entry(Uuid::from_u128(i), &format!("S{i}"), &[&[1.0, 0.0]]))
      .collect();

    let policy = MatchPolicy { threshold: 0.75, max_candidates: 3 };
    let candidates = policy.rank(&probe, &roster).unwrap();
    assert_eq!(candidates.len(), 3);
  }

  #[test]
  fn best_of_multiple_enrolled_embeddings_wins() {
    let probe = Embedding::new(vec![1.0, 0.0]);
    let roster = vec![entry(
      Uuid::new_v4(),
      "S1",
      &[&[0.0, 1.0], &[1.0, 0.0]], // second enrolment matches perfectly
    )];

    let candidates = policy().rank(&probe, &roster).unwrap();
    assert!((candidates[0].score - 1.0).abs() < 1e-6);
  }

  #[test]
  fn empty_result_is_no_match() {
    let probe = Embedding::new(vec![1.0, 0.0]);
    let roster = vec![entry(Uuid::new_v4(), "S1", &[&[0.0, 1.0]])];

    let result = policy().rank(&probe, &roster);
    assert!(matches!(result, Err(Error::NoMatch)));
  }

  #[test]
  fn empty_roster_is_no_match() {
    let probe = Embedding::new(vec![1.0, 0.0]);
    assert!(matches!(policy().rank(&probe, &[]), Err(Error::NoMatch)));
  }
}
