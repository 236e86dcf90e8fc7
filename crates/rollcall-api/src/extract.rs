//! Embedding-extractor implementations.
//!
//! The model behind `image → feature vector` is opaque to the service; both
//! implementations here keep it that way. Handlers call extractors inside
//! `spawn_blocking`, before any session is created, so biometric work never
//! happens under a session or ledger lock.

use std::io::Write as _;
use std::process::{Command, Stdio};

use rollcall_core::{
  matcher::{EmbeddingExtractor, ExtractError},
  roster::Embedding,
};

// ─── Client-computed descriptors ─────────────────────────────────────────────

/// Treats the submitted "image" payload as a JSON float array — for
/// deployments where the capture page runs the embedding model in the
/// browser and submits the descriptor directly.
pub struct DescriptorExtractor;

impl EmbeddingExtractor for DescriptorExtractor {
  fn extract(&self, image: &[u8]) -> Result<Embedding, ExtractError> {
    let values: Vec<f32> = serde_json::from_slice(image)
      .map_err(|e| ExtractError::Failed(format!("descriptor parse: {e}")))?;
    if values.is_empty() {
      return Err(ExtractError::NoFace);
    }
    Ok(Embedding::new(values))
  }
}

// ─── External model process ──────────────────────────────────────────────────

/// Pipes the raw image to an external model command. The command receives
/// the image bytes on stdin and must print a JSON float array on stdout, or
/// `null` when it finds no face.
pub struct CommandExtractor {
  program: String,
  args:    Vec<String>,
}

impl CommandExtractor {
  /// `argv[0]` is the program; the rest are its arguments.
  pub fn new(argv: Vec<String>) -> Result<Self, String> {
    let mut iter = argv.into_iter();
    let program = iter
      .next()
      .ok_or_else(|| "extractor command must not be empty".to_string())?;
    Ok(Self { program, args: iter.collect() })
  }
}

impl EmbeddingExtractor for CommandExtractor {
  fn extract(&self, image: &[u8]) -> Result<Embedding, ExtractError> {
    let mut child = Command::new(&self.program)
      .args(&self.args)
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::null())
      .spawn()
      .map_err(|e| ExtractError::Failed(format!("spawn {}: {e}", self.program)))?;

    if let Some(stdin) = child.stdin.as_mut() {
      stdin
        .write_all(image)
        .map_err(|e| ExtractError::Failed(format!("write image: {e}")))?;
    }
    drop(child.stdin.take());

    let output = child
      .wait_with_output()
      .map_err(|e| ExtractError::Failed(format!("wait: {e}")))?;
    if !output.status.success() {
      return Err(ExtractError::Failed(format!(
        "extractor exited with {}",
        output.status
      )));
    }

    let parsed: Option<Vec<f32>> = serde_json::from_slice(&output.stdout)
      .map_err(|e| ExtractError::Failed(format!("extractor output: {e}")))?;
    match parsed {
      None => Err(ExtractError::NoFace),
      Some(values) if values.is_empty() => Err(ExtractError::NoFace),
      Some(values) => Ok(Embedding::new(values)),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn descriptor_extractor_parses_a_float_array() {
    let embedding = DescriptorExtractor.extract(b"[0.5, -0.25, 1.0]").unwrap();
    assert_eq!(embedding.values, vec![0.5, -0.25, 1.0]);
  }

  #[test]
  fn descriptor_extractor_rejects_non_json() {
    assert!(matches!(
      DescriptorExtractor.extract(b"\x89PNG\r\n"),
      Err(ExtractError::Failed(_))
    ));
  }

  #[test]
  fn descriptor_extractor_treats_empty_array_as_no_face() {
    assert!(matches!(
      DescriptorExtractor.extract(b"[]"),
      Err(ExtractError::NoFace)
    ));
  }

  #[test]
  fn command_extractor_requires_a_program() {
    assert!(CommandExtractor::new(vec![]).is_err());
  }
}
