//! Text-level entry points: one document, or a `---` separated stream.

use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

use crate::canonicalizer::Canonicalizer;
use crate::error::{BatchError, CanonicalizeError};
use crate::manifest::ManifestAssembler;
use crate::registry::PolicyRegistry;
use crate::value::Value;

/// Separator placed between documents in canonical output.
pub const DOCUMENT_SEPARATOR: &str = "---\n";

fn delimiter() -> &'static Regex {
    static DELIMITER: OnceLock<Regex> = OnceLock::new();
    DELIMITER.get_or_init(|| {
        Regex::new(r"(?m)^---(?:[ \t]*(?:\r?\n|\z)|[ \t]+)").expect("invalid regex")
    })
}

/// Splits a stream on `---` delimiter lines, keeping empty segments so the
/// delimiter placement can be reproduced.
///
/// Anything after the marker on the same line (`--- # note`, `--- !tag`)
/// starts the next document.
pub fn split_documents(text: &str) -> Vec<&str> {
    delimiter().split(text).collect()
}

/// How a stream reacts to a failing document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchMode {
    /// Stop at the first failing document.
    #[default]
    FailFast,
    /// Keep the failing document unchanged behind an error comment.
    BestEffort,
}

/// Result of canonicalizing a stream.
#[derive(Debug, Default)]
pub struct BatchOutput {
    /// Canonical stream text.
    pub text: String,
    /// Number of documents (segments) processed.
    pub documents: usize,
    /// Failures left in place; always empty in [`BatchMode::FailFast`].
    pub failures: Vec<BatchError>,
}

/// Canonicalizes a single document.
///
/// Blank or comment-only input yields an empty string.
pub fn canonicalize_document(
    registry: &PolicyRegistry,
    text: &str,
) -> Result<String, CanonicalizeError> {
    let parsed: serde_yaml::Value = serde_yaml::from_str(text).map_err(CanonicalizeError::Parse)?;
    if parsed.is_null() {
        return Ok(String::new());
    }

    let value = Value::try_from(parsed)?;
    let assembler = ManifestAssembler::new(Canonicalizer::new(registry));
    let ordered = assembler.assemble_value(&value)?;
    serde_yaml::to_string(&ordered).map_err(CanonicalizeError::Serialize)
}

/// Canonicalizes every document of a `---` separated stream, preserving
/// document count and order.
pub fn canonicalize_batch(
    registry: &PolicyRegistry,
    text: &str,
    mode: BatchMode,
) -> Result<BatchOutput, BatchError> {
    let segments = split_documents(text);
    let mut rendered = Vec::with_capacity(segments.len());
    let mut failures = Vec::new();

    for (index, segment) in segments.iter().enumerate() {
        match canonicalize_document(registry, segment) {
            Ok(doc) => {
                debug!(index, bytes = doc.len(), "canonicalized document");
                rendered.push(doc);
            }
            Err(source) => {
                let error = BatchError { index, source };
                if mode == BatchMode::FailFast {
                    return Err(error);
                }
                debug!(index, %error, "keeping failed document unchanged");
                rendered.push(annotate_failure(segment, &error));
                failures.push(error);
            }
        }
    }

    Ok(BatchOutput {
        text: rendered.join(DOCUMENT_SEPARATOR),
        documents: segments.len(),
        failures,
    })
}

fn annotate_failure(segment: &str, error: &BatchError) -> String {
    let reason = error.source.to_string().replace('\n', " ");
    let mut out = format!("# error: {reason}\n{segment}");
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}
