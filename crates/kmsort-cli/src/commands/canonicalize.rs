//! Canonicalize command implementation.

use kmsort_canonical::{canonicalize_batch, BatchMode, PolicyRegistry};
use std::io::{self, Read, Write};
use std::path::PathBuf;

pub fn run(
    registry: &PolicyRegistry,
    input: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    // Read manifests from file or stdin
    let text = if let Some(path) = input {
        std::fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read file {}: {}", path.display(), e))?
    } else {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    };

    let output = canonicalize_batch(registry, &text, BatchMode::FailFast)
        .map_err(|e| format!("Canonicalization failed: {}", e))?;

    io::stdout().write_all(output.text.as_bytes())?;
    Ok(())
}
