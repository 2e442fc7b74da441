//! Guards against a batch run clobbering its own inputs.
//!
//! The batch binary writes one JSON file. It must never land on the record
//! file it reads, the taxonomy or config it was given, or a data file that
//! ships with the crate.

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

/// File names that hold source data and are never valid outputs
const PROTECTED_NAMES: [&str; 2] = ["genres.json", "taxonomy.json"];

/// Resolve symlinks and `..` when the file exists, so two spellings of the
/// same path compare equal.
fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Validates that `output` is safe to create or overwrite.
///
/// Checks:
/// - Output must be a `.json` file
/// - Output must not be one of `source_paths`
/// - Output must not use a protected source-data file name
pub fn validate_output_path(output: &Path, source_paths: &[&Path]) -> Result<()> {
    let output_name = output.file_name().and_then(|n| n.to_str()).unwrap_or("");

    if !output_name.to_ascii_lowercase().ends_with(".json") {
        bail!(
            "Safety check failed: output file '{}' must have a .json extension",
            output.display()
        );
    }

    let output_canonical = canonical(output);
    for source in source_paths {
        if output == *source || output_canonical == canonical(source) {
            bail!(
                "Safety check failed: output '{}' cannot be the same as input '{}'",
                output.display(),
                source.display()
            );
        }
    }

    for name in PROTECTED_NAMES {
        if output_name.eq_ignore_ascii_case(name) {
            bail!(
                "Safety check failed: output '{}' uses the source data name '{}'",
                output.display(),
                name
            );
        }
    }

    Ok(())
}
