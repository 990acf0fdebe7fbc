//! # Output Files
//!
//! Where converted text is written: `<stem>_llm.txt` next to the input by
//! default, and never over an existing file unless asked to. A taken name
//! gets a numeric suffix instead (`song_llm_1.txt`, `song_llm_2.txt`, ...).

use crate::error::ConvertError;
use std::path::{Path, PathBuf};

/// Suffix appended to the input's stem for the default output name.
pub const OUTPUT_SUFFIX: &str = "_llm";

/// `<dir>/<stem>_llm.txt` for an input path.
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{}{}.txt", stem, OUTPUT_SUFFIX))
}

/// The path to write to: `path` itself if it is free (or `overwrite` is set),
/// otherwise the first free `<stem>_<n>.<ext>`.
pub fn resolve_output_path(path: &Path, overwrite: bool) -> PathBuf {
    if overwrite || !path.exists() {
        return path.to_path_buf();
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path.extension().map(|e| e.to_string_lossy().into_owned());

    let mut n: u32 = 1;
    loop {
        let name = match &extension {
            Some(ext) => format!("{}_{}.{}", stem, n, ext),
            None => format!("{}_{}", stem, n),
        };
        let candidate = path.with_file_name(name);
        if !candidate.exists() {
            tracing::info!(
                "{} exists, writing to {} instead",
                path.display(),
                candidate.display()
            );
            return candidate;
        }
        n += 1;
    }
}

/// Write `text` to the resolved output path and return the path used.
pub fn write_output(path: &Path, text: &str, overwrite: bool) -> Result<PathBuf, ConvertError> {
    let target = resolve_output_path(path, overwrite);
    std::fs::write(&target, text).map_err(|e| ConvertError::io(&target, e))?;
    tracing::info!("Wrote {} bytes to {}", text.len(), target.display());
    Ok(target)
}
