//! Path normalization + MIME helpers for résumé files.

use std::path::{Path, PathBuf};

/// Fallback when neither the extension nor the content identifies the file.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Normalizes user-provided file paths.
///
/// Handles common drag-and-drop shell escaping (`\ `, `\(`, `\)`) and
/// expands `~/` to the HOME directory when available.
#[must_use]
pub fn normalize_input_path(path: &str) -> PathBuf {
    let unescaped = path
        .trim()
        .replace("\\ ", " ")
        .replace("\\(", "(")
        .replace("\\)", ")");

    if let Some(rest) = unescaped.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }

    PathBuf::from(unescaped)
}

/// Returns MIME type inferred from file extension for supported document formats.
#[must_use]
pub fn mime_type_for_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension().and_then(|e| e.to_str())?;

    match ext.to_ascii_lowercase().as_str() {
        "pdf" => Some("application/pdf"),
        "docx" => Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
        "doc" => Some("application/msword"),
        "odt" => Some("application/vnd.oasis.opendocument.text"),
        "rtf" => Some("application/rtf"),
        "txt" | "text" => Some("text/plain"),
        "md" => Some("text/markdown"),
        _ => None,
    }
}

/// Resolves a MIME type: extension first, then content sniffing.
#[must_use]
pub fn detect_mime_type(path: &Path, bytes: &[u8]) -> &'static str {
    mime_type_for_extension(path)
        .or_else(|| infer::get(bytes).map(|kind| kind.mime_type()))
        .unwrap_or(OCTET_STREAM)
}
