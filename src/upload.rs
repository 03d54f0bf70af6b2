//! Upload acceptance rules: filename sanitization and the image whitelist.

use thiserror::Error;

/// MIME types accepted for upload (strict whitelist).
pub const ALLOWED_MIME_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/gif"];

/// File extensions accepted for upload, matched case-insensitively.
pub const ALLOWED_EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".png", ".gif"];

/// Maximum accepted file size in bytes (5 MiB).
pub const MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// Why an upload was rejected. A rejection is a normal return value, not a
/// failure of the validator itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("Unsupported file type")]
    UnsupportedType,
    #[error("File too large (max 5MB)")]
    TooLarge,
}

/// Canonicalize an untrusted filename into a safe token: every character
/// outside `[A-Za-z0-9_.-]` becomes `_`, truncated to 120 characters.
///
/// Total over any input; an empty name stays empty. Path separators are
/// replaced, so the result can never traverse out of a directory.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| if is_allowed_char(c) { c } else { '_' })
        .take(120)
        .collect()
}

/// True when `name` can refer to a file this service stored: non-empty,
/// not a bare dot sequence (those address directories), and entirely
/// within the sanitizer's character set. Length is deliberately not
/// checked; generated keys carry a suffix and can run longer than the
/// names they were derived from.
pub fn is_safe_filename(name: &str) -> bool {
    !name.is_empty() && !name.chars().all(|c| c == '.') && name.chars().all(is_allowed_char)
}

/// Extract the trailing extension (including the dot) from a filename.
///
/// Only the final path segment is considered, and a leading dot does not
/// count as an extension: `file_extension(".gitignore") == ""`.
pub fn file_extension(name: &str) -> &str {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match base.rfind('.') {
        Some(idx) if idx > 0 => &base[idx..],
        _ => "",
    }
}

/// Filename without its extension or any directory prefix.
pub fn file_stem(name: &str) -> &str {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let extension = file_extension(base);
    base.strip_suffix(extension).unwrap_or(base)
}

/// Whitelist check on the declared MIME type and the filename extension.
/// Both must match for the file to be accepted.
pub fn validate_type(content_type: &str, extension: &str) -> Result<(), RejectReason> {
    let mime_ok = ALLOWED_MIME_TYPES.contains(&content_type);
    let ext_ok = ALLOWED_EXTENSIONS
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(extension));

    if mime_ok && ext_ok {
        Ok(())
    } else {
        Err(RejectReason::UnsupportedType)
    }
}

/// Full acceptance check: type whitelist plus the size cap.
///
/// The transport layer caps body size as well, but the pipeline validates
/// again regardless of what upstream enforced.
pub fn validate(content_type: &str, extension: &str, size: u64) -> Result<(), RejectReason> {
    validate_type(content_type, extension)?;

    if size > MAX_FILE_SIZE {
        return Err(RejectReason::TooLarge);
    }

    Ok(())
}

fn is_allowed_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-'
}
