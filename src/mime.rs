use std::path::Path;

/// Maps a file's extension to the MIME type served in `Content-Type`.
///
/// Pure and total: matching is ASCII case-insensitive, and anything
/// unrecognized, extensionless files included, falls back to
/// `application/octet-stream`.
pub fn from_path<P: AsRef<Path>>(path: P) -> &'static str {
    let ext = path
        .as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("html") => "text/html",
        Some("css") => "text/css",
        Some("js") => "text/javascript",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        _ => "application/octet-stream",
    }
}
