//! Filename derivation for attachments written to a directory.

use std::path::{Component, Path, PathBuf};

use url::Url;

use crate::media_type::MediaType;

/// Name used when the URL has no usable last path segment.
const FALLBACK_STEM: &str = "attachment";

/// Guess a file extension (with leading dot) from a declared media type.
pub(crate) fn extension_from_media_type(media_type: Option<&MediaType>) -> &'static str {
    let Some(media_type) = media_type else {
        return ".bin";
    };
    match media_type.media_type() {
        "text/html" => ".html",
        "text/plain" => ".txt",
        "application/json" => ".json",
        "application/xml" | "text/xml" => ".xml",
        "application/pdf" => ".pdf",
        "image/jpeg" => ".jpg",
        "image/png" => ".png",
        "image/gif" => ".gif",
        "image/svg+xml" => ".svg",
        "application/zip" => ".zip",
        "application/gzip" => ".gz",
        "text/css" => ".css",
        "text/csv" => ".csv",
        "text/javascript" | "application/javascript" => ".js",
        "video/mp4" => ".mp4",
        "audio/mpeg" => ".mp3",
        _ => ".bin",
    }
}

/// Sanitizes a filename for filesystem safety.
///
/// Replaces characters that are invalid on common filesystems:
/// / \ : * ? " < > |
pub(crate) fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.is_empty() {
        return "_".to_string();
    }

    if is_safe_filename_segment(&sanitized) {
        sanitized
    } else {
        sanitized
            .chars()
            .map(|c| if c == '.' { '_' } else { c })
            .collect()
    }
}

fn is_safe_filename_segment(name: &str) -> bool {
    !Path::new(name).components().any(|component| {
        matches!(
            component,
            Component::CurDir | Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}

/// Builds the preferred filename for an attachment fetched from `url`.
///
/// Uses the URL's last path segment when it has one; otherwise
/// `attachment` plus an extension guessed from the media type. A segment
/// without an extension also gets the guessed one.
pub(crate) fn attachment_filename(url: &Url, media_type: Option<&MediaType>) -> String {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|last| !last.is_empty())
        .map(sanitize_filename)
        .filter(|name| !name.trim_matches('_').is_empty());

    let extension = extension_from_media_type(media_type);
    match segment {
        Some(name) if Path::new(&name).extension().is_some() => name,
        Some(name) => format!("{name}{extension}"),
        None => format!("{FALLBACK_STEM}{extension}"),
    }
}

/// Candidate path for the `attempt`-th try at placing `filename` in `dir`.
///
/// Attempt 0 is `dir/filename`; later attempts insert `_<n>` before the extension.
pub(crate) fn candidate_path(dir: &Path, filename: &str, attempt: usize) -> PathBuf {
    if attempt == 0 {
        return dir.join(filename);
    }
    let (stem, ext) = match filename.rfind('.') {
        Some(pos) if pos > 0 => (&filename[..pos], &filename[pos..]),
        _ => (filename, ""),
    };
    dir.join(format!("{stem}_{attempt}{ext}"))
}

/// `path` with its last extension replaced by `extension` (given without a dot).
pub(crate) fn path_with_extension(path: &Path, extension: &str) -> PathBuf {
    path.with_extension(extension)
}
