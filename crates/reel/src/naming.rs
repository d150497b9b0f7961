//! Local artifact naming.

use std::path::{Path, PathBuf};

use url::Url;

use crate::classify::MediaKind;
use crate::request::DownloadRequest;

const FALLBACK_NAME: &str = "download";

/// Base name for an artifact: the filename hint, or the last path segment of
/// the URL without its extension.
pub fn base_name(request: &DownloadRequest) -> String {
    let name = match request.filename.as_deref().map(str::trim) {
        Some(hint) if !hint.is_empty() => hint.to_string(),
        _ => url_stem(&request.url).unwrap_or_default(),
    };
    let name = sanitize(&name);
    if name.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        name
    }
}

fn url_stem(url: &str) -> Option<String> {
    let url = Url::parse(url).ok()?;
    let last = url.path_segments()?.filter(|s| !s.is_empty()).next_back()?;
    let stem = Path::new(last).file_stem()?.to_str()?;
    Some(stem.to_string())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect::<String>()
        .trim_matches('.')
        .to_string()
}

/// Suffix recording which part of the source the artifact holds.
///
/// Playlists carry their time bounds, general resources their byte range.
/// Bounds that do not apply to the resource kind are ignored.
pub fn selection_suffix(request: &DownloadRequest, kind: MediaKind) -> String {
    match kind {
        MediaKind::Playlist => match (request.start_seconds, request.end_seconds) {
            (Some(start), Some(end)) => format!("({start},{end})"),
            (Some(start), None) => format!("({start},end)"),
            (None, Some(end)) => format!("(start,{end})"),
            (None, None) => String::new(),
        },
        MediaKind::General => request
            .byte_range
            .map(|length| format!("(ByteRange:{length})"))
            .unwrap_or_default(),
    }
}

/// `{downloads_dir}/{name}{suffix}{extension}`
pub fn artifact_path(
    downloads_dir: &Path,
    request: &DownloadRequest,
    kind: MediaKind,
    extension: &str,
) -> PathBuf {
    downloads_dir.join(format!(
        "{}{}{}",
        base_name(request),
        selection_suffix(request, kind),
        extension
    ))
}

/// Object key for an uploaded artifact.
pub fn object_key(key_prefix: &str, artifact: &Path) -> String {
    let file_name = artifact
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| FALLBACK_NAME.to_string());
    let prefix = key_prefix.trim_matches('/');
    if prefix.is_empty() {
        file_name
    } else {
        format!("{prefix}/{file_name}")
    }
}
