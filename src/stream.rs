//! Owner-gated file delivery: byte-range parsing and chunked streaming.
//!
//! Honors a single `Range: bytes=<start>-[<end>]` request header. The body
//! is read in fixed 1 MiB chunks; when the client disconnects the response
//! body stops being polled and the transfer ends early.

use std::path::Path;

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::Response;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

/// Streaming read size.
pub const CHUNK_SIZE: usize = 1024 * 1024;

/// Fallback MIME type for unknown extensions.
pub const FORCE_DOWNLOAD: &str = "application/force-download";

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("File not found or inaccessible: {path}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Requested range not satisfiable: {0}")]
    Unsatisfiable(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to build response: {0}")]
    Response(#[from] axum::http::Error),
}

/// Requested delivery mode, from the `upf` action code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    View,
    Download,
}

impl Action {
    /// `vw` -> view, `dl` -> download.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "vw" => Some(Action::View),
            "dl" => Some(Action::Download),
            _ => None,
        }
    }

    fn disposition(self) -> &'static str {
        match self {
            Action::View => "inline",
            Action::Download => "attachment",
        }
    }
}

/// An inclusive byte span within a file of known size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Parse a `Range` header value against the file size.
    ///
    /// Only the first range of a list is honored; a missing end means
    /// end-of-file. A non-numeric bound, an inverted span, or a start at or
    /// past end-of-file is unsatisfiable.
    pub fn parse(header: &str, size: u64) -> Result<ByteRange, StreamError> {
        let spec = header
            .strip_prefix("bytes=")
            .ok_or_else(|| StreamError::Unsatisfiable(header.to_string()))?;

        // No multi-range support; take the first span only.
        let spec = spec.split(',').next().unwrap_or(spec).trim();

        let (start, end) = spec
            .split_once('-')
            .ok_or_else(|| StreamError::Unsatisfiable(header.to_string()))?;

        let start: u64 = if start.is_empty() {
            0
        } else {
            start
                .parse()
                .map_err(|_| StreamError::Unsatisfiable(header.to_string()))?
        };

        let end: u64 = if end.is_empty() {
            size.saturating_sub(1)
        } else {
            end.parse()
                .map_err(|_| StreamError::Unsatisfiable(header.to_string()))?
        };
        let end = end.min(size.saturating_sub(1));

        if size == 0 || start >= size || start > end {
            return Err(StreamError::Unsatisfiable(header.to_string()));
        }

        Ok(ByteRange { start, end })
    }

    /// Number of bytes the span covers (bounds are inclusive).
    pub fn length(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// Resolve a MIME type from the file extension.
///
/// Fixed lookup table; anything else downloads as a generic attachment.
pub fn mime_for_extension(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "pdf" => "application/pdf",
        "txt" | "php" => "text/plain",
        "html" | "htm" => "text/html",
        "exe" => "application/octet-stream",
        "zip" => "application/zip",
        "doc" => "application/msword",
        "xls" => "application/vnd.ms-excel",
        "ppt" => "application/vnd.ms-powerpoint",
        "gif" => "image/gif",
        "png" => "image/png",
        "jpeg" | "jpg" => "image/jpg",
        _ => FORCE_DOWNLOAD,
    }
}

/// Stream a file as an HTTP response, honoring an optional byte range.
///
/// Emits `200` with the full length, or `206` with `Content-Range` for
/// exactly the requested span. Responses are marked non-cacheable; the
/// request terminates with the stream.
pub async fn serve_file(
    path: &Path,
    filename: &str,
    mime_type: &str,
    action: Action,
    range_header: Option<&str>,
) -> Result<Response, StreamError> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| StreamError::Unreadable {
            path: path.display().to_string(),
            source: e,
        })?;

    let size = file
        .metadata()
        .await
        .map_err(|e| StreamError::Unreadable {
            path: path.display().to_string(),
            source: e,
        })?
        .len();

    let mime_type = if mime_type.is_empty() {
        mime_for_extension(path)
    } else {
        mime_type
    };

    let range = match range_header {
        Some(header) => Some(ByteRange::parse(header, size)?),
        None => None,
    };

    let (status, length) = match range {
        Some(range) => {
            file.seek(std::io::SeekFrom::Start(range.start)).await?;
            (StatusCode::PARTIAL_CONTENT, range.length())
        }
        None => (StatusCode::OK, size),
    };

    let reader = file.take(length);
    let body = Body::from_stream(ReaderStream::with_capacity(reader, CHUNK_SIZE));

    let filename: String = filename
        .chars()
        .filter(|c| !c.is_control() && *c != '"' && *c != '\\')
        .collect();

    let mut builder = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, mime_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("{}; filename=\"{filename}\"", action.disposition()),
        )
        .header("content-transfer-encoding", "binary")
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CACHE_CONTROL, "private")
        .header(header::PRAGMA, "private")
        .header(header::EXPIRES, "Mon, 26 Jul 1997 05:00:00 GMT")
        .header(header::CONTENT_LENGTH, length);

    if let Some(range) = range {
        builder = builder.header(
            header::CONTENT_RANGE,
            format!("bytes {}-{}/{size}", range.start, range.end),
        );
    }

    Ok(builder.body(body)?)
}
