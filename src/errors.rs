use crate::services::{
    gallery::GalleryError, metadata::MetadataError, object_store::StoreError,
    thumbnail::ThumbnailError, thumbnail_cache::ResolveError,
};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// An HTTP-facing error: status, machine-readable code, short message and
/// the underlying cause chain as `details`.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub details: String,
    /// Render as `text/plain` instead of the JSON envelope.
    pub plain: bool,
}

impl AppError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        msg: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            status,
            code,
            message: msg.into(),
            details: details.into(),
            plain: false,
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(code: &'static str, msg: impl Into<String>, details: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, code, msg, details)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone(), msg)
    }

    pub fn into_plain(mut self) -> Self {
        self.plain = true;
        self
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.details.is_empty() || self.details == self.message {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.message, self.details)
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(code = self.code, "{}", self);
        }

        if self.plain {
            return (self.status, self.to_string()).into_response();
        }

        let body = Json(json!({
            "error": self.message,
            "details": self.details,
            "code": self.code,
        }));

        (self.status, body).into_response()
    }
}

/// Full `source()` chain joined with `: `.
fn chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !out.contains(&text) {
            out.push_str(": ");
            out.push_str(&text);
        }
        source = cause.source();
    }
    out
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(key) => AppError::not_found(format!("object `{}` not found", key)),
            StoreError::InvalidKey(key) => AppError::new(
                StatusCode::BAD_REQUEST,
                "INVALID_KEY",
                "Invalid object key",
                key,
            ),
            other => AppError::internal("STORE_ERROR", "Object store request failed", chain(&other)),
        }
    }
}

impl From<ResolveError> for AppError {
    fn from(err: ResolveError) -> Self {
        let code = match &err {
            ResolveError::Store { .. } => "STORE_ERROR",
            ResolveError::Thumbnail {
                source: ThumbnailError::Decode(_),
                ..
            } => "DECODE_ERROR",
            ResolveError::Thumbnail { .. } => "ENCODE_ERROR",
            ResolveError::Worker { .. } => "WORKER_ERROR",
        };
        AppError::internal(code, "Failed to resolve thumbnail", chain(&err))
    }
}

impl From<GalleryError> for AppError {
    fn from(err: GalleryError) -> Self {
        match err {
            GalleryError::List { .. } => {
                AppError::internal("STORE_ERROR", "Failed to list images", chain(&err))
            }
            GalleryError::Resolve(inner) => {
                let mut app = AppError::from(inner);
                app.message = "Failed to list images".into();
                app
            }
        }
    }
}

impl From<MetadataError> for AppError {
    fn from(err: MetadataError) -> Self {
        AppError::internal(
            "METADATA_PARSE_ERROR",
            "Failed to read EXIF data",
            chain(&err),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn json_envelope_has_error_details_and_code() {
        let err = AppError::from(StoreError::backend("head", "images/a.jpg", "access denied"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], "STORE_ERROR");
        assert_eq!(json["error"], "Object store request failed");
        assert!(json["details"].as_str().unwrap().contains("access denied"));
    }

    #[tokio::test]
    async fn plain_errors_render_as_text() {
        let err = AppError::from(MetadataError::Missing).into_plain();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(
            response.headers()[axum::http::header::CONTENT_TYPE]
                .to_str()
                .unwrap()
                .starts_with("text/plain")
        );
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Failed to read EXIF data: no EXIF data found");
    }

    #[tokio::test]
    async fn plain_not_found_states_the_message_once() {
        let response = AppError::not_found("index.html not found")
            .into_plain()
            .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"index.html not found");
    }

    #[test]
    fn missing_object_maps_to_404() {
        let err = AppError::from(StoreError::NotFound("images/a.jpg".into()));
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn decode_failures_are_labelled() {
        let err = ResolveError::Thumbnail {
            key: "images/a.jpg".into(),
            source: ThumbnailError::Decode(image::ImageError::IoError(std::io::Error::other(
                "bad bytes",
            ))),
        };
        let app = AppError::from(err);
        assert_eq!(app.code, "DECODE_ERROR");
        assert!(app.details.contains("images/a.jpg"));
    }
}
