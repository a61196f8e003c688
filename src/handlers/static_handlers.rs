//! Landing page and single-page-app fallback, streamed from `static_dir`.

use crate::{errors::AppError, handlers::object_handlers::content_type_for, state::AppState};
use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, StatusCode, Uri, header},
    response::Response,
};
use std::{
    io::ErrorKind,
    path::{Component, Path, PathBuf},
};
use tokio::fs::File;
use tokio_util::io::ReaderStream;

const INDEX_FILE: &str = "index.html";

/// `GET /`: the landing page.
pub async fn index(State(state): State<AppState>) -> Result<Response, AppError> {
    serve_file(&state.static_dir.join(INDEX_FILE)).await
}

/// Any other `GET`: the matching static asset if there is one, otherwise
/// the landing page so client-side routes still load.
pub async fn fallback(State(state): State<AppState>, uri: Uri) -> Result<Response, AppError> {
    if let Some(path) = asset_path(&state.static_dir, uri.path()) {
        match serve_file(&path).await {
            Err(err) if err.status == StatusCode::NOT_FOUND => {}
            other => return other,
        }
    }
    serve_file(&state.static_dir.join(INDEX_FILE)).await
}

/// Map a request path below `root`, refusing anything that could escape it.
fn asset_path(root: &Path, request_path: &str) -> Option<PathBuf> {
    let relative = Path::new(request_path.trim_start_matches('/'));
    if relative.as_os_str().is_empty()
        || !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
    {
        return None;
    }
    Some(root.join(relative))
}

async fn serve_file(path: &Path) -> Result<Response, AppError> {
    let file = File::open(path).await.map_err(|err| {
        if err.kind() == ErrorKind::NotFound {
            AppError::not_found(format!("{} not found", path.display())).into_plain()
        } else {
            AppError::internal("STATIC_FILE_ERROR", "Cannot open static file", err.to_string())
        }
    })?;
    let meta = file
        .metadata()
        .await
        .map_err(|err| AppError::internal("STATIC_FILE_ERROR", "Cannot stat static file", err.to_string()))?;
    if !meta.is_file() {
        return Err(AppError::not_found(format!("{} not found", path.display())).into_plain());
    }

    let mut response = Response::new(Body::from_stream(ReaderStream::new(file)));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content_type_for(&path.to_string_lossy())),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(meta.len()));
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_paths_stay_inside_root() {
        let root = Path::new("/srv/public");
        assert_eq!(
            asset_path(root, "/css/site.css"),
            Some(PathBuf::from("/srv/public/css/site.css"))
        );
        assert_eq!(asset_path(root, "/"), None);
        assert_eq!(asset_path(root, "/../etc/passwd"), None);
        assert_eq!(asset_path(root, "/a/./b"), Some(PathBuf::from("/srv/public/a/b")));
    }
}
