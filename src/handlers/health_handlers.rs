//! Health & readiness handlers.
//!
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness that probes the object store and the static dir

use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::collections::HashMap;
use tokio::fs;

/// Key probed by `/readyz`. It does not need to exist; a clean "not found"
/// proves the store answers.
const READINESS_PROBE_KEY: &str = ".readyz";

/// `GET /healthz`
///
/// Liveness probe: always 200 with a small JSON body, no I/O.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

/// `GET /readyz`
///
/// Readiness probe that:
/// 1. Issues a `head` against the object store.
/// 2. Checks that the landing page exists under the static directory.
///
/// HTTP 200 when all checks pass, HTTP 503 otherwise.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let store = state.store();
    let probe_key = format!("{}{}", state.gallery.source_prefix(), READINESS_PROBE_KEY);
    let store_check = match store.head(&probe_key).await {
        Ok(_) => CheckStatus::ok(),
        Err(e) => CheckStatus::failed(format!("{} store: {}", store.name(), e)),
    };

    let index = state.static_dir.join("index.html");
    let static_check = match fs::metadata(&index).await {
        Ok(meta) if meta.is_file() => CheckStatus::ok(),
        Ok(_) => CheckStatus::failed(format!("{} is not a file", index.display())),
        Err(e) => CheckStatus::failed(format!("{}: {}", index.display(), e)),
    };

    let overall_ok = store_check.ok && static_check.ok;
    let mut checks = HashMap::new();
    checks.insert("store", store_check);
    checks.insert("static", static_check);

    let body = ReadyResponse {
        status: if overall_ok { "ok".into() } else { "error".into() },
        checks,
    };
    let status = if overall_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    checks: HashMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}

impl CheckStatus {
    fn ok() -> Self {
        Self {
            ok: true,
            error: None,
        }
    }

    fn failed(error: String) -> Self {
        Self {
            ok: false,
            error: Some(error),
        }
    }
}
