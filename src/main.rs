use anyhow::Result;
use axum::Router;
use std::{io::ErrorKind, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;
mod state;
#[cfg(test)]
mod test_support;

use config::{AppConfig, StoreBackend};
use services::{
    gallery::GalleryService, local_store::LocalStore, naming::KeyNamer,
    object_store::ObjectStore, retry::RetryConfig, s3_store::S3Store, thumbnail::JpegQuality,
    thumbnail_cache::ThumbnailCache,
};
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config ---
    let cfg = AppConfig::from_env_and_args()?;

    tracing::info!("Starting thumbnail gallery with config: {:?}", cfg);

    // --- Object store ---
    let store: Arc<dyn ObjectStore> = match cfg.store {
        StoreBackend::Local => {
            let store = LocalStore::open(cfg.storage_dir.clone(), &cfg.bucket).await?;
            tracing::info!(
                "Serving bucket `{}` from {}",
                cfg.bucket,
                cfg.storage_dir.display()
            );
            Arc::new(store)
        }
        StoreBackend::S3 => {
            tracing::debug!("Connecting to S3 with {:?}", cfg.s3);
            Arc::new(S3Store::connect(&cfg.s3, &cfg.bucket).await)
        }
    };

    // --- Thumbnail cache + gallery ---
    let quality = cfg.compression_quality.and_then(JpegQuality::from_setting);
    let retry = RetryConfig::with_max_retries(cfg.store_retries);
    let cache = ThumbnailCache::new(
        store.clone(),
        KeyNamer::new(&cfg.image_dir),
        quality,
        retry.clone(),
    );
    let gallery = GalleryService::new(
        store,
        cache,
        &cfg.image_dir,
        &cfg.image_base_url,
        cfg.max_concurrency,
    );

    if !cfg.static_dir.join("index.html").is_file() {
        tracing::warn!(
            "No index.html under {}; the landing page will return 404",
            cfg.static_dir.display()
        );
    }

    let state = AppState {
        gallery,
        retry,
        image_base_url: cfg.image_base_url.clone(),
        static_dir: Arc::new(cfg.static_dir.clone()),
    };

    // --- Build router ---
    let app: Router = routes::routes::routes().with_state(state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
