use crate::api::handlers::{chapter, health, manga};
use crate::api::types::AppState;
use axum::{
    http::{header::CONTENT_TYPE, Method},
    routing::{get, post},
    Router,
};
use manga_reader_storage::Storage;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub fn create_router(storage: Storage) -> Router {
    let state = AppState { storage };

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/manga", get(manga::list_mangas))
        .route("/api/manga/:slug", get(manga::get_manga))
        .route("/api/manga/:slug/:chapter", get(chapter::get_chapter))
        .route("/api/admin/manga", post(manga::create_manga))
        .route(
            "/api/admin/manga/:slug/chapters",
            post(chapter::create_chapter),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
