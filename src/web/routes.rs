use super::handlers;
use super::state::AppState;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;

pub fn photo_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/photos", get(handlers::photos::list))
        .route("/photos/", get(handlers::photos::list_slash))
        .route("/photos/:file", get(handlers::photos::photo))
}
