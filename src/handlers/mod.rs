mod liveness_handler;
mod webhook_handler;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::{Extension, Router};

use crate::app_state::AppState;

pub use liveness_handler::liveness_handler;
pub use webhook_handler::webhook_handler;

/// GitHub caps webhook payloads at 25 MB.
pub const MAX_DELIVERY_SIZE: usize = 25 * 1024 * 1024;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(liveness_handler).post(webhook_handler))
        .layer(DefaultBodyLimit::max(MAX_DELIVERY_SIZE))
        .layer(Extension(state))
}
