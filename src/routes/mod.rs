use std::sync::Arc;

use axum::Router;

use crate::Loader;

mod dashboard;
mod health;
mod refresh;

// ---

pub fn router(loader: Arc<Loader>) -> Router {
    // ---
    Router::new()
        .merge(dashboard::router())
        .merge(refresh::router())
        .merge(health::router())
        .with_state(loader)
}
