use axum::{Router, routing::get};

use crate::api::cas::handlers::{logout, proxy_callback};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/proxy-callback",
            get(proxy_callback::receive_get).post(proxy_callback::receive_post),
        )
        .route("/logout", get(logout::logout_get).post(logout::logout_post))
}
