/*
 * Responsibility
 * - v1 の URL 構造を定義
 * - 保護対象 (/me, /proxy-ticket) にだけ gatekeeper を掛ける。/health は素通し
 */
use axum::{Router, routing::get};

use crate::middleware::auth::gatekeeper;
use crate::state::AppState;

use crate::api::v1::handlers::{health::health, me::me, proxy_ticket::proxy_ticket};

pub fn routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/me", get(me))
        .route("/proxy-ticket", get(proxy_ticket));

    Router::new()
        .route("/health", get(health))
        .merge(gatekeeper::apply(protected, state))
}
