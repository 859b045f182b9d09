/*
 * Responsibility
 * - GET /api/v1/me : 現在の session の Receipt を返す (PGT IOU は出さない)
 */
use axum::Json;

use crate::api::v1::{dto::me::MeResponse, extractors::Principal};

pub async fn me(Principal(principal): Principal) -> Json<MeResponse> {
    Json(MeResponse::from(principal.receipt()))
}
