/*
 * Responsibility
 * - GET /api/v1/proxy-ticket?targetService=... : session の PGT IOU で proxy ticket を取得
 * - NotFound / 拒否 / 到達不能 はそれぞれ別の status で返す (呼び出し側が retry を判断できるように)
 */
use axum::{
    Json,
    extract::{Query, State},
};

use crate::{
    api::v1::{
        dto::proxy_ticket::{ProxyTicketQuery, ProxyTicketResponse},
        extractors::Principal,
    },
    error::AppError,
    state::AppState,
};

pub async fn proxy_ticket(
    State(state): State<AppState>,
    Principal(principal): Principal,
    Query(query): Query<ProxyTicketQuery>,
) -> Result<Json<ProxyTicketResponse>, AppError> {
    query
        .validate()
        .map_err(|msg| AppError::bad_request("INVALID_TARGET_SERVICE", msg))?;

    let store = state
        .pgt_store
        .as_ref()
        .ok_or(AppError::not_found("proxy granting ticket"))?;
    let pgt_iou = principal
        .receipt()
        .pgt_iou()
        .ok_or(AppError::not_found("proxy granting ticket"))?;

    let target_service = query.target_service.trim();
    let ticket = store.redeem(pgt_iou, target_service).await.map_err(|e| {
        tracing::warn!(username = principal.username(), error = %e, "proxy ticket redemption failed");
        AppError::from(e)
    })?;

    Ok(Json(ProxyTicketResponse {
        proxy_ticket: ticket.0,
        target_service: target_service.to_string(),
    }))
}
