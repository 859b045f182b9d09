/*
 * Responsibility
 * - 中央認証サービスからの PGT 配送を受け取る (GET/POST, pgtId + pgtIou)
 * - echo 先があれば 1 回だけ peer に転送 (dedup key = pgt:<iou>)
 * - PGT store に記録して proxySuccess を返す
 *
 * Notes
 * - パラメータが欠けていれば何もせず空の 200 (エラーにしない)
 * - echo の失敗で配送自体を失敗させない
 */
use axum::{
    Form,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

use crate::api::cas::param;
use crate::services::echo::EchoOutcome;
use crate::state::AppState;

pub const PROXY_SUCCESS: &str =
    "<casClient:proxySuccess xmlns:casClient=\"http://www.yale.edu/tp/casClient\"/>\n";

pub async fn receive_get(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    receive(&state, params).await
}

pub async fn receive_post(
    State(state): State<AppState>,
    Query(mut params): Query<Vec<(String, String)>>,
    Form(form): Form<Vec<(String, String)>>,
) -> Response {
    params.extend(form);
    receive(&state, params).await
}

async fn receive(state: &AppState, params: Vec<(String, String)>) -> Response {
    let (Some(pgt_id), Some(pgt_iou)) = (param(&params, "pgtId"), param(&params, "pgtIou")) else {
        // CAS probes the callback without parameters before issuing a PGT
        tracing::debug!("proxy callback without pgtId/pgtIou");
        return StatusCode::OK.into_response();
    };

    let Some(store) = &state.pgt_store else {
        tracing::warn!(pgt_iou, "PGT delivered but no proxy callback is configured");
        return StatusCode::OK.into_response();
    };

    if let Some(echo) = &state.pgt_echo {
        let forwarded = [
            ("pgtIou".to_string(), pgt_iou.to_string()),
            ("pgtId".to_string(), pgt_id.to_string()),
        ];
        if let EchoOutcome::Forwarded(report) =
            echo.echo_once(&format!("pgt:{pgt_iou}"), &forwarded).await
        {
            tracing::info!(
                pgt_iou,
                succeeded = report.succeeded,
                attempted = report.attempted,
                "echoed PGT delivery"
            );
        }
    }

    store.receive(pgt_id, pgt_iou);
    tracing::debug!(pgt_iou, "stored proxy granting ticket");

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/xml; charset=utf-8")],
        PROXY_SUCCESS,
    )
        .into_response()
}
