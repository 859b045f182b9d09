/*
 * Responsibility
 * - single sign-out 通知の受け取り (logoutRequest の SessionIndex、または ticket パラメータ)
 * - その ticket で確立した local session を破棄
 * - echo 先があれば受け取ったパラメータのまま 1 回だけ転送 (dedup key = logout:<ticket>)
 * - 常に 200 を返す
 */
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
};

use crate::api::cas::param;
use crate::services::cas::response;
use crate::services::echo::EchoOutcome;
use crate::state::AppState;

pub async fn logout_get(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> StatusCode {
    logout(&state, params).await
}

pub async fn logout_post(
    State(state): State<AppState>,
    Query(mut params): Query<Vec<(String, String)>>,
    Form(form): Form<Vec<(String, String)>>,
) -> StatusCode {
    params.extend(form);
    logout(&state, params).await
}

async fn logout(state: &AppState, params: Vec<(String, String)>) -> StatusCode {
    let Some(ticket) = logged_out_ticket(&params) else {
        tracing::debug!("logout notification without a ticket");
        return StatusCode::OK;
    };

    if let Some(echo) = &state.logout_echo {
        if let EchoOutcome::Forwarded(report) =
            echo.echo_once(&format!("logout:{ticket}"), &params).await
        {
            tracing::info!(
                succeeded = report.succeeded,
                attempted = report.attempted,
                "echoed logout notification"
            );
        }
    }

    if state.sessions.invalidate_by_ticket(&ticket) {
        tracing::info!("session ended by single sign-out");
    }
    StatusCode::OK
}

fn logged_out_ticket(params: &[(String, String)]) -> Option<String> {
    if let Some(body) = param(params, "logoutRequest") {
        match response::parse_logout_request(body) {
            Ok(ticket) => return Some(ticket),
            Err(e) => tracing::warn!(error = %e, "unparsable logoutRequest"),
        }
    }
    param(params, "ticket").map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn ticket_from_saml_or_parameter() {
        let saml = "<samlp:LogoutRequest xmlns:samlp=\"urn:oasis:names:tc:SAML:2.0:protocol\">\
                    <samlp:SessionIndex>ST-7</samlp:SessionIndex></samlp:LogoutRequest>";
        assert_eq!(logged_out_ticket(&p(&[("logoutRequest", saml)])).as_deref(), Some("ST-7"));
        assert_eq!(logged_out_ticket(&p(&[("ticket", "ST-8")])).as_deref(), Some("ST-8"));
        assert_eq!(
            logged_out_ticket(&p(&[("logoutRequest", "<broken"), ("ticket", "ST-9")])).as_deref(),
            Some("ST-9")
        );
        assert_eq!(logged_out_ticket(&p(&[("ticket", " ")])), None);
    }
}
