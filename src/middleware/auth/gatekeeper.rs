//! CAS gatekeeper: session cookie → stored Receipt → `AuthenticationGate` →
//! pass / redirect to login / reject.
//!
//! 判定ロジックは services::auth 側。ここは HTTP との橋渡しだけ:
//! - cookie から session を引く、query から `ticket` を取る
//! - service 識別子を決める
//! - 判定結果の SessionUpdate を反映し、outcome を response に写す
//!
//! 認証済みなら `CasPrincipal` を extensions に入れる (extractor が取り出す)。

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderValue, Request, StatusCode, Uri, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::api::v1::extractors::CasPrincipal;
use crate::error::AppError;
use crate::services::auth::{AuthenticationOutcome, GateRequest, Rejection, SessionUpdate};
use crate::services::cas::service;
use crate::state::AppState;

/// Put everything in `router` behind CAS authentication.
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    router.layer(middleware::from_fn_with_state(state, gatekeeper))
}

async fn gatekeeper(State(state): State<AppState>, mut req: Request<Body>, next: Next) -> Response {
    let web = &state.web;

    let session_id = session_from_cookie(req.headers(), &web.session_cookie)
        .filter(|id| state.sessions.exists(id));
    let stored = session_id.and_then(|id| state.sessions.receipt(&id));
    let ticket = ticket_param(req.uri());
    let service = web.service.for_request(req.uri());

    let decision = state
        .gate
        .evaluate(GateRequest {
            stored_receipt: stored.as_ref(),
            ticket: ticket.as_deref(),
            service: &service,
        })
        .await;

    let mut new_session = None;
    match (decision.session, ticket.as_deref()) {
        (SessionUpdate::Store(receipt), Some(ticket)) => {
            let id = session_id.unwrap_or_else(|| {
                let id = state.sessions.create();
                new_session = Some(id);
                id
            });
            state.sessions.store_receipt(id, ticket, receipt);
        }
        (SessionUpdate::Clear, _) => {
            if let Some(id) = &session_id {
                state.sessions.clear_receipt(id);
            }
        }
        _ => {}
    }

    let mut response = match decision.outcome {
        AuthenticationOutcome::Authenticated { receipt, .. } => {
            req.extensions_mut().insert(CasPrincipal::new(receipt));
            next.run(req).await
        }
        AuthenticationOutcome::Gateway => next.run(req).await,
        AuthenticationOutcome::Rejected(rejection) => reject(&state, &service, rejection),
    };

    if let Some(id) = new_session {
        match session_cookie(&web.session_cookie, id, web.secure_cookie) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => tracing::error!(error = %e, "could not build session cookie"),
        }
    }

    response
}

fn reject(state: &AppState, service: &str, rejection: Rejection) -> Response {
    match rejection {
        Rejection::NotAuthenticated | Rejection::Stale(_) => {
            login_redirect(state, service).unwrap_or_else(IntoResponse::into_response)
        }
        Rejection::ValidationFailed(e) => AppError::from(e).into_response(),
        r if r.is_forbidden() => AppError::Forbidden.into_response(),
        Rejection::InsufficientStrictness(f) => AppError::Unauthorized(f.to_string()).into_response(),
    }
}

fn login_redirect(state: &AppState, service: &str) -> Result<Response, AppError> {
    let url = service::login_redirect(&state.web.login_url, service, state.gate.requires_renew())
        .map_err(|e| {
            tracing::error!(error = %e, "invalid login url");
            AppError::Internal
        })?;
    let location = HeaderValue::from_str(url.as_str()).map_err(|_| AppError::Internal)?;

    Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
}

fn ticket_param(uri: &Uri) -> Option<String> {
    let query = uri.query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == "ticket")
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

fn session_from_cookie(headers: &HeaderMap, name: &str) -> Option<Uuid> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .and_then(|(_, v)| Uuid::parse_str(v).ok())
}

fn session_cookie(
    name: &str,
    id: Uuid,
    secure: bool,
) -> Result<HeaderValue, axum::http::header::InvalidHeaderValue> {
    let mut cookie = format!("{name}={id}; Path=/; HttpOnly; SameSite=Lax");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}
