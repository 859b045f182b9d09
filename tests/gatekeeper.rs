//! End-to-end through the axum router: gatekeeper, PGT receptor, logout.

mod common;

use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::http::{Request, Response, StatusCode, header};
use cas_proxy_client::app::build_router;
use cas_proxy_client::services::auth::Strictness;
use cas_proxy_client::services::proxy::ProxyChainAuthorizer;
use cas_proxy_client::state::AppState;
use common::{CasMock, PROXY_PATH, failure_xml, gate, proxy_success_xml, state, success_xml};
use serde_json::Value;
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

async fn send(state: &AppState, req: Request<Body>) -> Response<Body> {
    build_router(state.clone()).oneshot(req).await.unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn get_with_cookie(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

async fn json(res: Response<Body>) -> Value {
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn text(res: Response<Body>) -> String {
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn session_cookie(res: &Response<Body>) -> String {
    let set = res
        .headers()
        .get(header::SET_COOKIE)
        .expect("session cookie")
        .to_str()
        .unwrap();
    set.split(';').next().unwrap().to_string()
}

#[tokio::test]
async fn health_is_not_gatekept() {
    let cas = CasMock::start().await;
    let state = state(&cas, gate(&cas, Strictness::default()));

    let res = send(&state, get("/health")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers().get("x-frame-options").unwrap(), "DENY");
    assert!(res.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn unauthenticated_request_redirects_to_login() {
    let cas = CasMock::start().await;
    let state = state(&cas, gate(&cas, Strictness::default()));

    let res = send(&state, get("/api/v1/me")).await;

    assert_eq!(res.status(), StatusCode::FOUND);
    let location = res.headers().get(header::LOCATION).unwrap().to_str().unwrap();
    assert_eq!(
        location,
        "https://cas.example/login?service=https%3A%2F%2Fapp.example%2F"
    );
    assert_eq!(cas.request_count().await, 0);
}

#[tokio::test]
async fn renew_is_carried_into_login_redirect() {
    let cas = CasMock::start().await;
    let strict = Strictness {
        require_renew: true,
        ..Strictness::default()
    };
    let state = state(&cas, gate(&cas, strict));

    let res = send(&state, get("/api/v1/me")).await;
    let location = res.headers().get(header::LOCATION).unwrap().to_str().unwrap();
    assert!(location.ends_with("&renew=true"), "{location}");
}

#[tokio::test]
async fn ticket_is_validated_once_then_session_is_reused() {
    let cas = CasMock::start().await;
    cas.on_validate("ST-1", "yes\nalice\n", 1).await;
    let state = state(&cas, gate(&cas, Strictness::default()));

    let first = send(&state, get("/api/v1/me?ticket=ST-1")).await;
    assert_eq!(first.status(), StatusCode::OK);
    let cookie = session_cookie(&first);
    let body = json(first).await;
    assert_eq!(body["username"], "alice");
    assert_eq!(body["primary_authentication"], false);

    let second = send(&state, get_with_cookie("/api/v1/me", &cookie)).await;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(json(second).await["username"], "alice");
    // expect(1) on the mock is verified when `cas` drops
}

#[tokio::test]
async fn rejected_ticket_is_unauthorized() {
    let cas = CasMock::start().await;
    cas.on_validate("ST-bad", failure_xml("INVALID_TICKET"), 1).await;
    let state = state(&cas, gate(&cas, Strictness::default()));

    let res = send(&state, get("/api/v1/me?ticket=ST-bad")).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(res.headers().get(header::SET_COOKIE).is_none());
    assert_eq!(json(res).await["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn unreachable_cas_is_service_unavailable() {
    let cas = CasMock::start().await;
    cas.on_validate_status("ST-2", 502).await;
    let state = state(&cas, gate(&cas, Strictness::default()));

    let res = send(&state, get("/api/v1/me?ticket=ST-2")).await;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn unauthorized_proxy_chain_is_forbidden() {
    let cas = CasMock::start().await;
    cas.on_validate("PT-1", success_xml("alice", None, &["https://evil.example/cb"]), 1)
        .await;
    let strict = Strictness {
        require_renew: false,
        authorized_chains: Some(Arc::new(
            ProxyChainAuthorizer::parse("; https://portal.example/cb").unwrap(),
        )),
    };
    let state = state(&cas, gate(&cas, strict));

    let res = send(&state, get("/api/v1/me?ticket=PT-1")).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn authorized_proxy_chain_passes() {
    let cas = CasMock::start().await;
    cas.on_validate("PT-2", success_xml("alice", None, &["https://portal.example/cb"]), 1)
        .await;
    let strict = Strictness {
        require_renew: false,
        authorized_chains: Some(Arc::new(
            ProxyChainAuthorizer::parse("; https://portal.example/cb").unwrap(),
        )),
    };
    let state = state(&cas, gate(&cas, strict));

    let res = send(&state, get("/api/v1/me?ticket=PT-2")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json(res).await["proxy_chain"][0], "https://portal.example/cb");
}

#[tokio::test]
async fn gateway_mode_passes_through_without_redirect() {
    let cas = CasMock::start().await;
    let state = state(&cas, gate(&cas, Strictness::default()).with_gateway(true));

    let res = send(&state, get("/api/v1/me")).await;

    // handler runs without a principal instead of a login redirect
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(res.headers().get(header::LOCATION).is_none());
    assert!(state.sessions.is_empty());
}

#[tokio::test]
async fn proxy_callback_stores_pgt_and_acknowledges() {
    let cas = CasMock::start().await;
    let state = state(&cas, gate(&cas, Strictness::default()));

    let res = send(&state, get("/cas/proxy-callback?pgtId=PGT-1&pgtIou=IOU-1")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        text(res).await.trim(),
        r#"<casClient:proxySuccess xmlns:casClient="http://www.yale.edu/tp/casClient"/>"#
    );
    assert!(state.pgt_store.as_ref().unwrap().contains("IOU-1"));
}

#[tokio::test]
async fn proxy_callback_without_parameters_is_a_silent_no_op() {
    let cas = CasMock::start().await;
    let state = state(&cas, gate(&cas, Strictness::default()));

    let res = send(&state, get("/cas/proxy-callback?pgtIou=IOU-only")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(text(res).await.is_empty());
    assert!(state.pgt_store.as_ref().unwrap().is_empty());
}

#[tokio::test]
async fn proxy_ticket_flow() {
    let cas = CasMock::start().await;
    cas.on_validate("ST-3", success_xml("alice", Some("IOU-3"), &[]), 1)
        .await;
    Mock::given(method("GET"))
        .and(path(PROXY_PATH))
        .and(query_param("pgt", "PGT-3"))
        .and(query_param("targetService", "https://mail.example/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(proxy_success_xml("PT-3")))
        .expect(1)
        .mount(&cas.server)
        .await;

    let gate = gate(&cas, Strictness::default())
        .with_proxy_callback(Some("https://app.example/cas/proxy-callback".into()));
    let state = state(&cas, gate);

    let login = send(&state, get("/api/v1/me?ticket=ST-3")).await;
    let cookie = session_cookie(&login);
    assert_eq!(json(login).await["can_proxy"], true);

    // central service pushes the PGT to the receptor
    let ack = send(&state, get("/cas/proxy-callback?pgtId=PGT-3&pgtIou=IOU-3")).await;
    assert_eq!(ack.status(), StatusCode::OK);

    let res = send(
        &state,
        get_with_cookie(
            "/api/v1/proxy-ticket?targetService=https%3A%2F%2Fmail.example%2F",
            &cookie,
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = json(res).await;
    assert_eq!(body["proxyTicket"], "PT-3");
    assert_eq!(body["targetService"], "https://mail.example/");
}

#[tokio::test]
async fn proxy_ticket_before_pgt_delivery_is_not_found() {
    let cas = CasMock::start().await;
    cas.on_validate("ST-4", success_xml("alice", Some("IOU-4"), &[]), 1)
        .await;
    let gate = gate(&cas, Strictness::default())
        .with_proxy_callback(Some("https://app.example/cas/proxy-callback".into()));
    let state = state(&cas, gate);

    let login = send(&state, get("/api/v1/me?ticket=ST-4")).await;
    let cookie = session_cookie(&login);

    let res = send(
        &state,
        get_with_cookie("/api/v1/proxy-ticket?targetService=https://mail.example/", &cookie),
    )
    .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn single_sign_out_ends_the_session() {
    let cas = CasMock::start().await;
    cas.on_validate("ST-5", "yes\nalice\n", 1).await;
    let state = state(&cas, gate(&cas, Strictness::default()));

    let login = send(&state, get("/api/v1/me?ticket=ST-5")).await;
    let cookie = session_cookie(&login);

    let saml = "<samlp:LogoutRequest xmlns:samlp=\"urn:oasis:names:tc:SAML:2.0:protocol\" ID=\"LR-1\">\
                <samlp:SessionIndex>ST-5</samlp:SessionIndex></samlp:LogoutRequest>";
    let form = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("logoutRequest", saml)
        .finish();
    let logout = Request::builder()
        .method("POST")
        .uri("/cas/logout")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form))
        .unwrap();
    assert_eq!(send(&state, logout).await.status(), StatusCode::OK);

    let res = send(&state, get_with_cookie("/api/v1/me", &cookie)).await;
    assert_eq!(res.status(), StatusCode::FOUND);
}
