//! Shared helpers: a wiremock stand-in for the central authentication
//! service, response bodies, and state wiring for router tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use cas_proxy_client::services::{
    auth::{AuthenticationGate, Strictness},
    cas::{ServiceIdentity, TicketValidationClient},
    http::SecureFetcher,
    proxy::ProxyGrantingTicketStore,
};
use cas_proxy_client::state::{AppState, WebSettings};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const SERVICE: &str = "https://app.example/";
pub const VALIDATE_PATH: &str = "/cas/serviceValidate";
pub const PROXY_PATH: &str = "/cas/proxy";
pub const TIMEOUT: Duration = Duration::from_millis(500);

pub struct CasMock {
    pub server: MockServer,
}

impl CasMock {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn url(&self, p: &str) -> String {
        format!("{}{}", self.server.uri(), p)
    }

    pub fn validate_url(&self) -> String {
        self.url(VALIDATE_PATH)
    }

    pub fn proxy_url(&self) -> String {
        self.url(PROXY_PATH)
    }

    /// Answer validation of `ticket` with `body`, expecting exactly `times` calls.
    pub async fn on_validate(&self, ticket: &str, body: impl Into<String>, times: u64) {
        Mock::given(method("GET"))
            .and(path(VALIDATE_PATH))
            .and(query_param("ticket", ticket))
            .respond_with(ResponseTemplate::new(200).set_body_string(body.into()))
            .expect(times)
            .mount(&self.server)
            .await;
    }

    pub async fn on_validate_status(&self, ticket: &str, status: u16) {
        Mock::given(method("GET"))
            .and(path(VALIDATE_PATH))
            .and(query_param("ticket", ticket))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    pub async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|r| r.len())
            .unwrap_or(0)
    }
}

pub fn success_xml(user: &str, pgt_iou: Option<&str>, proxies: &[&str]) -> String {
    let mut body = String::from(
        "<cas:serviceResponse xmlns:cas=\"http://www.yale.edu/tp/cas\">\n<cas:authenticationSuccess>\n",
    );
    body.push_str(&format!("<cas:user>{user}</cas:user>\n"));
    if let Some(iou) = pgt_iou {
        body.push_str(&format!("<cas:proxyGrantingTicket>{iou}</cas:proxyGrantingTicket>\n"));
    }
    if !proxies.is_empty() {
        body.push_str("<cas:proxies>\n");
        for p in proxies {
            body.push_str(&format!("<cas:proxy>{p}</cas:proxy>\n"));
        }
        body.push_str("</cas:proxies>\n");
    }
    body.push_str("</cas:authenticationSuccess>\n</cas:serviceResponse>\n");
    body
}

pub fn failure_xml(code: &str) -> String {
    format!(
        "<cas:serviceResponse xmlns:cas=\"http://www.yale.edu/tp/cas\">\
         <cas:authenticationFailure code=\"{code}\">ticket not recognized</cas:authenticationFailure>\
         </cas:serviceResponse>"
    )
}

pub fn proxy_success_xml(proxy_ticket: &str) -> String {
    format!(
        "<cas:serviceResponse xmlns:cas=\"http://www.yale.edu/tp/cas\">\
         <cas:proxySuccess><cas:proxyTicket>{proxy_ticket}</cas:proxyTicket></cas:proxySuccess>\
         </cas:serviceResponse>"
    )
}

pub fn proxy_failure_xml(code: &str) -> String {
    format!(
        "<cas:serviceResponse xmlns:cas=\"http://www.yale.edu/tp/cas\">\
         <cas:proxyFailure code=\"{code}\">unrecognized pgt</cas:proxyFailure>\
         </cas:serviceResponse>"
    )
}

pub fn fetcher() -> SecureFetcher {
    SecureFetcher::new().expect("http client")
}

pub fn gate(cas: &CasMock, strictness: Strictness) -> AuthenticationGate {
    AuthenticationGate::new(
        Arc::new(TicketValidationClient::new(fetcher())),
        strictness,
        cas.validate_url(),
        TIMEOUT,
    )
}

pub fn web() -> WebSettings {
    WebSettings {
        service: ServiceIdentity::Fixed(SERVICE.to_string()),
        login_url: "https://cas.example/login".to_string(),
        session_cookie: "CASSESSION".to_string(),
        session_idle: Duration::from_secs(600),
        secure_cookie: false,
        request_timeout: Duration::from_secs(10),
    }
}

/// State with a PGT store pointed at the mock's proxy endpoint.
pub fn state(cas: &CasMock, gate: AuthenticationGate) -> AppState {
    AppState::new(Arc::new(gate), web()).with_pgt_store(Arc::new(ProxyGrantingTicketStore::new(
        cas.proxy_url(),
        fetcher(),
        TIMEOUT,
    )))
}
