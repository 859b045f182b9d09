/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - gate: 認証判定, pgt_store: PGT 対応表, sessions: Receipt 保存先, echo: cluster 転送
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 */
use std::sync::Arc;
use std::time::Duration;

use crate::services::{
    auth::AuthenticationGate, cas::ServiceIdentity, echo::ClusterEcho,
    proxy::ProxyGrantingTicketStore, session::SessionStore,
};

/// Settings the HTTP layer needs that are not part of the core.
#[derive(Debug, Clone)]
pub struct WebSettings {
    pub service: ServiceIdentity,
    pub login_url: String,
    pub session_cookie: String,
    /// Sessions unused for this long are dropped.
    pub session_idle: Duration,
    pub secure_cookie: bool,
    pub request_timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct AppState {
    pub gate: Arc<AuthenticationGate>,
    pub sessions: Arc<SessionStore>,
    /// `None` when no proxy callback is configured.
    pub pgt_store: Option<Arc<ProxyGrantingTicketStore>>,
    pub pgt_echo: Option<Arc<ClusterEcho>>,
    pub logout_echo: Option<Arc<ClusterEcho>>,
    pub web: Arc<WebSettings>,
}

impl AppState {
    pub fn new(gate: Arc<AuthenticationGate>, web: WebSettings) -> Self {
        Self {
            gate,
            sessions: Arc::new(SessionStore::with_idle_timeout(web.session_idle)),
            pgt_store: None,
            pgt_echo: None,
            logout_echo: None,
            web: Arc::new(web),
        }
    }

    pub fn with_pgt_store(mut self, store: Arc<ProxyGrantingTicketStore>) -> Self {
        self.pgt_store = Some(store);
        self
    }

    pub fn with_pgt_echo(mut self, echo: Arc<ClusterEcho>) -> Self {
        self.pgt_echo = Some(echo);
        self
    }

    pub fn with_logout_echo(mut self, echo: Arc<ClusterEcho>) -> Self {
        self.logout_echo = Some(echo);
        self
    }
}
