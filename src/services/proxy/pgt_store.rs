/*
 * Responsibility
 * - pgtIou → PGT の対応表 (プロセス全体で共有、並行 receive / redeem)
 * - PGT を proxy ticket に交換する (中央認証サービスの proxy endpoint へ GET)
 *
 * Notes
 * - 同じ IOU が 2 回届いたら後勝ち
 * - ローカルでは失効させない。交換が拒否されたら失効の合図として捨てる
 * - pgt id はブラウザにもログにも出さない
 */
use std::fmt;
use std::time::Duration;

use dashmap::DashMap;
use thiserror::Error;

use crate::services::cas::response::{self, ProxyResponse, ResponseError};
use crate::services::http::{self, FetchError, SecureFetcher};

#[derive(Clone, PartialEq, Eq)]
pub struct ProxyGrantingTicket {
    pgt_id: String,
    proxy_endpoint: String,
}

impl ProxyGrantingTicket {
    pub fn new(pgt_id: impl Into<String>, proxy_endpoint: impl Into<String>) -> Self {
        Self {
            pgt_id: pgt_id.into(),
            proxy_endpoint: proxy_endpoint.into(),
        }
    }

    pub fn proxy_endpoint(&self) -> &str {
        &self.proxy_endpoint
    }
}

impl fmt::Debug for ProxyGrantingTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyGrantingTicket")
            .field("pgt_id", &"<redacted>")
            .field("proxy_endpoint", &self.proxy_endpoint)
            .finish()
    }
}

/// Single-use ticket for one downstream service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyTicket(pub String);

impl ProxyTicket {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Error)]
pub enum RedeemError {
    #[error("no proxy granting ticket for this IOU")]
    NotFound,
    #[error("proxy ticket refused ({}): {message}", .code.as_deref().unwrap_or("no code"))]
    Rejected {
        code: Option<String>,
        message: String,
    },
    #[error("proxy ticket request timed out after {0:?}")]
    Timeout(Duration),
    #[error("central authentication service unreachable: {0}")]
    Transport(String),
    #[error("central authentication service answered with status {0}")]
    Status(u16),
    #[error("unparsable proxy response: {0}")]
    Malformed(#[from] ResponseError),
    #[error("invalid proxy endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
}

impl From<FetchError> for RedeemError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::Timeout { timeout, .. } => RedeemError::Timeout(timeout),
            FetchError::Transport { message, .. } => RedeemError::Transport(message),
            FetchError::Status { status, .. } => RedeemError::Status(status),
        }
    }
}

#[derive(Debug)]
pub struct ProxyGrantingTicketStore {
    tickets: DashMap<String, ProxyGrantingTicket>,
    proxy_endpoint: String,
    fetcher: SecureFetcher,
    timeout: Duration,
}

impl ProxyGrantingTicketStore {
    pub fn new(proxy_endpoint: impl Into<String>, fetcher: SecureFetcher, timeout: Duration) -> Self {
        Self {
            tickets: DashMap::new(),
            proxy_endpoint: proxy_endpoint.into(),
            fetcher,
            timeout,
        }
    }

    /// Record a PGT pushed by the central service. Last write wins.
    pub fn receive(&self, pgt_id: &str, pgt_iou: &str) {
        let ticket = ProxyGrantingTicket::new(pgt_id, self.proxy_endpoint.clone());
        if self.tickets.insert(pgt_iou.to_string(), ticket).is_some() {
            tracing::debug!(pgt_iou, "replaced proxy granting ticket for repeated IOU");
        }
    }

    pub fn contains(&self, pgt_iou: &str) -> bool {
        self.tickets.contains_key(pgt_iou)
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    pub async fn redeem(&self, pgt_iou: &str, target_service: &str) -> Result<ProxyTicket, RedeemError> {
        // clone out so no shard lock is held across the await
        let pgt = self
            .tickets
            .get(pgt_iou)
            .map(|entry| entry.value().clone())
            .ok_or(RedeemError::NotFound)?;

        let url = http::url_with_params(
            &pgt.proxy_endpoint,
            &[("pgt", pgt.pgt_id.as_str()), ("targetService", target_service)],
        )?;

        let body = self.fetcher.get(url, self.timeout).await.map_err(|e| {
            tracing::warn!(error = %e, target_service, "proxy ticket request failed");
            RedeemError::from(e)
        })?;

        match response::parse_proxy(&body)? {
            ProxyResponse::Success { proxy_ticket } => {
                tracing::debug!(target_service, "proxy ticket obtained");
                Ok(ProxyTicket(proxy_ticket))
            }
            ProxyResponse::Failure { code, message } => {
                tracing::error!(
                    pgt_iou,
                    target_service,
                    code = code.as_deref(),
                    %message,
                    "central service refused proxy ticket"
                );
                // a newer delivery for the same IOU may have landed meanwhile
                self.tickets.remove_if(pgt_iou, |_, current| current == &pgt);
                Err(RedeemError::Rejected { code, message })
            }
        }
    }
}
