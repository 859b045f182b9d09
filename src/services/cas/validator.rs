/*
 * Responsibility
 * - ticket を中央認証サービスに渡して Receipt に変換する (TicketValidationClient)
 * - 検証 URL の組み立て (ticket / service / renew / pgtUrl)
 * - 応答 body の形式判定 → パース → Receipt 構築
 *
 * Notes
 * - timeout は "未認証" ではなく "検証失敗" として返す
 * - 失敗応答・不整合な応答から Receipt が作られることはない
 */
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

use super::receipt::{Receipt, ReceiptError, ReceiptParts};
use super::response::{self, ResponseError, ValidationResponse};
use crate::services::http::{self, FetchError, SecureFetcher};

#[derive(Debug, Clone)]
pub struct ValidationRequest {
    pub endpoint: String,
    pub ticket: String,
    pub service: String,
    pub renew: bool,
    pub proxy_callback_url: Option<String>,
    pub timeout: Duration,
}

impl ValidationRequest {
    pub fn url(&self) -> Result<Url, url::ParseError> {
        let mut params = vec![
            ("ticket", self.ticket.as_str()),
            ("service", self.service.as_str()),
        ];
        if self.renew {
            params.push(("renew", "true"));
        }
        if let Some(callback) = &self.proxy_callback_url {
            params.push(("pgtUrl", callback.as_str()));
        }
        http::url_with_params(&self.endpoint, &params)
    }
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid validation endpoint {endpoint}: {source}")]
    Endpoint {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },
    #[error("ticket validation timed out after {0:?}")]
    Timeout(Duration),
    #[error("central authentication service unreachable: {0}")]
    Transport(String),
    #[error("central authentication service answered with status {0}")]
    Status(u16),
    #[error("ticket rejected ({}): {message}", .code.as_deref().unwrap_or("no code"))]
    Rejected {
        code: Option<String>,
        message: String,
    },
    #[error("unparsable validation response: {0}")]
    Malformed(#[from] ResponseError),
    #[error(transparent)]
    Inconsistent(#[from] ReceiptError),
}

impl ValidationError {
    /// Could not get an answer at all, as opposed to getting a "no".
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ValidationError::Timeout(_) | ValidationError::Transport(_) | ValidationError::Status(_)
        )
    }
}

impl From<FetchError> for ValidationError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::Timeout { timeout, .. } => ValidationError::Timeout(timeout),
            FetchError::Transport { message, .. } => ValidationError::Transport(message),
            FetchError::Status { status, .. } => ValidationError::Status(status),
        }
    }
}

#[async_trait]
pub trait TicketValidator: Send + Sync {
    async fn validate(&self, request: &ValidationRequest) -> Result<Receipt, ValidationError>;
}

#[derive(Clone, Debug)]
pub struct TicketValidationClient {
    fetcher: SecureFetcher,
}

impl TicketValidationClient {
    pub fn new(fetcher: SecureFetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl TicketValidator for TicketValidationClient {
    async fn validate(&self, request: &ValidationRequest) -> Result<Receipt, ValidationError> {
        let url = request.url().map_err(|source| ValidationError::Endpoint {
            endpoint: request.endpoint.clone(),
            source,
        })?;

        let body = self.fetcher.get(url, request.timeout).await.map_err(|e| {
            tracing::warn!(error = %e, "ticket validation request failed");
            ValidationError::from(e)
        })?;

        receipt_from_body(request, &body)
    }
}

fn receipt_from_body(request: &ValidationRequest, body: &str) -> Result<Receipt, ValidationError> {
    let assertion = match response::parse_validation(body)? {
        ValidationResponse::Success(assertion) => assertion,
        ValidationResponse::Failure { code, message } => {
            tracing::info!(code = code.as_deref(), %message, "ticket rejected");
            return Err(ValidationError::Rejected { code, message });
        }
    };

    let receipt = Receipt::build(ReceiptParts {
        username: assertion.username,
        validation_endpoint: Some(request.endpoint.clone()),
        primary_authentication: request.renew,
        proxy_chain: Some(assertion.proxies),
        // an IOU only means something if we asked for a PGT
        pgt_iou: assertion
            .pgt_iou
            .filter(|_| request.proxy_callback_url.is_some()),
        proxy_callback_url: request.proxy_callback_url.clone(),
        attributes: assertion.attributes,
    })?;

    tracing::debug!(
        username = receipt.username(),
        proxied = receipt.is_proxied(),
        "ticket validated"
    );
    Ok(receipt)
}
