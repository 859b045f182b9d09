/*
 * Responsibility
 * - ticket 1 件を検証した結果 (Receipt) の不変オブジェクト
 * - 構築時に整合性チェックを必ず実行 (部分的に正しい Receipt は外に出ない)
 * - 違反はひとつずつ区別してログ + エラーに載せる
 */
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Verified outcome of one ticket validation.
///
/// Only obtainable through [`Receipt::build`], so every instance satisfies
/// its invariants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Receipt {
    username: String,
    validation_endpoint: String,
    primary_authentication: bool,
    proxy_chain: Vec<String>,
    #[serde(skip)]
    pgt_iou: Option<String>,
    proxy_callback_url: Option<String>,
    attributes: BTreeMap<String, Vec<String>>,
    validated_at: DateTime<Utc>,
}

/// Raw material for a [`Receipt`].
#[derive(Debug, Clone, Default)]
pub struct ReceiptParts {
    pub username: Option<String>,
    pub validation_endpoint: Option<String>,
    pub primary_authentication: bool,
    pub proxy_chain: Option<Vec<String>>,
    pub pgt_iou: Option<String>,
    pub proxy_callback_url: Option<String>,
    pub attributes: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptViolation {
    MissingUsername,
    MissingValidationEndpoint,
    MissingProxyChain,
    ProxiedPrimaryAuthentication,
}

impl fmt::Display for ReceiptViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ReceiptViolation::MissingUsername => "username is missing",
            ReceiptViolation::MissingValidationEndpoint => "validation endpoint is missing",
            ReceiptViolation::MissingProxyChain => "proxy chain is missing",
            ReceiptViolation::ProxiedPrimaryAuthentication => {
                "primary authentication cannot be proxied"
            }
        };
        f.write_str(msg)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptError {
    pub violations: Vec<ReceiptViolation>,
}

impl fmt::Display for ReceiptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "inconsistent receipt: ")?;
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ReceiptError {}

impl Receipt {
    pub fn build(parts: ReceiptParts) -> Result<Self, ReceiptError> {
        let username = parts.username.filter(|u| !u.trim().is_empty());
        let validation_endpoint = parts.validation_endpoint.filter(|e| !e.trim().is_empty());

        let mut violations = Vec::new();
        if username.is_none() {
            violations.push(ReceiptViolation::MissingUsername);
        }
        if validation_endpoint.is_none() {
            violations.push(ReceiptViolation::MissingValidationEndpoint);
        }
        match &parts.proxy_chain {
            None => violations.push(ReceiptViolation::MissingProxyChain),
            Some(chain) if parts.primary_authentication && !chain.is_empty() => {
                violations.push(ReceiptViolation::ProxiedPrimaryAuthentication)
            }
            Some(_) => {}
        }

        let (Some(username), Some(validation_endpoint), Some(proxy_chain), true) = (
            username,
            validation_endpoint,
            parts.proxy_chain,
            violations.is_empty(),
        ) else {
            for violation in &violations {
                tracing::error!(
                    %violation,
                    primary_authentication = parts.primary_authentication,
                    proxy_callback_url = parts.proxy_callback_url.as_deref(),
                    "receipt invariant violated"
                );
            }
            return Err(ReceiptError { violations });
        };

        Ok(Self {
            username,
            validation_endpoint,
            primary_authentication: parts.primary_authentication,
            proxy_chain,
            pgt_iou: parts.pgt_iou.filter(|i| !i.is_empty()),
            proxy_callback_url: parts.proxy_callback_url,
            attributes: parts.attributes,
            validated_at: Utc::now(),
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn validation_endpoint(&self) -> &str {
        &self.validation_endpoint
    }

    /// Ticket came from fresh credentials (renew honored).
    pub fn primary_authentication(&self) -> bool {
        self.primary_authentication
    }

    /// Most recent proxy first. Empty when used directly.
    pub fn proxy_chain(&self) -> &[String] {
        &self.proxy_chain
    }

    pub fn pgt_iou(&self) -> Option<&str> {
        self.pgt_iou.as_deref()
    }

    pub fn proxy_callback_url(&self) -> Option<&str> {
        self.proxy_callback_url.as_deref()
    }

    pub fn attributes(&self) -> &BTreeMap<String, Vec<String>> {
        &self.attributes
    }

    pub fn validated_at(&self) -> DateTime<Utc> {
        self.validated_at
    }

    pub fn is_proxied(&self) -> bool {
        !self.proxy_chain.is_empty()
    }

    /// The service that presented the ticket to us, if proxied.
    pub fn proxying_service(&self) -> Option<&str> {
        self.proxy_chain.first().map(String::as_str)
    }
}
