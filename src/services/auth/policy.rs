//! Strictness requirements a Receipt must meet to be trusted for a request.
use std::sync::Arc;

use thiserror::Error;

use crate::services::cas::Receipt;
use crate::services::proxy::ProxyChainAuthorizer;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StrictnessFailure {
    #[error("fresh credentials required")]
    RenewRequired,
    #[error("proxied authentication not accepted")]
    ProxiedNotAllowed { chain: Vec<String> },
    #[error("proxy chain not authorized")]
    ChainNotAuthorized { chain: Vec<String> },
}

impl StrictnessFailure {
    /// Chain trust problem (forbidden) rather than a missing login.
    pub fn is_authorization(&self) -> bool {
        !matches!(self, StrictnessFailure::RenewRequired)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Strictness {
    pub require_renew: bool,
    /// `None`: only unproxied receipts pass.
    pub authorized_chains: Option<Arc<ProxyChainAuthorizer>>,
}

impl Strictness {
    pub fn check(&self, receipt: &Receipt) -> Result<(), StrictnessFailure> {
        if self.require_renew && !receipt.primary_authentication() {
            return Err(StrictnessFailure::RenewRequired);
        }

        let chain = receipt.proxy_chain();
        match &self.authorized_chains {
            None if !chain.is_empty() => Err(StrictnessFailure::ProxiedNotAllowed {
                chain: chain.to_vec(),
            }),
            None => Ok(()),
            Some(authorizer) if authorizer.is_authorized(chain) => Ok(()),
            Some(_) => Err(StrictnessFailure::ChainNotAuthorized {
                chain: chain.to_vec(),
            }),
        }
    }
}
