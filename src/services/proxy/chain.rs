//! Authorized proxy chains.
//!
//! Configuration is a whitespace-separated token stream. A standalone `;`
//! closes the current chain; every other token must be an `https://` service
//! identifier. `"; https://a https://b"` authorizes direct use and `[a, b]`.
//!
//! Matching is exact: same length, same elements, same order.

use std::collections::HashSet;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainConfigError {
    #[error("proxy chain configuration contains no tokens")]
    Empty,
    #[error("proxy chain element is not an https:// identifier: {0}")]
    IllegalElement(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyChainAuthorizer {
    chains: HashSet<Vec<String>>,
}

impl ProxyChainAuthorizer {
    pub fn parse(config: &str) -> Result<Self, ChainConfigError> {
        let mut chains = HashSet::new();
        let mut current: Vec<String> = Vec::new();
        let mut tokens = 0usize;

        for token in config.split_whitespace() {
            tokens += 1;
            if token == ";" {
                chains.insert(std::mem::take(&mut current));
                continue;
            }
            if !has_https_scheme(token) {
                return Err(ChainConfigError::IllegalElement(token.to_string()));
            }
            current.push(token.to_string());
        }

        if tokens == 0 {
            return Err(ChainConfigError::Empty);
        }
        if !current.is_empty() {
            chains.insert(current);
        }

        tracing::debug!(chains = chains.len(), "authorized proxy chains loaded");
        Ok(Self { chains })
    }

    /// Only direct (unproxied) authentication is allowed.
    pub fn direct_only() -> Self {
        Self {
            chains: HashSet::from([Vec::new()]),
        }
    }

    pub fn is_authorized(&self, observed: &[String]) -> bool {
        // HashSet<Vec<String>> can be queried by &[String] through Borrow
        self.chains.contains(observed)
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

impl FromStr for ProxyChainAuthorizer {
    type Err = ChainConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn has_https_scheme(token: &str) -> bool {
    token
        .get(..8)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("https://"))
}
