/*
 * Responsibility
 * - 中央認証サービス / peer への outbound GET (ticket validation, PGT redemption, echo)
 * - 呼び出し側が指定した timeout を必ず掛ける (timeout は hard failure)
 * - timeout / 到達不能 / non-2xx を区別して返す
 *
 * Notes
 * - URL の query には ticket や pgt id が載るため、エラーやログには query を落とした形だけを出す
 */
use std::time::Duration;

use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {target} timed out after {timeout:?}")]
    Timeout { target: String, timeout: Duration },
    #[error("request to {target} failed: {message}")]
    Transport { target: String, message: String },
    #[error("{target} answered with status {status}")]
    Status { target: String, status: u16 },
}

/// Thin wrapper over a pooled `reqwest::Client`.
///
/// Cheap to clone; every clone shares the same connection pool.
#[derive(Clone, Debug)]
pub struct SecureFetcher {
    http: reqwest::Client,
}

impl SecureFetcher {
    pub fn new() -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("cas-proxy-client/", env!("CARGO_PKG_VERSION")))
            .pool_max_idle_per_host(10)
            .build()?;

        Ok(Self { http })
    }

    /// GET `url` and return the body as text.
    ///
    /// The timeout covers connect, headers and body.
    pub async fn get(&self, url: Url, timeout: Duration) -> Result<String, FetchError> {
        let target = redacted(&url);

        let response = self
            .http
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(e, &target, timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                target,
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| classify(e, &target, timeout))
    }
}

/// Append `params` to `base`, keeping any query `base` already carries.
pub fn url_with_params(base: &str, params: &[(&str, &str)]) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(base)?;
    if !params.is_empty() {
        url.query_pairs_mut().extend_pairs(params.iter().copied());
    }
    Ok(url)
}

/// `scheme://host/path` without query or fragment, safe to log.
pub fn redacted(url: &Url) -> String {
    let mut shown = url.clone();
    shown.set_query(None);
    shown.set_fragment(None);
    shown.to_string()
}

fn classify(err: reqwest::Error, target: &str, timeout: Duration) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout {
            target: target.to_string(),
            timeout,
        }
    } else {
        // reqwest embeds the full URL (query included) in its Display output
        FetchError::Transport {
            target: target.to_string(),
            message: err.without_url().to_string(),
        }
    }
}
