/*
 * Responsibility
 * - 検証時に渡す service 識別子の決定
 *   - 固定 URL (CAS_SERVICE_URL)
 *   - server name + request path + query (ticket を除去) から導出
 * - ログイン画面へのリダイレクト URL 組み立て
 */
use axum::http::Uri;
use url::Url;

use crate::services::http;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceIdentity {
    /// Same identifier for every request.
    Fixed(String),
    /// `host[:port]`; the rest comes from the request.
    ServerName(String),
}

impl ServiceIdentity {
    pub fn for_request(&self, uri: &Uri) -> String {
        match self {
            ServiceIdentity::Fixed(url) => url.clone(),
            ServiceIdentity::ServerName(server) => {
                let mut service = format!("https://{server}{}", uri.path());
                if let Some(query) = uri.query().map(strip_ticket).filter(|q| !q.is_empty()) {
                    service.push('?');
                    service.push_str(&query);
                }
                service
            }
        }
    }
}

/// Drop every `ticket` pair, keeping the rest byte-for-byte and in order.
fn strip_ticket(query: &str) -> String {
    query
        .split('&')
        .filter(|pair| {
            let key = pair.split_once('=').map_or(*pair, |(k, _)| k);
            !pair.is_empty() && key != "ticket"
        })
        .collect::<Vec<_>>()
        .join("&")
}

pub fn login_redirect(login_url: &str, service: &str, renew: bool) -> Result<Url, url::ParseError> {
    let mut params = vec![("service", service)];
    if renew {
        params.push(("renew", "true"));
    }
    http::url_with_params(login_url, &params)
}
