use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyTicketQuery {
    pub target_service: String,
}

impl ProxyTicketQuery {
    pub fn validate(&self) -> Result<(), &'static str> {
        match Url::parse(self.target_service.trim()) {
            Ok(url) if url.has_host() => Ok(()),
            _ => Err("targetService must be an absolute URL"),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyTicketResponse {
    pub proxy_ticket: String,
    pub target_service: String,
}
