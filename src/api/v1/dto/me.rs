use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::services::cas::Receipt;

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub username: String,
    pub primary_authentication: bool,
    pub proxy_chain: Vec<String>,
    pub attributes: BTreeMap<String, Vec<String>>,
    pub validated_at: DateTime<Utc>,
    /// A PGT IOU was issued, so proxy tickets may be requested.
    pub can_proxy: bool,
}

impl From<&Receipt> for MeResponse {
    fn from(r: &Receipt) -> Self {
        Self {
            username: r.username().to_string(),
            primary_authentication: r.primary_authentication(),
            proxy_chain: r.proxy_chain().to_vec(),
            attributes: r.attributes().clone(),
            validated_at: r.validated_at(),
            can_proxy: r.pgt_iou().is_some(),
        }
    }
}
