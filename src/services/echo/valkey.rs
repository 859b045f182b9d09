use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use crate::services::{
    cache::{CacheClient, ValkeyClient},
    echo::dedup::{DedupError, ReplicationDedup},
};

/// Valkey-backed dedup set shared by every node of the cluster.
///
/// Keys expire after `ttl`; a late duplicate after expiry is admitted again.
#[derive(Clone)]
pub struct ValkeyDedup<C: CacheClient> {
    cache: Arc<C>,
    // keeps environments sharing one Valkey apart
    prefix: String,
    ttl: Duration,
}

impl ValkeyDedup<ValkeyClient> {
    pub async fn connect(redis_url: &str, ttl: Duration) -> Result<Self, DedupError> {
        let client = ValkeyClient::new(redis_url).await?;
        Ok(Self::new_with_cache(Arc::new(client), "cas:echo", ttl))
    }
}

impl<C: CacheClient> ValkeyDedup<C> {
    pub fn new_with_cache(cache: Arc<C>, prefix: impl Into<String>, ttl: Duration) -> Self {
        Self {
            cache,
            prefix: prefix.into(),
            ttl,
        }
    }

    pub fn key(&self, raw: &str) -> String {
        format!("{}:{}", self.prefix, raw)
    }
}

impl<C: CacheClient> ReplicationDedup for ValkeyDedup<C> {
    fn admit_once<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<bool, DedupError>> + Send + 'a>> {
        Box::pin(async move {
            let full_key = self.key(key);
            let admitted = self
                .cache
                .set_if_absent_with_ttl(&full_key, "1", self.ttl)
                .await?;
            Ok(admitted)
        })
    }

    fn backend_name(&self) -> &'static str {
        self.cache.backend_name()
    }
}
