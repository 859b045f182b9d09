//! Cluster echo: forward PGT deliveries and logout notifications to peer
//! nodes exactly once per key, so peers echoing back to each other stop
//! after one hop.

pub mod dedup;
pub mod forwarder;
pub mod valkey;

use std::sync::Arc;

pub use dedup::{DedupError, MemoryDedup, ReplicationDedup};
pub use forwarder::{EchoForwarder, EchoReport};
pub use valkey::ValkeyDedup;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoOutcome {
    /// Key seen before; nothing forwarded.
    Duplicate,
    Forwarded(EchoReport),
    /// Dedup backend failed; nothing forwarded.
    DedupUnavailable,
}

#[derive(Clone)]
pub struct ClusterEcho {
    dedup: Arc<dyn ReplicationDedup>,
    forwarder: EchoForwarder,
}

impl ClusterEcho {
    pub fn new(dedup: Arc<dyn ReplicationDedup>, forwarder: EchoForwarder) -> Self {
        Self { dedup, forwarder }
    }

    pub fn forwarder(&self) -> &EchoForwarder {
        &self.forwarder
    }

    pub async fn echo_once(&self, key: &str, params: &[(String, String)]) -> EchoOutcome {
        match self.dedup.admit_once(key).await {
            Ok(true) => EchoOutcome::Forwarded(self.forwarder.forward(params).await),
            Ok(false) => {
                tracing::debug!(key, "already echoed, not forwarding again");
                EchoOutcome::Duplicate
            }
            Err(e) => {
                // never forward without an admission decision
                tracing::warn!(
                    key,
                    backend = self.dedup.backend_name(),
                    error = %e,
                    "dedup backend unavailable, skipping echo"
                );
                EchoOutcome::DedupUnavailable
            }
        }
    }
}

impl std::fmt::Debug for ClusterEcho {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterEcho")
            .field("dedup", &self.dedup.backend_name())
            .field("targets", &self.forwarder.targets())
            .finish()
    }
}
