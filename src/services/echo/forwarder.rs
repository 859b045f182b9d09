/*
 * Responsibility
 * - 受け取ったパラメータをそのまま peer 全台へ転送 (GET, query 追記)
 * - peer ごとに独立した best-effort。1 台の失敗で他を止めない
 * - 全結果を待ってから成功数を返す
 */
use std::time::Duration;

use tokio::task::JoinSet;

use crate::services::http::{self, SecureFetcher};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EchoReport {
    pub attempted: usize,
    pub succeeded: usize,
}

#[derive(Debug, Clone)]
pub struct EchoForwarder {
    targets: Vec<String>,
    fetcher: SecureFetcher,
    timeout: Duration,
}

impl EchoForwarder {
    pub fn new(targets: Vec<String>, fetcher: SecureFetcher, timeout: Duration) -> Self {
        let mut unique = Vec::with_capacity(targets.len());
        for target in targets {
            if !unique.contains(&target) {
                unique.push(target);
            }
        }
        Self {
            targets: unique,
            fetcher,
            timeout,
        }
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    pub async fn forward(&self, params: &[(String, String)]) -> EchoReport {
        let mut tasks = JoinSet::new();

        for target in &self.targets {
            let pairs: Vec<(&str, &str)> = params
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect();
            let url = match http::url_with_params(target, &pairs) {
                Ok(url) => url,
                Err(e) => {
                    tracing::error!(echo_target = %target, error = %e, "invalid echo target");
                    continue;
                }
            };

            let fetcher = self.fetcher.clone();
            let timeout = self.timeout;
            tasks.spawn(async move { fetcher.get(url, timeout).await });
        }
        let attempted = tasks.len();

        let mut succeeded = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(_)) => succeeded += 1,
                Ok(Err(e)) => tracing::error!(error = %e, "echo to peer failed"),
                Err(e) => tracing::error!(error = %e, "echo task aborted"),
            }
        }

        // targets whose URL could not be built were never attempted
        let report = EchoReport {
            attempted,
            succeeded,
        };
        tracing::debug!(
            attempted = report.attempted,
            succeeded = report.succeeded,
            "echoed request to peers"
        );
        report
    }
}
