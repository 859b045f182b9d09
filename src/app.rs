/*
 * Responsibility
 * - tracing / panic hook の初期化
 * - Config 読み込み → 依存生成 (fetcher, validator, gate, PGT store, echo) → Router 組み立て
 * - Middleware の適用 (http 共通 / gatekeeper は v1 routes 側)
 * - axum::serve() で起動
 */
use std::{panic, process, sync::Arc, time::Duration};

use anyhow::Result;
use axum::{Router, routing::get};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::config::Config;
use crate::middleware;
use crate::services::{
    auth::build_gate,
    cas::TicketValidationClient,
    echo::{ClusterEcho, EchoForwarder, MemoryDedup, ReplicationDedup, ValkeyDedup},
    http::SecureFetcher,
    proxy::ProxyGrantingTicketStore,
};
use crate::state::{AppState, WebSettings};

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,cas_proxy_client=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // stderr can be hidden depending on how the process is launched
        tracing::error!(?info, "panic");

        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;

    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting CAS client in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let state = build_state(&config).await?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Wire every process-level service from `config`.
pub async fn build_state(config: &Config) -> Result<AppState> {
    let fetcher = SecureFetcher::new()?;

    let validator = Arc::new(TicketValidationClient::new(fetcher.clone()));
    let gate = build_gate(config, validator);

    let web = WebSettings {
        service: config.service.clone(),
        login_url: config.login_url.clone(),
        session_cookie: config.session_cookie.clone(),
        session_idle: config.session_idle,
        secure_cookie: config.app_env.is_production(),
        request_timeout: request_timeout(config.http_timeout),
    };
    let mut state = AppState::new(gate, web);

    if let (Some(callback), Some(proxy_url)) = (&config.proxy_callback_url, &config.proxy_url) {
        tracing::info!(callback = %callback, "proxy granting tickets enabled");
        state = state.with_pgt_store(Arc::new(ProxyGrantingTicketStore::new(
            proxy_url.clone(),
            fetcher.clone(),
            config.http_timeout,
        )));
    }

    if config.pgt_echo_targets.is_empty() && config.logout_echo_targets.is_empty() {
        return Ok(state);
    }

    // one set for both: keys are namespaced by kind
    let dedup: Arc<dyn ReplicationDedup> = match &config.valkey_url {
        Some(url) => Arc::new(ValkeyDedup::connect(url, config.dedup_ttl).await?),
        None => Arc::new(MemoryDedup::new(config.dedup_ttl)),
    };
    tracing::info!(backend = dedup.backend_name(), "cluster echo enabled");

    let echo = |targets: &[String]| {
        Arc::new(ClusterEcho::new(
            Arc::clone(&dedup),
            EchoForwarder::new(targets.to_vec(), fetcher.clone(), config.http_timeout),
        ))
    };
    if !config.pgt_echo_targets.is_empty() {
        state = state.with_pgt_echo(echo(&config.pgt_echo_targets));
    }
    if !config.logout_echo_targets.is_empty() {
        state = state.with_logout_echo(echo(&config.logout_echo_targets));
    }

    Ok(state)
}

pub fn build_router(state: AppState) -> Router {
    let timeout = state.web.request_timeout;

    let router = Router::new()
        .route("/health", get(api::v1::handlers::health::health))
        .nest("/cas", api::cas::routes())
        .nest("/api/v1", api::v1::routes(state.clone()))
        .with_state(state);

    middleware::http::apply(router, timeout)
}

// one validation call plus headroom for the handler itself
fn request_timeout(outbound: Duration) -> Duration {
    (outbound * 3).max(Duration::from_secs(30))
}
