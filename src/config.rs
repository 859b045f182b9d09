/*
 * Responsibility
 * - 環境変数の読み込み (CAS endpoint, service 識別子, proxy 設定, echo 先, Valkey など)
 * - 設定値のバリデーション (不足・矛盾・不正なら起動失敗。リクエスト時まで遅らせない)
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::services::cas::ServiceIdentity;
use crate::services::proxy::{ChainConfigError, ProxyChainAuthorizer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn parse(value: Option<&str>) -> Self {
        match value
            .unwrap_or("development")
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
    Conflict(&'static str, &'static str),
    ProxyChains(ChainConfigError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
            ConfigError::Conflict(a, b) => {
                write!(f, "conflicting configuration: {} and {}", a, b)
            }
            ConfigError::ProxyChains(e) => {
                write!(f, "invalid configuration: CAS_AUTHORIZED_PROXY_CHAINS: {}", e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,

    pub login_url: String,
    pub validate_url: String,
    pub service: ServiceIdentity,
    pub renew: bool,
    pub gateway: bool,

    pub proxy_callback_url: Option<String>,
    pub proxy_url: Option<String>,
    pub authorized_proxy_chains: Option<ProxyChainAuthorizer>,

    pub pgt_echo_targets: Vec<String>,
    pub logout_echo_targets: Vec<String>,

    pub http_timeout: Duration,

    pub valkey_url: Option<String>,
    pub dedup_ttl: Duration,

    pub session_cookie: String,
    pub session_idle: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let port: u16 = get("PORT")
            .map(|s| s.parse().map_err(|_| ConfigError::Invalid("PORT")))
            .transpose()?
            .unwrap_or(3000);

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::parse(get("APP_ENV").as_deref());

        let login_url = get("CAS_LOGIN_URL").ok_or(ConfigError::Missing("CAS_LOGIN_URL"))?;
        require_https(&login_url, "CAS_LOGIN_URL")?;

        let validate_url =
            get("CAS_VALIDATE_URL").ok_or(ConfigError::Missing("CAS_VALIDATE_URL"))?;
        require_https(&validate_url, "CAS_VALIDATE_URL")?;

        let service = match (get("CAS_SERVICE_URL"), get("CAS_SERVER_NAME")) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::Conflict("CAS_SERVICE_URL", "CAS_SERVER_NAME"));
            }
            (None, None) => return Err(ConfigError::Missing("CAS_SERVICE_URL")),
            (Some(url), None) => {
                require_http_or_https(&url, "CAS_SERVICE_URL")?;
                ServiceIdentity::Fixed(url)
            }
            (None, Some(server)) => {
                if server.contains('/') || server.contains(char::is_whitespace) {
                    return Err(ConfigError::Invalid("CAS_SERVER_NAME"));
                }
                ServiceIdentity::ServerName(server)
            }
        };

        let renew = parse_bool(get("CAS_RENEW"), "CAS_RENEW")?;
        let gateway = parse_bool(get("CAS_GATEWAY"), "CAS_GATEWAY")?;
        if renew && gateway {
            return Err(ConfigError::Conflict("CAS_RENEW", "CAS_GATEWAY"));
        }

        let proxy_callback_url = get("CAS_PROXY_CALLBACK_URL");
        if let Some(url) = &proxy_callback_url {
            require_https(url, "CAS_PROXY_CALLBACK_URL")?;
        }

        let proxy_url = get("CAS_PROXY_URL");
        match &proxy_url {
            Some(url) => require_https(url, "CAS_PROXY_URL")?,
            None if proxy_callback_url.is_some() => {
                return Err(ConfigError::Missing("CAS_PROXY_URL"));
            }
            None => {}
        }

        let authorized_proxy_chains = get("CAS_AUTHORIZED_PROXY_CHAINS")
            .map(|s| ProxyChainAuthorizer::parse(&s).map_err(ConfigError::ProxyChains))
            .transpose()?;

        let pgt_echo_targets = parse_targets(get("CAS_PGT_ECHO_TARGETS"), "CAS_PGT_ECHO_TARGETS")?;
        let logout_echo_targets =
            parse_targets(get("CAS_LOGOUT_ECHO_TARGETS"), "CAS_LOGOUT_ECHO_TARGETS")?;

        let timeout_ms: u64 = get("CAS_HTTP_TIMEOUT_MS")
            .map(|v| v.parse().map_err(|_| ConfigError::Invalid("CAS_HTTP_TIMEOUT_MS")))
            .transpose()?
            .unwrap_or(5000);
        if timeout_ms == 0 {
            return Err(ConfigError::Invalid("CAS_HTTP_TIMEOUT_MS"));
        }

        let valkey_url = get("VALKEY_URL");

        let dedup_ttl_seconds: u64 = get("CAS_DEDUP_TTL_SECONDS")
            .map(|v| v.parse().map_err(|_| ConfigError::Invalid("CAS_DEDUP_TTL_SECONDS")))
            .transpose()?
            .unwrap_or(86_400);

        let session_cookie = get("CAS_SESSION_COOKIE").unwrap_or_else(|| "CASSESSION".to_string());
        if !session_cookie
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ConfigError::Invalid("CAS_SESSION_COOKIE"));
        }

        let session_idle_seconds: u64 = get("CAS_SESSION_IDLE_SECONDS")
            .map(|v| v.parse().map_err(|_| ConfigError::Invalid("CAS_SESSION_IDLE_SECONDS")))
            .transpose()?
            .unwrap_or(1800);
        if session_idle_seconds == 0 {
            return Err(ConfigError::Invalid("CAS_SESSION_IDLE_SECONDS"));
        }

        Ok(Self {
            addr,
            app_env,
            login_url,
            validate_url,
            service,
            renew,
            gateway,
            proxy_callback_url,
            proxy_url,
            authorized_proxy_chains,
            pgt_echo_targets,
            logout_echo_targets,
            http_timeout: Duration::from_millis(timeout_ms),
            valkey_url,
            dedup_ttl: Duration::from_secs(dedup_ttl_seconds),
            session_cookie,
            session_idle: Duration::from_secs(session_idle_seconds),
        })
    }
}

fn require_https(value: &str, key: &'static str) -> Result<(), ConfigError> {
    match Url::parse(value) {
        Ok(url) if url.scheme() == "https" && url.has_host() => Ok(()),
        _ => Err(ConfigError::Invalid(key)),
    }
}

fn require_http_or_https(value: &str, key: &'static str) -> Result<(), ConfigError> {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => Ok(()),
        _ => Err(ConfigError::Invalid(key)),
    }
}

fn parse_bool(value: Option<String>, key: &'static str) -> Result<bool, ConfigError> {
    match value.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(false),
        Some("true" | "1" | "yes" | "on") => Ok(true),
        Some("false" | "0" | "no" | "off") => Ok(false),
        Some(_) => Err(ConfigError::Invalid(key)),
    }
}

fn parse_targets(value: Option<String>, key: &'static str) -> Result<Vec<String>, ConfigError> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };
    value
        .split_whitespace()
        .map(|target| {
            require_http_or_https(target, key)?;
            Ok(target.to_string())
        })
        .collect()
}
