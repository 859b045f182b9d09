/*
 * Responsibility
 * - アプリ共通の AppError 定義
 * - IntoResponse 実装 (HTTP status / JSON error body)
 * - ticket 検証エラー / PGT 交換エラーを統一的に変換
 *   - 未認証 (401) と 認可拒否 (403) は区別する
 *   - 中央認証サービスに届かない (503/504) と 拒否された (401/502) も区別する
 */
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::services::cas::ValidationError;
use crate::services::proxy::RedeemError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{code}: {message}")]
    BadRequest { code: &'static str, message: String },
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("forbidden")]
    Forbidden,
    #[error("not found: {resource}")]
    NotFound { resource: &'static str },
    #[error("upstream refused: {0}")]
    UpstreamRejected(String),
    #[error("upstream unavailable")]
    UpstreamUnavailable,
    #[error("upstream timeout")]
    UpstreamTimeout,
    #[error("internal server error")]
    Internal,
}

impl AppError {
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &'static str) -> Self {
        Self::NotFound { resource }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::BadRequest { code, message } => (StatusCode::BAD_REQUEST, code, message),
            AppError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN", "forbidden".into()),
            AppError::NotFound { resource } => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("{resource} not found."),
            ),
            AppError::UpstreamRejected(message) => {
                (StatusCode::BAD_GATEWAY, "UPSTREAM_REJECTED", message)
            }
            AppError::UpstreamUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "UPSTREAM_UNAVAILABLE",
                "authentication service unavailable".into(),
            ),
            AppError::UpstreamTimeout => (
                StatusCode::GATEWAY_TIMEOUT,
                "UPSTREAM_TIMEOUT",
                "authentication service timed out".into(),
            ),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
                "internal server error".into(),
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody { code, message },
        };

        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        match e {
            ValidationError::Timeout(_) => AppError::UpstreamTimeout,
            ValidationError::Transport(_) | ValidationError::Status(_) => {
                AppError::UpstreamUnavailable
            }
            // server said no, or said yes inconsistently: same effect as an invalid ticket
            ValidationError::Rejected { .. }
            | ValidationError::Malformed(_)
            | ValidationError::Inconsistent(_) => {
                AppError::Unauthorized("ticket validation failed".into())
            }
            ValidationError::Endpoint { .. } => AppError::Internal,
        }
    }
}

impl From<RedeemError> for AppError {
    fn from(e: RedeemError) -> Self {
        match e {
            RedeemError::NotFound => AppError::not_found("proxy granting ticket"),
            RedeemError::Rejected { code, .. } => AppError::UpstreamRejected(format!(
                "proxy ticket refused ({})",
                code.as_deref().unwrap_or("no code")
            )),
            RedeemError::Malformed(_) => {
                AppError::UpstreamRejected("unparsable proxy response".into())
            }
            RedeemError::Timeout(_) => AppError::UpstreamTimeout,
            RedeemError::Transport(_) | RedeemError::Status(_) => AppError::UpstreamUnavailable,
            RedeemError::Endpoint(_) => AppError::Internal,
        }
    }
}
