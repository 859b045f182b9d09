use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::state::AppState;

use super::CasPrincipal;

/// Handler で CasPrincipal を受け取るための extractor
/// gatekeeper が insert 済みである前提。無ければ 401 (gatekeeper 未適用 or gateway 素通し)
pub struct Principal(pub CasPrincipal);

impl FromRequestParts<AppState> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CasPrincipal>()
            .cloned()
            .map(Principal)
            .ok_or_else(|| AppError::Unauthorized("not authenticated".into()))
    }
}
