/*
 * Responsibility
 * - middleware の公開インターフェース
 * - http: 全 route 共通 (request id / trace / limit / timeout / security headers)
 * - auth: CAS gatekeeper (保護対象の route にだけ掛ける)
 */
pub mod auth;
pub mod http;
