/*
 * Responsibility
 * - 中央認証サービス (と cluster peer) から呼ばれる endpoint
 *   - /cas/proxy-callback : PGT 受け取り (pgtId / pgtIou)
 *   - /cas/logout         : single sign-out 通知
 * - どちらも gatekeeper を通さない
 */
pub mod handlers;
mod routes;

pub use routes::routes;

/// First value for `name`, ignoring blanks.
pub(crate) fn param<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.trim())
        .filter(|v| !v.is_empty())
}
