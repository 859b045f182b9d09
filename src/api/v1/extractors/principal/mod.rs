/*!
 * CAS principal extractor
 *
 * Responsibility:
 * - gatekeeper が検証済みの Receipt を handler に渡す
 * - HTTP / axum 依存は core に閉じ込め、型定義は types に分離する
 */

mod core;
mod types;

pub use self::core::Principal;
pub use types::CasPrincipal;
