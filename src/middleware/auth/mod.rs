/*
 * Responsibility
 * - 認証 middleware の公開インターフェース
 * - 認可 (所有者 / admin) は handler 側で AuthorizationGuard を通す
 */
pub mod access;

pub use access::apply;
