/*
 * Responsibility
 * - handler 引数で使う extractor の公開インターフェース
 */
pub mod identity;

pub use identity::CurrentIdentity;
