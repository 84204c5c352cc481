/*!
 * Identity extractors
 *
 * Responsibility:
 * - middleware が request extensions に入れた `Authentication` を handler に渡す
 * - 保護された route は `CurrentIdentity` (匿名なら 401)
 *
 * Public API:
 * - CurrentIdentity
 */

mod core;

pub use core::CurrentIdentity;
