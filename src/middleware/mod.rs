/*
 * Responsibility
 * - middleware の公開インターフェース
 * - auth: Bearer token → Authentication (request extensions)
 * - http / security_headers: version に依存しない横断的関心事
 */
pub mod auth;
pub mod http;
pub mod security_headers;
