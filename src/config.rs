/*
 * Responsibility
 * - 環境変数や設定の読み込み (DATABASE_URL, JWT secret, token lifetime など)
 * - 設定値のバリデーション (不足なら起動失敗)
 * - secret の強度チェックは TokenCodec 側 (SigningSecret::parse) で行う
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::services::auth::guard::DenialPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(value: Option<String>) -> Self {
        match value
            .unwrap_or_else(|| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

// 未設定なら default、数値でない値と 0 は起動失敗
fn positive_u64<F>(lookup: &F, key: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = match lookup(key) {
        Some(v) => v.trim().parse::<u64>().map_err(|_| ConfigError::Invalid(key))?,
        None => default,
    };
    if value == 0 {
        return Err(ConfigError::Invalid(key));
    }
    Ok(value)
}

pub struct Config {
    pub addr: SocketAddr,
    pub database_url: String,
    pub app_env: AppEnv,

    // Raw secret material. `base64:` prefix means the rest is standard base64.
    pub jwt_secret: String,
    pub jwt_expiration: Duration,

    pub admin_role: String,
    pub auth_lookup_timeout: Duration,
    pub authz_denial: DenialPolicy,

    pub request_timeout: Duration,

    // panic hook で process::abort するか (catch_unwind を無効化するので既定 false)
    pub abort_on_panic: bool,
}

// Do not print secret material
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("addr", &self.addr)
            .field("app_env", &self.app_env)
            .field("jwt_expiration", &self.jwt_expiration)
            .field("admin_role", &self.admin_role)
            .field("auth_lookup_timeout", &self.auth_lookup_timeout)
            .field("authz_denial", &self.authz_denial)
            .field("request_timeout", &self.request_timeout)
            .field("abort_on_panic", &self.abort_on_panic)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup (process env in production,
    /// a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = match lookup("PORT") {
            Some(v) => v.parse().map_err(|_| ConfigError::Invalid("PORT"))?,
            None => 3000,
        };

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let app_env = AppEnv::parse(lookup("APP_ENV"));

        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let jwt_expiration_ms = positive_u64(&lookup, "JWT_EXPIRATION_MS", 86_400_000)?; // 24h

        let admin_role = lookup("ADMIN_ROLE")
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|| "ADMIN".to_string());
        if admin_role.is_empty() {
            return Err(ConfigError::Invalid("ADMIN_ROLE"));
        }

        let auth_lookup_timeout_ms = positive_u64(&lookup, "AUTH_LOOKUP_TIMEOUT_MS", 2_000)?;

        let authz_denial = match lookup("AUTHZ_DENIAL") {
            Some(v) => v
                .parse::<DenialPolicy>()
                .map_err(|_| ConfigError::Invalid("AUTHZ_DENIAL"))?,
            None => DenialPolicy::Forbidden,
        };

        let request_timeout_secs = positive_u64(&lookup, "REQUEST_TIMEOUT_SECS", 30)?;

        let abort_on_panic = match lookup("PANIC_ABORT").as_deref() {
            Some("1") | Some("true") => true,
            Some("0") | Some("false") | None => false,
            Some(_) => return Err(ConfigError::Invalid("PANIC_ABORT")),
        };

        Ok(Self {
            addr,
            database_url,
            app_env,
            jwt_secret,
            jwt_expiration: Duration::from_millis(jwt_expiration_ms),
            admin_role,
            auth_lookup_timeout: Duration::from_millis(auth_lookup_timeout_ms),
            authz_denial,
            request_timeout: Duration::from_secs(request_timeout_secs),
            abort_on_panic,
        })
    }
}
