//! HS256 identity tokens.
//!
//! Tokens are compact JWS strings carrying `sub`, `roles`, `iat` and `exp`.
//! `iat`/`exp` are epoch milliseconds so that millisecond lifetimes are exact.
//! Expiry is checked here against an explicit `now` rather than by
//! `jsonwebtoken`'s seconds-based validation.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::services::auth::identity::Role;

/// Minimum decoded key size, in bytes (256 bits).
pub const MIN_SECRET_BYTES: usize = 32;

const ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("token signature does not match")]
    BadSignature,
    #[error("token has expired")]
    Expired,
    #[error("unsupported token")]
    Unsupported,
}

#[derive(Debug, Error)]
pub enum TokenCodecError {
    #[error("signing secret is {bits} bits, at least {} required", MIN_SECRET_BYTES * 8)]
    WeakSecret { bits: usize },
    #[error("signing secret is not valid base64")]
    InvalidSecretEncoding,
    #[error("token lifetime must be greater than zero")]
    ZeroLifetime,
    #[error("token expiry is outside the representable time range")]
    LifetimeOutOfRange,
    #[error("failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// Decoded key material. Never printable.
#[derive(Clone)]
pub struct SigningSecret(Vec<u8>);

impl SigningSecret {
    /// `base64:<standard base64>` is decoded; anything else is taken as raw bytes.
    pub fn parse(raw: &str) -> Result<Self, TokenCodecError> {
        let bytes = match raw.strip_prefix("base64:") {
            Some(encoded) => STANDARD
                .decode(encoded.trim())
                .map_err(|_| TokenCodecError::InvalidSecretEncoding)?,
            None => raw.as_bytes().to_vec(),
        };
        Self::from_bytes(bytes)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, TokenCodecError> {
        if bytes.len() < MIN_SECRET_BYTES {
            return Err(TokenCodecError::WeakSecret {
                bits: bytes.len() * 8,
            });
        }
        Ok(Self(bytes))
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningSecret({} bits)", self.0.len() * 8)
    }
}

/// Signature-verified token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "sub")]
    pub subject: String,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(rename = "iat", with = "chrono::serde::ts_milliseconds")]
    pub issued_at: DateTime<Utc>,
    #[serde(rename = "exp", with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    validation: Arc<Validation>,
    lifetime: chrono::Duration,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print key material
        f.debug_struct("TokenCodec")
            .field("algorithm", &ALGORITHM)
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

impl TokenCodec {
    pub fn new(secret: SigningSecret, lifetime: Duration) -> Result<Self, TokenCodecError> {
        if lifetime.is_zero() {
            return Err(TokenCodecError::ZeroLifetime);
        }
        let lifetime = chrono::Duration::from_std(lifetime)
            .map_err(|_| TokenCodecError::LifetimeOutOfRange)?;
        if Utc::now().checked_add_signed(lifetime).is_none() {
            return Err(TokenCodecError::LifetimeOutOfRange);
        }

        let mut validation = Validation::new(ALGORITHM);
        // exp/iat are milliseconds; checked in `verify_at`.
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();

        Ok(Self {
            encoding_key: Arc::new(EncodingKey::from_secret(&secret.0)),
            decoding_key: Arc::new(DecodingKey::from_secret(&secret.0)),
            validation: Arc::new(validation),
            lifetime,
        })
    }

    pub fn lifetime(&self) -> chrono::Duration {
        self.lifetime
    }

    pub fn issue(
        &self,
        subject: &str,
        roles: &[Role],
        now: DateTime<Utc>,
    ) -> Result<String, TokenCodecError> {
        let expires_at = now
            .checked_add_signed(self.lifetime)
            .ok_or(TokenCodecError::LifetimeOutOfRange)?;
        let claims = Claims {
            subject: subject.to_string(),
            roles: roles.to_vec(),
            issued_at: now,
            expires_at,
        };

        let mut header = Header::new(ALGORITHM);
        header.typ = Some("JWT".to_string());

        let token = jsonwebtoken::encode(&header, &claims, &self.encoding_key)?;
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Signature first, then `now < exp`.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let segments: Vec<&str> = token.split('.').collect();
        if segments.len() != 3 || segments[0].is_empty() || segments[1].is_empty() {
            return Err(TokenError::Malformed);
        }
        if segments[2].is_empty() {
            // unsecured JWS (alg "none")
            return Err(TokenError::Unsupported);
        }

        let claims =
            jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
                .map(|data| data.claims)
                .map_err(|err| classify(token, err.kind()))?;

        if claims.expires_at <= claims.issued_at || claims.subject.trim().is_empty() {
            return Err(TokenError::Malformed);
        }
        if now >= claims.expires_at {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

fn classify(token: &str, kind: &ErrorKind) -> TokenError {
    match kind {
        ErrorKind::InvalidSignature => TokenError::BadSignature,
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::InvalidAlgorithm
        | ErrorKind::InvalidAlgorithmName
        | ErrorKind::MissingAlgorithm => TokenError::Unsupported,
        // The signature segment is decoded before the payload, so a base64
        // failure on a token whose other segments are sound is a damaged signature.
        ErrorKind::Base64(_) if leading_segments_are_sound(token) => TokenError::BadSignature,
        _ => TokenError::Malformed,
    }
}

fn leading_segments_are_sound(token: &str) -> bool {
    let Some((_, payload)) = token
        .rsplit_once('.')
        .and_then(|(signed, _)| signed.split_once('.'))
    else {
        return false;
    };

    jsonwebtoken::decode_header(token).is_ok() && URL_SAFE_NO_PAD.decode(payload).is_ok()
}
