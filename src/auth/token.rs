use std::collections::HashSet;
use std::str::FromStr;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::debug;

use super::AuthError;
use crate::config::JwtConfig;

/// Decoded token payload.
///
/// `sub` is optional on the way in so that a token without a subject still
/// decodes and can be rejected by identity resolution. A non-string `sub`
/// fails to decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    pub exp: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Upper bound for the configured default ttl.
pub const MAX_DEFAULT_TTL: Duration = Duration::days(3650);

/// The only verification failure callers ever see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid token")]
pub struct InvalidToken;

/// Signs and verifies bearer tokens with one immutable secret/algorithm pair.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
    default_ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, algorithm: &str, default_ttl: Duration) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::EmptySecret);
        }
        let algorithm = parse_hmac_algorithm(algorithm)?;
        if !default_ttl.is_positive() {
            return Err(AuthError::InvalidInput("token ttl must be positive".into()));
        }
        if default_ttl > MAX_DEFAULT_TTL {
            return Err(AuthError::InvalidInput("token ttl is too large".into()));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            algorithm,
            default_ttl,
        })
    }

    pub fn from_config(cfg: &JwtConfig) -> Result<Self, AuthError> {
        let ttl = cfg
            .ttl_minutes
            .checked_mul(60)
            .map(Duration::seconds)
            .ok_or_else(|| AuthError::InvalidInput("token ttl is too large".into()))?;
        Self::new(&cfg.secret, &cfg.algorithm, ttl)
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Issues a token for `subject` with the configured default ttl.
    pub fn issue_default(&self, subject: &str) -> Result<String, AuthError> {
        self.issue(subject, Map::new(), self.default_ttl)
    }

    pub fn issue(
        &self,
        subject: &str,
        extra: Map<String, Value>,
        ttl: Duration,
    ) -> Result<String, AuthError> {
        self.issue_at(subject, extra, ttl, OffsetDateTime::now_utc())
    }

    /// Signs `{sub, exp: now + ttl, ..extra}`. `sub` and `exp` keys inside
    /// `extra` are overwritten.
    pub fn issue_at(
        &self,
        subject: &str,
        mut extra: Map<String, Value>,
        ttl: Duration,
        now: OffsetDateTime,
    ) -> Result<String, AuthError> {
        if !ttl.is_positive() {
            return Err(AuthError::InvalidInput("token ttl must be positive".into()));
        }
        let exp = now
            .checked_add(ttl)
            .ok_or_else(|| AuthError::InvalidInput("token ttl out of range".into()))?;
        extra.remove("sub");
        extra.remove("exp");
        let claims = Claims {
            sub: Some(subject.to_owned()),
            exp: exp.unix_timestamp(),
            extra,
        };
        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))?;
        debug!(subject = %subject, exp = claims.exp, "token issued");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, InvalidToken> {
        self.verify_at(token, OffsetDateTime::now_utc())
    }

    /// Checks signature, algorithm and presence of `exp`, then requires
    /// `now < exp` with no leeway.
    pub fn verify_at(&self, token: &str, now: OffsetDateTime) -> Result<Claims, InvalidToken> {
        let claims = decode::<Claims>(token, &self.decoding, &self.validation())
            .map_err(|e| {
                debug!(reason = ?e.kind(), "token rejected");
                InvalidToken
            })?
            .claims;
        if claims.exp <= now.unix_timestamp() {
            debug!(reason = "expired", "token rejected");
            return Err(InvalidToken);
        }
        Ok(claims)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(self.algorithm);
        // expiry is compared against the caller's clock in verify_at
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.required_spec_claims = HashSet::from(["exp".to_owned()]);
        validation
    }
}

fn parse_hmac_algorithm(name: &str) -> Result<Algorithm, AuthError> {
    match Algorithm::from_str(name.trim()) {
        Ok(alg @ (Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)) => Ok(alg),
        _ => Err(AuthError::UnsupportedAlgorithm(name.to_owned())),
    }
}
