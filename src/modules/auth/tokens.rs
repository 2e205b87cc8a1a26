//! Signed session tokens.
//!
//! Compact HS256 JWS (`header.claims.signature`, base64url without padding).
//! Tokens are not stored anywhere: validity is signature plus expiry.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::Mac;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::error::AuthError;
use crate::modules::config::{AuthConfig, ConfigError};
use crate::modules::utils::time::current_timestamp;
use crate::HmacSha256;

const BEARER_PREFIX: &str = "bearer ";

/// Identity claims carried inside a session token
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    #[serde(rename = "username")]
    pub subject: String,
    #[serde(rename = "fname")]
    pub display_name: String,
    #[serde(rename = "iat")]
    pub issued_at: i64,
    #[serde(rename = "exp")]
    pub expires_at: i64,
}

impl SessionClaims {
    /// Expired once `now` reaches `expires_at`
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}

#[derive(Deserialize)]
struct TokenHeader {
    alg: String,
}

/// Issues and verifies session tokens with a shared secret
#[derive(Clone)]
pub struct TokenService {
    mac: HmacSha256,
    algorithm: String,
    ttl_secs: i64,
}

impl TokenService {
    pub fn new(secret: &str, algorithm: &str, ttl: chrono::Duration) -> Result<Self, ConfigError> {
        if secret.is_empty() {
            return Err(ConfigError::MissingSecret);
        }
        if algorithm != crate::TOKEN_ALGORITHM {
            return Err(ConfigError::UnsupportedAlgorithm(algorithm.to_string()));
        }
        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|_| ConfigError::MissingSecret)?;

        Ok(Self {
            mac,
            algorithm: algorithm.to_string(),
            ttl_secs: ttl.num_seconds(),
        })
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self, ConfigError> {
        Self::new(&config.secret, &config.algorithm, config.token_ttl)
    }

    /// Issue a token for `subject`, valid from now for the configured lifetime
    pub fn issue(&self, subject: &str, display_name: &str) -> String {
        self.issue_at(subject, display_name, current_timestamp())
    }

    /// Issue a token as if the current time were `now`
    pub fn issue_at(&self, subject: &str, display_name: &str, now: i64) -> String {
        let header = json!({ "alg": self.algorithm, "typ": "JWT" });
        let claims = json!({
            "username": subject,
            "fname": display_name,
            "iat": now,
            "exp": now + self.ttl_secs,
        });

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header.to_string()),
            URL_SAFE_NO_PAD.encode(claims.to_string())
        );
        let signature = self.sign(&signing_input);

        format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(signature))
    }

    /// Verify signature and expiry against the current time
    pub fn verify(&self, token: &str) -> Result<SessionClaims, AuthError> {
        self.verify_at(token, current_timestamp())
    }

    /// Verify signature and expiry as if the current time were `now`
    ///
    /// Every failure is the same `InvalidToken`, whatever the cause.
    pub fn verify_at(&self, token: &str, now: i64) -> Result<SessionClaims, AuthError> {
        self.decode(token, now).ok_or(AuthError::InvalidToken)
    }

    fn decode(&self, token: &str, now: i64) -> Option<SessionClaims> {
        let mut segments = token.split('.');
        let header_segment = segments.next()?;
        let claims_segment = segments.next()?;
        let signature_segment = segments.next()?;
        if segments.next().is_some() {
            return None;
        }

        let header: TokenHeader =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(header_segment).ok()?).ok()?;
        if header.alg != self.algorithm {
            return None;
        }

        let signature = URL_SAFE_NO_PAD.decode(signature_segment).ok()?;
        let mut mac = self.mac.clone();
        mac.update(header_segment.as_bytes());
        mac.update(b".");
        mac.update(claims_segment.as_bytes());
        // Constant-time comparison
        mac.verify_slice(&signature).ok()?;

        let claims: SessionClaims =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(claims_segment).ok()?).ok()?;
        if claims.is_expired_at(now) {
            return None;
        }

        Some(claims)
    }

    fn sign(&self, signing_input: &str) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(signing_input.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }

    /// Strip an optional `Bearer ` scheme from a credential header value
    pub fn strip_bearer(header: &str) -> &str {
        let value = header.trim();
        match value.get(..BEARER_PREFIX.len()) {
            Some(scheme) if scheme.eq_ignore_ascii_case(BEARER_PREFIX) => {
                value[BEARER_PREFIX.len()..].trim_start()
            }
            _ => value,
        }
    }
}
