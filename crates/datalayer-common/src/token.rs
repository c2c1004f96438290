//! JWT claim decoding
//!
//! Datalayer tokens are JWTs. The client never verifies signatures (the
//! server does); it only reads `exp` to decide when to log in again.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Subset of the claims carried by a Datalayer token
#[derive(Clone, Debug, Default, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    pub sub: Option<serde_json::Value>,
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub jti: Option<String>,
}

impl TokenClaims {
    /// Decode the payload segment of `token` without verifying it.
    ///
    /// Returns `None` for anything that is not a three-segment JWT with a
    /// JSON payload.
    pub fn decode(token: &str) -> Option<Self> {
        let mut segments = token.split('.');
        let (_header, payload, _signature) =
            (segments.next()?, segments.next()?, segments.next()?);
        if segments.next().is_some() {
            return None;
        }
        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| DateTime::from_timestamp(exp, 0))
    }

    /// Whether the token expires within `margin_secs` of `now`.
    /// Tokens without `exp` never expire.
    pub fn is_expired_at(&self, now: DateTime<Utc>, margin_secs: i64) -> bool {
        match self.exp {
            Some(exp) => exp - margin_secs <= now.timestamp(),
            None => false,
        }
    }
}
