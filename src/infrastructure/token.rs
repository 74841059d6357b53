//! QR capability tokens.
//!
//! A QR code carries an HS256-signed JWT whose claims name an account or card
//! number and expire shortly after issue.

use crate::domain::endpoint::InstrumentKind;
use crate::domain::ports::{QrPayload, TokenVerifier};
use crate::error::{LedgerError, Result};
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// Claims carried by a QR token
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct QrClaims {
    /// Account or card number
    pub number: String,
    pub variant: InstrumentKind,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

pub struct JwtTokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtTokenVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        let secret = secret.into();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

impl TokenVerifier for JwtTokenVerifier {
    fn verify(&self, token: &str) -> Result<QrPayload> {
        let data = decode::<QrClaims>(token, &self.key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => LedgerError::TokenExpired,
                _ => LedgerError::TokenInvalid(e.to_string()),
            }
        })?;

        Ok(QrPayload {
            number: data.claims.number,
            kind: data.claims.variant,
        })
    }
}

/// Signs a QR token for `number` that expires at `expires_at`.
pub fn issue_qr_token(
    secret: &str,
    number: &str,
    kind: InstrumentKind,
    expires_at: DateTime<Utc>,
) -> Result<String> {
    let claims = QrClaims {
        number: number.to_string(),
        variant: kind,
        exp: expires_at.timestamp(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| LedgerError::InternalError(Box::new(e)))
}
