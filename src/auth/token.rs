use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use jwt::{Claims, RegisteredClaims, SignWithKey, VerifyWithKey};
use sha2::Sha256;
use uuid::Uuid;

use crate::error::{config_error, internal_error, Error};

pub const TOKEN_LIFETIME_SECONDS: i64 = 60 * 60;

#[derive(Debug, Clone, PartialEq)]
pub struct TokenClaims {
    pub user_id: Uuid,
    pub email: String,
    pub issued_at: DateTime<Utc>,
    pub expiration: DateTime<Utc>,
}

/// HS256 tokens carrying the user id as subject and the email as a private claim.
pub struct TokenVerifier {
    key: Hmac<Sha256>,
    issuer: String,
}

impl TokenVerifier {
    pub fn new(secret: &str, issuer: &str) -> Result<Self, Error> {
        if secret.is_empty() {
            return Err(config_error("JWT_SECRET must not be empty"));
        }

        let key = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(config_error)?;

        Ok(Self {
            key,
            issuer: issuer.into(),
        })
    }

    pub fn issue(&self, user_id: Uuid, email: &str) -> Result<String, Error> {
        let now = Utc::now().timestamp();

        let mut private = BTreeMap::new();
        private.insert("email".to_string(), serde_json::Value::from(email));

        let claims = Claims {
            registered: RegisteredClaims {
                issuer: Some(self.issuer.clone()),
                subject: Some(user_id.to_string()),
                audience: None,
                expiration: Some((now + TOKEN_LIFETIME_SECONDS) as u64),
                not_before: None,
                issued_at: Some(now as u64),
                json_web_token_id: None,
            },
            private,
        };

        claims.sign_with_key(&self.key).map_err(internal_error)
    }

    pub fn verify(&self, token: &str) -> Option<TokenClaims> {
        let claims: Claims = token.verify_with_key(&self.key).ok()?;

        if claims.registered.issuer.as_ref() != Some(&self.issuer) {
            return None;
        }

        let now = Utc::now();

        let issued_at = Utc
            .timestamp_opt(claims.registered.issued_at? as i64, 0)
            .single()?;
        if issued_at > now {
            return None;
        }

        let expiration = Utc
            .timestamp_opt(claims.registered.expiration? as i64, 0)
            .single()?;
        if expiration < now {
            return None;
        }

        let user_id = claims
            .registered
            .subject
            .as_ref()
            .and_then(|x| Uuid::parse_str(x).ok())?;

        let email = claims
            .private
            .get("email")
            .and_then(|x| x.as_str())
            .unwrap_or_default()
            .to_string();

        Some(TokenClaims {
            user_id,
            email,
            issued_at,
            expiration,
        })
    }
}
