//! Password hashing and session token issuance (C4).
//!
//! Session tokens are opaque (§3 "Tokens are opaque") rather than JWTs — the
//! teacher's RS256 keypair scheme is dropped in favor of a random token keyed
//! into the session store. `jsonwebtoken` stays on the dependency list for
//! `sign_service_token`/`verify_service_token`, a narrow HS256 helper kept
//! available for signed internal service-to-service calls (e.g. a future
//! authenticated hand-off to the voice signaling upstream); it is not part of
//! the user-facing session flow.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::error::{AppError, AppResult};
use crate::ids;

/// Hash a password using Argon2id.
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to hash password: {e}")))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored Argon2id hash.
pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("stored password hash is invalid: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Mint a new opaque session token. Random, unguessable, carries no embedded
/// claims — the store is the source of truth for which user it belongs to.
pub fn generate_session_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("{}.{}", ids::prefix::SESSION, hex::encode(bytes))
}

pub fn session_expiry(config: &AuthConfig) -> chrono::DateTime<Utc> {
    Utc::now() + Duration::days(config.token_ttl_days as i64)
}

/// Claims for the HS256 service-token helper (not used by session auth).
#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceClaims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

pub fn sign_service_token(config: &AuthConfig, subject: &str, ttl: Duration) -> AppResult<String> {
    let now = Utc::now().timestamp();
    let claims = ServiceClaims {
        sub: subject.to_string(),
        iat: now,
        exp: now + ttl.num_seconds(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("service token signing failed: {e}")))
}

pub fn verify_service_token(config: &AuthConfig, token: &str) -> AppResult<ServiceClaims> {
    let data = decode::<ServiceClaims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized)?;
    Ok(data.claims)
}

mod hex {
    pub fn encode(bytes: [u8; 32]) -> String {
        const CHARS: &[u8; 16] = b"0123456789abcdef";
        let mut out = String::with_capacity(64);
        for b in bytes {
            out.push(CHARS[(b >> 4) as usize] as char);
            out.push(CHARS[(b & 0xf) as usize] as char);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_round_trip() {
        let hash = hash_password("correct horse battery staple").unwrap();
        assert!(verify_password("correct horse battery staple", &hash).unwrap());
        assert!(!verify_password("wrong password", &hash).unwrap());
    }

    #[test]
    fn session_tokens_are_unique_and_prefixed() {
        let a = generate_session_token();
        let b = generate_session_token();
        assert_ne!(a, b);
        assert!(a.starts_with("tok."));
    }

    #[test]
    fn service_token_round_trips() {
        let config = AuthConfig {
            token_ttl_days: 30,
            allow_registration: true,
            jwt_secret: "test-secret".to_string(),
        };
        let token = sign_service_token(&config, "voice-proxy", Duration::minutes(5)).unwrap();
        let claims = verify_service_token(&config, &token).unwrap();
        assert_eq!(claims.sub, "voice-proxy");
    }
}
