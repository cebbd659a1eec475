//! Access tokens and password handling.
//!
//! Access tokens are HS256 JWTs signed with `BOS_JWT_SECRET`. The claims carry the account id, the kind of account
//! that logged in, and the roles the holder may act under. The [`crate::middleware::JwtMiddlewareFactory`] validates
//! the bearer token on every `/api` request and stores the claims in the request extensions, from where handlers
//! extract them via the [`FromRequest`] impl on [`JwtClaims`].
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use actix_web::{dev::Payload, FromRequest, HttpMessage, HttpRequest};
use buy_order_engine::db_types::Role;
use futures::future::{ready, Ready};
use jwt_compact::{
    alg::{Hs256, Hs256Key},
    prelude::*,
};
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    config::AuthConfig,
    errors::{AuthError, ServerError},
};

pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    pub account_id: i64,
    /// The kind of account the token was issued for. Either `Customer` or `Merchant`.
    pub role: Role,
    pub email: String,
    pub roles: Vec<Role>,
}

impl JwtClaims {
    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.is_admin() || self.roles.contains(&role)
    }
}

impl FromRequest for JwtClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let claims = req.extensions().get::<JwtClaims>().cloned().ok_or(AuthError::MissingToken.into());
        ready(claims)
    }
}

/// Signs and validates access tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    key: Hs256Key,
    config: AuthConfig,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        let key = Hs256Key::new(config.jwt_secret.reveal().as_bytes());
        Self { key, config: config.clone() }
    }

    /// Issue an access token for an account whose credentials have already been checked.
    pub fn issue_token(&self, account_id: i64, role: Role, email: &str) -> Result<String, AuthError> {
        let mut roles = vec![role];
        if self.config.is_admin_email(email) {
            info!("🔐️ Granting admin rights to {email}");
            roles.push(Role::Admin);
        }
        let custom = JwtClaims { account_id, role, email: email.to_string(), roles };
        let claims =
            Claims::new(custom).set_duration_and_issuance(&TimeOptions::default(), self.config.jwt_expiry);
        let header = Header::empty().with_token_type("JWT");
        Hs256.token(&header, &claims, &self.key).map_err(|e| AuthError::InvalidToken(format!("{e}")))
    }

    /// Check the signature and expiry of an access token and return its claims.
    pub fn validate_token(&self, token: &str) -> Result<JwtClaims, AuthError> {
        let untrusted = UntrustedToken::new(token).map_err(|e| AuthError::InvalidToken(format!("{e}")))?;
        let token = Hs256
            .validator::<JwtClaims>(&self.key)
            .validate(&untrusted)
            .map_err(|e| AuthError::InvalidToken(format!("{e}")))?;
        token
            .claims()
            .validate_expiration(&TimeOptions::default())
            .map_err(|e| AuthError::InvalidToken(format!("{e}")))?;
        let (_, claims) = token.into_parts();
        Ok(claims.custom)
    }
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!("Passwords must be at least {MIN_PASSWORD_LENGTH} characters long")));
    }
    let salt = SaltString::encode_b64(&rand::random::<[u8; 16]>()).map_err(|e| AuthError::HashingError(e.to_string()))?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::HashingError(e.to_string()))?;
    Ok(hash.to_string())
}

/// Returns `true` if `password` matches the stored PHC hash. Malformed hashes never match.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(e) => {
            warn!("🔐️ Stored password hash could not be parsed. {e}");
            false
        },
    }
}
