//! JWT authentication and the principal provider.
//!
//! Tokens name either a user or a link share. [`principal`] turns the bearer
//! token of a request into the [`Principal`] acting on it. Credentials and
//! login are handled elsewhere; this module only issues and checks tokens.

use hyper::http::HeaderMap;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use libsql::Connection;
use serde::{Deserialize, Serialize};

use crate::config::Auth as AuthConfig;
use crate::error::{Error, Result};
use crate::models::{LinkShare, User};
use crate::principal::{Principal, PrincipalKind};

const MIN_SECRET_LENGTH: usize = 32;

fn validate_secret(config: &AuthConfig) -> Result<()> {
    if config.jwt_secret.len() < MIN_SECRET_LENGTH {
        return Err(Error::Config(format!(
            "JWT secret must be at least {MIN_SECRET_LENGTH} bytes"
        )));
    }
    Ok(())
}

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id or link share id, depending on `kind`.
    pub sub: i64,
    pub kind: PrincipalKind,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
}

fn issue(config: &AuthConfig, sub: i64, kind: PrincipalKind) -> Result<String> {
    validate_secret(config)?;
    let now = jiff::Timestamp::now();
    let hours = i64::from(config.token_expiry_days) * 24;
    let exp = now
        .checked_add(jiff::SignedDuration::from_hours(hours))
        .map_err(|e| Error::Internal(format!("Token expiry out of range: {e}")))?;

    let claims = Claims {
        sub,
        kind,
        exp: exp.as_second(),
        iat: now.as_second(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| Error::Internal(format!("Token creation failed: {e}")))
}

/// Create a JWT token for a user.
pub fn create_token(config: &AuthConfig, user: &User) -> Result<String> {
    issue(config, user.id, PrincipalKind::User)
}

/// Create a JWT token acting as a link share.
pub fn create_link_share_token(config: &AuthConfig, share: &LinkShare) -> Result<String> {
    issue(config, share.id, PrincipalKind::LinkShare)
}

/// Verify and decode a JWT token.
///
/// # Returns
/// - `Ok(Claims)` if the token is valid
/// - `Err(Error::TokenExpired)` if the token has expired
/// - `Err(Error::Unauthorized)` for any other validation failure
pub fn verify_token(config: &AuthConfig, token: &str) -> Result<Claims> {
    validate_secret(config)?;
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => Error::TokenExpired,
        _ => Error::Unauthorized,
    })?;

    Ok(token_data.claims)
}

/// Extract the bearer token from the Authorization header.
pub fn bearer(headers: &HeaderMap) -> Result<&str> {
    let auth_header = headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(Error::Unauthorized)?;

    auth_header
        .get(..7)
        .filter(|p| p.eq_ignore_ascii_case("bearer "))
        .map(|_| &auth_header[7..])
        .ok_or(Error::Unauthorized)
}

/// Resolve the principal behind a request.
///
/// A token whose user or share no longer exists is `Unauthorized`. An expired
/// link share is `TokenExpired`.
pub async fn principal(headers: &HeaderMap, config: &AuthConfig, conn: &Connection) -> Result<Principal> {
    let claims = verify_token(config, bearer(headers)?)?;

    let resolved = match claims.kind {
        PrincipalKind::User => User::by_id(conn, claims.sub).await.map(Principal::User),
        PrincipalKind::LinkShare => {
            let share = LinkShare::by_id(conn, claims.sub).await;
            match share {
                Ok(share) if share.is_expired(crate::db::now()) => {
                    return Err(Error::TokenExpired);
                }
                other => other.map(Principal::LinkShare),
            }
        }
    };

    match resolved {
        Ok(principal) => Ok(principal),
        Err(Error::NotFound(_)) => {
            tracing::debug!(sub = claims.sub, kind = ?claims.kind, "token names unknown principal");
            Err(Error::Unauthorized)
        }
        Err(e) => Err(e),
    }
}
