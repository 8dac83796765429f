use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::AppError;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::state::AppState;

/// JWT configuration constants
pub const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Agent,
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "agent" => Ok(Role::Agent),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => f.write_str("admin"),
            Role::Agent => f.write_str("agent"),
        }
    }
}

/// JWT Claims structure matching the token payload
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtClaims {
    pub sub: String,
    pub email: String,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

/// Caller identity, inserted into request extensions by the middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub user_id: String,
    pub email: String,
    pub role: Role,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            warn!("User {} ({}) attempted an admin-only action", self.email, self.role);
            Err(AppError::authorization("This action requires the admin role"))
        }
    }
}

/// Signs a token for `user_id` valid for `ttl_hours`.
pub fn issue_token(
    secret: &str,
    user_id: &str,
    email: &str,
    role: Role,
    ttl_hours: i64,
) -> Result<String, AppError> {
    let now = chrono::Utc::now();
    let claims = JwtClaims {
        sub: user_id.to_string(),
        email: email.to_string(),
        role,
        exp: (now + chrono::Duration::hours(ttl_hours)).timestamp(),
        iat: now.timestamp(),
    };
    Ok(encode(
        &Header::new(JWT_ALGORITHM),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

pub fn verify_jwt_token(secret: &str, token: &str) -> Result<JwtClaims, AppError> {
    let validation = Validation::new(JWT_ALGORITHM);
    decode::<JwtClaims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                AppError::authentication("Your session has expired. Please log in again.")
            }
            _ => AppError::authentication(format!("Could not validate credentials: {}", e)),
        })
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or_else(|| AppError::authentication("Missing Authorization header"))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::authentication("Authorization header must be in format: Bearer <token>"))?
        .trim();
    if token.is_empty() {
        return Err(AppError::authentication("Empty JWT token"));
    }
    Ok(token)
}

/// Validates the bearer token and stores a [`CurrentUser`] on the request.
pub async fn extract_current_user(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())?;
    let claims = verify_jwt_token(&state.jwt_secret, token)?;

    let current_user = CurrentUser {
        user_id: claims.sub,
        email: claims.email,
        role: claims.role,
    };
    debug!(
        user_id = %current_user.user_id,
        role = %current_user.role,
        "JWT authentication successful"
    );

    request.extensions_mut().insert(current_user);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &str = "test_secret";

    #[test]
    fn test_jwt_round_trip() {
        let token = issue_token(SECRET, "7", "agent@clinic.ph", Role::Agent, 1).unwrap();
        let claims = verify_jwt_token(SECRET, &token).unwrap();

        assert_eq!(claims.sub, "7");
        assert_eq!(claims.email, "agent@clinic.ph");
        assert_eq!(claims.role, Role::Agent);
    }

    #[test]
    fn test_wrong_secret_and_expired_tokens_rejected() {
        let token = issue_token(SECRET, "7", "a@clinic.ph", Role::Admin, 1).unwrap();
        assert!(verify_jwt_token("other_secret", &token).is_err());

        // well past the default 60s leeway
        let expired = issue_token(SECRET, "7", "a@clinic.ph", Role::Admin, -2).unwrap();
        let err = verify_jwt_token(SECRET, &expired).unwrap_err();
        assert_eq!(err.error_code(), "AUTH_ERROR");
    }

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_err());

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Token abc"));
        assert!(bearer_token(&headers).is_err());

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(bearer_token(&headers).unwrap(), "abc");
    }

    #[test]
    fn test_require_admin() {
        let agent = CurrentUser {
            user_id: "1".into(),
            email: "a@clinic.ph".into(),
            role: Role::Agent,
        };
        assert!(agent.require_admin().is_err());
        assert!(CurrentUser { role: Role::Admin, ..agent }.require_admin().is_ok());
        assert_eq!("ADMIN".parse::<Role>(), Ok(Role::Admin));
    }
}
