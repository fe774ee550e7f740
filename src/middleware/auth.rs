//! Authentication middleware that validates bearer tokens.
//!
//! The middleware:
//! 1. Extracts the token from the `Authorization: Bearer <token>` header
//! 2. Verifies it as an HS256 JWT against the configured signing secret
//! 3. Inserts an [`AuthContext`] into request extensions on success
//! 4. Returns 401 if validation fails
//!
//! When `auth_required` is false (local development), an anonymous
//! context is inserted so handlers that read the context still work.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::errors::AuthError;
use crate::state::AppState;

/// JWT claims carried by gateway bearer tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user identity
    pub sub: String,
    /// User email, when the identity provider supplies one
    #[serde(default)]
    pub email: Option<String>,
    /// Expiry, seconds since the Unix epoch
    pub exp: u64,
}

/// Authenticated caller identity, inserted into request extensions.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Option<String>,
    pub email: Option<String>,
}

impl AuthContext {
    /// Context for requests that passed validation.
    pub fn authenticated(user_id: String, email: Option<String>) -> Self {
        Self {
            user_id: Some(user_id),
            email,
        }
    }

    /// Context used when authentication is disabled.
    pub fn anonymous() -> Self {
        Self {
            user_id: None,
            email: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }
}

/// Extract the bearer token from the Authorization header.
fn extract_token(request: &Request) -> Result<String, AuthError> {
    let Some(auth_header) = request.headers().get("authorization") else {
        return Err(AuthError::MissingAuthHeader);
    };

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) => Ok(token.to_string()),
        None => Err(AuthError::InvalidAuthHeader),
    }
}

/// Verify a bearer JWT and return its claims.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| AuthError::InvalidToken(e.to_string()))
}

/// Axum middleware enforcing bearer authentication on protected routes.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    if !state.config.auth_required {
        tracing::debug!("Authentication disabled, inserting anonymous context");
        request.extensions_mut().insert(AuthContext::anonymous());
        return Ok(next.run(request).await);
    }

    let secret = state
        .config
        .auth_jwt_secret
        .as_deref()
        .ok_or_else(|| AuthError::ConfigError("Auth signing secret not configured".to_string()))?;

    let token = extract_token(&request)?;
    let claims = verify_token(&token, secret)?;

    tracing::debug!(
        method = %request.method(),
        path = %request.uri().path(),
        user = %claims.sub,
        "Bearer authentication successful"
    );

    request
        .extensions_mut()
        .insert(AuthContext::authenticated(claims.sub, claims.email));
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn make_token(secret: &str, exp_offset: i64) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64;
        let claims = Claims {
            sub: "user-123".to_string(),
            email: Some("reader@example.com".to_string()),
            exp: (now + exp_offset).max(0) as u64,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn valid_token_verifies() {
        let token = make_token("test-secret", 3600);
        let claims = verify_token(&token, "test-secret").unwrap();
        assert_eq!(claims.sub, "user-123");
        assert_eq!(claims.email.as_deref(), Some("reader@example.com"));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = make_token("test-secret", 3600);
        assert!(verify_token(&token, "other-secret").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = make_token("test-secret", -3600);
        assert!(verify_token(&token, "test-secret").is_err());
    }

    #[test]
    fn anonymous_context_has_no_user() {
        let ctx = AuthContext::anonymous();
        assert!(!ctx.is_authenticated());
        assert!(ctx.user_id.is_none());
    }
}
