//! JWT Authentication Middleware
//!
//! Validates bearer tokens, stores the claims in request extensions and
//! exposes the caller to handlers through [`AuthUser`].

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use ride_db::Caller;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::error::ApiError;

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub algorithm: Algorithm,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

/// Error type for JWT configuration
#[derive(Debug, Clone, thiserror::Error)]
#[error("JWT config error: {message}")]
pub struct JwtConfigError {
    pub message: String,
}

impl JwtConfig {
    /// Minimum secret length for HS256
    pub const MIN_SECRET_LENGTH: usize = 32;

    pub fn try_new(secret: impl Into<String>) -> Result<Self, JwtConfigError> {
        let secret = secret.into();
        if secret.len() < Self::MIN_SECRET_LENGTH {
            return Err(JwtConfigError {
                message: format!(
                    "JWT secret must be at least {} bytes, got {}. Set RIDE_JWT_SECRET.",
                    Self::MIN_SECRET_LENGTH,
                    secret.len()
                ),
            });
        }
        Ok(Self {
            secret,
            algorithm: Algorithm::HS256,
            issuer: None,
            audience: None,
        })
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthClaims {
    /// Subject: the user id
    pub sub: String,
    pub exp: u64,
    pub iat: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl AuthClaims {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role("admin") || self.has_role("super_admin")
    }

    /// The caller identity; the subject must be a UUID
    pub fn caller(&self) -> Result<Caller, ApiError> {
        let user_id = Uuid::parse_str(&self.sub)
            .map_err(|_| ApiError::unauthorized("token subject is not a valid user id"))?;
        Ok(Caller {
            user_id,
            is_admin: self.is_admin(),
        })
    }
}

/// Extract the token from a `Bearer <token>` header value
pub fn extract_token(auth_header: &str) -> Result<&str, ApiError> {
    auth_header
        .strip_prefix("Bearer ")
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            ApiError::unauthorized("Invalid authorization header format. Expected: Bearer <token>")
        })
}

/// Validate a token and return its claims
pub fn validate_token(token: &str, config: &JwtConfig) -> Result<AuthClaims, ApiError> {
    let mut validation = Validation::new(config.algorithm);

    if let Some(ref iss) = config.issuer {
        validation.set_issuer(&[iss]);
    }
    if let Some(ref aud) = config.audience {
        validation.set_audience(&[aud]);
    }

    let key = DecodingKey::from_secret(config.secret.as_bytes());
    let data = decode::<AuthClaims>(token, &key, &validation).map_err(|e| {
        debug!(error = %e, "Token rejected");
        if e.kind() == &jsonwebtoken::errors::ErrorKind::ExpiredSignature {
            ApiError::unauthorized("Token has expired")
        } else {
            ApiError::unauthorized("Invalid token")
        }
    })?;

    Ok(data.claims)
}

/// Authentication state shared with the middleware
#[derive(Clone)]
pub struct AuthState {
    pub config: Arc<JwtConfig>,
}

impl AuthState {
    pub fn new(config: JwtConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

/// Require a valid bearer token; stores [`AuthClaims`] in the extensions
pub async fn require_auth(
    State(auth_state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("Authorization header is required"))?;

    let token = extract_token(auth_header)?;
    let claims = validate_token(token, &auth_state.config)?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Require the `admin` role. Must run inside [`require_auth`].
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let claims = request
        .extensions()
        .get::<AuthClaims>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if !claims.is_admin() {
        return Err(ApiError::forbidden("admin access required"));
    }
    Ok(next.run(request).await)
}

/// Authenticated caller, resolved from the claims set by [`require_auth`]
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Caller);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = parts
            .extensions
            .get::<AuthClaims>()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;
        Ok(AuthUser(claims.caller()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "unit-test-secret-that-is-long-enough";

    fn claims(sub: &str, roles: &[&str], exp_offset_secs: i64) -> AuthClaims {
        let now = chrono::Utc::now().timestamp();
        AuthClaims {
            sub: sub.to_string(),
            exp: (now + exp_offset_secs) as u64,
            iat: now as u64,
            iss: None,
            aud: None,
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }

    fn token(claims: &AuthClaims) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_extract_token() {
        assert_eq!(extract_token("Bearer abc123").unwrap(), "abc123");
        assert!(extract_token("Basic abc123").is_err());
        assert!(extract_token("Bearer ").is_err());
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(JwtConfig::try_new("short").is_err());
        assert!(JwtConfig::try_new(SECRET).is_ok());
    }

    #[test]
    fn test_validate_token_roundtrip() {
        let config = JwtConfig::try_new(SECRET).unwrap();
        let user = Uuid::new_v4();
        let validated = validate_token(&token(&claims(&user.to_string(), &["admin"], 3600)), &config).unwrap();

        let caller = validated.caller().unwrap();
        assert_eq!(caller.user_id, user);
        assert!(caller.is_admin);
    }

    #[test]
    fn test_expired_and_foreign_tokens() {
        let config = JwtConfig::try_new(SECRET).unwrap();
        let expired = token(&claims(&Uuid::new_v4().to_string(), &[], -3600));
        assert!(matches!(validate_token(&expired, &config), Err(ApiError::Unauthorized(_))));

        let other = JwtConfig::try_new("another-secret-that-is-also-long-enough").unwrap();
        let foreign = token(&claims(&Uuid::new_v4().to_string(), &[], 3600));
        assert!(validate_token(&foreign, &other).is_err());
    }

    #[test]
    fn test_issuer_and_audience_enforced_when_configured() {
        let config = JwtConfig::try_new(SECRET)
            .unwrap()
            .with_issuer("ride-auth")
            .with_audience("ride-api");
        let user = Uuid::new_v4().to_string();

        let mut good = claims(&user, &[], 3600);
        good.iss = Some("ride-auth".to_string());
        good.aud = Some("ride-api".to_string());
        assert!(validate_token(&token(&good), &config).is_ok());

        let mut wrong_issuer = good.clone();
        wrong_issuer.iss = Some("someone-else".to_string());
        assert!(matches!(
            validate_token(&token(&wrong_issuer), &config),
            Err(ApiError::Unauthorized(_))
        ));

        let mut no_audience = good.clone();
        no_audience.aud = None;
        assert!(validate_token(&token(&no_audience), &config).is_err());
    }

    #[test]
    fn test_non_uuid_subject_is_unauthorized() {
        let c = claims("user:123", &["user"], 3600);
        assert!(matches!(c.caller(), Err(ApiError::Unauthorized(_))));
    }
}
