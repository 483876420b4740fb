//! JWT authentication for the API.
//!
//! The application has a single operator model: a `users` row per login, no
//! roles. Every business route sits behind [`AuthRouterExt::with_auth`],
//! which validates the bearer token and stashes the [`AuthUser`] in request
//! extensions for handlers that want it.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::entities::user;
use crate::errors::ServiceError;

#[derive(Clone)]
pub struct AuthConfig {
    secret: String,
    issuer: String,
    token_lifetime_secs: usize,
}

impl AuthConfig {
    pub fn new(secret: String, token_lifetime_secs: usize) -> Self {
        Self {
            secret,
            issuer: "milkbill-api".to_string(),
            token_lifetime_secs,
        }
    }
}

/// Claims carried in every issued token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub name: String,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

/// Authenticated operator extracted from a validated token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: i64,
    pub username: String,
    pub token_id: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ServiceError::AuthError("Authentication required".to_string()))
    }
}

/// Token issue/verify plus the credential check against the users table.
pub struct AuthService {
    config: AuthConfig,
    db: Arc<DatabaseConnection>,
}

impl AuthService {
    pub fn new(config: AuthConfig, db: Arc<DatabaseConnection>) -> Self {
        Self { config, db }
    }

    /// Verifies credentials and mints a token.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<String, ServiceError> {
        let user = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::AuthError("Invalid credentials".to_string()))?;

        if !verify_password(password, &user.password_hash) {
            warn!(username, "failed login attempt");
            return Err(ServiceError::AuthError("Invalid credentials".to_string()));
        }

        self.issue_token(user.id, &user.username)
    }

    pub fn issue_token(&self, user_id: i64, username: &str) -> Result<String, ServiceError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            name: username.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now,
            exp: now + self.config.token_lifetime_secs as i64,
            iss: self.config.issuer.clone(),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.secret.as_bytes()),
        )
        .map_err(|e| ServiceError::AuthError(format!("Token creation failed: {e}")))
    }

    pub fn verify_token(&self, token: &str) -> Result<AuthUser, ServiceError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.issuer]);

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.secret.as_bytes()),
            &validation,
        )
        .map_err(|_| ServiceError::AuthError("Invalid or expired token".to_string()))?;

        let user_id = data
            .claims
            .sub
            .parse::<i64>()
            .map_err(|_| ServiceError::AuthError("Malformed token subject".to_string()))?;

        Ok(AuthUser {
            user_id,
            username: data.claims.name,
            token_id: data.claims.jti,
        })
    }
}

/// Validates the `Authorization: Bearer` header and forwards the request
/// with the resolved [`AuthUser`] attached.
pub async fn auth_middleware(
    State(auth): State<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ServiceError::AuthError("Missing bearer token".to_string()))?;

    let user = auth.verify_token(token)?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Router extension that gates all contained routes behind authentication.
pub trait AuthRouterExt {
    fn with_auth(self, auth: Arc<AuthService>) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self, auth: Arc<AuthService>) -> Self {
        self.layer(axum::middleware::from_fn_with_state(auth, auth_middleware))
    }
}

/// Seeds the first operator account when the users table is empty.
/// Subsequent starts leave existing accounts alone.
pub async fn ensure_operator(
    db: &DatabaseConnection,
    username: &str,
    password: &str,
) -> Result<(), ServiceError> {
    use sea_orm::{ActiveValue, PaginatorTrait};

    if user::Entity::find().count(db).await? > 0 {
        return Ok(());
    }
    user::ActiveModel {
        username: ActiveValue::Set(username.to_string()),
        password_hash: ActiveValue::Set(hash_password(password)?),
        created_at: ActiveValue::Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    tracing::info!(username, "seeded initial operator account");
    Ok(())
}

/// Hashes a password into an Argon2id PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::InternalError(format!("Password hashing failed: {e}")))
}

/// Verifies a password against a stored PHC string. Malformed stored hashes
/// verify as false rather than erroring.
pub fn verify_password(password: &str, stored: &str) -> bool {
    PasswordHash::new(stored)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_round_trip() {
        let stored = hash_password("dairy-secret").unwrap();
        assert!(verify_password("dairy-secret", &stored));
        assert!(!verify_password("dairy-secret2", &stored));
        assert!(!verify_password("dairy-secret", "malformed"));
    }

    #[test]
    fn salts_differ_between_hashes() {
        assert_ne!(
            hash_password("same").unwrap(),
            hash_password("same").unwrap()
        );
    }

    #[test]
    fn token_round_trip() {
        let cfg = AuthConfig::new("unit-test-secret-that-is-long-enough".into(), 3600);
        // Token issue/verify needs no database.
        let svc = AuthService {
            config: cfg,
            db: Arc::new(DatabaseConnection::Disconnected),
        };
        let token = svc.issue_token(7, "operator").unwrap();
        let user = svc.verify_token(&token).unwrap();
        assert_eq!(user.user_id, 7);
        assert_eq!(user.username, "operator");
    }

    #[test]
    fn garbage_token_is_rejected() {
        let cfg = AuthConfig::new("unit-test-secret-that-is-long-enough".into(), 3600);
        let svc = AuthService {
            config: cfg,
            db: Arc::new(DatabaseConnection::Disconnected),
        };
        assert!(svc.verify_token("not-a-jwt").is_err());
    }
}
