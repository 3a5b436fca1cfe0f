//! Authentication and account service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{
    config::{AdminConfig, AuthConfig, BorrowingConfig},
    error::{AppError, AppResult},
    models::{
        token::TokenResponse,
        user::{NewUser, RegisterUser, Role, User, UserClaims, UserProfile},
    },
    repository::Repository,
};

const REFRESH_TOKEN_BYTES: usize = 64;

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Register a new account with role User
    pub async fn register(&self, request: RegisterUser) -> AppResult<UserProfile> {
        if self.repository.users.username_exists(&request.username).await? {
            return Err(AppError::Conflict("Username already exists".to_string()));
        }
        if self.repository.users.email_exists(&request.email).await? {
            return Err(AppError::Conflict("Email already exists".to_string()));
        }

        let user = self
            .repository
            .users
            .create(&NewUser {
                name: request.name,
                email: Some(request.email),
                phone_number: Some(request.phone_number),
                address: Some(request.address),
                username: request.username,
                password_hash: hash_password(&request.password)?,
                role: Role::User,
            })
            .await?;

        tracing::info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(user.into())
    }

    /// Check credentials and issue a token pair. Other active refresh tokens
    /// of the user are revoked.
    pub async fn login(&self, username: &str, password: &str) -> AppResult<TokenResponse> {
        let user = self
            .repository
            .users
            .get_by_username(username)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid username or password".to_string()))?;

        if !verify_password(&user, password)? {
            tracing::warn!(username = %username, "Failed login attempt");
            return Err(AppError::Authentication("Invalid username or password".to_string()));
        }

        let revoked = self.repository.refresh_tokens.revoke_all_for_user(user.id).await?;
        tracing::debug!(user_id = %user.id, revoked, "Revoked previous refresh tokens");

        self.issue_tokens(&user).await
    }

    /// Exchange a refresh token for a new pair. The presented token can only
    /// be used once.
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<TokenResponse> {
        let stored = self
            .repository
            .refresh_tokens
            .get_by_hash(&hash_refresh_token(refresh_token))
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid refresh token".to_string()))?;

        if stored.is_expired(Utc::now()) {
            return Err(AppError::Authentication("Refresh token has expired".to_string()));
        }
        if stored.is_revoked {
            return Err(AppError::Authentication("Refresh token has been revoked".to_string()));
        }
        if stored.is_used || !self.repository.refresh_tokens.mark_used(stored.id).await? {
            return Err(AppError::Authentication("Refresh token has already been used".to_string()));
        }

        let user = self.repository.users.get_by_id(stored.user_id).await?;
        self.issue_tokens(&user).await
    }

    /// Revoke a refresh token
    pub async fn logout(&self, refresh_token: &str) -> AppResult<()> {
        let stored = self
            .repository
            .refresh_tokens
            .get_by_hash(&hash_refresh_token(refresh_token))
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid refresh token".to_string()))?;

        self.repository.refresh_tokens.revoke(stored.id).await?;
        tracing::info!(user_id = %stored.user_id, "User logged out");
        Ok(())
    }

    pub async fn profile(&self, user_id: Uuid) -> AppResult<UserProfile> {
        Ok(self.repository.users.get_by_id(user_id).await?.into())
    }

    /// Create the bootstrap administrator when it does not exist yet and a
    /// password is configured
    pub async fn ensure_admin(&self, admin: &AdminConfig) -> AppResult<()> {
        if self.repository.users.get_by_username(&admin.login).await?.is_some() {
            return Ok(());
        }

        let Some(password) = admin.password.as_deref() else {
            tracing::warn!(login = %admin.login, "Admin account missing and no admin password configured");
            return Ok(());
        };

        let user = self
            .repository
            .users
            .create(&NewUser {
                name: admin.name.clone(),
                email: admin.email.clone(),
                phone_number: None,
                address: None,
                username: admin.login.clone(),
                password_hash: hash_password(password)?,
                role: Role::Admin,
            })
            .await?;

        tracing::info!(user_id = %user.id, login = %user.username, "Admin account created");
        Ok(())
    }

    /// Account recorded as approver on new borrowing requests: the
    /// configured id, or the account named by `approver_login`
    pub async fn resolve_approver(&self, config: &BorrowingConfig) -> AppResult<Option<Uuid>> {
        if let Some(id) = config.approver_id {
            return Ok(Some(id));
        }

        let approver = self
            .repository
            .users
            .get_by_username(&config.approver_login)
            .await?
            .map(|user| user.id);

        if approver.is_none() {
            tracing::warn!(
                login = %config.approver_login,
                "No approver account found, borrowing requests will be refused"
            );
        }
        Ok(approver)
    }

    async fn issue_tokens(&self, user: &User) -> AppResult<TokenResponse> {
        let now = Utc::now();
        let expires_in = Duration::minutes(self.config.access_token_minutes);

        let claims = UserClaims {
            sub: user.username.clone(),
            user_id: user.id,
            role: user.role,
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
            exp: (now + expires_in).timestamp(),
            iat: now.timestamp(),
        };

        let access_token = claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))?;

        let refresh_token = generate_refresh_token();
        self.repository
            .refresh_tokens
            .create(
                user.id,
                &hash_refresh_token(&refresh_token),
                now + Duration::days(self.config.refresh_token_days),
            )
            .await?;

        Ok(TokenResponse {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: expires_in.num_seconds(),
        })
    }
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

fn verify_password(user: &User, password: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn generate_refresh_token() -> String {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    STANDARD.encode(bytes)
}

/// Hex SHA-256 digest, the only form in which refresh tokens are stored
fn hash_refresh_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with_password(password: &str) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Jane".to_string(),
            email: None,
            phone_number: None,
            address: None,
            username: "jane".to_string(),
            password: hash_password(password).unwrap(),
            role: Role::User,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn password_round_trip() {
        let user = user_with_password("s3cret");
        assert!(verify_password(&user, "s3cret").unwrap());
        assert!(!verify_password(&user, "wrong").unwrap());
    }

    #[test]
    fn refresh_tokens_are_random_and_hashed() {
        let a = generate_refresh_token();
        let b = generate_refresh_token();
        assert_ne!(a, b);
        assert_eq!(STANDARD.decode(&a).unwrap().len(), REFRESH_TOKEN_BYTES);

        let digest = hash_refresh_token(&a);
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, hash_refresh_token(&a));
        assert_ne!(digest, hash_refresh_token(&b));
    }
}
