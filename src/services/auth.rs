//! Authentication service: registration, login and token issuance

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::{
        role::{canonical_role, normalize_role, Role, RoleName},
        user::{RegisterUser, User, UserClaims},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Authenticate by email and password and return a JWT token
    pub async fn authenticate(&self, email: &str, password: &str) -> AppResult<(String, User)> {
        let user = self
            .repository
            .users
            .get_by_email(email)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid email or password".to_string()))?;

        // Inactive accounts never get a token, whatever the password
        if !user.is_active {
            tracing::warn!(user_id = user.id, "Login refused for inactive account");
            return Err(AppError::Authentication("Account is deactivated".to_string()));
        }

        if !verify_password(&user.password, password)? {
            return Err(AppError::Authentication("Invalid email or password".to_string()));
        }

        self.repository.users.touch_last_login(user.id).await?;
        let token = self.create_token_for_user(&user)?;

        tracing::info!(user_id = user.id, "User logged in");
        Ok((token, user))
    }

    /// Self-registration. Role defaults to employee; admin cannot be self-assigned.
    pub async fn register(&self, data: RegisterUser) -> AppResult<(String, User)> {
        data.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        if data.password != data.confirm_password {
            return Err(AppError::Validation("Passwords do not match".to_string()));
        }

        let role = match normalize_role(data.role.as_deref()) {
            None => Role::Employee,
            Some(RoleName::Known(Role::Admin)) => {
                return Err(AppError::Authorization(
                    "Admin role cannot be self-assigned".to_string(),
                ))
            }
            Some(RoleName::Known(role)) => role,
            Some(RoleName::Other(raw)) => {
                return Err(AppError::Validation(format!("Unknown role: {}", raw)))
            }
        };

        if self.repository.users.email_exists(&data.email, None).await? {
            return Err(AppError::Conflict("Email already in use".to_string()));
        }

        let password_hash = hash_password(&data.password)?;
        let user = self
            .repository
            .users
            .create(
                &data.name,
                &data.email,
                &password_hash,
                role.as_str(),
                data.department.as_deref(),
            )
            .await?;

        let token = self.create_token_for_user(&user)?;

        tracing::info!(user_id = user.id, role = %role, "User registered");
        Ok((token, user))
    }

    /// Create the configured bootstrap administrator unless an admin already exists
    pub async fn ensure_admin(&self) -> AppResult<()> {
        let Some(ref admin) = self.config.bootstrap_admin else {
            return Ok(());
        };

        let roles = self.repository.users.distinct_roles().await?;
        if roles.iter().any(|r| canonical_role(Some(r.as_str())) == Some(Role::Admin)) {
            return Ok(());
        }

        let password_hash = hash_password(&admin.password)?;
        let user = self
            .repository
            .users
            .create(&admin.name, &admin.email, &password_hash, Role::Admin.as_str(), None)
            .await?;

        tracing::info!(user_id = user.id, "Bootstrap administrator created");
        Ok(())
    }

    /// Current user profile
    pub async fn me(&self, user_id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(user_id).await
    }

    /// Validate a bearer token
    pub fn validate_token(&self, token: &str) -> AppResult<UserClaims> {
        UserClaims::from_token(token, &self.config.jwt_secret)
            .map_err(|_| AppError::Authentication("Invalid or expired token".to_string()))
    }

    /// Resolve the session behind a bearer token against the stored account
    pub async fn session(&self, token: &str) -> AppResult<UserClaims> {
        let claims = self.validate_token(token)?;

        let user = match self.repository.users.get_by_id(claims.user_id).await {
            Ok(user) => user,
            Err(AppError::NotFound(_)) => {
                return Err(AppError::Authentication("Account no longer exists".to_string()))
            }
            Err(e) => return Err(e),
        };

        session_claims(claims, &user)
    }

    fn create_token_for_user(&self, user: &User) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let exp = now + (self.config.jwt_expiration_hours as i64 * 3600);

        let claims = UserClaims {
            sub: user.email.clone(),
            user_id: user.id,
            role: user.role.clone(),
            exp,
            iat: now,
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }
}

/// Inactive accounts lose their session; the stored role replaces the one issued in the token
fn session_claims(claims: UserClaims, user: &User) -> AppResult<UserClaims> {
    if !user.is_active {
        tracing::warn!(user_id = user.id, "Token refused for inactive account");
        return Err(AppError::Authentication("Account is deactivated".to_string()));
    }

    Ok(UserClaims {
        role: user.role.clone(),
        ..claims
    })
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// Check a password against a stored Argon2 hash
pub fn verify_password(hash: &str, password: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
