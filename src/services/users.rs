//! User management service (administrators)

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        role::{canonical_role, normalize_role, Caller, Role, RoleName},
        user::{CreateUser, DeletionCheck, UpdateUser, User, UserQuery, UserShort},
    },
    repository::Repository,
    services::{auth::hash_password, deletion_guard::DeletionGuard},
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    guard: DeletionGuard,
}

/// Resolve an admin-supplied role to its canonical spelling; unknown roles are rejected
fn validated_role(raw: Option<&str>) -> AppResult<Option<Role>> {
    match normalize_role(raw) {
        None => Ok(None),
        Some(RoleName::Known(role)) => Ok(Some(role)),
        Some(RoleName::Other(other)) => Err(AppError::Validation(format!("Unknown role: {}", other))),
    }
}

impl UsersService {
    pub fn new(repository: Repository) -> Self {
        Self {
            guard: DeletionGuard::new(repository.clone()),
            repository,
        }
    }

    /// List users, optionally restricted to one canonical role
    pub async fn list(&self, query: &UserQuery, caller: &Caller) -> AppResult<Vec<UserShort>> {
        caller.require_admin()?;

        let wanted = validated_role(query.role.as_deref())?;
        let users = self.repository.users.list(query).await?;

        Ok(match wanted {
            Some(role) => users
                .into_iter()
                .filter(|u| canonical_role(u.role.as_deref()) == Some(role))
                .collect(),
            None => users,
        })
    }

    pub async fn get_by_id(&self, id: i32, caller: &Caller) -> AppResult<User> {
        caller.require_admin()?;
        self.repository.users.get_by_id(id).await
    }

    pub async fn create(&self, data: CreateUser, caller: &Caller) -> AppResult<User> {
        caller.require_admin()?;
        data.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let role = validated_role(data.role.as_deref())?.unwrap_or(Role::Employee);

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

        tracing::info!(user_id = user.id, created_by = caller.id, role = %role, "User created");
        Ok(user)
    }

    pub async fn update(&self, id: i32, data: UpdateUser, caller: &Caller) -> AppResult<User> {
        caller.require_admin()?;
        data.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        if let Some(ref name) = data.name {
            if name.trim().is_empty() {
                return Err(AppError::Validation("Name cannot be empty".to_string()));
            }
        }

        if let Some(ref email) = data.email {
            if self.repository.users.email_exists(email, Some(id)).await? {
                return Err(AppError::Conflict("Email already in use".to_string()));
            }
        }

        let role = validated_role(data.role.as_deref())?;
        let password_hash = match data.password {
            Some(ref password) => Some(hash_password(password)?),
            None => None,
        };

        let user = self
            .repository
            .users
            .update(id, &data, role.map(|r| r.as_str()), password_hash)
            .await?;

        tracing::info!(user_id = id, updated_by = caller.id, "User updated");
        Ok(user)
    }

    pub async fn can_delete(&self, id: i32, caller: &Caller) -> AppResult<DeletionCheck> {
        caller.require_admin()?;
        self.guard.can_delete_user(id).await
    }

    pub async fn delete(&self, id: i32, caller: &Caller) -> AppResult<()> {
        caller.require_admin()?;
        self.guard.delete_user(id).await
    }
}
