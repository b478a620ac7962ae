//! Users repository for database operations

use chrono::Utc;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::user::{UpdateUser, User, UserQuery, UserShort},
};

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Get user by email (authentication)
    pub async fn get_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Check if email already exists
    pub async fn email_exists(&self, email: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1) AND ($2::int IS NULL OR id != $2))",
        )
        .bind(email.trim())
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// List users, optionally filtered by name or email
    pub async fn list(&self, query: &UserQuery) -> AppResult<Vec<UserShort>> {
        let pattern = query
            .name
            .as_ref()
            .map(|name| format!("%{}%", name.trim().to_lowercase()));

        let users = sqlx::query_as::<_, UserShort>(
            r#"
            SELECT id, name, email, role, is_active
            FROM users
            WHERE $1::text IS NULL OR LOWER(name) LIKE $1 OR LOWER(email) LIKE $1
            ORDER BY name
            "#,
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// Create a new user
    pub async fn create(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        role: &str,
        department: Option<&str>,
    ) -> AppResult<User> {
        let now = Utc::now();

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password, role, department, is_active, crea_date, modif_date)
            VALUES ($1, $2, $3, $4, $5, TRUE, $6, $6)
            RETURNING *
            "#,
        )
        .bind(name.trim())
        .bind(email.trim().to_lowercase())
        .bind(password_hash)
        .bind(role)
        .bind(department)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    /// Update an existing user. `role` is the already-normalized canonical role.
    pub async fn update(
        &self,
        id: i32,
        user: &UpdateUser,
        role: Option<&str>,
        password_hash: Option<String>,
    ) -> AppResult<User> {
        let now = Utc::now();
        let email = user.email.as_ref().map(|e| e.trim().to_lowercase());
        let name = user.name.as_ref().map(|n| n.trim().to_string());

        // Build dynamic update query
        let mut sets = vec!["modif_date = $1".to_string()];
        let mut param_idx = 2;

        macro_rules! add_field {
            ($field:expr, $name:expr) => {
                if $field.is_some() {
                    sets.push(format!("{} = ${}", $name, param_idx));
                    param_idx += 1;
                }
            };
        }

        add_field!(name, "name");
        add_field!(email, "email");
        add_field!(role, "role");
        add_field!(user.department, "department");
        add_field!(user.is_active, "is_active");
        add_field!(password_hash, "password");

        let query = format!(
            "UPDATE users SET {} WHERE id = ${} RETURNING *",
            sets.join(", "),
            param_idx
        );

        let mut builder = sqlx::query_as::<_, User>(&query).bind(now);

        macro_rules! bind_field {
            ($field:expr) => {
                if let Some(ref val) = $field {
                    builder = builder.bind(val);
                }
            };
        }

        bind_field!(name);
        bind_field!(email);
        bind_field!(role);
        bind_field!(user.department);
        bind_field!(user.is_active);
        bind_field!(password_hash);

        builder
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Distinct raw role values in use
    pub async fn distinct_roles(&self) -> AppResult<Vec<String>> {
        let roles = sqlx::query_scalar::<_, String>("SELECT DISTINCT role FROM users WHERE role IS NOT NULL")
            .fetch_all(&self.pool)
            .await?;
        Ok(roles)
    }

    /// Stamp a successful login
    pub async fn touch_last_login(&self, id: i32) -> AppResult<()> {
        sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Permanently delete a user
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }
        Ok(())
    }
}
