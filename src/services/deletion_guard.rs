//! Deletion guard for user accounts.
//!
//! A user is only removed when nothing in the inventory still points at them. Rules are checked
//! in order and the first failing one decides the outcome.

use async_trait::async_trait;

use crate::{
    error::{AppError, AppResult},
    models::{
        role::Role,
        user::{DeletionCheck, User},
    },
    repository::Repository,
};

/// Storage queries the guard depends on
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GuardStore: Send + Sync {
    async fn get_user(&self, user_id: i32) -> AppResult<User>;
    async fn count_incidents_involving(&self, user_id: i32) -> AppResult<i64>;
    async fn active_equipment_names(&self, user_id: i32) -> AppResult<Vec<String>>;
    async fn count_created_equipment(&self, user_id: i32) -> AppResult<i64>;
    async fn delete_user(&self, user_id: i32) -> AppResult<()>;
}

#[async_trait]
impl GuardStore for Repository {
    async fn get_user(&self, user_id: i32) -> AppResult<User> {
        self.users.get_by_id(user_id).await
    }

    async fn count_incidents_involving(&self, user_id: i32) -> AppResult<i64> {
        self.incidents.count_involving(user_id).await
    }

    async fn active_equipment_names(&self, user_id: i32) -> AppResult<Vec<String>> {
        self.assignments.active_equipment_names(user_id).await
    }

    async fn count_created_equipment(&self, user_id: i32) -> AppResult<i64> {
        self.equipment.count_created_by(user_id).await
    }

    async fn delete_user(&self, user_id: i32) -> AppResult<()> {
        self.users.delete(user_id).await
    }
}

/// Why a deletion is refused
#[derive(Debug, Clone, PartialEq, Eq)]
enum Refusal {
    Administrator,
    Dependencies(String),
}

impl From<Refusal> for AppError {
    fn from(refusal: Refusal) -> Self {
        match refusal {
            Refusal::Administrator => AppError::SecurityPolicy(ADMIN_REFUSAL.to_string()),
            Refusal::Dependencies(reason) => AppError::BusinessRule(reason),
        }
    }
}

const ADMIN_REFUSAL: &str = "Administrator accounts cannot be deleted";

#[derive(Clone)]
pub struct DeletionGuard<S = Repository> {
    store: S,
}

impl<S: GuardStore> DeletionGuard<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    async fn first_refusal(&self, user: &User) -> AppResult<Option<Refusal>> {
        if user.canonical_role() == Some(Role::Admin) {
            return Ok(Some(Refusal::Administrator));
        }

        let incidents = self.store.count_incidents_involving(user.id).await?;
        if incidents > 0 {
            return Ok(Some(Refusal::Dependencies(format!(
                "User is involved in {} incident(s)",
                incidents
            ))));
        }

        let equipment = self.store.active_equipment_names(user.id).await?;
        if !equipment.is_empty() {
            return Ok(Some(Refusal::Dependencies(format!(
                "User still holds equipment: {}",
                equipment.join(", ")
            ))));
        }

        let created = self.store.count_created_equipment(user.id).await?;
        if created > 0 {
            return Ok(Some(Refusal::Dependencies(format!(
                "User created {} equipment record(s)",
                created
            ))));
        }

        Ok(None)
    }

    /// Preview the guard decision without deleting anything
    pub async fn can_delete_user(&self, user_id: i32) -> AppResult<DeletionCheck> {
        let user = self.store.get_user(user_id).await?;

        let check = match self.first_refusal(&user).await? {
            None => DeletionCheck { allowed: true, reasons: Vec::new() },
            Some(Refusal::Administrator) => DeletionCheck {
                allowed: false,
                reasons: vec![ADMIN_REFUSAL.to_string()],
            },
            Some(Refusal::Dependencies(reason)) => DeletionCheck {
                allowed: false,
                reasons: vec![reason],
            },
        };
        Ok(check)
    }

    /// Delete the user permanently, unless a rule refuses it
    pub async fn delete_user(&self, user_id: i32) -> AppResult<()> {
        let user = self.store.get_user(user_id).await?;

        if let Some(refusal) = self.first_refusal(&user).await? {
            tracing::warn!(user_id, ?refusal, "User deletion refused");
            return Err(refusal.into());
        }

        self.store.delete_user(user_id).await?;
        tracing::info!(user_id, "User deleted");
        Ok(())
    }
}
