//! Equipment ledger repository
//!
//! Every write that touches assignment state runs in one transaction holding the equipment row
//! lock, and mirrors the embedded history into the registry before committing.

use chrono::Utc;
use sqlx::{types::Json, PgConnection, Pool, Postgres};

use super::{assignments, scope_condition};
use crate::{
    error::{AppError, AppResult},
    models::{
        assignment::AssignmentRecord,
        equipment::{
            AssignmentEffect, Equipment, EquipmentQuery, EquipmentRow, EquipmentStatus,
            NewEquipment,
        },
        role::Visibility,
    },
};

#[derive(Clone)]
pub struct EquipmentRepository {
    pool: Pool<Postgres>,
}

impl EquipmentRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List equipment within the caller's scope, newest first
    pub async fn list(&self, visibility: Visibility, query: &EquipmentQuery) -> AppResult<Vec<Equipment>> {
        let (scope, owner) = scope_condition(visibility, "assigned_to", 2);
        let sql = format!(
            "SELECT * FROM equipment WHERE ($1::equipment_status IS NULL OR status = $1) AND {} ORDER BY crea_date DESC, id DESC",
            scope
        );

        let mut builder = sqlx::query_as::<_, EquipmentRow>(&sql).bind(query.status);
        if let Some(owner) = owner {
            builder = builder.bind(owner);
        }

        let rows = builder.fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Equipment::from).collect())
    }

    /// Get equipment by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Equipment> {
        sqlx::query_as::<_, EquipmentRow>("SELECT * FROM equipment WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Equipment::from)
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
    }

    /// Check whether a normalized serial number is taken by another equipment
    pub async fn serial_exists(&self, serial: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM equipment WHERE serial_number = $1 AND ($2::int IS NULL OR id != $2))",
        )
        .bind(serial)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Create equipment, with its first assignment period when one is requested
    pub async fn create(
        &self,
        data: &NewEquipment,
        created_by: i32,
    ) -> AppResult<(Equipment, Option<AssignmentRecord>)> {
        let now = Utc::now();
        let mut template = Equipment {
            id: 0,
            name: data.name.clone(),
            equipment_type: data.equipment_type.clone(),
            serial_number: data.serial_number.clone(),
            purchase_date: data.purchase_date,
            status: EquipmentStatus::Available,
            assigned_to: None,
            created_by,
            updated_by: None,
            assignment_history: Vec::new(),
            crea_date: Some(now),
            modif_date: Some(now),
        };
        let effect = match data.assignment {
            Some((employee_id, condition)) => template.reassign(employee_id, condition, now),
            None => AssignmentEffect::default(),
        };

        let mut tx = self.pool.begin().await?;

        let equipment: Equipment = sqlx::query_as::<_, EquipmentRow>(
            r#"
            INSERT INTO equipment (
                name, equipment_type, serial_number, purchase_date, status,
                assigned_to, created_by, assignment_history, crea_date, modif_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            RETURNING *
            "#,
        )
        .bind(&template.name)
        .bind(&template.equipment_type)
        .bind(&template.serial_number)
        .bind(template.purchase_date)
        .bind(template.status)
        .bind(template.assigned_to)
        .bind(created_by)
        .bind(Json(&template.assignment_history))
        .bind(now)
        .fetch_one(&mut *tx)
        .await?
        .into();

        let record = mirror_effect(&mut tx, &equipment, &effect, created_by).await?;

        tx.commit().await?;

        Ok((equipment, record))
    }

    /// Lock the equipment row, let `mutate` change it, then persist the ledger and mirror the
    /// assignment effect into the registry in the same transaction.
    ///
    /// Any error from `mutate` or from the writes rolls everything back.
    pub async fn update_locked<F>(&self, id: i32, updated_by: i32, mutate: F) -> AppResult<Equipment>
    where
        F: FnOnce(&mut Equipment) -> AppResult<AssignmentEffect> + Send,
    {
        let mut tx = self.pool.begin().await?;

        let mut equipment: Equipment =
            sqlx::query_as::<_, EquipmentRow>("SELECT * FROM equipment WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .map(Equipment::from)
                .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))?;

        let effect = mutate(&mut equipment)?;

        let saved: Equipment = sqlx::query_as::<_, EquipmentRow>(
            r#"
            UPDATE equipment SET
                name = $1, equipment_type = $2, serial_number = $3, purchase_date = $4,
                status = $5, assigned_to = $6, updated_by = $7, assignment_history = $8,
                modif_date = $9
            WHERE id = $10
            RETURNING *
            "#,
        )
        .bind(&equipment.name)
        .bind(&equipment.equipment_type)
        .bind(&equipment.serial_number)
        .bind(equipment.purchase_date)
        .bind(equipment.status)
        .bind(equipment.assigned_to)
        .bind(updated_by)
        .bind(Json(&equipment.assignment_history))
        .bind(Utc::now())
        .bind(id)
        .fetch_one(&mut *tx)
        .await?
        .into();

        mirror_effect(&mut tx, &saved, &effect, updated_by).await?;

        tx.commit().await?;

        Ok(saved)
    }

    /// Delete equipment. Open registry records are closed first; closed history is kept.
    pub async fn delete(&self, id: i32, deleted_by: i32) -> AppResult<Equipment> {
        let mut tx = self.pool.begin().await?;

        let equipment: Equipment = sqlx::query_as::<_, EquipmentRow>("DELETE FROM equipment WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .map(Equipment::from)
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))?;

        assignments::close_open(&mut tx, id, Utc::now(), deleted_by).await?;

        tx.commit().await?;

        Ok(equipment)
    }

    /// Count equipment created by a user (deletion guard)
    pub async fn count_created_by(&self, user_id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM equipment WHERE created_by = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Write the registry side of an assignment effect
async fn mirror_effect(
    conn: &mut PgConnection,
    equipment: &Equipment,
    effect: &AssignmentEffect,
    actor: i32,
) -> AppResult<Option<AssignmentRecord>> {
    if let Some(end) = effect.closed.as_ref().and_then(|period| period.end_date) {
        assignments::close_open(conn, equipment.id, end, actor).await?;
    }

    match effect.opened {
        Some(ref period) => {
            let record = assignments::insert_open(conn, equipment.id, &equipment.name, period, actor).await?;
            Ok(Some(record))
        }
        None => Ok(None),
    }
}
