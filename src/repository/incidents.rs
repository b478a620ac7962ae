//! Incidents repository for database operations

use chrono::Utc;
use sqlx::{Pool, Postgres};

use super::scope_condition;
use crate::{
    error::{AppError, AppResult},
    models::{
        incident::{Incident, IncidentPriority, IncidentStats, IncidentStatus, NewIncident},
        role::Visibility,
        stats::StatEntry,
    },
};

#[derive(Clone)]
pub struct IncidentsRepository {
    pool: Pool<Postgres>,
}

impl IncidentsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List incidents within the caller's scope, newest first
    pub async fn list(&self, visibility: Visibility, limit: Option<i64>) -> AppResult<Vec<Incident>> {
        let (scope, owner) = scope_condition(visibility, "reported_by", 2);
        let sql = format!(
            "SELECT * FROM incidents WHERE {} ORDER BY crea_date DESC, id DESC LIMIT $1",
            scope
        );

        let mut builder = sqlx::query_as::<_, Incident>(&sql).bind(limit);
        if let Some(owner) = owner {
            builder = builder.bind(owner);
        }

        Ok(builder.fetch_all(&self.pool).await?)
    }

    /// Get incident by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Incident> {
        sqlx::query_as::<_, Incident>("SELECT * FROM incidents WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Incident {} not found", id)))
    }

    /// Create an incident; status is always New
    pub async fn create(&self, data: &NewIncident, reported_by: i32) -> AppResult<Incident> {
        let now = Utc::now();

        let incident = sqlx::query_as::<_, Incident>(
            r#"
            INSERT INTO incidents (title, description, equipment_id, status, priority, reported_by, notes, crea_date, modif_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING *
            "#,
        )
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.equipment_id)
        .bind(IncidentStatus::New)
        .bind(data.priority)
        .bind(reported_by)
        .bind(&data.notes)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(incident)
    }

    /// Lock the incident row, let `mutate` change it, then write it back in the same transaction.
    ///
    /// Concurrent updates of one incident are serialized, so none of them is lost.
    pub async fn update_locked<F>(&self, id: i32, mutate: F) -> AppResult<Incident>
    where
        F: FnOnce(&mut Incident) -> AppResult<()> + Send,
    {
        let mut tx = self.pool.begin().await?;

        let mut incident = sqlx::query_as::<_, Incident>("SELECT * FROM incidents WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Incident {} not found", id)))?;

        mutate(&mut incident)?;

        let saved = sqlx::query_as::<_, Incident>(
            r#"
            UPDATE incidents SET
                title = $1, description = $2, status = $3, priority = $4, assigned_to = $5,
                resolved_by = $6, resolved_at = $7, notes = $8, modif_date = $9
            WHERE id = $10
            RETURNING *
            "#,
        )
        .bind(&incident.title)
        .bind(&incident.description)
        .bind(incident.status)
        .bind(incident.priority)
        .bind(incident.assigned_to)
        .bind(incident.resolved_by)
        .bind(incident.resolved_at)
        .bind(&incident.notes)
        .bind(Utc::now())
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(saved)
    }

    /// Set or clear the assignee
    pub async fn set_assignee(&self, id: i32, assigned_to: Option<i32>) -> AppResult<Incident> {
        sqlx::query_as::<_, Incident>(
            "UPDATE incidents SET assigned_to = $1, modif_date = $2 WHERE id = $3 RETURNING *",
        )
        .bind(assigned_to)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Incident {} not found", id)))
    }

    /// Delete an incident
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM incidents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Incident {} not found", id)));
        }
        Ok(())
    }

    /// Counts by status and priority within the caller's scope
    pub async fn stats(&self, visibility: Visibility) -> AppResult<IncidentStats> {
        let (scope, owner) = scope_condition(visibility, "reported_by", 1);

        let by_status_sql = format!(
            "SELECT status, COUNT(*) FROM incidents WHERE {} GROUP BY status ORDER BY status",
            scope
        );
        let mut by_status = sqlx::query_as::<_, (IncidentStatus, i64)>(&by_status_sql);
        if let Some(owner) = owner {
            by_status = by_status.bind(owner);
        }
        let by_status = by_status.fetch_all(&self.pool).await?;

        let by_priority_sql = format!(
            "SELECT priority, COUNT(*) FROM incidents WHERE {} GROUP BY priority ORDER BY priority",
            scope
        );
        let mut by_priority = sqlx::query_as::<_, (IncidentPriority, i64)>(&by_priority_sql);
        if let Some(owner) = owner {
            by_priority = by_priority.bind(owner);
        }
        let by_priority = by_priority.fetch_all(&self.pool).await?;

        let total = by_status.iter().map(|(_, count)| count).sum();

        Ok(IncidentStats {
            total,
            by_status: by_status
                .into_iter()
                .map(|(status, count)| StatEntry::new(&status, count))
                .collect(),
            by_priority: by_priority
                .into_iter()
                .map(|(priority, count)| StatEntry::new(&priority, count))
                .collect(),
        })
    }

    /// Count incidents a user reported or is assigned to (deletion guard)
    pub async fn count_involving(&self, user_id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM incidents WHERE reported_by = $1 OR assigned_to = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
