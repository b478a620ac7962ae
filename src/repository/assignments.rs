//! Assignment registry repository.
//!
//! Registry rows are only written from inside an equipment transaction, through
//! [`insert_open`] and [`close_open`], so the registry never drifts from the embedded history.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::AppResult,
    models::{
        assignment::{AssignmentQuery, AssignmentRecord},
        equipment::AssignmentPeriod,
        role::Visibility,
    },
};

use super::scope_condition;

#[derive(Clone)]
pub struct AssignmentsRepository {
    pool: Pool<Postgres>,
}

impl AssignmentsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List registry records within the caller's scope
    pub async fn list(&self, query: &AssignmentQuery, visibility: Visibility) -> AppResult<Vec<AssignmentRecord>> {
        let (scope, owner) = scope_condition(visibility, "employee_id", 4);

        let sql = format!(
            r#"
            SELECT * FROM assignments
            WHERE ($1::int IS NULL OR equipment_id = $1)
              AND ($2::int IS NULL OR employee_id = $2)
              AND (NOT $3 OR end_date IS NULL)
              AND {}
            ORDER BY start_date DESC, id DESC
            "#,
            scope
        );

        let mut builder = sqlx::query_as::<_, AssignmentRecord>(&sql)
            .bind(query.equipment_id)
            .bind(query.employee_id)
            .bind(query.active_only.unwrap_or(false));
        if let Some(owner) = owner {
            builder = builder.bind(owner);
        }

        Ok(builder.fetch_all(&self.pool).await?)
    }

    /// Names of the equipment an employee currently holds
    pub async fn active_equipment_names(&self, employee_id: i32) -> AppResult<Vec<String>> {
        let names = sqlx::query_scalar::<_, String>(
            r#"
            SELECT COALESCE(e.name, a.equipment_name)
            FROM assignments a
            LEFT JOIN equipment e ON e.id = a.equipment_id
            WHERE a.employee_id = $1 AND a.end_date IS NULL
            ORDER BY a.start_date
            "#,
        )
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(names)
    }
}

/// Insert the registry mirror of a freshly opened period
pub async fn insert_open(
    conn: &mut PgConnection,
    equipment_id: i32,
    equipment_name: &str,
    period: &AssignmentPeriod,
    created_by: i32,
) -> AppResult<AssignmentRecord> {
    let record = sqlx::query_as::<_, AssignmentRecord>(
        r#"
        INSERT INTO assignments (employee_id, equipment_id, equipment_name, start_date, condition, created_by)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(period.assigned_to)
    .bind(equipment_id)
    .bind(equipment_name)
    .bind(period.start_date)
    .bind(period.condition)
    .bind(created_by)
    .fetch_one(&mut *conn)
    .await?;
    Ok(record)
}

/// Close whatever registry record is open for the equipment. Returns the number closed.
pub async fn close_open(
    conn: &mut PgConnection,
    equipment_id: i32,
    at: DateTime<Utc>,
    closed_by: i32,
) -> AppResult<u64> {
    let result = sqlx::query(
        r#"
        UPDATE assignments
        SET end_date = GREATEST($2, start_date), closed_by = $3
        WHERE equipment_id = $1 AND end_date IS NULL
        "#,
    )
    .bind(equipment_id)
    .bind(at)
    .bind(closed_by)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected())
}
