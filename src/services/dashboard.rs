//! Dashboard service: inventory-wide counts for staff

use std::collections::BTreeMap;

use crate::{
    error::AppResult,
    models::{
        equipment::EquipmentStatus,
        incident::IncidentStatus,
        role::{normalize_role, Caller},
        stats::{Dashboard, IncidentSummary, StatEntry},
    },
    repository::Repository,
};

/// How many incidents the dashboard lists
const DASHBOARD_INCIDENTS: i64 = 5;

#[derive(Clone)]
pub struct DashboardService {
    repository: Repository,
}

impl DashboardService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Counts across the whole inventory, so technicians and admins only
    pub async fn get_dashboard(&self, caller: &Caller) -> AppResult<Dashboard> {
        caller.require_staff()?;

        let pool = &self.repository.pool;

        let equipment_by_status = sqlx::query_as::<_, (EquipmentStatus, i64)>(
            "SELECT status, COUNT(*) FROM equipment GROUP BY status ORDER BY status",
        )
        .fetch_all(pool)
        .await?;

        let users_by_role = sqlx::query_as::<_, (Option<String>, i64)>(
            "SELECT role, COUNT(*) FROM users GROUP BY role",
        )
        .fetch_all(pool)
        .await?;

        let incidents_by_status = sqlx::query_as::<_, (IncidentStatus, i64)>(
            "SELECT status, COUNT(*) FROM incidents GROUP BY status ORDER BY status",
        )
        .fetch_all(pool)
        .await?;

        let recent_incidents = sqlx::query_as::<_, IncidentSummary>(
            r#"
            SELECT id, title, status, priority, assigned_to, crea_date
            FROM incidents
            ORDER BY crea_date DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(DASHBOARD_INCIDENTS)
        .fetch_all(pool)
        .await?;

        Ok(Dashboard {
            total_equipment: equipment_by_status.iter().map(|(_, count)| count).sum(),
            equipment_by_status: equipment_by_status
                .into_iter()
                .map(|(status, count)| StatEntry::new(&status, count))
                .collect(),
            total_users: users_by_role.iter().map(|(_, count)| count).sum(),
            users_by_role: count_by_role(users_by_role),
            total_incidents: incidents_by_status.iter().map(|(_, count)| count).sum(),
            incidents_by_status: incidents_by_status
                .into_iter()
                .map(|(status, count)| StatEntry::new(&status, count))
                .collect(),
            recent_incidents,
        })
    }
}

/// Merge stored role spellings into their canonical buckets
fn count_by_role(rows: Vec<(Option<String>, i64)>) -> Vec<StatEntry> {
    let mut buckets: BTreeMap<String, i64> = BTreeMap::new();
    for (raw, count) in rows {
        let label = match normalize_role(raw.as_deref()) {
            Some(name) if !name.as_str().is_empty() => name.as_str().to_string(),
            _ => "none".to_string(),
        };
        *buckets.entry(label).or_default() += count;
    }

    buckets
        .into_iter()
        .map(|(label, count)| StatEntry { label, count })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_spellings_are_merged() {
        let rows = vec![
            (Some("Employé".to_string()), 3),
            (Some("employee".to_string()), 2),
            (Some("Technicien".to_string()), 1),
            (Some("Administrateur".to_string()), 1),
            (Some("Stagiaire".to_string()), 1),
            (None, 2),
            (Some("  ".to_string()), 1),
        ];

        let entries = count_by_role(rows);
        let count = |label: &str| entries.iter().find(|e| e.label == label).map(|e| e.count);

        assert_eq!(count("employee"), Some(5));
        assert_eq!(count("technician"), Some(1));
        assert_eq!(count("admin"), Some(1));
        assert_eq!(count("stagiaire"), Some(1));
        assert_eq!(count("none"), Some(3));
        assert_eq!(entries.len(), 5);
    }
}
