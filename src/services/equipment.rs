//! Equipment lifecycle service

use chrono::{DateTime, Utc};

use crate::{
    error::{AppError, AppResult},
    models::{
        equipment::{
            normalize_serial, AssignmentChange, AssignmentEffect, CreateEquipment, Equipment, EquipmentCreated,
            EquipmentQuery, EquipmentStatus, UpdateEquipment,
        },
        role::{Caller, Role, Visibility},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct EquipmentService {
    repository: Repository,
}

impl EquipmentService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self, query: &EquipmentQuery, caller: &Caller) -> AppResult<Vec<Equipment>> {
        self.repository
            .equipment
            .list(Visibility::for_caller(caller), query)
            .await
    }

    /// Get one equipment; out-of-scope equipment looks exactly like missing equipment
    pub async fn get(&self, id: i32, caller: &Caller) -> AppResult<Equipment> {
        let equipment = self.repository.equipment.get_by_id(id).await?;

        if !Visibility::for_caller(caller).permits(equipment.assigned_to) {
            return Err(AppError::NotFound(format!("Equipment {} not found", id)));
        }
        Ok(equipment)
    }

    pub async fn create(&self, data: CreateEquipment, caller: &Caller) -> AppResult<EquipmentCreated> {
        caller.require_staff()?;
        let data = data.validate_required()?;

        if self.repository.equipment.serial_exists(&data.serial_number, None).await? {
            return Err(AppError::Conflict("Serial number already exists".to_string()));
        }

        if let Some((employee_id, _)) = data.assignment {
            self.check_assignee(employee_id).await?;
        }

        let (equipment, assignment) = self.repository.equipment.create(&data, caller.id).await?;

        tracing::info!(
            equipment_id = equipment.id,
            serial = %equipment.serial_number,
            assigned_to = ?equipment.assigned_to,
            created_by = caller.id,
            "Equipment created"
        );
        Ok(EquipmentCreated { equipment, assignment })
    }

    pub async fn update(&self, id: i32, data: UpdateEquipment, caller: &Caller) -> AppResult<Equipment> {
        caller.require_staff()?;

        let fields = FieldChanges::from_payload(&data)?;

        if let Some(ref serial) = fields.serial_number {
            if self.repository.equipment.serial_exists(serial, Some(id)).await? {
                return Err(AppError::Conflict("Serial number already exists".to_string()));
            }
        }

        let change = data.assignment_change();
        if let AssignmentChange::Assign { employee_id, .. } = change {
            self.check_assignee(employee_id).await?;
        }

        let status = data.status;
        let now = Utc::now();

        let equipment = self
            .repository
            .equipment
            .update_locked(id, caller.id, move |equipment| {
                apply_update(equipment, fields, change, status, now)
            })
            .await?;

        tracing::info!(
            equipment_id = id,
            status = ?equipment.status,
            assigned_to = ?equipment.assigned_to,
            updated_by = caller.id,
            "Equipment updated"
        );
        Ok(equipment)
    }

    pub async fn delete(&self, id: i32, caller: &Caller) -> AppResult<()> {
        caller.require_admin()?;

        let equipment = self.repository.equipment.delete(id, caller.id).await?;

        tracing::info!(
            equipment_id = id,
            serial = %equipment.serial_number,
            deleted_by = caller.id,
            "Equipment deleted"
        );
        Ok(())
    }

    /// Equipment can only be handed to an existing employee
    async fn check_assignee(&self, employee_id: i32) -> AppResult<()> {
        let target = self.repository.users.get_by_id(employee_id).await?;
        if target.canonical_role() != Some(Role::Employee) {
            return Err(AppError::Authorization(format!(
                "User {} is not an employee and cannot hold equipment",
                employee_id
            )));
        }
        Ok(())
    }
}

/// Apply field edits, then the assignment change, then an explicit status.
///
/// Works on a copy: when any step fails the locked record is left exactly as it was.
fn apply_update(
    equipment: &mut Equipment,
    fields: FieldChanges,
    change: AssignmentChange,
    status: Option<EquipmentStatus>,
    at: DateTime<Utc>,
) -> AppResult<AssignmentEffect> {
    let mut next = equipment.clone();
    fields.apply(&mut next);

    let rotates = !matches!(change, AssignmentChange::Keep);
    let effect = match change {
        AssignmentChange::Keep => AssignmentEffect::default(),
        AssignmentChange::Assign { employee_id, condition } => next.reassign(employee_id, condition, at),
        AssignmentChange::Unassign => next.unassign(at),
    };

    if rotates && !next.assignment_consistent() {
        return Err(AppError::Internal(format!(
            "Equipment {} has inconsistent assignment state after update",
            next.id
        )));
    }

    if let Some(status) = status {
        next.set_status(status)?;
    }

    *equipment = next;
    Ok(effect)
}

/// Scalar field edits from an update payload, trimmed and checked
#[derive(Debug, Default)]
struct FieldChanges {
    name: Option<String>,
    equipment_type: Option<String>,
    serial_number: Option<String>,
    purchase_date: Option<chrono::NaiveDate>,
}

impl FieldChanges {
    fn from_payload(data: &UpdateEquipment) -> AppResult<Self> {
        let non_blank = |value: &Option<String>, field: &str| -> AppResult<Option<String>> {
            match value.as_deref().map(str::trim) {
                None => Ok(None),
                Some("") => Err(AppError::Validation(format!("Field {} cannot be empty", field))),
                Some(v) => Ok(Some(v.to_string())),
            }
        };

        Ok(Self {
            name: non_blank(&data.name, "name")?,
            equipment_type: non_blank(&data.equipment_type, "type")?,
            serial_number: non_blank(&data.serial_number, "serial_number")?.map(|s| normalize_serial(&s)),
            purchase_date: data.purchase_date,
        })
    }

    fn apply(self, equipment: &mut Equipment) {
        if let Some(name) = self.name {
            equipment.name = name;
        }
        if let Some(equipment_type) = self.equipment_type {
            equipment.equipment_type = equipment_type;
        }
        if let Some(serial_number) = self.serial_number {
            equipment.serial_number = serial_number;
        }
        if let Some(purchase_date) = self.purchase_date {
            equipment.purchase_date = purchase_date;
        }
    }
}
