//! Equipment model, embedded assignment history and lifecycle rules

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use utoipa::{IntoParams, ToSchema};

use super::assignment::AssignmentRecord;
use crate::error::AppError;

/// Equipment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "equipment_status", rename_all = "snake_case")]
pub enum EquipmentStatus {
    Available,
    Assigned,
    Broken,
    InMaintenance,
    Reserved,
}

/// Physical condition recorded when an assignment period starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "condition_state", rename_all = "snake_case")]
pub enum ConditionState {
    #[default]
    #[serde(rename = "Good condition")]
    GoodCondition,
    #[serde(rename = "New")]
    New,
    #[serde(rename = "Used")]
    Used,
    #[serde(rename = "Light scratches")]
    LightScratches,
    #[serde(rename = "Heavy scratches")]
    HeavyScratches,
    #[serde(rename = "Damaged screen")]
    DamagedScreen,
    #[serde(rename = "Faulty keyboard")]
    FaultyKeyboard,
    #[serde(rename = "Weak battery")]
    WeakBattery,
    #[serde(rename = "Under repair")]
    UnderRepair,
    #[serde(rename = "Other")]
    Other,
}

/// One assignment period, embedded in the equipment record.
///
/// A period is open while `end_date` is absent. Callers go through [`AssignmentPeriod::is_open`]
/// and [`AssignmentPeriod::close`] rather than inspecting the field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AssignmentPeriod {
    pub assigned_to: i32,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub condition: ConditionState,
}

impl AssignmentPeriod {
    pub fn open(assigned_to: i32, condition: ConditionState, at: DateTime<Utc>) -> Self {
        Self {
            assigned_to,
            start_date: at,
            end_date: None,
            condition,
        }
    }

    pub fn is_open(&self) -> bool {
        self.end_date.is_none()
    }

    /// Close the period; an end before the start is clamped to the start.
    pub fn close(&mut self, at: DateTime<Utc>) {
        if self.is_open() {
            self.end_date = Some(at.max(self.start_date));
        }
    }
}

/// Internal row structure for database queries
#[derive(Debug, Clone, FromRow)]
pub struct EquipmentRow {
    id: i32,
    name: String,
    equipment_type: String,
    serial_number: String,
    purchase_date: NaiveDate,
    status: EquipmentStatus,
    assigned_to: Option<i32>,
    created_by: i32,
    updated_by: Option<i32>,
    assignment_history: Json<Vec<AssignmentPeriod>>,
    crea_date: Option<DateTime<Utc>>,
    modif_date: Option<DateTime<Utc>>,
}

impl From<EquipmentRow> for Equipment {
    fn from(row: EquipmentRow) -> Self {
        Equipment {
            id: row.id,
            name: row.name,
            equipment_type: row.equipment_type,
            serial_number: row.serial_number,
            purchase_date: row.purchase_date,
            status: row.status,
            assigned_to: row.assigned_to,
            created_by: row.created_by,
            updated_by: row.updated_by,
            assignment_history: row.assignment_history.0,
            crea_date: row.crea_date,
            modif_date: row.modif_date,
        }
    }
}

/// Equipment record
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Equipment {
    pub id: i32,
    pub name: String,
    #[serde(rename = "type")]
    pub equipment_type: String,
    /// Trimmed, upper-cased, unique
    pub serial_number: String,
    pub purchase_date: NaiveDate,
    pub status: EquipmentStatus,
    /// Current holder, always an employee
    pub assigned_to: Option<i32>,
    pub created_by: i32,
    pub updated_by: Option<i32>,
    /// Ordered, append-only
    pub assignment_history: Vec<AssignmentPeriod>,
    pub crea_date: Option<DateTime<Utc>>,
    pub modif_date: Option<DateTime<Utc>>,
}

/// Net effect of an assignment change on the history, mirrored into the registry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentEffect {
    pub closed: Option<AssignmentPeriod>,
    pub opened: Option<AssignmentPeriod>,
}

impl AssignmentEffect {
    pub fn is_noop(&self) -> bool {
        self.closed.is_none() && self.opened.is_none()
    }
}

impl Equipment {
    pub fn open_period(&self) -> Option<&AssignmentPeriod> {
        self.assignment_history.iter().rev().find(|p| p.is_open())
    }

    pub fn open_period_count(&self) -> usize {
        self.assignment_history.iter().filter(|p| p.is_open()).count()
    }

    /// Close every open period. More than one should never exist, but all are closed so a
    /// damaged history converges back to the invariant.
    fn close_open_periods(&mut self, at: DateTime<Utc>) -> Option<AssignmentPeriod> {
        let mut closed = None;
        for period in self.assignment_history.iter_mut().filter(|p| p.is_open()) {
            period.close(at);
            closed = Some(period.clone());
        }
        closed
    }

    /// Hand the equipment to `employee_id`, rotating the open period.
    ///
    /// Reassigning to the current holder leaves the history untouched.
    pub fn reassign(
        &mut self,
        employee_id: i32,
        condition: ConditionState,
        at: DateTime<Utc>,
    ) -> AssignmentEffect {
        let already_held = self.assigned_to == Some(employee_id)
            && self.open_period().map(|p| p.assigned_to) == Some(employee_id)
            && self.open_period_count() == 1;
        if already_held {
            self.status = EquipmentStatus::Assigned;
            return AssignmentEffect::default();
        }

        let closed = self.close_open_periods(at);
        let opened = AssignmentPeriod::open(employee_id, condition, at);
        self.assignment_history.push(opened.clone());
        self.assigned_to = Some(employee_id);
        self.status = EquipmentStatus::Assigned;

        AssignmentEffect {
            closed,
            opened: Some(opened),
        }
    }

    /// Take the equipment back from its holder
    pub fn unassign(&mut self, at: DateTime<Utc>) -> AssignmentEffect {
        let closed = self.close_open_periods(at);
        self.assigned_to = None;
        self.status = EquipmentStatus::Available;

        AssignmentEffect {
            closed,
            opened: None,
        }
    }

    /// Apply an explicit status from an update payload.
    ///
    /// Broken, InMaintenance and Reserved are orthogonal to assignment. Assigned and Available
    /// must agree with the current holder.
    pub fn set_status(&mut self, status: EquipmentStatus) -> Result<(), AppError> {
        match status {
            EquipmentStatus::Assigned if self.assigned_to.is_none() => Err(AppError::Validation(
                "Status Assigned requires an assigned employee".to_string(),
            )),
            EquipmentStatus::Available if self.assigned_to.is_some() => Err(AppError::Validation(
                "Status Available requires the equipment to be unassigned".to_string(),
            )),
            _ => {
                self.status = status;
                Ok(())
            }
        }
    }

    /// Whether the assignment bookkeeping of this record is internally consistent
    pub fn assignment_consistent(&self) -> bool {
        match (self.open_period_count(), self.open_period(), self.assigned_to) {
            (0, _, None) => true,
            (1, Some(period), Some(holder)) => period.assigned_to == holder,
            _ => false,
        }
    }
}

/// Trim a serial number and upper-case it
pub fn normalize_serial(serial: &str) -> String {
    serial.trim().to_uppercase()
}

/// Assignment part of a create/update payload
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AssignmentRequest {
    /// Target employee; absent or null means "unassign" on update
    #[serde(alias = "employeeId")]
    pub employee_id: Option<i32>,
    #[serde(default, alias = "etat")]
    pub condition: Option<ConditionState>,
}

impl AssignmentRequest {
    pub fn target(&self) -> Option<(i32, ConditionState)> {
        self.employee_id
            .map(|id| (id, self.condition.unwrap_or_default()))
    }
}

/// Create equipment request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateEquipment {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub equipment_type: Option<String>,
    #[serde(alias = "serial", alias = "serialNumber")]
    pub serial_number: Option<String>,
    #[serde(alias = "purchaseDate")]
    pub purchase_date: Option<NaiveDate>,
    pub assignment: Option<AssignmentRequest>,
}

/// Validated create request
#[derive(Debug, Clone)]
pub struct NewEquipment {
    pub name: String,
    pub equipment_type: String,
    pub serial_number: String,
    pub purchase_date: NaiveDate,
    pub assignment: Option<(i32, ConditionState)>,
}

impl CreateEquipment {
    /// Check required fields and normalize them
    pub fn validate_required(self) -> Result<NewEquipment, AppError> {
        let required = |value: Option<String>| value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        match (
            required(self.name),
            required(self.equipment_type),
            required(self.serial_number),
            self.purchase_date,
        ) {
            (Some(name), Some(equipment_type), Some(serial), Some(purchase_date)) => Ok(NewEquipment {
                name,
                equipment_type,
                serial_number: normalize_serial(&serial),
                purchase_date,
                assignment: self.assignment.as_ref().and_then(AssignmentRequest::target),
            }),
            _ => Err(AppError::Validation(
                "Fields name, type, serial_number and purchase_date are required".to_string(),
            )),
        }
    }
}

/// Update equipment request
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateEquipment {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub equipment_type: Option<String>,
    #[serde(alias = "serial", alias = "serialNumber")]
    pub serial_number: Option<String>,
    #[serde(alias = "purchaseDate")]
    pub purchase_date: Option<NaiveDate>,
    pub status: Option<EquipmentStatus>,
    /// Absent: keep the current holder. Null or without employee: unassign.
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<AssignmentRequest>)]
    pub assignment: Option<Option<AssignmentRequest>>,
}

/// Assignment change requested by an update payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentChange {
    Keep,
    Assign { employee_id: i32, condition: ConditionState },
    Unassign,
}

impl UpdateEquipment {
    pub fn assignment_change(&self) -> AssignmentChange {
        match &self.assignment {
            None => AssignmentChange::Keep,
            Some(request) => match request.as_ref().and_then(AssignmentRequest::target) {
                Some((employee_id, condition)) => AssignmentChange::Assign { employee_id, condition },
                None => AssignmentChange::Unassign,
            },
        }
    }
}

/// Equipment creation result
#[derive(Debug, Serialize, ToSchema)]
pub struct EquipmentCreated {
    pub equipment: Equipment,
    pub assignment: Option<AssignmentRecord>,
}

/// Equipment list query
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct EquipmentQuery {
    pub status: Option<EquipmentStatus>,
}
