//! Role normalization and caller identity
//!
//! Role strings arrive from many places (registration forms, legacy records, admin edits) in
//! any case, with or without accents, in French or English. Every access decision goes through
//! [`normalize_role`] so the mapping lives in exactly one table.

use serde::{Deserialize, Serialize};
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};
use utoipa::ToSchema;

use crate::error::AppError;

/// Canonical roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Employee,
    Technician,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Employee => "employee",
            Role::Technician => "technician",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Synonym table, keyed on the lower-cased, accent-stripped spelling.
const ROLE_SYNONYMS: &[(&str, Role)] = &[
    ("employee", Role::Employee),
    ("employe", Role::Employee),
    ("technician", Role::Technician),
    ("technicien", Role::Technician),
    ("tech", Role::Technician),
    ("admin", Role::Admin),
    ("administrator", Role::Admin),
    ("administrateur", Role::Admin),
];

/// Result of normalizing a raw role string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleName {
    Known(Role),
    /// No synonym matched; holds the lower-cased trimmed input
    Other(String),
}

impl RoleName {
    pub fn role(&self) -> Option<Role> {
        match self {
            RoleName::Known(role) => Some(*role),
            RoleName::Other(_) => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RoleName::Known(role) => role.as_str(),
            RoleName::Other(raw) => raw.as_str(),
        }
    }
}

fn strip_accents(s: &str) -> String {
    s.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Map a free-form role string to its canonical role.
///
/// `None` means "no role" and is never confused with any canonical value.
pub fn normalize_role(raw: Option<&str>) -> Option<RoleName> {
    let raw = raw?;
    let lowered = raw.trim().to_lowercase();
    let key = strip_accents(&lowered);

    let name = ROLE_SYNONYMS
        .iter()
        .find(|(synonym, _)| *synonym == key)
        .map(|(_, role)| RoleName::Known(*role))
        .unwrap_or(RoleName::Other(lowered));

    Some(name)
}

/// Shorthand for call sites that only care about canonical roles
pub fn canonical_role(raw: Option<&str>) -> Option<Role> {
    normalize_role(raw).and_then(|name| name.role())
}

/// Authenticated caller, as resolved from the session token
#[derive(Debug, Clone)]
pub struct Caller {
    pub id: i32,
    pub role: Option<RoleName>,
}

impl Caller {
    pub fn new(id: i32, raw_role: Option<&str>) -> Self {
        Self {
            id,
            role: normalize_role(raw_role),
        }
    }

    pub fn role(&self) -> Option<Role> {
        self.role.as_ref().and_then(RoleName::role)
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Some(Role::Admin)
    }

    /// Technicians and admins manage the whole inventory
    pub fn is_staff(&self) -> bool {
        matches!(self.role(), Some(Role::Technician) | Some(Role::Admin))
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Authorization("Administrator privileges required".to_string()))
        }
    }

    pub fn require_staff(&self) -> Result<(), AppError> {
        if self.is_staff() {
            Ok(())
        } else {
            Err(AppError::Authorization("Technician or administrator privileges required".to_string()))
        }
    }
}

/// Read scope derived from the caller's role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Technicians and admins
    All,
    /// Employees: only records tied to their own id
    Own(i32),
    /// No role or an unrecognized one
    Nothing,
}

impl Visibility {
    pub fn for_caller(caller: &Caller) -> Self {
        match caller.role() {
            Some(Role::Technician) | Some(Role::Admin) => Visibility::All,
            Some(Role::Employee) => Visibility::Own(caller.id),
            None => Visibility::Nothing,
        }
    }

    /// Whether a record owned by `owner` (assignee or reporter) is in scope
    pub fn permits(&self, owner: Option<i32>) -> bool {
        match self {
            Visibility::All => true,
            Visibility::Own(id) => owner == Some(*id),
            Visibility::Nothing => false,
        }
    }
}
