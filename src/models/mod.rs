//! Data models for AssetDesk

pub mod assignment;
pub mod equipment;
pub mod incident;
pub mod role;
pub mod stats;
pub mod user;

// Re-export commonly used types
pub use assignment::AssignmentRecord;
pub use equipment::{Equipment, EquipmentStatus};
pub use incident::{Incident, IncidentDetails};
pub use role::{Caller, Role, Visibility};
pub use user::{User, UserShort};
