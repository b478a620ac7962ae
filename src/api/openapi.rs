//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{assignments, auth, dashboard, equipment, health, incidents, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "AssetDesk API",
        version = "1.0.0",
        description = "IT asset management REST API: equipment, assignments and incidents"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::login,
        auth::register,
        auth::me,
        // Users
        users::list_users,
        users::get_user,
        users::create_user,
        users::update_user,
        users::delete_user,
        users::can_delete_user,
        // Equipment
        equipment::list_equipment,
        equipment::get_equipment,
        equipment::create_equipment,
        equipment::update_equipment,
        equipment::delete_equipment,
        // Assignments
        assignments::list_assignments,
        // Incidents
        incidents::list_incidents,
        incidents::recent_incidents,
        incidents::incident_stats,
        incidents::get_incident,
        incidents::create_incident,
        incidents::update_incident,
        incidents::assign_incident,
        incidents::delete_incident,
        // Dashboard
        dashboard::get_dashboard,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            auth::UserInfo,
            // Users
            crate::models::user::User,
            crate::models::user::UserShort,
            crate::models::user::UserQuery,
            crate::models::user::RegisterUser,
            crate::models::user::CreateUser,
            crate::models::user::UpdateUser,
            crate::models::user::DeletionCheck,
            crate::models::role::Role,
            // Equipment
            crate::models::equipment::Equipment,
            crate::models::equipment::EquipmentStatus,
            crate::models::equipment::ConditionState,
            crate::models::equipment::AssignmentPeriod,
            crate::models::equipment::AssignmentRequest,
            crate::models::equipment::CreateEquipment,
            crate::models::equipment::UpdateEquipment,
            crate::models::equipment::EquipmentCreated,
            crate::models::equipment::EquipmentQuery,
            // Assignments
            crate::models::assignment::AssignmentRecord,
            crate::models::assignment::AssignmentQuery,
            // Incidents
            crate::models::incident::Incident,
            crate::models::incident::IncidentDetails,
            crate::models::incident::IncidentStatus,
            crate::models::incident::IncidentPriority,
            crate::models::incident::CreateIncident,
            crate::models::incident::UpdateIncident,
            crate::models::incident::AssignIncident,
            crate::models::incident::IncidentStats,
            crate::models::stats::StatEntry,
            // Dashboard
            crate::models::stats::Dashboard,
            crate::models::stats::IncidentSummary,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "users", description = "User management"),
        (name = "equipment", description = "Equipment inventory and assignment"),
        (name = "assignments", description = "Assignment registry"),
        (name = "incidents", description = "Incident reporting and follow-up"),
        (name = "dashboard", description = "Inventory overview")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
