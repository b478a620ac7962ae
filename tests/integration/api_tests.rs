//! API integration tests
//!
//! These run against a live server started with a bootstrap administrator, e.g.
//! `ASSETDESK_AUTH__BOOTSTRAP_ADMIN__EMAIL=admin@assetdesk.local`.

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::{SystemTime, UNIX_EPOCH};

const BASE_URL: &str = "http://localhost:8080/api/v1";

fn admin_credentials() -> (String, String) {
    (
        std::env::var("ASSETDESK_TEST_ADMIN_EMAIL").unwrap_or_else(|_| "admin@assetdesk.local".to_string()),
        std::env::var("ASSETDESK_TEST_ADMIN_PASSWORD").unwrap_or_else(|_| "change-me".to_string()),
    )
}

/// Unique suffix so repeated runs do not collide on emails and serials
fn unique(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Clock before epoch")
        .as_nanos();
    format!("{}{}", prefix, nanos)
}

async fn login(client: &Client, email: &str, password: &str) -> reqwest::Response {
    client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to send login request")
}

/// Helper to get an admin token
async fn admin_token(client: &Client) -> String {
    let (email, password) = admin_credentials();
    let body: Value = login(client, &email, &password)
        .await
        .json()
        .await
        .expect("Failed to parse login response");
    body["data"]["token"].as_str().expect("No token in response").to_string()
}

/// Create a user as admin and return (id, email, token)
async fn create_user(client: &Client, admin: &str, role: &str) -> (i64, String, String) {
    let email = format!("{}@example.com", unique(role));
    let response = client
        .post(format!("{}/users", BASE_URL))
        .bearer_auth(admin)
        .json(&json!({
            "name": format!("Test {}", role),
            "email": email,
            "password": "secret1",
            "role": role
        }))
        .send()
        .await
        .expect("Failed to create user");
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = response.json().await.expect("Failed to parse user");
    let id = body["data"]["id"].as_i64().expect("No user id");

    let body: Value = login(client, &email, "secret1").await.json().await.expect("Failed to parse login");
    let token = body["data"]["token"].as_str().expect("No token").to_string();
    (id, email, token)
}

async fn create_equipment(client: &Client, token: &str, assignment: Option<Value>) -> reqwest::Response {
    let mut payload = json!({
        "name": "PC Test",
        "type": "Ordinateur",
        "serial": unique("sn-"),
        "purchaseDate": "2025-01-01"
    });
    if let Some(assignment) = assignment {
        payload["assignment"] = assignment;
    }

    client
        .post(format!("{}/equipment", BASE_URL))
        .bearer_auth(token)
        .json(&payload)
        .send()
        .await
        .expect("Failed to create equipment")
}

async fn get_json(client: &Client, token: &str, path: &str) -> Value {
    client
        .get(format!("{}{}", BASE_URL, path))
        .bearer_auth(token)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response")
}

/// Ledger and registry agree: at most one open period, its assignee is the holder, and the
/// registry has exactly one open record for that holder (none when unassigned)
async fn assert_ledger_matches_registry(client: &Client, admin: &str, equipment_id: i64) {
    let equipment = get_json(client, admin, &format!("/equipment/{}", equipment_id)).await;
    let equipment = &equipment["data"];
    let open_periods: Vec<_> = equipment["assignment_history"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|p| p["end_date"].is_null())
        .collect();

    let records = get_json(
        client,
        admin,
        &format!("/assignments?equipment_id={}&active_only=true", equipment_id),
    )
    .await;
    let open_records = records["data"].as_array().unwrap();

    if equipment["assigned_to"].is_null() {
        assert!(open_periods.is_empty());
        assert!(open_records.is_empty());
    } else {
        assert_eq!(open_periods.len(), 1);
        assert_eq!(open_periods[0]["assigned_to"], equipment["assigned_to"]);
        assert_eq!(open_records.len(), 1);
        assert_eq!(open_records[0]["employee_id"], equipment["assigned_to"]);
    }
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_login_and_me() {
    let client = Client::new();
    let (email, password) = admin_credentials();

    let response = login(&client, &email, &password).await;
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["token_type"], "Bearer");
    let token = body["data"]["token"].as_str().unwrap();

    let me: Value = client
        .get(format!("{}/auth/me", BASE_URL))
        .bearer_auth(token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["data"]["role"], "admin");
}

#[tokio::test]
#[ignore]
async fn test_register_rejects_admin_and_mismatch() {
    let client = Client::new();
    let email = format!("{}@example.com", unique("reg"));

    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "name": "Eve", "email": email, "password": "secret1",
            "confirm_password": "secret1", "role": "Administrateur"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "name": "Eve", "email": email, "password": "secret1", "confirm_password": "secret2"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "name": "Eve", "email": email, "password": "secret1", "confirm_password": "secret1"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["user"]["role"], "employee");
}

#[tokio::test]
#[ignore]
async fn test_inactive_login_rejected() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (id, email, _) = create_user(&client, &admin, "employee").await;

    let response = client
        .put(format!("{}/users/{}", BASE_URL, id))
        .bearer_auth(&admin)
        .json(&json!({ "is_active": false }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let response = login(&client, &email, "secret1").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body.get("data").is_none());
}

#[tokio::test]
#[ignore]
async fn test_equipment_create_delete_scenario() {
    let client = Client::new();
    let admin = admin_token(&client).await;

    let response = create_equipment(&client, &admin, None).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    let equipment = &body["data"]["equipment"];
    assert_eq!(equipment["status"], "Available");
    assert!(equipment["assigned_to"].is_null());
    let id = equipment["id"].as_i64().unwrap();

    let response = client
        .delete(format!("{}/equipment/{}", BASE_URL, id))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = client
        .get(format!("{}/equipment/{}", BASE_URL, id))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore]
async fn test_duplicate_serial_conflict() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let serial = unique("dup-");

    let attempts = [
        (serial.clone(), StatusCode::CREATED),
        (format!("  {}  ", serial.to_uppercase()), StatusCode::CONFLICT),
    ];
    for (input, expected) in attempts {
        let response = client
            .post(format!("{}/equipment", BASE_URL))
            .bearer_auth(&admin)
            .json(&json!({
                "name": "Phone", "type": "Mobile", "serial_number": input, "purchase_date": "2024-06-01"
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), expected);
    }
}

#[tokio::test]
#[ignore]
async fn test_reassignment_rotates_registry() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (employee_a, _, token_a) = create_user(&client, &admin, "employee").await;
    let (employee_b, _, _) = create_user(&client, &admin, "Employé").await;

    let response = create_equipment(&client, &admin, Some(json!({ "employee_id": employee_a }))).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["equipment"]["status"], "Assigned");
    assert!(body["data"]["assignment"]["end_date"].is_null());
    let id = body["data"]["equipment"]["id"].as_i64().unwrap();

    // The holder sees it
    let response = client
        .get(format!("{}/equipment/{}", BASE_URL, id))
        .bearer_auth(&token_a)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = client
        .put(format!("{}/equipment/{}", BASE_URL, id))
        .bearer_auth(&admin)
        .json(&json!({ "assignment": { "employee_id": employee_b, "condition": "Used" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    let history = body["data"]["assignment_history"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history.iter().filter(|p| p["end_date"].is_null()).count(), 1);
    assert_eq!(body["data"]["assigned_to"], employee_b);

    let records: Value = client
        .get(format!("{}/assignments?equipment_id={}", BASE_URL, id))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let records = records["data"].as_array().unwrap();
    assert_eq!(records.len(), 2);
    let open: Vec<_> = records.iter().filter(|r| r["end_date"].is_null()).collect();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0]["employee_id"], employee_b);
    let closed = records.iter().find(|r| r["employee_id"] == employee_a).unwrap();
    let parse = |v: &Value| chrono::DateTime::parse_from_rfc3339(v.as_str().unwrap()).unwrap();
    assert!(parse(&closed["end_date"]) >= parse(&closed["start_date"]));

    assert_ledger_matches_registry(&client, &admin, id).await;

    // Former holder lost access
    let response = client
        .get(format!("{}/equipment/{}", BASE_URL, id))
        .bearer_auth(&token_a)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore]
async fn test_assigning_to_technician_is_forbidden() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (technician, _, _) = create_user(&client, &admin, "technicien").await;

    let body: Value = create_equipment(&client, &admin, None).await.json().await.unwrap();
    let id = body["data"]["equipment"]["id"].as_i64().unwrap();

    let response = client
        .put(format!("{}/equipment/{}", BASE_URL, id))
        .bearer_auth(&admin)
        .json(&json!({ "name": "Renamed", "assignment": { "employee_id": technician } }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body: Value = client
        .get(format!("{}/equipment/{}", BASE_URL, id))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["name"], "PC Test");
    assert!(body["data"]["assigned_to"].is_null());
    assert_eq!(body["data"]["assignment_history"].as_array().unwrap().len(), 0);
}

#[tokio::test]
#[ignore]
async fn test_incident_resolution_and_visibility() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (_, _, reporter) = create_user(&client, &admin, "employee").await;
    let (_, _, other) = create_user(&client, &admin, "employee").await;
    let (_, _, technician) = create_user(&client, &admin, "tech").await;

    let body: Value = create_equipment(&client, &admin, None).await.json().await.unwrap();
    let equipment_id = body["data"]["equipment"]["id"].as_i64().unwrap();

    let response = client
        .post(format!("{}/incidents", BASE_URL))
        .bearer_auth(&reporter)
        .json(&json!({
            "title": "Screen flickers", "description": "Since Monday",
            "equipment_id": equipment_id, "status": "Resolved"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["status"], "New");
    let id = body["data"]["id"].as_i64().unwrap();

    // Another employee neither lists nor reads it
    let list: Value = client
        .get(format!("{}/incidents", BASE_URL))
        .bearer_auth(&other)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(list["data"].as_array().unwrap().iter().all(|i| i["id"] != id));
    let response = client
        .get(format!("{}/incidents/{}", BASE_URL, id))
        .bearer_auth(&other)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let resolved: Value = client
        .put(format!("{}/incidents/{}", BASE_URL, id))
        .bearer_auth(&technician)
        .json(&json!({ "status": "Resolved", "resolved_by": 1 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(resolved["data"]["status"], "Resolved");
    assert!(resolved["data"]["resolved_at"].is_string());
    assert_ne!(resolved["data"]["resolved_by"], 1);

    let reopened: Value = client
        .put(format!("{}/incidents/{}", BASE_URL, id))
        .bearer_auth(&technician)
        .json(&json!({ "status": "InProgress" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(reopened["data"]["resolved_by"].is_null());
    assert!(reopened["data"]["resolved_at"].is_null());
}

#[tokio::test]
#[ignore]
async fn test_admin_cannot_be_deleted() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (id, _, _) = create_user(&client, &admin, "Administrateur").await;

    let check: Value = client
        .get(format!("{}/users/{}/can-delete", BASE_URL, id))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(check["data"]["allowed"], false);

    let response = client
        .delete(format!("{}/users/{}", BASE_URL, id))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore]
async fn test_unauthenticated_request_rejected() {
    let client = Client::new();

    let response = client
        .get(format!("{}/equipment", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_unassignment_closes_registry_record() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (employee, _, _) = create_user(&client, &admin, "employee").await;

    let body: Value = create_equipment(&client, &admin, Some(json!({ "employee_id": employee })))
        .await
        .json()
        .await
        .unwrap();
    let id = body["data"]["equipment"]["id"].as_i64().unwrap();
    assert_ledger_matches_registry(&client, &admin, id).await;

    let response = client
        .put(format!("{}/equipment/{}", BASE_URL, id))
        .bearer_auth(&admin)
        .json(&json!({ "assignment": null }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert!(body["data"]["assigned_to"].is_null());
    assert_eq!(body["data"]["status"], "Available");

    let records = get_json(&client, &admin, &format!("/assignments?equipment_id={}", id)).await;
    let records = records["data"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0]["end_date"].is_string());
    assert_ledger_matches_registry(&client, &admin, id).await;
}

#[tokio::test]
#[ignore]
async fn test_rejected_status_keeps_assignment() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (holder, _, _) = create_user(&client, &admin, "employee").await;
    let (other, _, _) = create_user(&client, &admin, "employee").await;

    let body: Value = create_equipment(&client, &admin, Some(json!({ "employee_id": holder })))
        .await
        .json()
        .await
        .unwrap();
    let id = body["data"]["equipment"]["id"].as_i64().unwrap();

    // Handing it over and marking it Available contradict each other
    let response = client
        .put(format!("{}/equipment/{}", BASE_URL, id))
        .bearer_auth(&admin)
        .json(&json!({ "assignment": { "employee_id": other }, "status": "Available" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = get_json(&client, &admin, &format!("/equipment/{}", id)).await;
    assert_eq!(body["data"]["assigned_to"], holder);
    assert_eq!(body["data"]["assignment_history"].as_array().unwrap().len(), 1);
    assert_ledger_matches_registry(&client, &admin, id).await;
}

#[tokio::test]
#[ignore]
async fn test_employee_cannot_see_colleague_equipment() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (holder, _, _) = create_user(&client, &admin, "employee").await;
    let (_, _, colleague) = create_user(&client, &admin, "employee").await;

    let body: Value = create_equipment(&client, &admin, Some(json!({ "employee_id": holder })))
        .await
        .json()
        .await
        .unwrap();
    let id = body["data"]["equipment"]["id"].as_i64().unwrap();

    let response = client
        .get(format!("{}/equipment/{}", BASE_URL, id))
        .bearer_auth(&colleague)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let list = get_json(&client, &colleague, "/equipment").await;
    assert!(list["data"].as_array().unwrap().iter().all(|e| e["id"] != id));
}

#[tokio::test]
#[ignore]
async fn test_only_admin_deletes_incidents() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (_, _, reporter) = create_user(&client, &admin, "employee").await;
    let (_, _, technician) = create_user(&client, &admin, "technician").await;

    let body: Value = create_equipment(&client, &admin, None).await.json().await.unwrap();
    let equipment_id = body["data"]["equipment"]["id"].as_i64().unwrap();

    let body: Value = client
        .post(format!("{}/incidents", BASE_URL))
        .bearer_auth(&reporter)
        .json(&json!({ "title": "No sound", "description": "Speakers mute", "equipment_id": equipment_id }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = body["data"]["id"].as_i64().unwrap();

    for token in [&reporter, &technician] {
        let response = client
            .delete(format!("{}/incidents/{}", BASE_URL, id))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    // Blank titles are refused rather than stored empty
    let response = client
        .put(format!("{}/incidents/{}", BASE_URL, id))
        .bearer_auth(&reporter)
        .json(&json!({ "title": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .delete(format!("{}/incidents/{}", BASE_URL, id))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore]
async fn test_session_follows_account_changes() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (id, _, token) = create_user(&client, &admin, "technician").await;

    let response = create_equipment(&client, &token, None).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    // Demotion applies to the token already issued
    let response = client
        .put(format!("{}/users/{}", BASE_URL, id))
        .bearer_auth(&admin)
        .json(&json!({ "role": "employee" }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let response = create_equipment(&client, &token, None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = client
        .put(format!("{}/users/{}", BASE_URL, id))
        .bearer_auth(&admin)
        .json(&json!({ "is_active": false }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let response = client
        .get(format!("{}/auth/me", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_dashboard_for_staff_only() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (_, _, employee) = create_user(&client, &admin, "employee").await;
    create_equipment(&client, &admin, None).await;

    let response = client
        .get(format!("{}/dashboard", BASE_URL))
        .bearer_auth(&employee)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body = get_json(&client, &admin, "/dashboard").await;
    assert!(body["data"]["total_equipment"].as_i64().unwrap() >= 1);
    let roles = body["data"]["users_by_role"].as_array().unwrap();
    assert!(roles.iter().any(|r| r["label"] == "admin"));
    assert!(roles.iter().any(|r| r["label"] == "employee"));
    assert!(body["data"]["recent_incidents"].as_array().unwrap().len() <= 5);
}
