//! API integration tests for the dreams manager.
//!
//! Drives the full router with `oneshot` against an in-memory SQLite
//! database.

mod common;

use axum::http::StatusCode;
use common::*;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn send(app: &axum::Router, request: axum::http::Request<axum::body::Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, extract_json(response).await)
}

async fn register(app: &axum::Router, fullname: &str, phone: &str) -> Value {
    let (status, body) = send(
        app,
        post_json(
            "/user/register",
            json!({
                "fullname": fullname,
                "phone_country_code": "+256",
                "phone": phone,
                "password": "secret",
                "confirm_password": "secret"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    body
}

#[tokio::test]
async fn test_welcome_and_health() {
    let (app, _) = test_app().await;

    let (status, body) = send(&app, get_request("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["server_error"], false);

    let (status, body) = send(&app, get_request("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["server_data"]["status"], "healthy");
    assert_eq!(body["server_data"]["database"]["connected"], true);
    assert_eq!(body["server_data"]["database"]["pool"]["max_connections"], 1);
}

#[tokio::test]
async fn test_unknown_route_envelope() {
    let (app, _) = test_app().await;

    let (status, body) = send(&app, get_request("/nothing/here")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["server_error"], true);
    assert_eq!(body["server_message"], "Resource Error");
    assert!(body["message_detail"].as_str().unwrap().contains("/nothing/here"));
}

#[tokio::test]
async fn test_database_down() {
    let (app, state) = test_app().await;
    state.shutdown().await;

    let (status, body) = send(&app, get_request("/products/count")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["server_message"], "Database Error");

    let (status, body) = send(&app, get_request("/health")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["server_data"]["status"], "unhealthy");
}

#[tokio::test]
async fn test_registration_roles() {
    let (app, _) = test_app().await;

    let body = register(&app, "Jane Doe", "0772000111").await;
    assert_eq!(body["response_action"], "login_page");
    assert_eq!(body["message_detail"], "Jane's Account Created, You can now login");
    register(&app, "Ann Field", "0772000222").await;

    let (_, body) = send(&app, get_request("/user/profile/1")).await;
    assert_eq!(body["server_data"]["default_role"], "root");
    assert!(body["server_data"].get("password").is_none());

    let (_, body) = send(&app, get_request("/user/profile/2")).await;
    assert_eq!(body["server_data"]["default_role"], "Guest");

    let (status, body) = send(
        &app,
        post_json(
            "/user/register",
            json!({"fullname": "Jane Again", "phone_country_code": "+256", "phone": "772000111"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["server_error"], true);

    // The root account is not an agent.
    let (_, body) = send(&app, get_request("/agents/count")).await;
    assert_eq!(body["server_data"], 1);
    let (status, _) = send(&app, get_request("/agents/profile/1")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_change_role() {
    let (app, _) = test_app().await;
    register(&app, "Jane Doe", "0772000111").await;
    register(&app, "Ann Field", "0772000222").await;

    let (status, body) = send(&app, get_request("/agents/change-role/2/activate")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["server_message"], "Account Modified");
    assert_eq!(body["message_detail"], "Ann Field's account activated");
    assert_eq!(body["response_color"], "info");

    let (_, body) = send(&app, get_request("/agents/profile/2")).await;
    assert_eq!(body["server_data"]["default_role"], "agent");

    let (status, _) = send(&app, get_request("/agents/change-role/40/activate")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, get_request("/agents/change-role/2/promote")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_change_role_after_patching_phone() {
    let (app, _) = test_app().await;
    register(&app, "Jane Doe", "0772000111").await;
    register(&app, "Ann Field", "0772000222").await;

    let (status, _) = send(
        &app,
        json_request("PATCH", "/user/2", json!({"phone_number": "256772000333"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, get_request("/agents/profile/2")).await;
    assert_eq!(body["server_data"]["phone_number"], 256772000333_i64);

    let (status, body) = send(&app, get_request("/agents/change-role/2/activate")).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["message_detail"], "Ann Field's account activated");
}

#[tokio::test]
async fn test_add_rejects_wrong_field_types() {
    let (app, _) = test_app().await;

    let (status, body) = send(
        &app,
        post_json(
            "/products/add",
            json!({"name": "Lamp", "user_id": "1", "category_id": "solar"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["server_message"], "Validation Error");

    let (_, body) = send(&app, get_request("/products/count")).await;
    assert_eq!(body["server_data"], 0);
}

#[tokio::test]
async fn test_add_validation_and_duplicates() {
    let (app, _) = test_app().await;

    let (status, body) = send(&app, post_json("/categories/add", json!({"name": "Solar"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["server_message"], "Validation Error");
    assert_eq!(body["message_detail"], "user_id is required");

    let (status, body) = send(
        &app,
        post_json("/categories/add", json!({"name": "Solar", "user_id": "1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message_detail"], "Solar has been registered");
    assert_eq!(body["response_action"], "reload_page");

    let (status, _) = send(
        &app,
        post_json("/categories/add", json!({"name": "Solar", "user_id": "2"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_product_lifecycle() {
    let (app, _) = test_app().await;
    register(&app, "Jane Doe", "0772000111").await;
    send(&app, post_json("/categories/add", json!({"name": "Solar", "user_id": "1"}))).await;

    for name in ["Lamp", "Panel", "Torch"] {
        let (status, _) = send(
            &app,
            post_json(
                "/products/add",
                json!({"name": name, "user_id": "1", "category_id": "1"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, body) = send(&app, get_request("/products/paginated_report/1/2")).await;
    let report = &body["server_data"];
    assert_eq!(report["title"], "Products");
    assert_eq!(report["values"][0], json!(["Torch", "Solar", "Jane Doe", report["values"][0][3]]));
    assert_eq!(report["cards"][0]["content"], "3");
    assert_eq!(report["pagination_details"]["total_pages"], 2);
    assert_eq!(
        report["pagination_details"]["next_page_link"],
        "/dashboard/admin/products/report/2/2"
    );

    let (_, body) = send(&app, get_request("/products/latest/2")).await;
    assert_eq!(body["server_data"].as_array().unwrap().len(), 2);
    assert_eq!(body["server_data"][0]["category"], "Solar");

    let (_, body) = send(&app, get_request("/products/count")).await;
    assert_eq!(body["server_data"], 3);

    let (_, body) = send(&app, get_request("/products/select_array")).await;
    assert_eq!(body["server_data"][2], json!({"value": 1, "text": "Lamp", "selected": false}));

    let (_, body) = send(&app, get_request("/products/search?q=AN")).await;
    assert_eq!(body["server_data"].as_array().unwrap().len(), 1);
    assert_eq!(body["server_data"][0]["name"], "Panel");

    let (status, body) = send(
        &app,
        json_request("PATCH", "/products/2", json!({"name": "Solar Panel", "id": 99})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["server_data"]["id"], 2);
    assert_eq!(body["server_data"]["name"], "Solar Panel");
    assert!(body["server_data"]["last_updated"]["timestamp"].is_string());

    let (_, body) = send(&app, get_request("/products/profile/2")).await;
    let oid = body["server_data"]["_id"].as_str().unwrap().to_string();
    assert_eq!(body["server_data"]["agent"], "Jane Doe");

    let (status, _) = send(&app, delete_request(&format!("/products/{}", oid))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, delete_request(&format!("/products/{}", oid))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, get_request("/products/profile/2")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_paginated_report_of_twelve() {
    let (app, _) = test_app().await;

    for i in 0..12 {
        send(
            &app,
            post_json("/stages/add", json!({"name": format!("stage {}", i), "user_id": 1})),
        )
        .await;
    }

    let (_, body) = send(&app, get_request("/stages/paginated_report/2/5")).await;
    let details = &body["server_data"]["pagination_details"];
    assert_eq!(details["total_pages"], 3);
    assert_eq!(details["start_entry"], 6);
    assert_eq!(details["end_entry"], 10);
    assert_eq!(details["previous_page_link"], "/dashboard/admin/stages/report/1/5");
    assert_eq!(details["next_page_link"], "/dashboard/admin/stages/report/3/5");
    assert_eq!(body["server_data"]["values"].as_array().unwrap().len(), 5);
    // Missing agents render as "Error".
    assert_eq!(body["server_data"]["values"][0][1], "Error");

    let (_, body) = send(&app, get_request("/events/paginated_report/1/5")).await;
    let details = &body["server_data"]["pagination_details"];
    assert_eq!(details["total_pages"], 0);
    assert_eq!(details["previous_page_link"], "#!");
    assert_eq!(details["next_page_link"], "#!");
}

#[tokio::test]
async fn test_backdated_add() {
    let (app, _) = test_app().await;

    let (status, _) = send(
        &app,
        post_json(
            "/events/add",
            json!({
                "title": "Health fair",
                "event_type": "outreach",
                "start_date": "2024-03-15",
                "end_date": "2024-03-16",
                "location": "Gulu",
                "manual_date_created": "2024-03-01"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, get_request("/events/profile/1")).await;
    let event = &body["server_data"];
    assert_eq!(event["status"], "planned");
    assert!(event["date_created"]["timestamp"]
        .as_str()
        .unwrap()
        .starts_with("2024-03-01 "));
    assert!(event.get("manual_date_created").is_none());
}
