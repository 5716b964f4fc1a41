mod common;

use actix_web::cookie::Cookie;
use actix_web::http::{header, StatusCode};
use actix_web::{test, App};
use serde_json::{json, Value};

use common::{wait_for_messages, TestApp};

const BOUNDARY: &str = "----helpdesk-test-boundary";

fn bearer(token: &str) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {token}"))
}

fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n").as_bytes(),
        );
    }
    if let Some((file_name, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"upload\"; filename=\"{file_name}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn multipart_content_type() -> (header::HeaderName, String) {
    (header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
}

#[actix_web::test]
async fn api_requires_a_token() {
    let app = TestApp::spawn().await;
    let service = test::init_service(App::new().configure(|cfg| app.state.configure(cfg))).await;

    let req = test::TestRequest::get().uri("/api/tickets").to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri("/api/tickets")
        .insert_header(bearer("not-a-token"))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "InvalidAuthToken");
}

#[actix_web::test]
async fn health_check_is_public() {
    let app = TestApp::spawn().await;
    let service = test::init_service(App::new().configure(|cfg| app.state.configure(cfg))).await;

    let req = test::TestRequest::get().uri("/health-check").to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn login_returns_a_usable_access_token() {
    let app = TestApp::spawn().await;
    let service = test::init_service(App::new().configure(|cfg| app.state.configure(cfg))).await;

    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({ "username": "alice", "password": common::PASSWORD }))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    let token = body["accessToken"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(bearer(&token))
        .to_request();
    let me: Value = test::call_and_read_body_json(&service, req).await;
    assert_eq!(me["username"], "alice");

    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({ "username": "alice", "password": "wrong-password" }))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn register_sets_both_cookies_and_refresh_reissues_access() {
    let app = TestApp::spawn().await;
    let service = test::init_service(App::new().configure(|cfg| app.state.configure(cfg))).await;

    let req = test::TestRequest::post()
        .uri("/auth/register")
        .set_json(json!({
            "username": "dave",
            "email": "dave@example.com",
            "password": "s3cret-pass",
            "password2": "s3cret-pass",
        }))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let access = resp.response().cookies().find(|c| c.name() == "accessToken");
    let refresh = resp
        .response()
        .cookies()
        .find(|c| c.name() == "refreshToken")
        .map(|c| c.value().to_string())
        .expect("refresh cookie");
    assert!(access.is_some());
    assert!(!refresh.is_empty());

    let req = test::TestRequest::post()
        .uri("/auth/refresh")
        .cookie(Cookie::new("refreshToken", refresh))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.response().cookies().any(|c| c.name() == "accessToken"));

    let req = test::TestRequest::post().uri("/auth/refresh").to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn create_then_read_ticket() {
    let app = TestApp::spawn().await;
    let service = test::init_service(App::new().configure(|cfg| app.state.configure(cfg))).await;
    let token = app.token_for(&app.alice);

    let req = test::TestRequest::post()
        .uri("/api/tickets")
        .insert_header(bearer(&token))
        .set_json(json!({ "title": "Printer jam", "priority": 2, "message": "Paper stuck in tray 2" }))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = test::read_body_json(resp).await;
    assert_eq!(created["status"]["status"], "Open");
    assert_eq!(created["priority"], 2);
    assert_eq!(created["priority_display"], "Medium");
    assert_eq!(created["posts"].as_array().unwrap().len(), 1);

    let id = created["id"].as_i64().unwrap();
    let req = test::TestRequest::get()
        .uri(&format!("/api/tickets/{id}"))
        .insert_header(bearer(&token))
        .to_request();
    let fetched: Value = test::call_and_read_body_json(&service, req).await;
    assert_eq!(fetched["title"], "Printer jam");
    assert_eq!(fetched["created_by"]["username"], "alice");
}

#[actix_web::test]
async fn create_rejects_missing_message() {
    let app = TestApp::spawn().await;
    let service = test::init_service(App::new().configure(|cfg| app.state.configure(cfg))).await;

    let req = test::TestRequest::post()
        .uri("/api/tickets")
        .insert_header(bearer(&app.token_for(&app.alice)))
        .set_json(json!({ "title": "No body" }))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["errors"][0]["field"], "message");
}

#[actix_web::test]
async fn missing_ids_are_bad_requests_unless_ticket_is_missing() {
    let app = TestApp::spawn().await;
    let ticket = app.open_ticket(&app.alice, "Laptop", "Battery drains fast").await;
    let service = test::init_service(App::new().configure(|cfg| app.state.configure(cfg))).await;
    let token = app.token_for(&app.alice);

    let req = test::TestRequest::post()
        .uri(&format!("/api/tickets/{}/change_status", ticket.id))
        .insert_header(bearer(&token))
        .set_json(json!({}))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Status ID is required");

    let req = test::TestRequest::post()
        .uri("/api/tickets/9999/change_status")
        .insert_header(bearer(&token))
        .set_json(json!({}))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::post()
        .uri(&format!("/api/tickets/{}/transfer_department", ticket.id))
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Department ID is required");

    let req = test::TestRequest::post()
        .uri(&format!("/api/tickets/{}/assign", ticket.id))
        .insert_header(bearer(&token))
        .set_json(json!({ "user": 9999 }))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn assign_and_follow_report_messages() {
    let app = TestApp::spawn().await;
    let ticket = app.open_ticket(&app.alice, "Laptop", "Battery drains fast").await;
    let service = test::init_service(App::new().configure(|cfg| app.state.configure(cfg))).await;
    let token = app.token_for(&app.bob);

    let req = test::TestRequest::post()
        .uri(&format!("/api/tickets/{}/assign_to_me", ticket.id))
        .insert_header(bearer(&token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&service, req).await;
    assert_eq!(body["status"], "Ticket assigned successfully");

    let req = test::TestRequest::post()
        .uri(&format!("/api/tickets/{}/assign", ticket.id))
        .insert_header(bearer(&token))
        .set_json(json!({ "user": app.carol.id }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&service, req).await;
    assert_eq!(body["status"], "Ticket assigned to carol");

    for expected in ["Successfully followed the ticket", "Successfully unfollowed the ticket"] {
        let req = test::TestRequest::post()
            .uri(&format!("/api/tickets/{}/toggle_follow", ticket.id))
            .insert_header(bearer(&token))
            .to_request();
        let body: Value = test::call_and_read_body_json(&service, req).await;
        assert_eq!(body["status"], expected);
    }
}

#[actix_web::test]
async fn add_post_accepts_attachment_and_notifies() {
    let app = TestApp::spawn().await;
    let ticket = app.open_ticket(&app.alice, "Scanner", "Scanner is offline").await;
    let service = test::init_service(App::new().configure(|cfg| app.state.configure(cfg))).await;

    let req = test::TestRequest::post()
        .uri(&format!("/api/tickets/{}/add_post", ticket.id))
        .insert_header(bearer(&app.token_for(&app.bob)))
        .insert_header(multipart_content_type())
        .set_payload(multipart_body(&[("message", "Driver reinstalled")], Some(("log.txt", b"ok"))))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Driver reinstalled");
    assert!(body["upload"].as_str().unwrap().ends_with("_log.txt"));

    wait_for_messages(&app.transport, 1).await;
    assert_eq!(app.transport.recipients(), vec!["alice@example.com".to_string()]);
}

#[actix_web::test]
async fn add_post_rejects_unsupported_file_type() {
    let app = TestApp::spawn().await;
    let ticket = app.open_ticket(&app.alice, "Scanner", "Scanner is offline").await;
    let service = test::init_service(App::new().configure(|cfg| app.state.configure(cfg))).await;

    let req = test::TestRequest::post()
        .uri(&format!("/api/tickets/{}/add_post", ticket.id))
        .insert_header(bearer(&app.token_for(&app.bob)))
        .insert_header(multipart_content_type())
        .set_payload(multipart_body(&[("message", "See attached")], Some(("run.exe", b"MZ"))))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["errors"][0]["field"], "upload");
}

#[actix_web::test]
async fn list_filters_and_paginates() {
    let app = TestApp::spawn().await;
    for n in 0..12 {
        app.open_ticket(&app.alice, &format!("Printer {n}"), "Body").await;
    }
    app.open_ticket(&app.alice, "Email", "Body").await;
    let service = test::init_service(App::new().configure(|cfg| app.state.configure(cfg))).await;
    let token = app.token_for(&app.alice);

    let req = test::TestRequest::get()
        .uri("/api/tickets?title=PRINTER&page=9")
        .insert_header(bearer(&token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&service, req).await;
    assert_eq!(body["totalElements"], 12);
    assert_eq!(body["page"], 2);
    assert_eq!(body["content"].as_array().unwrap().len(), 2);
}

#[actix_web::test]
async fn reference_data_is_listed_and_fetched() {
    let app = TestApp::spawn().await;
    let service = test::init_service(App::new().configure(|cfg| app.state.configure(cfg))).await;
    let token = app.token_for(&app.alice);

    let req = test::TestRequest::get()
        .uri("/api/statuses")
        .insert_header(bearer(&token))
        .to_request();
    let statuses: Value = test::call_and_read_body_json(&service, req).await;
    let labels: Vec<_> = statuses.as_array().unwrap().iter().map(|s| s["status"].clone()).collect();
    assert!(labels.contains(&json!("Open")));

    let req = test::TestRequest::get()
        .uri("/api/departments/9999")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn delete_removes_ticket() {
    let app = TestApp::spawn().await;
    let ticket = app.open_ticket(&app.alice, "Old", "Stale").await;
    let service = test::init_service(App::new().configure(|cfg| app.state.configure(cfg))).await;
    let token = app.token_for(&app.alice);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/tickets/{}", ticket.id))
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::get()
        .uri(&format!("/api/tickets/{}", ticket.id))
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
