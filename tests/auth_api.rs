mod common;

use actix_web::{http::StatusCode, test, web, App};
use authgate_server::AppState;
use common::{state_with, DownNotifier, Inbox};
use serde_json::json;
use std::sync::Arc;

macro_rules! init_app {
    ($state:expr) => {{
        let state: AppState = $state;
        let gate = state.require_session();
        test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(|cfg| authgate_server::configure_routes(cfg, gate.clone())),
        )
        .await
    }};
}

#[actix_web::test]
async fn test_register_otp_login_and_gate() {
    let inbox = Arc::new(Inbox::default());
    let app = init_app!(state_with(inbox.clone()));

    let register_response = test::TestRequest::post()
        .uri("/register")
        .set_json(json!({
            "username": "tester",
            "email": "test@example.com",
            "password": "Abcdef1!"
        }))
        .send_request(&app)
        .await;
    assert_eq!(register_response.status(), StatusCode::OK);
    let register_body: serde_json::Value = test::read_body_json(register_response).await;
    let user_id = register_body["user_id"].as_i64().unwrap();
    assert!(register_body.get("password_hash").is_none());

    let otp_response = test::TestRequest::post()
        .uri("/verify-otp")
        .set_json(json!({ "email": "test@example.com", "password": "Abcdef1!" }))
        .send_request(&app)
        .await;
    assert_eq!(otp_response.status(), StatusCode::OK);
    let otp_body: serde_json::Value = test::read_body_json(otp_response).await;
    assert_eq!(otp_body["message"], "OTP sent successfully");

    let code = inbox.last_code("test@example.com").expect("code was sent");
    assert_eq!(code.len(), 6);
    assert!(code.chars().all(|c| c.is_ascii_digit()));

    let login_response = test::TestRequest::post()
        .uri("/login")
        .set_json(json!({ "email": "test@example.com", "otp": code }))
        .send_request(&app)
        .await;
    assert_eq!(login_response.status(), StatusCode::OK);
    let login_body: serde_json::Value = test::read_body_json(login_response).await;
    let token = login_body["token"].as_str().unwrap().to_string();

    // Same code a second time
    let replay_response = test::TestRequest::post()
        .uri("/login")
        .set_json(json!({ "email": "test@example.com", "otp": code }))
        .send_request(&app)
        .await;
    assert_eq!(replay_response.status(), StatusCode::UNAUTHORIZED);

    let me_response = test::TestRequest::get()
        .uri("/me")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .send_request(&app)
        .await;
    assert_eq!(me_response.status(), StatusCode::OK);
    let me_body: serde_json::Value = test::read_body_json(me_response).await;
    assert_eq!(me_body["user_id"].as_i64(), Some(user_id));
    assert!(me_body["session_id"].as_str().is_some());

    let change_response = test::TestRequest::post()
        .uri("/change-password")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .send_request(&app)
        .await;
    assert_eq!(change_response.status(), StatusCode::OK);

    let logout_response = test::TestRequest::post()
        .uri("/logout")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .send_request(&app)
        .await;
    assert_eq!(logout_response.status(), StatusCode::OK);

    // The token is still signed and unexpired, but its session is gone
    let revoked_response = test::TestRequest::get()
        .uri("/me")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .send_request(&app)
        .await;
    assert_eq!(revoked_response.status(), StatusCode::UNAUTHORIZED);
    let revoked_body: serde_json::Value = test::read_body_json(revoked_response).await;
    assert_eq!(revoked_body["error"], "Invalid session");
}

#[actix_web::test]
async fn test_verify_otp_input_validation() {
    let app = init_app!(state_with(Arc::new(Inbox::default())));

    let cases = [
        (json!({ "email": "a@b", "password": "Abcdef1!" }), "Invalid email format"),
        (json!({ "email": "a@b.co", "password": "abcdefgh" }), "Password must contain"),
        (json!({ "email": "a@b.co" }), "Invalid request format"),
    ];

    for (body, expected) in cases {
        let response = test::TestRequest::post()
            .uri("/verify-otp")
            .set_json(body)
            .send_request(&app)
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json: serde_json::Value = test::read_body_json(response).await;
        assert!(
            json["error"].as_str().unwrap().starts_with(expected),
            "unexpected error body: {}",
            json
        );
    }
}

#[actix_web::test]
async fn test_verify_otp_delivery_failure() {
    let app = init_app!(state_with(Arc::new(DownNotifier)));

    let response = test::TestRequest::post()
        .uri("/verify-otp")
        .set_json(json!({ "email": "a@b.co", "password": "Abcdef1!" }))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json: serde_json::Value = test::read_body_json(response).await;
    assert_eq!(json["error"], "Failed to send OTP");

    // The undelivered code was rolled back
    let login = test::TestRequest::post()
        .uri("/login")
        .set_json(json!({ "email": "a@b.co", "otp": "000000" }))
        .send_request(&app)
        .await;
    assert_eq!(login.status(), StatusCode::UNAUTHORIZED);
    let json: serde_json::Value = test::read_body_json(login).await;
    assert_eq!(json["error"], "No pending OTP for this email");
}

#[actix_web::test]
async fn test_login_for_unregistered_email_keeps_code() {
    let inbox = Arc::new(Inbox::default());
    let app = init_app!(state_with(inbox.clone()));

    let response = test::TestRequest::post()
        .uri("/verify-otp")
        .set_json(json!({ "email": "ghost@example.com", "password": "Abcdef1!" }))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let code = inbox.last_code("ghost@example.com").unwrap();
    let response = test::TestRequest::post()
        .uri("/login")
        .set_json(json!({ "email": "ghost@example.com", "otp": code }))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json: serde_json::Value = test::read_body_json(response).await;
    assert_eq!(json["error"], "Unknown account");

    // The rejected attempt must not have consumed the code.
    let response = test::TestRequest::post()
        .uri("/register")
        .set_json(json!({
            "username": "ghost",
            "email": "ghost@example.com",
            "password": "Abcdef1!"
        }))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = test::TestRequest::post()
        .uri("/login")
        .set_json(json!({ "email": "ghost@example.com", "otp": code }))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_duplicate_registration() {
    let app = init_app!(state_with(Arc::new(Inbox::default())));
    let body = json!({
        "username": "tester",
        "email": "dup@example.com",
        "password": "Abcdef1!"
    });

    let first = test::TestRequest::post()
        .uri("/register")
        .set_json(body.clone())
        .send_request(&app)
        .await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = test::TestRequest::post()
        .uri("/register")
        .set_json(body)
        .send_request(&app)
        .await;
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
    let json: serde_json::Value = test::read_body_json(second).await;
    assert_eq!(json["error"], "Email already registered");
}

#[actix_web::test]
async fn test_gate_rejections() {
    let app = init_app!(state_with(Arc::new(Inbox::default())));

    let response = test::TestRequest::get().uri("/me").send_request(&app).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json: serde_json::Value = test::read_body_json(response).await;
    assert_eq!(json["error"], "Authorization header is required");

    let response = test::TestRequest::get()
        .uri("/me")
        .insert_header(("Authorization", "Token abc"))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json: serde_json::Value = test::read_body_json(response).await;
    assert_eq!(json["error"], "Invalid authorization header format");

    let response = test::TestRequest::get()
        .uri("/me")
        .insert_header(("Authorization", "Bearer not.a.token"))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json: serde_json::Value = test::read_body_json(response).await;
    assert_eq!(json["error"], "Invalid or expired token");
}

#[actix_web::test]
async fn test_token_without_active_session_is_rejected() {
    let state = state_with(Arc::new(Inbox::default()));
    // Signed by the right key, but never recorded as an active session
    let issued = state.tokens.issue(5).unwrap();
    let app = init_app!(state);

    let response = test::TestRequest::get()
        .uri("/me")
        .insert_header(("Authorization", format!("Bearer {}", issued.token)))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json: serde_json::Value = test::read_body_json(response).await;
    assert_eq!(json["error"], "Invalid session");
}

#[actix_web::test]
async fn test_stub_routes() {
    let app = init_app!(state_with(Arc::new(Inbox::default())));

    let response = test::TestRequest::post()
        .uri("/social-login/github")
        .send_request(&app)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = test::read_body_json(response).await;
    assert_eq!(json["message"], "Logged in with github");

    let response = test::TestRequest::post()
        .uri("/forgot-password")
        .send_request(&app)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = test::TestRequest::post()
        .uri("/change-password")
        .send_request(&app)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
