//! BackendClient integration tests — request shapes and error mapping against a mock backend

#![cfg(feature = "remote")]

use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use studio_gate::contact::ContactMessage;
use studio_gate::gate::Identity;
use studio_gate::store::{Mailer, PasscodeVerifier, RoleStore, SessionProvider, WaiverStore};
use studio_gate::waiver::WaiverSubmission;
use studio_gate::{BackendClient, ErrorCategory, GateConfig, GateError, SignUpOutcome};

const API_KEY: &str = "anon-test-key";
const JWT_SECRET: &str = "test-secret-key-for-testing-only";

fn client_for(server: &MockServer) -> BackendClient {
    let config = GateConfig::new(server.uri())
        .with_api_key(API_KEY)
        .without_jwt_secret();
    BackendClient::new(config).unwrap()
}

fn waiver_form() -> WaiverSubmission {
    WaiverSubmission {
        full_name: "Coral Reyes".into(),
        email: "coral@example.com".into(),
        phone: "(904) 555-0199".into(),
        emergency_contact_name: "Dario Reyes".into(),
        emergency_contact_phone: "904-555-0100".into(),
        agreed: true,
        ..WaiverSubmission::default()
    }
}

#[tokio::test]
async fn test_role_lookup_request_shape() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/user_roles"))
        .and(query_param("select", "role"))
        .and(query_param("user_id", "eq.u-1"))
        .and(query_param("limit", "1"))
        .and(header("apikey", API_KEY))
        .and(header("authorization", format!("Bearer {API_KEY}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "role": "admin" }])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(client.is_admin("u-1", None).await.unwrap());
}

#[tokio::test]
async fn test_role_lookup_member_or_missing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/user_roles"))
        .and(query_param("user_id", "eq.u-member"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "role": "member" }])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/user_roles"))
        .and(query_param("user_id", "eq.u-none"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(!client.is_admin("u-member", None).await.unwrap());
    assert!(!client.is_admin("u-none", None).await.unwrap());
}

#[tokio::test]
async fn test_data_api_error_mapping() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/waivers"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(json!({ "code": "42501", "message": "permission denied for table waivers" })),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.has_waiver("u-1", None).await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Database);
    assert!(matches!(&err, GateError::Database { code: Some(c), .. } if c == "42501"));
    assert_eq!(
        err.user_message(),
        "You do not have permission to perform this action."
    );
}

#[tokio::test]
async fn test_has_waiver_lookup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/waivers"))
        .and(query_param("select", "user_id"))
        .and(query_param("user_id", "eq.u-signed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "user_id": "u-signed" }])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/waivers"))
        .and(query_param("user_id", "eq.u-new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(client.has_waiver("u-signed", None).await.unwrap());
    assert!(!client.has_waiver("u-new", None).await.unwrap());
}

#[tokio::test]
async fn test_waiver_upsert_merges_on_user() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/waivers"))
        .and(query_param("on_conflict", "user_id"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let record = client.upsert_waiver("u-1", None, waiver_form()).await.unwrap();
    assert_eq!(record.user_id, "u-1");

    let requests = server.received_requests().await.unwrap();
    let prefer = requests[0].headers.get("prefer").unwrap().to_str().unwrap();
    assert_eq!(prefer, "resolution=merge-duplicates,return=minimal");

    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body[0]["user_id"], "u-1");
    assert_eq!(body[0]["full_name"], "Coral Reyes");
}

#[tokio::test]
async fn test_data_calls_authenticate_as_visitor() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/user_roles"))
        .and(header("apikey", API_KEY))
        .and(header("authorization", "Bearer user-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/waivers"))
        .and(header("apikey", API_KEY))
        .and(header("authorization", "Bearer user-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "user_id": "u-1" }])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/waivers"))
        .and(header("authorization", "Bearer user-token"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(!client.is_admin("u-1", Some("user-token")).await.unwrap());
    assert!(client.has_waiver("u-1", Some("user-token")).await.unwrap());
    client
        .upsert_waiver("u-1", Some("user-token"), waiver_form())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_get_waiver_reads_full_row() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/waivers"))
        .and(query_param("select", "*"))
        .and(query_param("user_id", "eq.u-2"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "user_id": "u-2",
                "signed_at": "2026-03-02T10:00:00+00:00",
                "full_name": "Kai Moana",
                "email": "kai@example.com",
                "phone": "9045550101",
                "emergency_contact_name": "Lani Moana",
                "emergency_contact_phone": "9045550102",
                "occupation": "Lifeguard",
                "preferred_schedule": "Weekday mornings"
            }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/waivers"))
        .and(query_param("user_id", "eq.u-new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let record = client.get_waiver("u-2", Some("user-token")).await.unwrap().unwrap();
    assert_eq!(record.occupation.as_deref(), Some("Lifeguard"));
    assert_eq!(record.preferred_schedule.as_deref(), Some("Weekday mornings"));
    assert!(record.current_pain.is_none());
    assert!(client.get_waiver("u-new", None).await.unwrap().is_none());
}

#[tokio::test]
async fn test_list_waivers_newest_first_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/waivers"))
        .and(query_param("order", "signed_at.desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "user_id": "u-2",
                "signed_at": "2026-03-02T10:00:00+00:00",
                "full_name": "Kai Moana",
                "email": "kai@example.com",
                "phone": "9045550101",
                "emergency_contact_name": "Lani Moana",
                "emergency_contact_phone": "9045550102"
            }
        ])))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let waivers = client.list_waivers(None).await.unwrap();
    assert_eq!(waivers.len(), 1);
    assert_eq!(waivers[0].full_name, "Kai Moana");
    assert!(waivers[0].medical_conditions.is_none());
}

#[tokio::test]
async fn test_sign_in_password_grant() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .and(body_partial_json(json!({ "email": "sol@example.com" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "user-token",
            "token_type": "bearer",
            "user": { "id": "u-sol", "email": "sol@example.com" }
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let session = client.sign_in("sol@example.com", "Tide!pool9").await.unwrap();
    assert_eq!(session.access_token, "user-token");
    assert_eq!(session.user, Identity::new("u-sol", "sol@example.com"));
}

#[tokio::test]
async fn test_auth_error_mapping() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.sign_in("sol@example.com", "nope").await.unwrap_err();
    assert!(matches!(
        &err,
        GateError::Auth { message, code: Some(code) }
            if message == "Invalid login credentials" && code == "invalid_grant"
    ));
    assert_eq!(
        err.user_message(),
        "The email or password you entered is incorrect. Please try again."
    );
}

#[tokio::test]
async fn test_sign_up_awaiting_confirmation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .and(body_partial_json(json!({ "data": { "full_name": "Kai Moana" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "u-kai",
            "email": "kai@example.com",
            "confirmation_sent_at": "2026-03-02T10:00:00Z"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let outcome = client
        .sign_up("kai@example.com", "Kelp#2026", Some("Kai Moana"))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        SignUpOutcome::ConfirmationRequired(Identity::new("u-kai", "kai@example.com"))
    );
}

#[tokio::test]
async fn test_resolve_through_auth_api() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("apikey", API_KEY))
        .and(header("authorization", "Bearer user-token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "id": "u-sol", "email": "sol@example.com" })),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let who = client.resolve("user-token").await.unwrap();
    assert_eq!(who.id, "u-sol");
}

#[tokio::test]
async fn test_resolve_locally_with_secret() {
    let server = MockServer::start().await;
    let config = GateConfig::new(server.uri())
        .with_api_key(API_KEY)
        .with_jwt_secret(JWT_SECRET);
    let client = BackendClient::new(config).unwrap();

    let claims = json!({
        "sub": "u-local",
        "email": "local@example.com",
        "aud": "authenticated",
        "exp": chrono::Utc::now().timestamp() + 3600,
    });
    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(JWT_SECRET.as_bytes())).unwrap();

    let who = client.resolve(&token).await.unwrap();
    assert_eq!(who, Identity::new("u-local", "local@example.com"));

    let forged = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"wrong-secret")).unwrap();
    let err = client.resolve(&forged).await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Auth);

    // never touched the network
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_passcode_verification() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/functions/v1/verify-passcode"))
        .and(body_partial_json(json!({ "code": "seaside" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "valid": true })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/functions/v1/verify-passcode"))
        .and(body_partial_json(json!({ "code": "tidepool" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "valid": false })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(client.verify("seaside").await.unwrap());
    assert!(!client.verify("tidepool").await.unwrap());
}

#[tokio::test]
async fn test_function_outage_is_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/functions/v1/verify-passcode"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.verify("seaside").await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Network);
}

#[tokio::test]
async fn test_contact_rejection_is_mail_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/functions/v1/send-contact-email"))
        .and(body_partial_json(json!({ "userEmail": "sol@example.com", "subject": "Booking" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "success": false, "error": "Mailbox full" })),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let from = Identity::new("u-sol", "sol@example.com");
    let message = ContactMessage::new(&from, Some("Sol"), "Booking", "Can I move my Tuesday class?").unwrap();

    let err = client.send_contact(&message).await.unwrap_err();
    assert!(matches!(err, GateError::Mail(reason) if reason == "Mailbox full"));
}

#[tokio::test]
async fn test_welcome_email_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/functions/v1/send-signup-emails"))
        .and(body_partial_json(json!({ "userEmail": "kai@example.com", "userName": "kai" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client
        .send_welcome(&Identity::new("u-kai", "kai@example.com"), None)
        .await
        .unwrap();
}
