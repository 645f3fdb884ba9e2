// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

use actix_web::http::{header, StatusCode};
use actix_web::{test, App};
use common::TestContext;
use rsvp_controller_core::prelude::MemoryStore;
use serde_json::{json, Value};
use std::sync::Arc;
use test_util::{assert_eq, FailingNotifier, RecordingNotifier};

mod common;

fn setup() -> (Arc<MemoryStore>, Arc<RecordingNotifier>, TestContext) {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let ctx = TestContext::new(store.clone(), notifier.clone());

    (store, notifier, ctx)
}

fn submit(name: &str, email: &str) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/api/submit-rsvp")
        .set_json(json!({ "name": name, "email": email }))
}

fn get(uri: &str) -> test::TestRequest {
    test::TestRequest::get().uri(uri)
}

#[actix_web::test]
async fn register_confirm_and_check() {
    let (_, notifier, ctx) = setup();
    let app = test::init_service(App::new().configure(ctx.app())).await;

    let resp = test::call_service(&app, submit("Ana", "a@x.com").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["message"].is_string());

    let body: Value =
        test::call_and_read_body_json(&app, get("/api/check-rsvp/a@x.com").to_request()).await;
    assert_eq!(
        body,
        json!({ "registered": true, "name": "Ana", "confirmed": false })
    );

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].destination, "a@x.com");
    assert!(sent[0]
        .confirmation_url
        .as_str()
        .starts_with(common::CONFIRMATION_BASE_URL));

    let token = notifier.last_token_for("a@x.com").unwrap();

    let resp =
        test::call_service(&app, get(&format!("/api/confirm-rsvp/{token}")).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap()
        .starts_with("text/html"));
    let page = test::read_body(resp).await;
    assert!(String::from_utf8_lossy(&page).contains("Ana"));

    let body: Value =
        test::call_and_read_body_json(&app, get("/api/check-rsvp/a@x.com").to_request()).await;
    assert_eq!(
        body,
        json!({ "registered": true, "name": "Ana", "confirmed": true })
    );

    // Following the link again still works
    let resp =
        test::call_service(&app, get(&format!("/api/confirm-rsvp/{token}")).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn count_distinct_registrations() {
    let (_, _, ctx) = setup();
    let app = test::init_service(App::new().configure(ctx.app())).await;

    let body: Value =
        test::call_and_read_body_json(&app, get("/api/rsvp-count").to_request()).await;
    assert_eq!(body, json!({ "count": 0 }));

    for (name, email) in [("Ana", "a@x.com"), ("Ben", "b@x.com"), ("Anna", "a@x.com")] {
        let resp = test::call_service(&app, submit(name, email).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let body: Value =
        test::call_and_read_body_json(&app, get("/api/rsvp-count").to_request()).await;
    assert_eq!(body, json!({ "count": 2 }));

    let body: Value =
        test::call_and_read_body_json(&app, get("/api/check-rsvp/a@x.com").to_request()).await;
    assert_eq!(body["name"], "Anna");
}

#[actix_web::test]
async fn unknown_email_is_not_registered() {
    let (_, _, ctx) = setup();
    let app = test::init_service(App::new().configure(ctx.app())).await;

    let resp = test::call_service(&app, get("/api/check-rsvp/nobody@x.com").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({ "registered": false }));
}

#[actix_web::test]
async fn invalid_submission_is_rejected() {
    let (store, notifier, ctx) = setup();
    let app = test::init_service(App::new().configure(ctx.app())).await;

    let resp = test::call_service(&app, submit("Ana", "not-an-email").to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
        body,
        json!({
            "code": "validation_failed",
            "message": "Some provided values are invalid",
            "errors": [{ "field": "email", "code": "invalid_email" }]
        })
    );

    assert_eq!(store.write_count(), 0);
    assert!(notifier.sent().is_empty());

    let body: Value =
        test::call_and_read_body_json(&app, get("/api/rsvp-count").to_request()).await;
    assert_eq!(body, json!({ "count": 0 }));
}

#[actix_web::test]
async fn malformed_json_is_bad_request() {
    let (_, _, ctx) = setup();
    let app = test::init_service(App::new().configure(ctx.app())).await;

    let req = test::TestRequest::post()
        .uri("/api/submit-rsvp")
        .insert_header(header::ContentType::json())
        .set_payload(r#"{"name": "Ana""#)
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "invalid_json");
}

#[actix_web::test]
async fn unknown_token_is_rejected() {
    let (_, _, ctx) = setup();
    let app = test::init_service(App::new().configure(ctx.app())).await;

    let resp = test::call_service(&app, submit("Ana", "a@x.com").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(&app, get("/api/confirm-rsvp/garbage-token").to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "invalid_token");

    let body: Value =
        test::call_and_read_body_json(&app, get("/api/check-rsvp/a@x.com").to_request()).await;
    assert_eq!(body["confirmed"], false);
}

#[actix_web::test]
async fn store_outage_is_internal_error() {
    let (store, _, ctx) = setup();
    let app = test::init_service(App::new().configure(ctx.app())).await;
    store.set_unavailable(true);

    for req in [
        submit("Ana", "a@x.com"),
        get("/api/rsvp-count"),
        get("/api/check-rsvp/a@x.com"),
        get("/api/confirm-rsvp/some-token"),
        get("/api/test-connection"),
    ] {
        let resp = test::call_service(&app, req.to_request()).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], "store_unavailable");
    }
}

#[actix_web::test]
async fn notification_failure_keeps_registration() {
    let store = Arc::new(MemoryStore::new());
    let ctx = TestContext::new(store, Arc::new(FailingNotifier));
    let app = test::init_service(App::new().configure(ctx.app())).await;

    let resp = test::call_service(&app, submit("Ana", "a@x.com").to_request()).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "notification_failed");

    let body: Value =
        test::call_and_read_body_json(&app, get("/api/check-rsvp/a@x.com").to_request()).await;
    assert_eq!(body["registered"], true);
}

#[actix_web::test]
async fn test_connection_reports_probe_value() {
    let (_, _, ctx) = setup();
    let app = test::init_service(App::new().configure(ctx.app())).await;

    let body: Value =
        test::call_and_read_body_json(&app, get("/api/test-connection").to_request()).await;
    assert_eq!(
        body,
        json!({ "message": "Connection successful, probe value: ok" })
    );
}
