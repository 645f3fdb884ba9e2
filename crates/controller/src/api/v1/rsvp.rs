// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! RSVP related API structs and Endpoints
use super::response::{ApiError, Message};
use crate::rsvp::{ConfirmationEngine, NewRsvp, RsvpRecord, RsvpRepository};
use crate::storage::Store;
use actix_web::http::header::ContentType;
use actix_web::web::{Data, Json, Path};
use actix_web::{get, post, HttpResponse};
use serde::Serialize;

/// Response body of the *GET /rsvp-count* endpoint
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RsvpCount {
    pub count: u64,
}

/// Response body of the *GET /check-rsvp/{email}* endpoint
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RsvpStatus {
    pub registered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmed: Option<bool>,
}

impl From<Option<RsvpRecord>> for RsvpStatus {
    fn from(record: Option<RsvpRecord>) -> Self {
        match record {
            Some(record) => Self {
                registered: true,
                name: Some(record.name),
                confirmed: Some(record.confirmed),
            },
            None => Self {
                registered: false,
                name: None,
                confirmed: None,
            },
        }
    }
}

/// API Endpoint *POST /submit-rsvp*
///
/// Registers the attendee and sends the confirmation link to the given email address.
/// A registration with the same email address is replaced.
#[post("/submit-rsvp")]
pub async fn submit_rsvp(
    repository: Data<RsvpRepository>,
    body: Json<NewRsvp>,
) -> Result<Json<Message>, ApiError> {
    repository.submit(body.into_inner()).await?;

    Ok(Json(Message::new(
        "RSVP registered successfully, check your inbox for the confirmation link",
    )))
}

/// API Endpoint *GET /rsvp-count*
#[get("/rsvp-count")]
pub async fn rsvp_count(repository: Data<RsvpRepository>) -> Result<Json<RsvpCount>, ApiError> {
    let count = repository.count().await?;

    Ok(Json(RsvpCount { count }))
}

/// API Endpoint *GET /check-rsvp/{email}*
///
/// Returns whether the email address is registered, and if so under which name.
#[get("/check-rsvp/{email}")]
pub async fn check_rsvp(
    repository: Data<RsvpRepository>,
    email: Path<String>,
) -> Result<Json<RsvpStatus>, ApiError> {
    let record = repository.lookup(&email).await?;

    Ok(Json(record.into()))
}

/// API Endpoint *GET /confirm-rsvp/{token}*
///
/// Target of the link in the confirmation mail, responds with a HTML page.
#[get("/confirm-rsvp/{token}")]
pub async fn confirm_rsvp(
    engine: Data<ConfirmationEngine>,
    token: Path<String>,
) -> Result<HttpResponse, ApiError> {
    let record = engine.confirm(&token).await?;

    Ok(HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(confirmation_page(&record)))
}

fn confirmation_page(record: &RsvpRecord) -> String {
    let name = html_escape::encode_text(&record.name);
    let email = html_escape::encode_text(&record.email);

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>RSVP confirmed</title>
</head>
<body>
<h1>Thank you, {name}!</h1>
<p>Your registration for {email} is confirmed.</p>
</body>
</html>
"#
    )
}

/// API Endpoint *GET /test-connection*
///
/// Writes a probe value to the store and reads it back.
#[get("/test-connection")]
pub async fn test_connection(store: Data<dyn Store>) -> Result<Json<Message>, ApiError> {
    let value = store.check_connection().await?;

    Ok(Json(Message::new(format!(
        "Connection successful, probe value: {value}"
    ))))
}
