// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! REST API v1
//!
//! Mounted below `/api`. Current Endpoints. See their respective function:
//! - `/submit-rsvp` ([POST](rsvp::submit_rsvp))
//! - `/rsvp-count` ([GET](rsvp::rsvp_count))
//! - `/check-rsvp/{email}` ([GET](rsvp::check_rsvp))
//! - `/confirm-rsvp/{token}` ([GET](rsvp::confirm_rsvp))
//! - `/test-connection` ([GET](rsvp::test_connection))
use actix_web::web;

pub mod response;
pub mod rsvp;

pub use response::ApiError;

/// Register all endpoints of this API version
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(rsvp::submit_rsvp)
        .service(rsvp::rsvp_count)
        .service(rsvp::check_rsvp)
        .service(rsvp::confirm_rsvp)
        .service(rsvp::test_connection);
}
