// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Response types for the REST API
use serde::Serialize;

mod error;

pub use error::{json_error_handler, ApiError};

pub const CODE_INVALID_EMAIL: &str = "invalid_email";
pub const CODE_INVALID_VALUE: &str = "invalid_value";
pub const CODE_INVALID_LENGTH: &str = "invalid_length";
pub const CODE_MISSING_VALUE: &str = "missing_value";
pub const CODE_VALUE_REQUIRED: &str = "value_required";

pub const CODE_INVALID_TOKEN: &str = "invalid_token";
pub const CODE_STORE_UNAVAILABLE: &str = "store_unavailable";
pub const CODE_NOTIFICATION_FAILED: &str = "notification_failed";

/// Plain `{"message": ..}` body
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
