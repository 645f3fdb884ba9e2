// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

use serde::Deserialize;
use serde::Serialize;

#[derive(Deserialize, Serialize, PartialEq, Eq, Debug)]
pub struct Email(String);

impl From<&str> for Email {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for Email {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Mail asking a registered attendee to follow the confirmation link
#[derive(Deserialize, Serialize, PartialEq, Eq, Debug)]
pub struct RsvpConfirmation {
    pub recipient: Email,
    pub confirmation_url: String,
}

/// The different kinds of MailTasks that are currently supported
#[derive(Deserialize, PartialEq, Eq, Debug)]
#[cfg_attr(any(test, feature = "client"), derive(Serialize))]
#[serde(tag = "message", rename_all = "snake_case")]
pub enum Message {
    RsvpConfirmation(RsvpConfirmation),
}
