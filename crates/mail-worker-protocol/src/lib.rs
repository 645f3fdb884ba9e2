// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Wire format of the mail tasks the controller hands to the external mail worker
use serde::Deserialize;
#[cfg(any(test, feature = "client"))]
use serde::Serialize;
pub mod v1;

/// Versioned Mail Task Protocol
#[derive(Deserialize, PartialEq, Eq, Debug)]
#[cfg_attr(any(test, feature = "client"), derive(Serialize))]
#[serde(tag = "version")]
pub enum MailTask {
    #[serde(rename = "1")]
    V1(v1::Message),
}

#[cfg(feature = "client")]
impl MailTask {
    /// Creates a MailTask asking the recipient to confirm their RSVP
    pub fn rsvp_confirmation<E, U>(recipient: E, confirmation_url: U) -> MailTask
    where
        E: Into<v1::Email>,
        U: Into<String>,
    {
        Self::V1(v1::Message::RsvpConfirmation(v1::RsvpConfirmation {
            recipient: recipient.into(),
            confirmation_url: confirmation_url.into(),
        }))
    }

    pub fn as_kind_str(&self) -> &'static str {
        match self {
            MailTask::V1(message) => match message {
                v1::Message::RsvpConfirmation(_) => "rsvp_confirmation",
            },
        }
    }
}
