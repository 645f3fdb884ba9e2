// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Long Running Services that expose clean APIs and hide implementation details from endpoints
use async_trait::async_trait;
use url::Url;

pub mod mail;

pub use mail::MailService;

/// Delivers the confirmation link of a new registration
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send `confirmation_url` to `destination`
    ///
    /// Returns once the message was handed off, delivery itself is not awaited.
    async fn send(&self, destination: &str, confirmation_url: &Url) -> anyhow::Result<()>;
}
