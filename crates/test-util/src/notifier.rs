// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

use controller::prelude::async_trait::async_trait;
use controller::prelude::url::Url;
use controller::prelude::Notifier;
use parking_lot::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentConfirmation {
    pub destination: String,
    pub confirmation_url: Url,
}

/// Notifier which keeps every confirmation instead of sending it
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentConfirmation>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentConfirmation> {
        self.sent.lock().clone()
    }

    /// Token at the end of the last confirmation url sent to `destination`
    pub fn last_token_for(&self, destination: &str) -> Option<String> {
        self.sent
            .lock()
            .iter()
            .rev()
            .find(|sent| sent.destination == destination)
            .and_then(|sent| sent.confirmation_url.path_segments()?.last().map(str::to_owned))
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, destination: &str, confirmation_url: &Url) -> anyhow::Result<()> {
        self.sent.lock().push(SentConfirmation {
            destination: destination.to_owned(),
            confirmation_url: confirmation_url.clone(),
        });

        Ok(())
    }
}

/// Notifier whose delivery always fails
#[derive(Default)]
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send(&self, _: &str, _: &Url) -> anyhow::Result<()> {
        anyhow::bail!("mail worker unreachable")
    }
}
