// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

use super::{
    record_key, ConfirmationToken, NewRsvp, RsvpError, RsvpRecord, RsvpSubmission, ALL_RSVPS_KEY,
};
use crate::services::Notifier;
use crate::storage::{Store, StoreError};
use anyhow::ensure;
use chrono::{TimeZone, Utc};
use std::sync::Arc;
use url::Url;
use validator::Validate;

/// Creates and reads registrations
pub struct RsvpRepository {
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
    confirmation_base_url: Url,
}

impl RsvpRepository {
    /// Fails if `confirmation_base_url` cannot have path segments appended
    pub fn new(
        store: Arc<dyn Store>,
        notifier: Arc<dyn Notifier>,
        confirmation_base_url: Url,
    ) -> anyhow::Result<Self> {
        ensure!(
            !confirmation_base_url.cannot_be_a_base(),
            "confirmation base url {confirmation_base_url} cannot be used as base"
        );

        Ok(Self {
            store,
            notifier,
            confirmation_base_url,
        })
    }

    fn confirmation_url(&self, token: &ConfirmationToken) -> Url {
        let mut url = self.confirmation_base_url.clone();

        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(token.as_str());
        }

        url
    }

    /// Register `new_rsvp`, replacing any previous registration of the same email
    ///
    /// The confirmation link is sent once the registration is stored. A failure to send it
    /// leaves the registration in place.
    #[tracing::instrument(level = "debug", skip(self, new_rsvp), fields(email = %new_rsvp.email))]
    pub async fn submit(&self, new_rsvp: NewRsvp) -> Result<RsvpSubmission, RsvpError> {
        new_rsvp.validate()?;

        let token = ConfirmationToken::generate();

        let now = self.store.server_time().await?;
        let created_at = Utc
            .timestamp_opt(now, 0)
            .single()
            .ok_or_else(|| StoreError::Unavailable(format!("invalid server time {now}")))?;

        let record = RsvpRecord {
            name: new_rsvp.name,
            email: new_rsvp.email,
            created_at,
            confirmed: false,
            confirmation_token: Some(token.clone()),
        };

        self.store
            .replace_fields(&record_key(&record.email), &record.to_fields())
            .await?;
        self.store.add_to_set(ALL_RSVPS_KEY, &record.email).await?;

        log::info!("Stored registration for {}", record.email);

        let confirmation_url = self.confirmation_url(&token);

        self.notifier
            .send(&record.email, &confirmation_url)
            .await
            .map_err(|e| {
                log::warn!(
                    "Failed to send confirmation to {}, registration was kept: {:?}",
                    record.email,
                    e
                );
                RsvpError::NotificationFailure(e)
            })?;

        Ok(RsvpSubmission {
            token,
            confirmation_url,
        })
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn lookup(&self, email: &str) -> Result<Option<RsvpRecord>, RsvpError> {
        let key = record_key(email);
        let fields = self.store.read_fields(&key).await?;

        Ok(RsvpRecord::from_fields(&key, fields)?)
    }

    /// Number of distinct registered emails
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn count(&self) -> Result<u64, RsvpError> {
        Ok(self.store.set_cardinality(ALL_RSVPS_KEY).await?)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::storage::MemoryStore;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct Outbox {
        sent: Mutex<Vec<(String, Url)>>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for Outbox {
        async fn send(&self, destination: &str, confirmation_url: &Url) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("mail worker unreachable");
            }

            self.sent
                .lock()
                .push((destination.to_owned(), confirmation_url.clone()));
            Ok(())
        }
    }

    fn base_url() -> Url {
        Url::parse("https://rsvp.example.org/api/confirm-rsvp/").unwrap()
    }

    fn setup(fail: bool) -> (Arc<MemoryStore>, Arc<Outbox>, RsvpRepository) {
        let store = Arc::new(MemoryStore::new());
        let outbox = Arc::new(Outbox {
            fail,
            ..Default::default()
        });
        let repository = RsvpRepository::new(store.clone(), outbox.clone(), base_url()).unwrap();

        (store, outbox, repository)
    }

    fn rsvp(name: &str, email: &str) -> NewRsvp {
        NewRsvp {
            name: name.into(),
            email: email.into(),
        }
    }

    #[tokio::test]
    async fn submit_stores_unconfirmed_record() {
        let (store, outbox, repository) = setup(false);
        store.set_server_time(1_700_000_000);

        let submission = repository.submit(rsvp("Ana", "a@x.com")).await.unwrap();

        let record = repository.lookup("a@x.com").await.unwrap().unwrap();
        assert_eq!(record.name, "Ana");
        assert_eq!(record.created_at.timestamp(), 1_700_000_000);
        assert!(!record.confirmed);
        assert_eq!(record.confirmation_token, Some(submission.token.clone()));

        assert_eq!(
            submission.confirmation_url.as_str(),
            format!(
                "https://rsvp.example.org/api/confirm-rsvp/{}",
                submission.token
            )
        );
        assert_eq!(
            *outbox.sent.lock(),
            vec![("a@x.com".to_owned(), submission.confirmation_url)]
        );
    }

    #[tokio::test]
    async fn resubmission_replaces_record() {
        let (_, _, repository) = setup(false);

        let first = repository.submit(rsvp("Ana", "a@x.com")).await.unwrap();
        let second = repository.submit(rsvp("Anna", "a@x.com")).await.unwrap();

        let record = repository.lookup("a@x.com").await.unwrap().unwrap();
        assert_eq!(record.name, "Anna");
        assert_ne!(first.token, second.token);
        assert_eq!(record.confirmation_token, Some(second.token));
        assert_eq!(repository.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn resubmission_drops_legacy_fields() {
        let (store, _, repository) = setup(false);
        store.insert_raw(
            "rsvp:a@x.com",
            &[("name", "Ana"), ("email", "a@x.com"), ("timestamp", "1690000000")],
        );

        repository.submit(rsvp("Anna", "a@x.com")).await.unwrap();

        let fields = store.raw_fields("rsvp:a@x.com").unwrap();
        assert!(!fields.contains_key("timestamp"));
        assert_eq!(fields["name"], "Anna");
        assert_eq!(fields["confirmed"], "false");
    }

    #[tokio::test]
    async fn count_distinct_emails() {
        let (_, _, repository) = setup(false);

        assert_eq!(repository.count().await.unwrap(), 0);

        for email in ["a@x.com", "b@x.com", "c@x.com"] {
            repository.submit(rsvp("Guest", email)).await.unwrap();
        }
        assert_eq!(repository.count().await.unwrap(), 3);

        repository.submit(rsvp("Guest", "b@x.com")).await.unwrap();
        assert_eq!(repository.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn invalid_input_does_not_touch_the_store() {
        let (store, outbox, repository) = setup(false);

        let result = repository.submit(rsvp("Ana", "not-an-email")).await;
        assert!(matches!(result, Err(RsvpError::InvalidInput(_))));

        let result = repository.submit(rsvp(" ", "a@x.com")).await;
        assert!(matches!(result, Err(RsvpError::InvalidInput(_))));

        assert_eq!(store.write_count(), 0);
        assert_eq!(repository.count().await.unwrap(), 0);
        assert!(outbox.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn unknown_email_is_not_found() {
        let (_, _, repository) = setup(false);

        assert_eq!(repository.lookup("nobody@x.com").await.unwrap(), None);
    }

    #[tokio::test]
    async fn notification_failure_keeps_record() {
        let (_, _, repository) = setup(true);

        let result = repository.submit(rsvp("Ana", "a@x.com")).await;
        assert!(matches!(result, Err(RsvpError::NotificationFailure(_))));

        assert!(repository.lookup("a@x.com").await.unwrap().is_some());
        assert_eq!(repository.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unavailable_store_is_reported() {
        let (store, outbox, repository) = setup(false);
        store.set_unavailable(true);

        assert!(matches!(
            repository.submit(rsvp("Ana", "a@x.com")).await,
            Err(RsvpError::StoreUnavailable(_))
        ));
        assert!(matches!(
            repository.lookup("a@x.com").await,
            Err(RsvpError::StoreUnavailable(_))
        ));
        assert!(matches!(
            repository.count().await,
            Err(RsvpError::StoreUnavailable(_))
        ));
        assert!(outbox.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn base_url_without_trailing_slash() {
        let store = Arc::new(MemoryStore::new());
        let repository = RsvpRepository::new(
            store,
            Arc::new(Outbox::default()),
            Url::parse("https://rsvp.example.org/confirm").unwrap(),
        )
        .unwrap();

        let submission = repository.submit(rsvp("Ana", "a@x.com")).await.unwrap();

        assert_eq!(
            submission.confirmation_url.as_str(),
            format!("https://rsvp.example.org/confirm/{}", submission.token)
        );
    }

    #[test]
    fn rejects_unusable_base_url() {
        let result = RsvpRepository::new(
            Arc::new(MemoryStore::new()),
            Arc::new(Outbox::default()),
            Url::parse("mailto:rsvp@example.org").unwrap(),
        );

        assert!(result.is_err());
    }
}
