// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

use super::{RsvpError, RsvpRecord, FIELD_CONFIRMATION_TOKEN, FIELD_CONFIRMED, RSVP_KEY_PREFIX};
use crate::storage::{Store, StoreError};
use futures::TryStreamExt;
use std::sync::Arc;

/// Resolves confirmation tokens to registrations
///
/// Tokens are not indexed, confirming walks every stored registration until one holds the
/// token. The cost grows linearly with the number of registrations.
pub struct ConfirmationEngine {
    store: Arc<dyn Store>,
}

impl ConfirmationEngine {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Mark the registration holding `token` as confirmed and return it
    ///
    /// Confirming an already confirmed registration succeeds again. The flag is only written
    /// while the registration still holds `token`, a registration re-submitted in between is
    /// skipped.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn confirm(&self, token: &str) -> Result<RsvpRecord, RsvpError> {
        if token.is_empty() {
            return Err(RsvpError::InvalidToken);
        }

        let mut keys = self.store.scan_keys_by_prefix(RSVP_KEY_PREFIX).await?;

        while let Some(key) = keys.try_next().await? {
            let fields = self.store.read_fields(&key).await?;

            let record = match RsvpRecord::from_fields(&key, fields) {
                Ok(Some(record)) => record,
                // Removed while scanning
                Ok(None) => continue,
                Err(StoreError::InvalidRecord { key, reason }) => {
                    log::warn!("Skipping invalid registration {}: {}", key, reason);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let matches = record
                .confirmation_token
                .as_ref()
                .map_or(false, |stored| stored.as_str() == token);

            if !matches {
                continue;
            }

            let updated = self
                .store
                .update_fields_if(
                    &key,
                    FIELD_CONFIRMATION_TOKEN,
                    token,
                    &[(FIELD_CONFIRMED, true.to_string())],
                )
                .await?;

            if !updated {
                log::debug!("Registration {} was replaced while confirming", key);
                continue;
            }

            log::info!("Confirmed registration for {}", record.email);

            return Ok(RsvpRecord {
                confirmed: true,
                ..record
            });
        }

        Err(RsvpError::InvalidToken)
    }
}
