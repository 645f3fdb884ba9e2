// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

use crate::rsvp::{ConfirmationEngine, RsvpError};
use crate::storage::{RedisStore, Store};
use anyhow::{Context, Result};
use controller_shared::settings::Settings;
use std::sync::Arc;

async fn connect(settings: &Settings) -> Result<Arc<dyn Store>> {
    let store = RedisStore::connect(&settings.redis.url, settings.redis.timeout)
        .await
        .context("Failed to connect to redis")?;

    Ok(Arc::new(store))
}

/// Implementation of the `rsvp-controller count` command
pub async fn count(settings: Settings) -> Result<()> {
    let store = connect(&settings).await?;

    let count = store
        .set_cardinality(crate::rsvp::ALL_RSVPS_KEY)
        .await
        .context("Failed to count registrations")?;

    println!("{count}");

    Ok(())
}

/// Implementation of the `rsvp-controller confirm <token>` command
pub async fn confirm(settings: Settings, token: &str) -> Result<()> {
    let engine = ConfirmationEngine::new(connect(&settings).await?);

    match engine.confirm(token).await {
        Ok(record) => {
            println!("Confirmed registration of {} <{}>", record.name, record.email);
            Ok(())
        }
        Err(RsvpError::InvalidToken) => {
            anyhow::bail!("No registration holds the given token")
        }
        Err(e) => Err(e).context("Failed to confirm registration"),
    }
}
