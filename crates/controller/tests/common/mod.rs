// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

#![allow(dead_code)]

use actix_web::web::ServiceConfig;
use rsvp_controller_core::configure_app;
use rsvp_controller_core::prelude::{
    ConfirmationEngine, NewRsvp, Notifier, RsvpRepository, Store,
};
use std::sync::Arc;
use url::Url;

pub const CONFIRMATION_BASE_URL: &str = "https://rsvp.example.org/api/confirm-rsvp/";

/// Everything needed to drive the controller against a given store and notifier
pub struct TestContext {
    pub store: Arc<dyn Store>,
    pub repository: Arc<RsvpRepository>,
    pub engine: Arc<ConfirmationEngine>,
}

impl TestContext {
    pub fn new(store: Arc<dyn Store>, notifier: Arc<dyn Notifier>) -> Self {
        let repository = Arc::new(
            RsvpRepository::new(
                store.clone(),
                notifier,
                Url::parse(CONFIRMATION_BASE_URL).unwrap(),
            )
            .unwrap(),
        );
        let engine = Arc::new(ConfirmationEngine::new(store.clone()));

        Self {
            store,
            repository,
            engine,
        }
    }

    /// App configuration serving the REST API for this context
    pub fn app(&self) -> impl FnOnce(&mut ServiceConfig) {
        configure_app(
            self.store.clone(),
            self.repository.clone(),
            self.engine.clone(),
        )
    }

    pub fn new_rsvp(name: &str, email: &str) -> NewRsvp {
        NewRsvp {
            name: name.into(),
            email: email.into(),
        }
    }
}
