// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Core library of the *RSVP Controller*
//!
//! # Example
//!
//! ```no_run
//! use rsvp_controller_core::Controller;
//! use anyhow::Result;
//!
//! #[actix_web::main]
//! async fn main()  {
//!     rsvp_controller_core::try_or_exit(run()).await;
//! }
//!
//! async fn run() -> Result<()> {
//!    if let Some(controller) = Controller::create("RSVP Controller").await? {
//!         controller.run().await?;
//!     }
//!
//!     Ok(())
//! }
//! ```
use crate::api::v1::response::json_error_handler;
use crate::rsvp::{ConfirmationEngine, RsvpRepository};
use crate::services::{MailService, Notifier};
use crate::storage::{RedisStore, Store};
use crate::trace::ReducedSpanBuilder;
use actix_cors::Cors;
use actix_web::http::header;
use actix_web::web::{self, Data};
use actix_web::{App, HttpServer};
use anyhow::{Context, Result};
use controller_shared::settings::{self, Settings};
use std::net::Ipv6Addr;
use std::sync::Arc;
use tokio::signal::ctrl_c;
use tracing_actix_web::TracingLogger;

pub mod api;
mod cli;
pub mod rsvp;
pub mod services;
pub mod storage;
mod trace;

pub mod prelude {
    pub use crate::rsvp::{ConfirmationEngine, NewRsvp, RsvpError, RsvpRecord, RsvpRepository};
    pub use crate::services::Notifier;
    pub use crate::storage::{MemoryStore, RedisStore, Store, StoreError};

    // re-export commonly used crates to reduce dependency management in dependent crates
    pub use actix_web;
    pub use anyhow;
    pub use async_trait;
    pub use redis;
    pub use url;
}

/// Wrapper of the main function. Correctly outputs the error to the logging utility or stderr.
pub async fn try_or_exit<T, F>(f: F) -> T
where
    F: std::future::Future<Output = Result<T>>,
{
    match f.await {
        Ok(ok) => ok,
        Err(err) => {
            if log::log_enabled!(log::Level::Error) {
                log::error!("Crashed with error: {:?}", err);
            } else {
                eprintln!("Crashed with error: {err:?}");
            }

            std::process::exit(-1);
        }
    }
}

/// Register the REST API and everything it extracts from the app data
///
/// Used by [`Controller::run`] for every worker, can be used by tests to build an [`App`].
pub fn configure_app(
    store: Arc<dyn Store>,
    repository: Arc<RsvpRepository>,
    engine: Arc<ConfirmationEngine>,
) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .app_data(Data::from(store))
            .app_data(Data::from(repository))
            .app_data(Data::from(engine))
            .service(web::scope("/api").configure(api::v1::configure));
    }
}

/// Controller struct representation containing all fields required to drive the controller
pub struct Controller {
    /// Settings loaded on [Controller::create]
    pub startup_settings: Arc<Settings>,

    /// Store holding all registrations
    pub store: Arc<dyn Store>,

    pub repository: Arc<RsvpRepository>,

    pub confirmation: Arc<ConfirmationEngine>,

    /// RabbitMQ connection publishing the mail tasks, `None` when mail delivery is disabled
    rabbitmq: Option<lapin::Connection>,
}

impl Controller {
    /// Tries to create a controller from CLI arguments and then the settings.
    ///
    /// This can return Ok(None) which would indicate that the controller executed a CLI
    /// subprogram (e.g. `count`) and must now exit.
    ///
    /// Otherwise it will return itself which can be run using [`Controller::run`]
    pub async fn create(program_name: &str) -> Result<Option<Self>> {
        // A missing .env file is fine
        let _ = dotenvy::dotenv();

        let args = cli::parse_args().await?;

        // Some args run commands by them self and thus should exit here
        if !args.controller_should_start() {
            return Ok(None);
        }

        let settings = Settings::load(&args.config)
            .with_context(|| format!("Failed to load settings from {:?}", args.config))?;

        trace::init(&settings.logging)?;

        log::info!("Starting {}", program_name);

        let controller = Self::init(settings).await?;

        Ok(Some(controller))
    }

    #[tracing::instrument(err, skip(settings))]
    async fn init(settings: Settings) -> Result<Self> {
        let settings = Arc::new(settings);

        let store: Arc<dyn Store> = Arc::new(
            RedisStore::connect(&settings.redis.url, settings.redis.timeout)
                .await
                .context("Failed to create redis connection manager")?,
        );

        let (rabbitmq, mail_service) = if settings.rabbit_mq.mail_task_queue.is_some() {
            let (connection, channel) = services::mail::connect(&settings.rabbit_mq)
                .await
                .context("Could not create rabbitmq channel")?;

            let mail_service =
                MailService::new(settings.rabbit_mq.mail_task_queue.clone(), channel);

            (Some(connection), mail_service)
        } else {
            log::warn!("No rabbit_mq.mail_task_queue configured, confirmation mails are disabled");

            (None, MailService::disabled())
        };

        let notifier: Arc<dyn Notifier> = Arc::new(mail_service);

        let repository = Arc::new(RsvpRepository::new(
            store.clone(),
            notifier,
            settings.rsvp.confirmation_base_url.clone(),
        )?);
        let confirmation = Arc::new(ConfirmationEngine::new(store.clone()));

        Ok(Self {
            startup_settings: settings,
            store,
            repository,
            confirmation,
            rabbitmq,
        })
    }

    /// Runs the controller until a fatal error occurred or a shutdown is requested (e.g. SIGTERM).
    pub async fn run(self) -> Result<()> {
        let http_server = {
            let cors = self.startup_settings.http.cors.clone();
            let store = self.store.clone();
            let repository = self.repository.clone();
            let confirmation = self.confirmation.clone();

            HttpServer::new(move || {
                App::new()
                    .wrap(TracingLogger::<ReducedSpanBuilder>::new())
                    .wrap(setup_cors(&cors))
                    .configure(configure_app(
                        store.clone(),
                        repository.clone(),
                        confirmation.clone(),
                    ))
            })
        };

        let address = (Ipv6Addr::UNSPECIFIED, self.startup_settings.http.port);

        let http_server = http_server.bind(address).with_context(|| {
            format!("Failed to bind http server to {}:{}", address.0, address.1)
        })?;

        log::info!("Startup finished");

        let http_server = http_server.disable_signals().run();
        let http_server_handle = http_server.handle();

        actix_rt::spawn(http_server);

        ctrl_c()
            .await
            .context("Failed to listen for termination signal")?;

        log::info!("Got termination signal, exiting");

        // ==== Begin shutdown sequence ====

        http_server_handle.stop(true).await;

        if let Some(connection) = self.rabbitmq {
            if let Err(e) = connection.close(0, "shutting down").await {
                log::error!("Failed to close RabbitMQ connection, {}", e);
            }
        }

        log::info!("All tasks stopped, goodbye!");

        Ok(())
    }
}

fn setup_cors(settings: &settings::HttpCors) -> Cors {
    let mut cors = Cors::default();

    if settings.allows_any_origin() {
        cors = cors.allow_any_origin();
    } else {
        for origin in &settings.allowed_origin {
            cors = cors.allowed_origin(origin)
        }
    }

    cors.allowed_header(header::CONTENT_TYPE)
        .allow_any_method()
}
