// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! MailService
//!
//! Hands confirmation mails to the external mail worker via RabbitMQ.
use super::Notifier;
use anyhow::{Context, Result};
use async_trait::async_trait;
use controller_shared::settings::RabbitMqConfig;
use lapin::options::{BasicPublishOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use mail_worker_proto::MailTask;
use url::Url;

/// Connect to RabbitMQ and open the channel used for publishing mail tasks
///
/// Declares the mail task queue if one is configured.
pub async fn connect(config: &RabbitMqConfig) -> Result<(Connection, Channel)> {
    let properties = ConnectionProperties::default()
        .with_executor(tokio_executor_trait::Tokio::current())
        .with_reactor(tokio_reactor_trait::Tokio);

    let connection = Connection::connect(&config.url, properties)
        .await
        .context("failed to connect to rabbitmq")?;

    let channel = connection
        .create_channel()
        .await
        .context("failed to create rabbitmq channel")?;

    if let Some(queue) = &config.mail_task_queue {
        channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .with_context(|| format!("failed to declare mail task queue {queue}"))?;
    }

    Ok((connection, channel))
}

#[derive(Clone)]
pub struct MailService {
    mail_task_queue: Option<String>,
    rabbit_mq_channel: Option<Channel>,
}

impl MailService {
    pub fn new(mail_task_queue: Option<String>, rabbit_mq_channel: Channel) -> Self {
        Self {
            mail_task_queue,
            rabbit_mq_channel: Some(rabbit_mq_channel),
        }
    }

    /// A mail service that drops every mail task
    pub fn disabled() -> Self {
        Self {
            mail_task_queue: None,
            rabbit_mq_channel: None,
        }
    }

    async fn send_to_rabbitmq(&self, mail_task: MailTask) -> Result<()> {
        let (queue_name, channel) = match (&self.mail_task_queue, &self.rabbit_mq_channel) {
            (Some(queue_name), Some(channel)) => (queue_name, channel),
            _ => {
                log::warn!(
                    "No mail task queue configured, dropping {} mail task",
                    mail_task.as_kind_str()
                );
                return Ok(());
            }
        };

        channel
            .basic_publish(
                "",
                queue_name,
                BasicPublishOptions::default(),
                &serde_json::to_vec(&mail_task).context("Failed to serialize mail_task")?,
                BasicProperties::default(),
            )
            .await
            .context("Failed to publish mail_task")?;

        log::debug!("Issued {} mail task", mail_task.as_kind_str());

        Ok(())
    }
}

#[async_trait]
impl Notifier for MailService {
    /// Sends a RSVP confirmation mail task to the rabbit mq queue, if configured.
    async fn send(&self, destination: &str, confirmation_url: &Url) -> Result<()> {
        let mail_task = MailTask::rsvp_confirmation(destination, confirmation_url.as_str());

        self.send_to_rabbitmq(mail_task).await
    }
}
