// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! RSVP registrations
//!
//! Every registration is stored as a field map under `rsvp:{email}`. All registered email
//! addresses are additionally collected in the `all_rsvps` set, which is only used for counting.
use crate::storage::{Fields, StoreError};
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use std::fmt;
use url::Url;
use validator::{Validate, ValidationError, ValidationErrors};

mod confirmation;
mod repository;

pub use confirmation::ConfirmationEngine;
pub use repository::RsvpRepository;

pub const RSVP_KEY_PREFIX: &str = "rsvp:";
pub const ALL_RSVPS_KEY: &str = "all_rsvps";

const FIELD_NAME: &str = "name";
const FIELD_EMAIL: &str = "email";
const FIELD_CREATED_AT: &str = "created_at";
const FIELD_CONFIRMED: &str = "confirmed";
const FIELD_CONFIRMATION_TOKEN: &str = "confirmation_token";
/// Creation time as written by records of the earlier deployment
const FIELD_LEGACY_TIMESTAMP: &str = "timestamp";

pub(crate) fn record_key(email: &str) -> String {
    format!("{RSVP_KEY_PREFIX}{email}")
}

#[derive(Debug, thiserror::Error)]
pub enum RsvpError {
    #[error("invalid registration: {0}")]
    InvalidInput(#[from] ValidationErrors),
    #[error("store is unavailable")]
    StoreUnavailable(#[from] StoreError),
    #[error("confirmation token does not match any registration")]
    InvalidToken,
    #[error("registration was stored but the confirmation could not be sent")]
    NotificationFailure(#[source] anyhow::Error),
}

/// Opaque secret which proves control over the registered email address
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ConfirmationToken(String);

impl ConfirmationToken {
    /// Generate a random confirmation token
    pub fn generate() -> Self {
        use rand::Rng;

        let token = rand::thread_rng()
            .sample_iter(rand::distributions::Alphanumeric)
            .take(64)
            .map(char::from)
            .collect();

        Self(token)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ConfirmationToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl fmt::Display for ConfirmationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ConfirmationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ConfirmationToken(***)")
    }
}

/// A registration as persisted in the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsvpRecord {
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub confirmed: bool,
    /// `None` for records written before confirmation links existed
    pub confirmation_token: Option<ConfirmationToken>,
}

impl RsvpRecord {
    /// Full field set, written on every submission
    pub(crate) fn to_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            (FIELD_NAME, self.name.clone()),
            (FIELD_EMAIL, self.email.clone()),
            (FIELD_CREATED_AT, self.created_at.timestamp().to_string()),
            (FIELD_CONFIRMED, self.confirmed.to_string()),
            (
                FIELD_CONFIRMATION_TOKEN,
                self.confirmation_token
                    .as_ref()
                    .map(|token| token.as_str().to_owned())
                    .unwrap_or_default(),
            ),
        ]
    }

    /// Parse the field map read from `key`
    ///
    /// Returns `Ok(None)` for an empty map, which is what the store returns for absent keys.
    pub(crate) fn from_fields(key: &str, mut fields: Fields) -> Result<Option<Self>, StoreError> {
        if fields.is_empty() {
            return Ok(None);
        }

        let invalid = |reason: String| StoreError::InvalidRecord {
            key: key.to_owned(),
            reason,
        };

        let name = fields
            .remove(FIELD_NAME)
            .ok_or_else(|| invalid(format!("missing field `{FIELD_NAME}`")))?;
        let email = fields
            .remove(FIELD_EMAIL)
            .ok_or_else(|| invalid(format!("missing field `{FIELD_EMAIL}`")))?;

        let created_at = match fields
            .remove(FIELD_CREATED_AT)
            .or_else(|| fields.remove(FIELD_LEGACY_TIMESTAMP))
        {
            Some(value) => {
                let seconds: i64 = value
                    .parse()
                    .map_err(|_| invalid(format!("invalid timestamp `{value}`")))?;

                Utc.timestamp_opt(seconds, 0)
                    .single()
                    .ok_or_else(|| invalid(format!("timestamp out of range `{value}`")))?
            }
            None => return Err(invalid(format!("missing field `{FIELD_CREATED_AT}`"))),
        };

        let confirmed = match fields.remove(FIELD_CONFIRMED).as_deref() {
            None | Some("false") => false,
            Some("true") => true,
            Some(other) => return Err(invalid(format!("invalid confirmed flag `{other}`"))),
        };

        let confirmation_token = fields
            .remove(FIELD_CONFIRMATION_TOKEN)
            .filter(|token| !token.is_empty())
            .map(ConfirmationToken);

        Ok(Some(Self {
            name,
            email,
            created_at,
            confirmed,
            confirmation_token,
        }))
    }
}

/// Registration request body
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewRsvp {
    #[validate(custom = "validate_name")]
    pub name: String,
    #[validate(email)]
    pub email: String,
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::new("empty"));
    }

    Ok(())
}

/// Outcome of a successful submission
#[derive(Debug, Clone)]
pub struct RsvpSubmission {
    pub token: ConfirmationToken,
    pub confirmation_url: Url,
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fields(pairs: &[(&str, &str)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn generated_tokens_are_long_and_distinct() {
        let a = ConfirmationToken::generate();
        let b = ConfirmationToken::generate();

        assert_eq!(a.as_str().len(), 64);
        assert!(a.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn token_is_hidden_in_debug_output() {
        let token = ConfirmationToken::from("secret".to_owned());

        assert_eq!(format!("{token:?}"), "ConfirmationToken(***)");
        assert_eq!(token.to_string(), "secret");
    }

    #[test]
    fn record_fields_parse_back() {
        let record = RsvpRecord {
            name: "Ana".into(),
            email: "a@x.com".into(),
            created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            confirmed: false,
            confirmation_token: Some("T0k3n".to_owned().into()),
        };

        let stored = record
            .to_fields()
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v))
            .collect();

        assert_eq!(
            RsvpRecord::from_fields("rsvp:a@x.com", stored).unwrap(),
            Some(record)
        );
    }

    #[test]
    fn legacy_record_is_unconfirmed_without_token() {
        let record = RsvpRecord::from_fields(
            "rsvp:a@x.com",
            fields(&[
                ("name", "Ana"),
                ("email", "a@x.com"),
                ("timestamp", "1690000000"),
            ]),
        )
        .unwrap()
        .unwrap();

        assert_eq!(record.created_at.timestamp(), 1_690_000_000);
        assert!(!record.confirmed);
        assert_eq!(record.confirmation_token, None);
    }

    #[test]
    fn empty_map_is_no_record() {
        assert_eq!(
            RsvpRecord::from_fields("rsvp:a@x.com", Fields::new()).unwrap(),
            None
        );
    }

    #[test]
    fn malformed_records_are_rejected() {
        let missing_name = RsvpRecord::from_fields(
            "rsvp:a@x.com",
            fields(&[("email", "a@x.com"), ("created_at", "1")]),
        );
        assert!(matches!(
            missing_name,
            Err(StoreError::InvalidRecord { .. })
        ));

        let bad_flag = RsvpRecord::from_fields(
            "rsvp:a@x.com",
            fields(&[
                ("name", "Ana"),
                ("email", "a@x.com"),
                ("created_at", "1"),
                ("confirmed", "yes"),
            ]),
        );
        assert!(matches!(bad_flag, Err(StoreError::InvalidRecord { .. })));

        let bad_time = RsvpRecord::from_fields(
            "rsvp:a@x.com",
            fields(&[("name", "Ana"), ("email", "a@x.com"), ("created_at", "now")]),
        );
        assert!(matches!(bad_time, Err(StoreError::InvalidRecord { .. })));
    }

    #[test]
    fn blank_names_and_bad_emails_are_invalid() {
        let valid = NewRsvp {
            name: "Ana".into(),
            email: "a@x.com".into(),
        };
        assert!(valid.validate().is_ok());

        let blank = NewRsvp {
            name: "   ".into(),
            email: "a@x.com".into(),
        };
        let errors = blank.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("name"));

        let bad_email = NewRsvp {
            name: "Ana".into(),
            email: "not-an-email".into(),
        };
        let errors = bad_email.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));
    }
}
