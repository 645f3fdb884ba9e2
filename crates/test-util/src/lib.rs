// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Test utility functions for use with the controller
pub use ::serde_json;
pub use pretty_assertions::assert_eq;

#[cfg(feature = "controller")]
pub use notifier::{FailingNotifier, RecordingNotifier, SentConfirmation};

#[cfg(feature = "controller")]
pub mod notifier;

#[cfg(feature = "controller")]
pub mod redis;

/// Helper macro to compare a `[Serialize]` implementor with a JSON literal
///
/// Asserts that the left expression equals the right JSON literal when serialized.
///
/// # Examples
///
/// ```
/// use serde::Serialize;
///
/// #[derive(Debug, Serialize)]
/// struct Count {
///     count: u64,
/// }
///
/// #[test]
/// fn test_count() {
///     assert_eq_json!(Count { count: 3 }, { "count": 3 });
/// }
/// ```
#[macro_export]
macro_rules! assert_eq_json {
    ($val:expr,$($json:tt)+) => {
        let val: $crate::serde_json::Value = $crate::serde_json::to_value(&$val).expect("Expected value to be serializable");

        $crate::assert_eq!(val, $crate::serde_json::json!($($json)+));
    };
}
