// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Events emitted by the messaging transport.

use serde_json::Value;

/// Event delivered by the bus connection.
#[derive(Debug, Clone, PartialEq)]
pub enum BusEvent {
    /// The broker acknowledged a (re)connection.
    Connected,

    /// A message arrived on a subscribed topic.
    Message {
        /// Full topic name.
        topic: String,
        /// Raw payload bytes.
        payload: Vec<u8>,
    },
}

impl BusEvent {
    /// Creates a message event.
    #[must_use]
    pub fn message(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self::Message {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Decodes a bus payload the way smart-home MQTT conventions expect.
///
/// Payloads that are valid JSON are returned as parsed values; anything else
/// (including invalid UTF-8) is returned as a JSON string.
///
/// # Examples
///
/// ```
/// use hs100_mqtt::event::decode_payload;
/// use serde_json::json;
///
/// assert_eq!(decode_payload(b"true"), json!(true));
/// assert_eq!(decode_payload(br#"{"val":false}"#), json!({"val": false}));
/// assert_eq!(decode_payload(b"toggle"), json!("toggle"));
/// ```
#[must_use]
pub fn decode_payload(payload: &[u8]) -> Value {
    serde_json::from_slice(payload)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(payload).into_owned()))
}
