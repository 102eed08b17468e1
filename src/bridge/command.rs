// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Inbound power commands.

use std::sync::Arc;

use serde_json::Value;

use crate::device::Plug;
use crate::event::decode_payload;

/// Interprets a command payload.
///
/// Accepts `true`/`false` and `{"val": true|false}`. Every other shape
/// yields `None`.
///
/// # Examples
///
/// ```
/// use hs100_mqtt::bridge::parse_command;
/// use serde_json::json;
///
/// assert_eq!(parse_command(&json!({"val": true})), Some(true));
/// assert_eq!(parse_command(&json!(false)), Some(false));
/// assert_eq!(parse_command(&json!("toggle")), None);
/// ```
#[must_use]
pub fn parse_command(payload: &Value) -> Option<bool> {
    match payload {
        Value::Bool(on) => Some(*on),
        Value::Object(fields) => fields.get("val").and_then(Value::as_bool),
        _ => None,
    }
}

/// Applies a raw command payload to `device`.
///
/// The relay request runs in its own task and its outcome is only logged.
/// Returns the requested state, or `None` if the payload was ignored.
pub(crate) fn dispatch<P: Plug>(device: &Arc<P>, payload: &[u8]) -> Option<bool> {
    let Some(on) = parse_command(&decode_payload(payload)) else {
        tracing::trace!(device_id = device.device_id(), "Ignoring unrecognized command payload");
        return None;
    };

    tracing::info!(device_id = device.device_id(), on, "Setting power state");
    let device = Arc::clone(device);
    tokio::spawn(async move {
        match device.set_power_state(on).await {
            Ok(()) => tracing::debug!(device_id = device.device_id(), on, "Power state set"),
            Err(e) => tracing::warn!(
                device_id = device.device_id(),
                on,
                error = %e,
                "Failed to set power state"
            ),
        }
    });

    Some(on)
}
