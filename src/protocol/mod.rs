// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wire protocols.
//!
//! - [`kasa`]: the XOR-obfuscated JSON protocol spoken by Kasa plugs
//! - [`MqttBroker`]: the MQTT connection the bridge publishes to
//!
//! The bridge only depends on the [`Bus`] trait, which [`MqttBroker`]
//! implements.

pub mod kasa;
mod mqtt_broker;

pub(crate) use mqtt_broker::short_id;
pub use mqtt_broker::{MqttBroker, MqttBrokerBuilder, MqttBrokerConfig, parse_mqtt_url};

use std::future::Future;

use serde_json::Value;

use crate::error::ProtocolError;

/// Publish/subscribe primitives used by the bridge.
pub trait Bus: Send + Sync + 'static {
    /// Publishes a JSON payload.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the message cannot be queued.
    fn publish(
        &self,
        topic: &str,
        payload: &Value,
        retain: bool,
    ) -> impl Future<Output = Result<(), ProtocolError>> + Send;

    /// Subscribes to a topic; matching messages arrive as
    /// [`BusEvent::Message`](crate::event::BusEvent::Message).
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the subscription cannot be queued.
    fn subscribe(&self, topic: &str) -> impl Future<Output = Result<(), ProtocolError>> + Send;

    /// Returns `false` while publishes would only queue up behind a lost
    /// connection.
    fn is_connected(&self) -> bool {
        true
    }
}
