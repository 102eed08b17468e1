// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `hs100_mqtt` - bridge TP-Link Kasa smart plugs to MQTT.
//!
//! Plugs are discovered on the local network, polled periodically and their
//! relay state and meter readings published to MQTT. Commands published to
//! the bus switch the relay.
//!
//! # Topics
//!
//! | Topic | Direction | Payload |
//! |---|---|---|
//! | `{instance}/maintenance/_bridge/online` | out, retained | `true`/`false` (last will) |
//! | `{instance}/maintenance/{name}/online` | out | `true`/`false` |
//! | `{instance}/status/{name}` | out | `{"val":true,"power":..,"voltage":..,"current":..,"energy":..}` |
//! | `{instance}/info/{name}` | out | `{"sysInfo":{..},"emeter":{"realtime":{..}},"host":".."}` |
//! | `{instance}/set/{name}` | in | `true`, `false` or `{"val":true}` |
//!
//! `{name}` is the display name from the device config file, or the device id.
//!
//! # Architecture
//!
//! - [`discovery`] probes the network and emits [`event::DeviceEvent`]s
//! - [`protocol::MqttBroker`] connects to the broker and emits [`event::BusEvent`]s
//! - [`bridge::Bridge`] consumes both, schedules polls and handles commands
//! - [`device::KasaPlug`] talks to a single plug over TCP
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use hs100_mqtt::bridge::{Bridge, NameResolver};
//! use hs100_mqtt::discovery::{Discovery, DiscoveryOptions};
//! use hs100_mqtt::protocol::MqttBroker;
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> hs100_mqtt::Result<()> {
//!     let (broker, bus_events) = MqttBroker::builder()
//!         .url("mqtt://192.168.1.50:1883")?
//!         .last_will("hs100/maintenance/_bridge/online", serde_json::json!(false))
//!         .build();
//!
//!     let (device_tx, device_events) = mpsc::channel(64);
//!     Discovery::bind(DiscoveryOptions::new()).await?.spawn(device_tx);
//!
//!     Bridge::new(Arc::new(broker), NameResolver::new(), "hs100", Duration::from_secs(10))
//!         .run(device_events, bus_events)
//!         .await;
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod config;
pub mod device;
pub mod discovery;
pub mod error;
pub mod event;
pub mod protocol;
pub mod response;

pub use bridge::{Bridge, NameResolver, PollScheduler, StatusMessage, Topics};
pub use config::Config;
pub use device::{KasaPlug, Plug};
pub use error::{DeviceError, Error, ParseError, ProtocolError, Result};
pub use event::{BusEvent, DeviceEvent};
pub use protocol::{Bus, MqttBroker, MqttBrokerBuilder};
pub use response::{DeviceInfo, Realtime, SysInfo};
