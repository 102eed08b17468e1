// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device lifecycle orchestration.
//!
//! The [`Bridge`] is an actor: a single task owns the device table, the
//! command topic table and the [`PollScheduler`], and reacts to two event
//! streams:
//!
//! - [`DeviceEvent`]s from discovery drive the per-device state machine
//!   `Unknown -> Discovered -> Online <-> Offline`.
//! - [`BusEvent`]s from the MQTT connection announce the bridge and carry
//!   inbound commands.
//!
//! Fetches and relay requests run in spawned tasks, so the actor never waits
//! on a device.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use hs100_mqtt::bridge::{Bridge, NameResolver};
//! use hs100_mqtt::device::KasaPlug;
//! use hs100_mqtt::protocol::MqttBroker;
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> hs100_mqtt::Result<()> {
//!     let (broker, bus_events) = MqttBroker::builder().url("mqtt://127.0.0.1")?.build();
//!     let (_device_tx, device_events) = mpsc::channel(64);
//!
//!     let bridge: Bridge<MqttBroker, KasaPlug> =
//!         Bridge::new(Arc::new(broker), NameResolver::new(), "hs100", Duration::from_secs(10));
//!     bridge.run(device_events, bus_events).await;
//!     Ok(())
//! }
//! ```

mod command;
mod names;
mod scheduler;
mod telemetry;
mod topics;

pub use command::parse_command;
pub use names::NameResolver;
pub use scheduler::{PollFn, PollScheduler};
pub use telemetry::{InfoMessage, StatusMessage, TelemetryPublisher};
pub use topics::Topics;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::device::Plug;
use crate::event::{BusEvent, DeviceEvent};
use crate::protocol::Bus;

/// Lifecycle state of a device known to the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Seen for the first time, polling started.
    Discovered,
    /// Reachable again after being offline.
    Online,
    /// Unreachable, polling paused.
    Offline,
}

struct ManagedDevice<P> {
    device: Arc<P>,
    name: String,
    state: LifecycleState,
}

/// Bridges discovered plugs to the bus.
pub struct Bridge<B, P> {
    bus: Arc<B>,
    names: Arc<NameResolver>,
    topics: Topics,
    publisher: Arc<TelemetryPublisher<B>>,
    scheduler: PollScheduler,
    poll_interval: Duration,
    devices: HashMap<String, ManagedDevice<P>>,
    /// Command topic to device id.
    commands: HashMap<String, String>,
}

impl<B: Bus, P: Plug> Bridge<B, P> {
    /// Creates a bridge publishing under the `instance` topic prefix.
    #[must_use]
    pub fn new(
        bus: Arc<B>,
        names: NameResolver,
        instance: impl Into<String>,
        poll_interval: Duration,
    ) -> Self {
        let names = Arc::new(names);
        let topics = Topics::new(instance);
        let publisher = Arc::new(TelemetryPublisher::new(
            Arc::clone(&bus),
            Arc::clone(&names),
            topics.clone(),
        ));

        Self {
            bus,
            names,
            topics,
            publisher,
            scheduler: PollScheduler::new(),
            poll_interval,
            devices: HashMap::new(),
            commands: HashMap::new(),
        }
    }

    /// Returns the poll scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &PollScheduler {
        &self.scheduler
    }

    /// Returns the lifecycle state of `device_id`, `None` if never seen.
    #[must_use]
    pub fn lifecycle_state(&self, device_id: &str) -> Option<LifecycleState> {
        self.devices.get(device_id).map(|managed| managed.state)
    }

    /// Returns the number of known devices.
    #[must_use]
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// Processes events until both channels are closed.
    pub async fn run(
        mut self,
        mut device_events: mpsc::Receiver<DeviceEvent<P>>,
        mut bus_events: mpsc::UnboundedReceiver<BusEvent>,
    ) {
        tracing::info!(instance = self.topics.instance(), "Bridge started");
        loop {
            tokio::select! {
                Some(event) = device_events.recv() => self.handle_device_event(event).await,
                Some(event) = bus_events.recv() => self.handle_bus_event(event).await,
                else => break,
            }
        }
        tracing::info!(instance = self.topics.instance(), "Bridge stopped");
    }

    /// Applies a device lifecycle event.
    pub async fn handle_device_event(&mut self, event: DeviceEvent<P>) {
        match event {
            DeviceEvent::New(device) => self.on_new(device).await,
            DeviceEvent::Online(device) => self.on_online(&device).await,
            DeviceEvent::Offline(device) => self.on_offline(&device).await,
        }
    }

    /// Applies a bus event.
    pub async fn handle_bus_event(&mut self, event: BusEvent) {
        match event {
            BusEvent::Connected => {
                tracing::info!(instance = self.topics.instance(), "Connected to broker");
                self.publish_flag(&self.topics.bridge_online(), true, true)
                    .await;
            }
            BusEvent::Message { topic, payload } => self.on_command(&topic, &payload),
        }
    }

    async fn on_new(&mut self, device: Arc<P>) {
        let device_id = device.device_id().to_string();
        let name = self.names.resolve(&device_id).to_string();
        tracing::info!(device_id = %device_id, name = %name, host = %device.host(), "New device");

        self.publish_flag(&self.topics.device_online(&name), true, false)
            .await;

        let set_topic = self.topics.set(&name);
        match self.commands.insert(set_topic.clone(), device_id.clone()) {
            Some(owner) if owner == device_id => {}
            previous => {
                if let Some(owner) = previous {
                    tracing::warn!(topic = %set_topic, previous = %owner, device_id = %device_id, "Command topic reassigned");
                }
                if let Err(e) = self.bus.subscribe(&set_topic).await {
                    tracing::error!(topic = %set_topic, error = %e, "Failed to subscribe to command topic");
                }
            }
        }

        let poll = self.poll_fn(&device);
        poll();
        self.scheduler.register(&device_id, poll, self.poll_interval);

        self.devices.insert(
            device_id,
            ManagedDevice {
                device,
                name,
                state: LifecycleState::Discovered,
            },
        );
    }

    async fn on_online(&mut self, device: &Arc<P>) {
        let Some(managed) = self.devices.get_mut(device.device_id()) else {
            tracing::debug!(device_id = device.device_id(), "Ignoring online event for unknown device");
            return;
        };
        managed.state = LifecycleState::Online;
        let name = managed.name.clone();
        tracing::info!(device_id = device.device_id(), name = %name, "Device online");

        self.publish_flag(&self.topics.device_online(&name), true, false)
            .await;
        self.scheduler.start(device.device_id(), self.poll_interval);
    }

    async fn on_offline(&mut self, device: &Arc<P>) {
        let Some(managed) = self.devices.get_mut(device.device_id()) else {
            tracing::debug!(device_id = device.device_id(), "Ignoring offline event for unknown device");
            return;
        };
        managed.state = LifecycleState::Offline;
        let name = managed.name.clone();
        tracing::warn!(device_id = device.device_id(), name = %name, "Device offline");

        self.publish_flag(&self.topics.device_online(&name), false, false)
            .await;
        self.scheduler.stop(device.device_id());
    }

    fn on_command(&self, topic: &str, payload: &[u8]) {
        let Some(device_id) = self.commands.get(topic) else {
            tracing::trace!(topic, "Ignoring message on unknown topic");
            return;
        };
        let Some(managed) = self.devices.get(device_id) else {
            return;
        };

        command::dispatch(&managed.device, payload);
        self.scheduler.trigger_now(device_id);
    }

    fn poll_fn(&self, device: &Arc<P>) -> PollFn {
        let publisher = Arc::clone(&self.publisher);
        let device = Arc::clone(device);
        Arc::new(move || {
            let publisher = Arc::clone(&publisher);
            let device = Arc::clone(&device);
            tokio::spawn(async move {
                publisher.publish(device.as_ref()).await;
            });
        })
    }

    async fn publish_flag(&self, topic: &str, online: bool, retain: bool) {
        if let Err(e) = self.bus.publish(topic, &Value::Bool(online), retain).await {
            tracing::error!(topic, error = %e, "Failed to publish maintenance flag");
        }
    }
}

impl<B, P> std::fmt::Debug for Bridge<B, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("instance", &self.topics.instance())
            .field("devices", &self.devices.len())
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}
