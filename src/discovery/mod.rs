// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Kasa device discovery over UDP.
//!
//! Once per discovery interval an encrypted `get_sysinfo` probe is broadcast
//! to `255.255.255.255:9999` and sent to every statically configured host.
//! Plugs answer with their sysinfo, which a [`DiscoveryTracker`] turns into
//! lifecycle events:
//!
//! | Tracked state | Sighting | Missed more than `offline_tolerance` rounds |
//! |---|---|---|
//! | unknown | `New` | - |
//! | discovered | `Online` | `Offline` |
//! | online | none, host refreshed | `Offline` |
//! | offline | `Online` | none |
//!
//! # Examples
//!
//! ```no_run
//! use std::time::Duration;
//! use hs100_mqtt::discovery::{Discovery, DiscoveryOptions};
//! use tokio::sync::mpsc;
//!
//! # async fn example() -> hs100_mqtt::Result<()> {
//! let options = DiscoveryOptions::new()
//!     .with_interval(Duration::from_secs(10))
//!     .with_static_hosts(["192.168.1.60"]);
//!
//! let (tx, mut rx) = mpsc::channel(64);
//! Discovery::bind(options).await?.spawn(tx);
//!
//! while let Some(event) = rx.recv().await {
//!     println!("{event:?}");
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::device::{KasaPlug, Plug};
use crate::error::{ParseError, ProtocolError, Result};
use crate::event::DeviceEvent;
use crate::protocol::kasa;
use crate::response::{SysInfo, module_result};

const SYSINFO_PROBE: &str = r#"{"system":{"get_sysinfo":{}}}"#;
const BROADCAST_ADDR: &str = "255.255.255.255";

/// Options for the discovery loop.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use hs100_mqtt::discovery::DiscoveryOptions;
///
/// let options = DiscoveryOptions::new()
///     .with_offline_tolerance(5)
///     .with_device_timeout(Duration::from_secs(2));
/// assert_eq!(options.offline_tolerance(), 5);
/// assert_eq!(options.port(), 9999);
/// ```
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    interval: Duration,
    offline_tolerance: u32,
    static_hosts: Vec<String>,
    broadcast: bool,
    port: u16,
    device_timeout: Duration,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            offline_tolerance: 3,
            static_hosts: Vec::new(),
            broadcast: true,
            port: kasa::DEFAULT_PORT,
            device_timeout: KasaPlug::DEFAULT_TIMEOUT,
        }
    }
}

impl DiscoveryOptions {
    /// Creates options with the defaults: 10 s interval, 3 missed rounds,
    /// broadcast enabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the time between two probe rounds.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets how many rounds a device may miss before it is reported offline.
    #[must_use]
    pub fn with_offline_tolerance(mut self, rounds: u32) -> Self {
        self.offline_tolerance = rounds;
        self
    }

    /// Adds hosts probed directly every round.
    #[must_use]
    pub fn with_static_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.static_hosts.extend(hosts.into_iter().map(Into::into));
        self
    }

    /// Enables or disables the broadcast probe.
    #[must_use]
    pub fn with_broadcast(mut self, enabled: bool) -> Self {
        self.broadcast = enabled;
        self
    }

    /// Sets the device port, used for both probes and requests.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the request timeout of discovered plugs.
    #[must_use]
    pub fn with_device_timeout(mut self, timeout: Duration) -> Self {
        self.device_timeout = timeout;
        self
    }

    /// Returns the probe interval.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns the offline tolerance in rounds.
    #[must_use]
    pub fn offline_tolerance(&self) -> u32 {
        self.offline_tolerance
    }

    /// Returns the statically configured hosts.
    #[must_use]
    pub fn static_hosts(&self) -> &[String] {
        &self.static_hosts
    }

    /// Returns the device port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrackedState {
    Discovered,
    Online,
    Offline,
}

#[derive(Debug)]
struct Tracked {
    plug: Arc<KasaPlug>,
    last_seen: u64,
    state: TrackedState,
}

/// Turns discovery sightings into lifecycle events.
///
/// Pure bookkeeping, no I/O; the caller drives it with
/// [`begin_round`](Self::begin_round), [`observe`](Self::observe) and
/// [`sweep`](Self::sweep).
#[derive(Debug)]
pub struct DiscoveryTracker {
    round: u64,
    offline_tolerance: u32,
    port: u16,
    device_timeout: Duration,
    devices: HashMap<String, Tracked>,
}

impl DiscoveryTracker {
    /// Creates a tracker whose plugs use `options`' port and timeout.
    #[must_use]
    pub fn new(options: &DiscoveryOptions) -> Self {
        Self {
            round: 0,
            offline_tolerance: options.offline_tolerance,
            port: options.port,
            device_timeout: options.device_timeout,
            devices: HashMap::new(),
        }
    }

    /// Starts a new probe round.
    pub fn begin_round(&mut self) {
        self.round += 1;
    }

    /// Returns the current round number.
    #[must_use]
    pub fn round(&self) -> u64 {
        self.round
    }

    /// Returns the number of tracked devices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Returns `true` if no device has been seen yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Records a reply from `host`.
    pub fn observe(&mut self, sys_info: &SysInfo, host: &str) -> Option<DeviceEvent<KasaPlug>> {
        let round = self.round;
        let Some(tracked) = self.devices.get_mut(&sys_info.device_id) else {
            let plug = Arc::new(
                KasaPlug::new(&sys_info.device_id, host)
                    .with_port(self.port)
                    .with_timeout(self.device_timeout),
            );
            self.devices.insert(
                sys_info.device_id.clone(),
                Tracked {
                    plug: Arc::clone(&plug),
                    last_seen: round,
                    state: TrackedState::Discovered,
                },
            );
            return Some(DeviceEvent::new_device(plug));
        };

        tracked.last_seen = round;
        if tracked.plug.host() != host {
            tracing::info!(device_id = %sys_info.device_id, host, "Device host changed");
            tracked.plug.set_host(host);
        }

        match tracked.state {
            TrackedState::Online => None,
            TrackedState::Discovered | TrackedState::Offline => {
                tracked.state = TrackedState::Online;
                Some(DeviceEvent::online(Arc::clone(&tracked.plug)))
            }
        }
    }

    /// Reports devices that missed too many rounds.
    pub fn sweep(&mut self) -> Vec<DeviceEvent<KasaPlug>> {
        let round = self.round;
        let tolerance = u64::from(self.offline_tolerance);

        self.devices
            .values_mut()
            .filter(|tracked| tracked.state != TrackedState::Offline)
            .filter(|tracked| round.saturating_sub(tracked.last_seen) > tolerance)
            .map(|tracked| {
                tracked.state = TrackedState::Offline;
                DeviceEvent::offline(Arc::clone(&tracked.plug))
            })
            .collect()
    }
}

/// Parses a discovery reply datagram.
///
/// # Errors
///
/// Returns error if the datagram is not an encrypted sysinfo reply.
pub fn parse_response(datagram: &[u8]) -> Result<SysInfo> {
    let plain = kasa::decrypt(datagram);
    let response: Value = serde_json::from_slice(&plain).map_err(ParseError::from)?;
    let sys_info = module_result(&response, "system", "get_sysinfo")?;
    Ok(serde_json::from_value(sys_info.clone()).map_err(ParseError::from)?)
}

/// The discovery loop.
#[derive(Debug)]
pub struct Discovery {
    socket: UdpSocket,
    options: DiscoveryOptions,
    tracker: DiscoveryTracker,
}

impl Discovery {
    /// Binds the probe socket on an ephemeral port.
    ///
    /// # Errors
    ///
    /// Returns error if the socket cannot be bound or broadcast enabled.
    pub async fn bind(options: DiscoveryOptions) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0").await.map_err(|e| {
            ProtocolError::ConnectionFailed(format!("cannot bind discovery socket: {e}"))
        })?;
        socket.set_broadcast(options.broadcast).map_err(ProtocolError::from)?;

        let tracker = DiscoveryTracker::new(&options);
        Ok(Self {
            socket,
            options,
            tracker,
        })
    }

    /// Spawns the loop; it ends when `events` is closed.
    pub fn spawn(self, events: mpsc::Sender<DeviceEvent<KasaPlug>>) -> JoinHandle<()> {
        tokio::spawn(self.run(events))
    }

    /// Runs the loop until `events` is closed.
    pub async fn run(mut self, events: mpsc::Sender<DeviceEvent<KasaPlug>>) {
        let probe = kasa::encrypt(SYSINFO_PROBE.as_bytes());
        let mut ticker = tokio::time::interval(self.options.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut buf = vec![0u8; kasa::MAX_FRAME_LEN];

        tracing::info!(
            interval_s = self.options.interval.as_secs(),
            static_hosts = self.options.static_hosts.len(),
            "Discovery started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    for event in self.tracker.sweep() {
                        tracing::debug!(device_id = event.device_id(), "Device missed discovery rounds");
                        if events.send(event).await.is_err() {
                            return;
                        }
                    }
                    self.tracker.begin_round();
                    self.send_probes(&probe).await;
                }
                received = self.socket.recv_from(&mut buf) => {
                    let (len, peer) = match received {
                        Ok(received) => received,
                        Err(e) => {
                            tracing::warn!(error = %e, "Discovery receive failed");
                            continue;
                        }
                    };
                    let sys_info = match parse_response(&buf[..len]) {
                        Ok(sys_info) => sys_info,
                        Err(e) => {
                            tracing::debug!(%peer, error = %e, "Ignoring discovery reply");
                            continue;
                        }
                    };
                    let host = peer.ip().to_string();
                    if let Some(event) = self.tracker.observe(&sys_info, &host)
                        && events.send(event).await.is_err()
                    {
                        return;
                    }
                }
            }
        }
    }

    async fn send_probes(&self, probe: &[u8]) {
        let port = self.options.port;
        if self.options.broadcast
            && let Err(e) = self.socket.send_to(probe, (BROADCAST_ADDR, port)).await
        {
            tracing::warn!(error = %e, "Discovery broadcast failed");
        }
        for host in &self.options.static_hosts {
            if let Err(e) = self.socket.send_to(probe, (host.as_str(), port)).await {
                tracing::warn!(host = %host, error = %e, "Discovery probe failed");
            }
        }
    }
}
