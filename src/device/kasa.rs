// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! TCP client for Kasa smart plugs.

use std::time::Duration;

use parking_lot::RwLock;
use serde_json::{Value, json};
use tokio::net::TcpStream;

use crate::device::Plug;
use crate::error::{ParseError, ProtocolError, Result};
use crate::protocol::kasa;
use crate::response::{DeviceInfo, module_result};

/// Handle for a Kasa plug (HS100, HS103, HS110, ...).
///
/// Every request opens a fresh TCP connection to port 9999, sends one
/// encrypted frame and reads one reply; the device closes idle connections
/// quickly so nothing is pooled.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use hs100_mqtt::device::{KasaPlug, Plug};
///
/// # async fn example() -> hs100_mqtt::Result<()> {
/// let plug = KasaPlug::new("8006F2D5B0E8C7A1", "192.168.1.60")
///     .with_timeout(Duration::from_secs(3));
///
/// let info = plug.get_info().await?;
/// plug.set_power_state(!info.sys_info.is_on()).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct KasaPlug {
    device_id: String,
    host: RwLock<String>,
    port: u16,
    timeout: Duration,
}

impl KasaPlug {
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Creates a handle for the device reachable at `host`.
    #[must_use]
    pub fn new(device_id: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            host: RwLock::new(host.into()),
            port: kasa::DEFAULT_PORT,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Sets a custom port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the request timeout (connect, write and read combined).
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Updates the host after the device changed its address.
    pub fn set_host(&self, host: impl Into<String>) {
        *self.host.write() = host.into();
    }

    /// Sends a raw JSON request and returns the decoded reply.
    ///
    /// # Errors
    ///
    /// Returns error on connection failure, timeout or a non-JSON reply.
    pub async fn request(&self, request: &Value) -> Result<Value> {
        let host = self.host();
        let port = self.port;
        let payload = request.to_string();

        tracing::trace!(device_id = %self.device_id, %host, request = %payload, "Sending Kasa request");

        let exchange = async {
            let mut stream = TcpStream::connect((host.as_str(), port)).await?;
            kasa::write_frame(&mut stream, payload.as_bytes()).await?;
            let reply = kasa::read_frame(&mut stream).await?;
            Ok::<_, ProtocolError>(reply)
        };

        // Safe: request timeouts are seconds, far below u64::MAX milliseconds
        #[allow(clippy::cast_possible_truncation)]
        let timeout_ms = self.timeout.as_millis() as u64;

        let reply = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| ProtocolError::Timeout(timeout_ms))??;

        let value: Value = serde_json::from_slice(&reply).map_err(ParseError::from)?;
        tracing::trace!(device_id = %self.device_id, reply = %value, "Received Kasa reply");
        Ok(value)
    }
}

impl Plug for KasaPlug {
    fn device_id(&self) -> &str {
        &self.device_id
    }

    fn host(&self) -> String {
        self.host.read().clone()
    }

    async fn get_info(&self) -> Result<DeviceInfo> {
        let request = json!({
            "system": {"get_sysinfo": {}},
            "emeter": {"get_realtime": {}},
        });
        let response = self.request(&request).await?;
        DeviceInfo::from_response(&response)
    }

    async fn set_power_state(&self, on: bool) -> Result<()> {
        let request = json!({
            "system": {"set_relay_state": {"state": u8::from(on)}},
        });
        let response = self.request(&request).await?;
        module_result(&response, "system", "set_relay_state")?;
        Ok(())
    }
}
