// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Status and info publishing.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::device::Plug;
use crate::error::{ParseError, Result};
use crate::response::{DeviceInfo, Realtime, SysInfo};

use super::names::NameResolver;
use super::topics::Topics;
use crate::protocol::Bus;

/// Normalized device summary published to `{instance}/status/{name}`.
///
/// Meter fields are omitted when the plug reports no reading.
///
/// # Examples
///
/// ```
/// use hs100_mqtt::bridge::StatusMessage;
///
/// let status = StatusMessage { val: true, power: Some(42.0), voltage: None, current: None, energy: None };
/// assert_eq!(serde_json::to_string(&status).unwrap(), r#"{"val":true,"power":42.0}"#);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusMessage {
    /// Relay state.
    pub val: bool,
    /// Active power in W.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power: Option<f64>,
    /// Voltage in V.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voltage: Option<f64>,
    /// Current in A.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<f64>,
    /// Cumulative energy in kWh.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy: Option<f64>,
}

impl StatusMessage {
    /// Builds the summary from a device snapshot.
    #[must_use]
    pub fn from_info(info: &DeviceInfo) -> Self {
        let realtime = info.realtime.as_ref();
        Self {
            val: info.sys_info.is_on(),
            power: realtime.and_then(Realtime::power),
            voltage: realtime.and_then(Realtime::voltage),
            current: realtime.and_then(Realtime::current),
            energy: realtime.and_then(Realtime::energy),
        }
    }
}

/// Raw snapshot published to `{instance}/info/{name}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoMessage<'a> {
    sys_info: &'a SysInfo,
    emeter: EmeterSnapshot,
    host: &'a str,
}

#[derive(Debug, Serialize)]
struct EmeterSnapshot {
    realtime: Realtime,
}

impl<'a> InfoMessage<'a> {
    /// Wraps `info`, tagging it with the device host.
    #[must_use]
    pub fn new(info: &'a DeviceInfo, host: &'a str) -> Self {
        Self {
            sys_info: &info.sys_info,
            emeter: EmeterSnapshot {
                realtime: info
                    .realtime
                    .as_ref()
                    .map(Realtime::normalized)
                    .unwrap_or_default(),
            },
            host,
        }
    }

    /// Converts the message to a JSON value.
    ///
    /// # Errors
    ///
    /// Returns a parse error if serialization fails.
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self).map_err(ParseError::from)?)
    }
}

/// Fetches device snapshots and publishes them on the bus.
pub struct TelemetryPublisher<B> {
    bus: Arc<B>,
    names: Arc<NameResolver>,
    topics: Topics,
}

impl<B: Bus> TelemetryPublisher<B> {
    /// Creates a publisher writing to `bus` under the `topics` layout.
    #[must_use]
    pub fn new(bus: Arc<B>, names: Arc<NameResolver>, topics: Topics) -> Self {
        Self { bus, names, topics }
    }

    /// Fetches one snapshot of `device` and publishes info then status.
    ///
    /// # Errors
    ///
    /// Returns error if the fetch fails or a publish cannot be queued.
    /// Nothing is published when the fetch fails.
    pub async fn try_publish<P: Plug>(&self, device: &P) -> Result<StatusMessage> {
        let info = device.get_info().await?;
        let host = device.host();
        let name = self.names.resolve(device.device_id());

        let status = StatusMessage::from_info(&info);
        let info_payload = InfoMessage::new(&info, &host).to_value()?;
        let status_payload = serde_json::to_value(&status).map_err(ParseError::from)?;

        self.bus
            .publish(&self.topics.info(name), &info_payload, false)
            .await?;
        self.bus
            .publish(&self.topics.status(name), &status_payload, false)
            .await?;

        Ok(status)
    }

    /// Like [`try_publish`](Self::try_publish), but logs failures instead of
    /// returning them.
    ///
    /// Skips the poll entirely while the bus is disconnected, so stale
    /// snapshots never pile up in the client queue.
    pub async fn publish<P: Plug>(&self, device: &P) {
        if !self.bus.is_connected() {
            tracing::debug!(device_id = device.device_id(), "Bus disconnected, skipping poll");
            return;
        }

        match self.try_publish(device).await {
            Ok(status) => tracing::debug!(
                device_id = device.device_id(),
                on = status.val,
                power = status.power,
                "Published telemetry"
            ),
            Err(e) => tracing::error!(
                device_id = device.device_id(),
                host = %device.host(),
                error = %e,
                "Failed to poll device"
            ),
        }
    }
}

impl<B> fmt::Debug for TelemetryPublisher<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelemetryPublisher")
            .field("instance", &self.topics.instance())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ProtocolError};
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct RecordingBus {
        published: Mutex<Vec<(String, Value)>>,
        disconnected: AtomicBool,
    }

    impl Bus for RecordingBus {
        async fn publish(
            &self,
            topic: &str,
            payload: &Value,
            _retain: bool,
        ) -> std::result::Result<(), ProtocolError> {
            self.published
                .lock()
                .push((topic.to_string(), payload.clone()));
            Ok(())
        }

        async fn subscribe(&self, _topic: &str) -> std::result::Result<(), ProtocolError> {
            Ok(())
        }

        fn is_connected(&self) -> bool {
            !self.disconnected.load(Ordering::SeqCst)
        }
    }

    struct StaticPlug {
        response: Option<Value>,
    }

    impl Plug for StaticPlug {
        fn device_id(&self) -> &str {
            "A1B2"
        }

        fn host(&self) -> String {
            "192.168.1.20".to_string()
        }

        async fn get_info(&self) -> Result<DeviceInfo> {
            match &self.response {
                Some(response) => DeviceInfo::from_response(response),
                None => Err(ProtocolError::Timeout(5000).into()),
            }
        }

        async fn set_power_state(&self, _on: bool) -> Result<()> {
            Ok(())
        }
    }

    fn sample_info() -> DeviceInfo {
        DeviceInfo::from_response(&json!({
            "system": {"get_sysinfo": {"deviceId": "A1B2", "alias": "Lamp", "relay_state": 1}},
            "emeter": {"get_realtime": {"power_mw": 42000, "voltage_mv": 230500, "current_ma": 180, "total_wh": 1250}}
        }))
        .unwrap()
    }

    fn publisher(bus: &Arc<RecordingBus>, names: NameResolver) -> TelemetryPublisher<RecordingBus> {
        TelemetryPublisher::new(Arc::clone(bus), Arc::new(names), Topics::new("hs100"))
    }

    #[test]
    fn status_from_meter_reading() {
        let status = StatusMessage::from_info(&sample_info());
        assert!(status.val);
        assert_eq!(status.power, Some(42.0));
        assert_eq!(status.voltage, Some(230.5));
        assert_eq!(status.current, Some(0.18));
        assert_eq!(status.energy, Some(1.25));
    }

    #[test]
    fn status_without_meter_has_only_val() {
        let info = DeviceInfo::from_response(&json!({
            "system": {"get_sysinfo": {"deviceId": "A1B2", "relay_state": 0}}
        }))
        .unwrap();

        let status = serde_json::to_value(StatusMessage::from_info(&info)).unwrap();
        assert_eq!(status, json!({"val": false}));
    }

    #[test]
    fn info_message_shape() {
        let info = sample_info();
        let value = InfoMessage::new(&info, "192.168.1.20").to_value().unwrap();

        assert_eq!(value["host"], "192.168.1.20");
        assert_eq!(value["sysInfo"]["deviceId"], "A1B2");
        assert_eq!(value["sysInfo"]["alias"], "Lamp");
        assert_eq!(value["emeter"]["realtime"]["power"], 42.0);
        assert_eq!(value["emeter"]["realtime"]["power_mw"], 42000.0);
    }

    #[test]
    fn info_message_keeps_sysinfo_as_reported() {
        let info = DeviceInfo::from_response(&json!({
            "system": {"get_sysinfo": {"deviceId": "A1B2", "mic_type": "IOT.SMARTPLUGSWITCH"}}
        }))
        .unwrap();
        let value = InfoMessage::new(&info, "192.168.1.20").to_value().unwrap();

        assert_eq!(
            value["sysInfo"],
            json!({"deviceId": "A1B2", "mic_type": "IOT.SMARTPLUGSWITCH"})
        );
    }

    #[tokio::test]
    async fn publishes_info_then_status_under_resolved_name() {
        let bus = Arc::new(RecordingBus::default());
        let names: NameResolver = [("A1B2", "lamp")].into_iter().collect();
        let plug = StaticPlug {
            response: Some(json!({
                "system": {"get_sysinfo": {"deviceId": "A1B2", "relay_state": 1}}
            })),
        };

        let status = publisher(&bus, names).try_publish(&plug).await.unwrap();
        assert!(status.val);

        let published = bus.published.lock();
        assert_eq!(published.len(), 2);
        assert_eq!(published[0].0, "hs100/info/lamp");
        assert_eq!(published[1].0, "hs100/status/lamp");
        assert_eq!(published[1].1, json!({"val": true}));
    }

    #[tokio::test]
    async fn fetch_failure_publishes_nothing() {
        let bus = Arc::new(RecordingBus::default());
        let plug = StaticPlug { response: None };
        let publisher = publisher(&bus, NameResolver::new());

        let result = publisher.try_publish(&plug).await;
        assert!(matches!(result, Err(Error::Protocol(ProtocolError::Timeout(5000)))));

        publisher.publish(&plug).await;
        assert!(bus.published.lock().is_empty());
    }

    #[tokio::test]
    async fn poll_is_skipped_while_bus_is_disconnected() {
        let bus = Arc::new(RecordingBus::default());
        let plug = StaticPlug {
            response: Some(json!({
                "system": {"get_sysinfo": {"deviceId": "A1B2", "relay_state": 1}}
            })),
        };
        let publisher = publisher(&bus, NameResolver::new());

        bus.disconnected.store(true, Ordering::SeqCst);
        publisher.publish(&plug).await;
        assert!(bus.published.lock().is_empty());

        bus.disconnected.store(false, Ordering::SeqCst);
        publisher.publish(&plug).await;
        assert_eq!(bus.published.lock().len(), 2);
    }
}
