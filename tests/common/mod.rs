// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory bus and plug shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use hs100_mqtt::protocol::Bus;
use hs100_mqtt::{DeviceInfo, Plug, ProtocolError};
use parking_lot::Mutex;
use serde_json::{Value, json};

/// A message recorded by [`RecordingBus`].
#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub topic: String,
    pub payload: Value,
    pub retain: bool,
}

/// Bus that records every publish and subscription.
#[derive(Debug, Default)]
pub struct RecordingBus {
    published: Mutex<Vec<Published>>,
    subscriptions: Mutex<Vec<String>>,
}

impl RecordingBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn published(&self) -> Vec<Published> {
        self.published.lock().clone()
    }

    pub fn topics(&self) -> Vec<String> {
        self.published
            .lock()
            .iter()
            .map(|p| p.topic.clone())
            .collect()
    }

    /// Payloads published to `topic`, oldest first.
    pub fn payloads(&self, topic: &str) -> Vec<Value> {
        self.published
            .lock()
            .iter()
            .filter(|p| p.topic == topic)
            .map(|p| p.payload.clone())
            .collect()
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.subscriptions.lock().clone()
    }

    pub fn clear(&self) {
        self.published.lock().clear();
    }
}

impl Bus for RecordingBus {
    async fn publish(&self, topic: &str, payload: &Value, retain: bool) -> Result<(), ProtocolError> {
        self.published.lock().push(Published {
            topic: topic.to_string(),
            payload: payload.clone(),
            retain,
        });
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<(), ProtocolError> {
        self.subscriptions.lock().push(topic.to_string());
        Ok(())
    }
}

/// Plug that answers from memory and counts calls.
#[derive(Debug)]
pub struct FakePlug {
    device_id: String,
    on: AtomicBool,
    failing: AtomicBool,
    info_calls: AtomicUsize,
    set_calls: Mutex<Vec<bool>>,
}

impl FakePlug {
    pub fn new(device_id: &str) -> Arc<Self> {
        Arc::new(Self {
            device_id: device_id.to_string(),
            on: AtomicBool::new(false),
            failing: AtomicBool::new(false),
            info_calls: AtomicUsize::new(0),
            set_calls: Mutex::new(Vec::new()),
        })
    }

    /// Makes subsequent `get_info` calls fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn info_calls(&self) -> usize {
        self.info_calls.load(Ordering::SeqCst)
    }

    pub fn set_calls(&self) -> Vec<bool> {
        self.set_calls.lock().clone()
    }
}

impl Plug for FakePlug {
    fn device_id(&self) -> &str {
        &self.device_id
    }

    fn host(&self) -> String {
        "192.168.1.20".to_string()
    }

    async fn get_info(&self) -> hs100_mqtt::Result<DeviceInfo> {
        self.info_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(ProtocolError::Timeout(5000).into());
        }

        DeviceInfo::from_response(&json!({
            "system": {"get_sysinfo": {
                "deviceId": self.device_id,
                "alias": "Fake",
                "relay_state": u8::from(self.on.load(Ordering::SeqCst)),
                "feature": "TIM:ENE",
                "err_code": 0
            }},
            "emeter": {"get_realtime": {
                "power": 12.5, "voltage": 231.0, "current": 0.06, "total": 4.2, "err_code": 0
            }}
        }))
    }

    async fn set_power_state(&self, on: bool) -> hs100_mqtt::Result<()> {
        self.set_calls.lock().push(on);
        self.on.store(on, Ordering::SeqCst);
        Ok(())
    }
}
