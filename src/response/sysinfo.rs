// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! System information (`system.get_sysinfo`) response parsing.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// System information reported by a Kasa plug.
///
/// Only the fields the bridge interprets are typed; everything else the
/// firmware sends is preserved in [`extra`](Self::extra) so the info channel
/// can republish the snapshot unmodified.
///
/// # Examples
///
/// ```
/// use hs100_mqtt::response::SysInfo;
///
/// let json = r#"{"deviceId":"8006A1B2","alias":"Lamp","model":"HS110(EU)","relay_state":1,"feature":"TIM:ENE"}"#;
/// let info: SysInfo = serde_json::from_str(json).unwrap();
/// assert!(info.is_on());
/// assert!(info.has_emeter());
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SysInfo {
    /// Stable, vendor-assigned device identifier.
    #[serde(rename = "deviceId")]
    pub device_id: String,

    /// Name configured in the Kasa app.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    /// Hardware model, e.g. `HS100(EU)`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Relay state, `1` when switched on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relay_state: Option<u8>,

    /// Feature flags, `TIM:ENE` on plugs with an energy meter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature: Option<String>,

    /// All other fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SysInfo {
    /// Returns `true` if the relay is switched on.
    #[must_use]
    pub fn is_on(&self) -> bool {
        self.relay_state == Some(1)
    }

    /// Returns `true` if the plug advertises an energy meter.
    #[must_use]
    pub fn has_emeter(&self) -> bool {
        self.feature
            .as_deref()
            .is_some_and(|feature| feature.split(':').any(|f| f == "ENE"))
    }

    /// Returns the configured name, empty if not reported.
    #[must_use]
    pub fn alias(&self) -> &str {
        self.alias.as_deref().unwrap_or_default()
    }

    /// Returns the hardware model, empty if not reported.
    #[must_use]
    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or_default()
    }
}
