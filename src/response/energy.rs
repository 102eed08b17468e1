// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Energy meter (`emeter.get_realtime`) response parsing.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Realtime meter reading of an energy-monitoring plug (HS110).
///
/// Kasa firmware comes in two dialects:
/// - v1 reports `power` (W), `voltage` (V), `current` (A), `total` (kWh)
/// - v2 reports `power_mw`, `voltage_mv`, `current_ma`, `total_wh`
///
/// The accessors return SI units regardless of the dialect, and
/// [`normalized`](Self::normalized) fills in both sets of fields.
///
/// # Examples
///
/// ```
/// use hs100_mqtt::response::Realtime;
///
/// let json = r#"{"voltage_mv":231234,"current_ma":85,"power_mw":10512,"total_wh":1523,"err_code":0}"#;
/// let realtime: Realtime = serde_json::from_str(json).unwrap();
/// assert_eq!(realtime.power(), Some(10.512));
/// assert_eq!(realtime.energy(), Some(1.523));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Realtime {
    /// Active power in Watts (v1).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power: Option<f64>,
    /// Active power in milliwatts (v2).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_mw: Option<f64>,
    /// Voltage in Volts (v1).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voltage: Option<f64>,
    /// Voltage in millivolts (v2).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voltage_mv: Option<f64>,
    /// Current in Amperes (v1).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<f64>,
    /// Current in milliamperes (v2).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_ma: Option<f64>,
    /// Cumulative energy in kWh (v1).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    /// Cumulative energy in Wh (v2).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_wh: Option<f64>,
    /// Remaining fields (`err_code`, `slot_id`, ...), kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Realtime {
    /// Returns the active power in Watts.
    #[must_use]
    pub fn power(&self) -> Option<f64> {
        self.power.or_else(|| self.power_mw.map(milli))
    }

    /// Returns the voltage in Volts.
    #[must_use]
    pub fn voltage(&self) -> Option<f64> {
        self.voltage.or_else(|| self.voltage_mv.map(milli))
    }

    /// Returns the current in Amperes.
    #[must_use]
    pub fn current(&self) -> Option<f64> {
        self.current.or_else(|| self.current_ma.map(milli))
    }

    /// Returns the cumulative energy in kWh.
    #[must_use]
    pub fn energy(&self) -> Option<f64> {
        self.total.or_else(|| self.total_wh.map(milli))
    }

    /// Returns a copy with both firmware dialects populated.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            power: self.power(),
            power_mw: self.power_mw.or_else(|| self.power.map(kilo)),
            voltage: self.voltage(),
            voltage_mv: self.voltage_mv.or_else(|| self.voltage.map(kilo)),
            current: self.current(),
            current_ma: self.current_ma.or_else(|| self.current.map(kilo)),
            total: self.energy(),
            total_wh: self.total_wh.or_else(|| self.total.map(kilo)),
            extra: self.extra.clone(),
        }
    }
}

fn milli(value: f64) -> f64 {
    value / 1000.0
}

fn kilo(value: f64) -> f64 {
    (value * 1000.0).floor()
}
