// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Events driving the bridge.
//!
//! The bridge reacts to two event streams, each delivered over a tokio
//! `mpsc` channel:
//!
//! - [`DeviceEvent`] from the device transport (discovery)
//! - [`BusEvent`] from the MQTT connection
//!
//! Both are plain values, so tests can feed synthetic sequences into the
//! bridge without any network.

mod bus_event;
mod device_event;

pub use bus_event::{BusEvent, decode_payload};
pub use device_event::DeviceEvent;
