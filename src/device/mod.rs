// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device handles.
//!
//! The bridge talks to devices exclusively through the [`Plug`] trait, so the
//! lifecycle and polling logic can be exercised with in-memory fakes. The
//! production implementation is [`KasaPlug`].

mod kasa;

pub use kasa::KasaPlug;

use std::future::Future;

use crate::error::Result;
use crate::response::DeviceInfo;

/// A smart plug the bridge can poll and switch.
pub trait Plug: Send + Sync + 'static {
    /// Returns the stable, vendor-assigned device identifier.
    fn device_id(&self) -> &str;

    /// Returns the current network host of the device.
    fn host(&self) -> String;

    /// Fetches system information and the meter reading.
    ///
    /// # Errors
    ///
    /// Returns error if the device is unreachable or the reply is malformed.
    fn get_info(&self) -> impl Future<Output = Result<DeviceInfo>> + Send;

    /// Switches the relay on or off.
    ///
    /// # Errors
    ///
    /// Returns error if the device is unreachable or rejects the request.
    fn set_power_state(&self, on: bool) -> impl Future<Output = Result<()>> + Send;
}
