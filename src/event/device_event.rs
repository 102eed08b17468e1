// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device lifecycle events.

use std::fmt;
use std::sync::Arc;

use crate::device::Plug;

/// Lifecycle events emitted by the device transport.
///
/// Every event carries the shared device handle so the bridge can poll and
/// switch the device without a separate lookup.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use hs100_mqtt::device::KasaPlug;
/// use hs100_mqtt::event::DeviceEvent;
///
/// let plug = Arc::new(KasaPlug::new("A1B2", "192.168.1.60"));
/// let event = DeviceEvent::new_device(plug);
/// assert_eq!(event.device_id(), "A1B2");
/// assert!(event.is_new());
/// ```
pub enum DeviceEvent<P> {
    /// A device answered discovery for the first time.
    New(Arc<P>),

    /// A known device is reachable again.
    Online(Arc<P>),

    /// A known device stopped answering.
    Offline(Arc<P>),
}

impl<P: Plug> DeviceEvent<P> {
    /// Creates a device-new event.
    #[must_use]
    pub fn new_device(device: Arc<P>) -> Self {
        Self::New(device)
    }

    /// Creates a device-online event.
    #[must_use]
    pub fn online(device: Arc<P>) -> Self {
        Self::Online(device)
    }

    /// Creates a device-offline event.
    #[must_use]
    pub fn offline(device: Arc<P>) -> Self {
        Self::Offline(device)
    }

    /// Returns the device handle.
    #[must_use]
    pub fn device(&self) -> &Arc<P> {
        match self {
            Self::New(device) | Self::Online(device) | Self::Offline(device) => device,
        }
    }

    /// Returns the identifier of the device.
    #[must_use]
    pub fn device_id(&self) -> &str {
        self.device().device_id()
    }

    /// Returns `true` for device-new events.
    #[must_use]
    pub fn is_new(&self) -> bool {
        matches!(self, Self::New(_))
    }
}

impl<P> Clone for DeviceEvent<P> {
    fn clone(&self) -> Self {
        match self {
            Self::New(device) => Self::New(Arc::clone(device)),
            Self::Online(device) => Self::Online(Arc::clone(device)),
            Self::Offline(device) => Self::Offline(Arc::clone(device)),
        }
    }
}

impl<P: Plug> fmt::Debug for DeviceEvent<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::New(_) => "New",
            Self::Online(_) => "Online",
            Self::Offline(_) => "Offline",
        };
        f.debug_struct("DeviceEvent")
            .field("kind", &kind)
            .field("device_id", &self.device_id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::KasaPlug;

    fn plug(id: &str) -> Arc<KasaPlug> {
        Arc::new(KasaPlug::new(id, "127.0.0.1"))
    }

    #[test]
    fn device_id_extraction() {
        assert_eq!(DeviceEvent::new_device(plug("A")).device_id(), "A");
        assert_eq!(DeviceEvent::online(plug("B")).device_id(), "B");
        assert_eq!(DeviceEvent::offline(plug("C")).device_id(), "C");
    }

    #[test]
    fn only_new_is_new() {
        assert!(DeviceEvent::new_device(plug("A")).is_new());
        assert!(!DeviceEvent::online(plug("A")).is_new());
        assert!(!DeviceEvent::offline(plug("A")).is_new());
    }

    #[test]
    fn clone_shares_handle() {
        let event = DeviceEvent::online(plug("A"));
        let cloned = event.clone();
        assert!(Arc::ptr_eq(event.device(), cloned.device()));
    }

    #[test]
    fn debug_shows_kind_and_id() {
        let debug = format!("{:?}", DeviceEvent::offline(plug("A1B2")));
        assert!(debug.contains("Offline"));
        assert!(debug.contains("A1B2"));
    }
}
