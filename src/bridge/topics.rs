// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Topic layout of the bridge.

/// Builds the topics of one bridge instance.
///
/// | Topic | Direction |
/// |---|---|
/// | `{instance}/maintenance/_bridge/online` | out, retained |
/// | `{instance}/maintenance/{name}/online` | out |
/// | `{instance}/status/{name}` | out |
/// | `{instance}/info/{name}` | out |
/// | `{instance}/set/{name}` | in |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    instance: String,
}

impl Topics {
    /// Creates the topic layout for `instance`.
    #[must_use]
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    /// Returns the instance prefix.
    #[must_use]
    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// Bridge-wide online flag.
    #[must_use]
    pub fn bridge_online(&self) -> String {
        format!("{}/maintenance/_bridge/online", self.instance)
    }

    /// Per-device online flag.
    #[must_use]
    pub fn device_online(&self, name: &str) -> String {
        format!("{}/maintenance/{name}/online", self.instance)
    }

    /// Normalized status summary.
    #[must_use]
    pub fn status(&self, name: &str) -> String {
        format!("{}/status/{name}", self.instance)
    }

    /// Raw info snapshot.
    #[must_use]
    pub fn info(&self, name: &str) -> String {
        format!("{}/info/{name}", self.instance)
    }

    /// Inbound command topic.
    #[must_use]
    pub fn set(&self, name: &str) -> String {
        format!("{}/set/{name}", self.instance)
    }
}
