// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Display names for devices.

use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;

use crate::error::{Error, ParseError};

/// Maps device identifiers to human-readable names.
///
/// The mapping comes from an optional JSON file keyed by device id:
///
/// ```json
/// {
///     "8006F2D5B0E8C7A1": { "name": "desk-lamp" },
///     "8006A1B2C3D4E5F6": { "room": "kitchen" }
/// }
/// ```
///
/// Devices without an entry, or whose entry has no `name`, keep their id.
///
/// # Examples
///
/// ```
/// use hs100_mqtt::bridge::NameResolver;
///
/// let names = NameResolver::from_json(r#"{"A1B2": {"name": "lamp"}}"#).unwrap();
/// assert_eq!(names.resolve("A1B2"), "lamp");
/// assert_eq!(names.resolve("C3D4"), "C3D4");
/// ```
#[derive(Debug, Clone, Default)]
pub struct NameResolver {
    names: HashMap<String, String>,
}

impl NameResolver {
    /// Creates an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the JSON mapping.
    ///
    /// # Errors
    ///
    /// Returns a parse error if the document is not a JSON object.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let document: Value = serde_json::from_str(json).map_err(ParseError::from)?;
        let Value::Object(entries) = document else {
            return Err(ParseError::UnexpectedFormat(
                "device config must be a JSON object keyed by device id".to_string(),
            )
            .into());
        };

        let names = entries
            .into_iter()
            .filter_map(|(device_id, entry)| {
                let name = entry.get("name")?.as_str()?.trim();
                (!name.is_empty()).then(|| (device_id, name.to_string()))
            })
            .collect();

        Ok(Self { names })
    }

    /// Loads the mapping from `path`; a missing file yields an empty resolver.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, Error> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No device config file, using device ids as names");
            return Ok(Self::new());
        }

        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        let resolver = Self::from_json(&json)
            .map_err(|e| Error::Config(format!("invalid {}: {e}", path.display())))?;

        tracing::info!(path = %path.display(), names = resolver.len(), "Loaded device names");
        Ok(resolver)
    }

    /// Returns the display name for `device_id`, or `device_id` itself.
    #[must_use]
    pub fn resolve<'a>(&'a self, device_id: &'a str) -> &'a str {
        self.names.get(device_id).map_or(device_id, String::as_str)
    }

    /// Returns the number of configured names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if no names are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for NameResolver {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            names: iter
                .into_iter()
                .map(|(id, name)| (id.into(), name.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_falls_back_to_id() {
        let names = NameResolver::new();
        assert_eq!(names.resolve("A1B2"), "A1B2");
        assert!(names.is_empty());
    }

    #[test]
    fn entry_without_name_falls_back() {
        let names = NameResolver::from_json(r#"{"A1B2": {"room": "office"}, "C3D4": {"name": ""}}"#)
            .unwrap();
        assert_eq!(names.resolve("A1B2"), "A1B2");
        assert_eq!(names.resolve("C3D4"), "C3D4");
        assert_eq!(names.len(), 0);
    }

    #[test]
    fn non_string_name_is_ignored() {
        let names = NameResolver::from_json(r#"{"A1B2": {"name": 7}, "C3D4": "lamp"}"#).unwrap();
        assert_eq!(names.resolve("A1B2"), "A1B2");
        assert_eq!(names.resolve("C3D4"), "C3D4");
    }

    #[test]
    fn resolve_is_idempotent() {
        let names: NameResolver = [("A1B2", "lamp")].into_iter().collect();
        assert_eq!(names.resolve("A1B2"), names.resolve("A1B2"));
        assert_eq!(names.resolve("lamp"), "lamp");
    }

    #[test]
    fn non_object_document_is_rejected() {
        assert!(NameResolver::from_json("[1, 2]").is_err());
        assert!(NameResolver::from_json("not json").is_err());
    }

    #[test]
    fn missing_file_is_empty() {
        let path = std::env::temp_dir().join(format!("hs100-missing-{}.json", std::process::id()));
        let names = NameResolver::load(&path).unwrap();
        assert!(names.is_empty());
    }

    #[test]
    fn load_reads_file() {
        let path = std::env::temp_dir().join(format!("hs100-names-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"A1B2": {"name": "kettle"}}"#).unwrap();

        let names = NameResolver::load(&path);
        std::fs::remove_file(&path).unwrap();

        assert_eq!(names.unwrap().resolve("A1B2"), "kettle");
    }

    #[test]
    fn load_rejects_malformed_file() {
        let path = std::env::temp_dir().join(format!("hs100-bad-{}.json", std::process::id()));
        std::fs::write(&path, "{").unwrap();

        let result = NameResolver::load(&path);
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(result, Err(Error::Config(_))));
    }
}
