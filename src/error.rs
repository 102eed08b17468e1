// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the bridge.
//!
//! This module provides the error hierarchy used across the crate: transport
//! failures (Kasa TCP/UDP and MQTT), payload parsing, device-side rejections
//! and startup configuration problems.

use thiserror::Error;

/// The main error type for this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred during protocol communication.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Error occurred while parsing a payload.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// The device answered but refused the operation.
    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    /// Startup configuration is invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to protocol communication (Kasa and MQTT).
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Socket I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// MQTT client request could not be queued.
    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    /// Connection to the peer failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Request timed out.
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// Invalid URL or address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Frame exceeds the maximum Kasa frame length.
    #[error("frame of {0} bytes exceeds the maximum length")]
    FrameTooLarge(usize),
}

/// Errors related to parsing device or bus payloads.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Expected field is missing from the response.
    #[error("missing field in response: {0}")]
    MissingField(String),

    /// Unexpected response format.
    #[error("unexpected response format: {0}")]
    UnexpectedFormat(String),
}

/// Errors reported by the plug itself.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The plug answered with a non-zero `err_code`.
    #[error("{module} rejected with err_code {code}: {message}")]
    CommandRejected {
        /// Module/method that rejected the request (e.g. `system.set_relay_state`).
        module: String,
        /// The `err_code` value.
        code: i64,
        /// The `err_msg` value, empty when absent.
        message: String,
    },
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_display() {
        let err = ParseError::MissingField("system.get_sysinfo".to_string());
        assert_eq!(
            err.to_string(),
            "missing field in response: system.get_sysinfo"
        );
    }

    #[test]
    fn device_error_display() {
        let err = DeviceError::CommandRejected {
            module: "system.set_relay_state".to_string(),
            code: -3,
            message: "invalid argument".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "system.set_relay_state rejected with err_code -3: invalid argument"
        );
    }

    #[test]
    fn error_from_protocol_error() {
        let err: Error = ProtocolError::Timeout(5000).into();
        assert!(matches!(err, Error::Protocol(ProtocolError::Timeout(5000))));
        assert_eq!(
            err.to_string(),
            "protocol error: request timed out after 5000 ms"
        );
    }

    #[test]
    fn io_error_converts_to_protocol_error() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err: ProtocolError = io.into();
        assert!(matches!(err, ProtocolError::Io(_)));
    }
}
