// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Response types for Kasa requests.
//!
//! A Kasa reply mirrors the request envelope: `{"<module>":{"<method>":{...}}}`.
//! Each inner object carries an `err_code` that is non-zero when the module
//! refused the request (for example `emeter` on a plug without a meter).

mod energy;
mod sysinfo;

pub use energy::Realtime;
pub use sysinfo::SysInfo;

use serde_json::Value;

use crate::error::{DeviceError, Error, ParseError};

/// Snapshot returned by a device info query.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceInfo {
    /// System information.
    pub sys_info: SysInfo,
    /// Realtime meter reading, `None` on plugs without a meter.
    pub realtime: Option<Realtime>,
}

impl DeviceInfo {
    /// Parses the combined `get_sysinfo` + `get_realtime` reply.
    ///
    /// # Errors
    ///
    /// Returns error if the sysinfo part is missing, malformed or rejected.
    pub fn from_response(response: &Value) -> Result<Self, Error> {
        let sys_info = module_result(response, "system", "get_sysinfo")?;
        let sys_info: SysInfo = serde_json::from_value(sys_info.clone()).map_err(ParseError::from)?;

        let realtime = match module_result(response, "emeter", "get_realtime") {
            Ok(value) => match serde_json::from_value::<Realtime>(value.clone()) {
                Ok(realtime) => Some(realtime),
                Err(e) => {
                    tracing::debug!(device_id = %sys_info.device_id, error = %e, "Ignoring malformed realtime reading");
                    None
                }
            },
            Err(_) => None,
        };

        Ok(Self { sys_info, realtime })
    }
}

/// Extracts `response[module][method]`, checking its `err_code`.
///
/// # Errors
///
/// Returns `MissingField` if the object is absent and `CommandRejected` if
/// `err_code` is present and non-zero.
pub fn module_result<'a>(
    response: &'a Value,
    module: &str,
    method: &str,
) -> Result<&'a Value, Error> {
    let value = response
        .get(module)
        .and_then(|m| m.get(method))
        .filter(|v| v.is_object())
        .ok_or_else(|| ParseError::MissingField(format!("{module}.{method}")))?;

    let code = value.get("err_code").and_then(Value::as_i64).unwrap_or(0);
    if code != 0 {
        let message = value
            .get("err_msg")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Err(DeviceError::CommandRejected {
            module: format!("{module}.{method}"),
            code,
            message,
        }
        .into());
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_plug_with_meter() {
        let response = json!({
            "system": {"get_sysinfo": {"deviceId": "A1B2", "relay_state": 1, "err_code": 0}},
            "emeter": {"get_realtime": {"power": 42.0, "voltage": 230.0, "current": 0.2, "total": 3.5, "err_code": 0}}
        });

        let info = DeviceInfo::from_response(&response).unwrap();
        assert_eq!(info.sys_info.device_id, "A1B2");
        assert!(info.sys_info.is_on());
        assert_eq!(info.realtime.unwrap().power(), Some(42.0));
    }

    #[test]
    fn parse_plug_without_meter() {
        let response = json!({
            "system": {"get_sysinfo": {"deviceId": "A1B2", "relay_state": 0}},
            "emeter": {"err_code": -1, "err_msg": "module not support"}
        });

        let info = DeviceInfo::from_response(&response).unwrap();
        assert!(!info.sys_info.is_on());
        assert!(info.realtime.is_none());
    }

    #[test]
    fn rejected_realtime_is_absent() {
        let response = json!({
            "system": {"get_sysinfo": {"deviceId": "A1B2"}},
            "emeter": {"get_realtime": {"err_code": -2001, "err_msg": "module not support"}}
        });

        let info = DeviceInfo::from_response(&response).unwrap();
        assert!(info.realtime.is_none());
    }

    #[test]
    fn missing_sysinfo_fails() {
        let response = json!({"emeter": {"get_realtime": {}}});
        let err = DeviceInfo::from_response(&response).unwrap_err();
        assert!(matches!(err, Error::Parse(ParseError::MissingField(_))));
    }

    #[test]
    fn rejected_sysinfo_fails() {
        let response = json!({"system": {"get_sysinfo": {"err_code": -1, "err_msg": "busy"}}});
        let err = DeviceInfo::from_response(&response).unwrap_err();
        assert!(matches!(
            err,
            Error::Device(DeviceError::CommandRejected { code: -1, .. })
        ));
    }

    #[test]
    fn module_result_accepts_missing_err_code() {
        let response = json!({"system": {"set_relay_state": {}}});
        assert!(module_result(&response, "system", "set_relay_state").is_ok());
    }
}
