//! Registered device API and device binding.
//!
//! ## `devices`: `GET /devices`
//!
//! Response:
//! ```json
//! {
//!   "devices": [
//!     { "type": "ANDROID", "id": "0x1a2b3c4d", "friendlyName": "Pixel" },
//!     { "type": "DESKTOP_APP", "id": "AA:BB:CC", "friendlyName": "Laptop" }
//!   ]
//! }
//! ```
//!
//! Stream URLs are only issued for a mobile device id; see [`choose_device`].

use crate::client::GatewayClient;
use crate::error::{ApiError, Result};
use crate::types::{Device, DeviceKind};

impl GatewayClient {
    /// List every device registered on the account.
    pub fn devices(&self) -> Result<Vec<Device>> {
        let resp = self.get("/devices")?;
        let Some(arr) = resp["devices"].as_array() else {
            return Ok(vec![]);
        };
        Ok(arr
            .iter()
            .map(|d| Device {
                kind: DeviceKind::from_api(d["type"].as_str().unwrap_or("")),
                id: d["id"].as_str().unwrap_or("").to_owned(),
                friendly_name: d["friendlyName"].as_str().unwrap_or("").to_owned(),
            })
            .collect())
    }
}

/// The devices eligible for stream URL issuance.
pub fn mobile_devices(devices: &[Device]) -> Vec<&Device> {
    devices.iter().filter(|d| d.kind.is_mobile()).collect()
}

/// Pick the device to bind for this session.
///
/// `preferred` matches a device id (with or without the `0x` prefix) or its
/// friendly name. Without a preference the single mobile device is chosen.
///
/// # Errors
///
/// [`ApiError::Other`] when nothing matches, no mobile device exists, or the
/// choice is ambiguous (the caller should then ask the user).
pub fn choose_device<'a>(devices: &'a [Device], preferred: Option<&str>) -> Result<&'a Device> {
    let mobile = mobile_devices(devices);
    if let Some(want) = preferred {
        return mobile
            .into_iter()
            .find(|d| d.id == want || d.stream_id() == want || d.friendly_name == want)
            .ok_or_else(|| ApiError::Other(format!("no mobile device matches {want:?}")));
    }
    match mobile.as_slice() {
        [] => Err(ApiError::Other(
            "no mobile device registered on this account".into(),
        )),
        [only] => Ok(only),
        _ => Err(ApiError::Other(format!(
            "{} mobile devices registered; choose one",
            mobile.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(kind: DeviceKind, id: &str, name: &str) -> Device {
        Device {
            kind,
            id: id.into(),
            friendly_name: name.into(),
        }
    }

    #[test]
    fn single_mobile_device_is_chosen() {
        let devices = vec![
            device(DeviceKind::Desktop, "AA:BB", "Laptop"),
            device(DeviceKind::Android, "0xbeef", "Pixel"),
        ];
        let chosen = choose_device(&devices, None).unwrap();
        assert_eq!(chosen.stream_id(), "beef");
    }

    #[test]
    fn ambiguous_without_preference() {
        let devices = vec![
            device(DeviceKind::Android, "0x1", "Pixel"),
            device(DeviceKind::Ios, "ios-2", "iPhone"),
        ];
        assert!(choose_device(&devices, None).is_err());
        assert_eq!(
            choose_device(&devices, Some("iPhone")).unwrap().id,
            "ios-2"
        );
        assert_eq!(choose_device(&devices, Some("1")).unwrap().id, "0x1");
    }

    #[test]
    fn desktop_is_never_chosen() {
        let devices = vec![device(DeviceKind::Desktop, "AA:BB", "Laptop")];
        assert!(choose_device(&devices, Some("AA:BB")).is_err());
        assert!(choose_device(&devices, None).is_err());
    }

    #[test]
    fn devices_endpoint() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/devices")
            .with_body(
                r#"{"devices":[{"type":"IOS","id":"ios-1","friendlyName":"Phone"}]}"#,
            )
            .create();
        let session = crate::auth::SessionCache {
            username: None,
            token: Some("tok".into()),
        };
        let client = GatewayClient::with_session(&server.url(), &session).unwrap();
        let devices = client.devices().unwrap();
        assert_eq!(devices[0].kind, DeviceKind::Ios);
        assert_eq!(devices[0].friendly_name, "Phone");
    }
}
