//! Cached device state.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::message::{RequestMessage, ResponseMessage};
use crate::types::{
    Color, DeviceKind, FirmwareVersion, MultizoneColors, Power, Product, TargetAddress,
    TileChainColors, TileInfo,
};

/// Version information reported by `StateVersion`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub vendor: u32,
    pub product: u32,
    pub version: u32,
}

impl VersionInfo {
    /// The product descriptor, if the vendor and product are known.
    pub fn product(&self) -> Option<&'static Product> {
        Product::lookup(self.vendor, self.product)
    }
}

/// The last known state of a device.
///
/// Every successful response and every acknowledged setter updates it, so it
/// reflects what the client last heard from or told the device.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatus {
    label: Option<String>,
    power: Option<Power>,
    color: Option<Color>,
    version: Option<VersionInfo>,
    firmware: Option<FirmwareVersion>,
    firmware_build: Option<u64>,
    /// Received signal strength in mW.
    wifi_signal: Option<f32>,
    zone_count: Option<usize>,
    zones: Option<MultizoneColors>,
    tiles: Option<Vec<TileInfo>>,
    tile_colors: Option<TileChainColors>,
}

impl DeviceStatus {
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn power(&self) -> Option<Power> {
        self.power
    }

    pub fn color(&self) -> Option<Color> {
        self.color
    }

    pub fn version(&self) -> Option<VersionInfo> {
        self.version
    }

    pub fn product(&self) -> Option<&'static Product> {
        self.version.and_then(|v| v.product())
    }

    pub fn firmware(&self) -> Option<FirmwareVersion> {
        self.firmware
    }

    /// Firmware build time, in nanoseconds since the epoch.
    pub fn firmware_build(&self) -> Option<u64> {
        self.firmware_build
    }

    pub fn wifi_signal(&self) -> Option<f32> {
        self.wifi_signal
    }

    /// Signal strength in dBm.
    pub fn wifi_signal_dbm(&self) -> Option<f32> {
        self.wifi_signal
            .filter(|s| *s > 0.0)
            .map(|s| (10.0 * s.log10()).round())
    }

    pub fn zone_count(&self) -> Option<usize> {
        self.zone_count
    }

    /// Zone colors last read from or written to a strip.
    pub fn zones(&self) -> Option<&MultizoneColors> {
        self.zones.as_ref()
    }

    pub fn tiles(&self) -> Option<&[TileInfo]> {
        self.tiles.as_deref()
    }

    /// Colors last read from or written to a tile chain.
    pub fn tile_colors(&self) -> Option<&TileChainColors> {
        self.tile_colors.as_ref()
    }

    pub(crate) fn set_zones(&mut self, zones: MultizoneColors) {
        self.zones = Some(zones);
    }

    pub(crate) fn set_tile_colors(&mut self, colors: TileChainColors) {
        self.tile_colors = Some(colors);
    }

    /// Take over whatever `message` reports.
    pub(crate) fn update(&mut self, message: &ResponseMessage) {
        match message {
            ResponseMessage::StatePower { level } | ResponseMessage::LightStatePower { level } => {
                self.power = Some(*level);
            }
            ResponseMessage::StateLabel { label } => self.label = Some(label.clone()),
            ResponseMessage::StateVersion {
                vendor,
                product,
                version,
            } => {
                self.version = Some(VersionInfo {
                    vendor: *vendor,
                    product: *product,
                    version: *version,
                });
            }
            ResponseMessage::StateHostFirmware { build, version } => {
                self.firmware = Some(*version);
                self.firmware_build = Some(*build);
            }
            ResponseMessage::StateWifiInfo { signal, .. } => self.wifi_signal = Some(*signal),
            ResponseMessage::LightState {
                color,
                power,
                label,
            } => {
                self.color = Some(*color);
                self.power = Some(*power);
                self.label = Some(label.clone());
            }
            ResponseMessage::StateZone { count, .. }
            | ResponseMessage::StateMultiZone { count, .. } => {
                self.zone_count = Some(*count as usize);
            }
            ResponseMessage::StateExtendedColorZones { count, .. } => {
                self.zone_count = Some(*count as usize);
            }
            ResponseMessage::StateDeviceChain {
                start_index: 0,
                tiles,
                ..
            } => self.tiles = Some(tiles.clone()),
            ResponseMessage::StateDeviceChain { .. }
            | ResponseMessage::StateService { .. }
            | ResponseMessage::Acknowledgement
            | ResponseMessage::State64 { .. } => {}
        }
    }

    /// Take over what an acknowledged setter changed.
    pub(crate) fn apply(&mut self, request: &RequestMessage) {
        match request {
            RequestMessage::SetPower { level } | RequestMessage::LightSetPower { level, .. } => {
                self.power = Some(*level);
            }
            RequestMessage::SetLabel { label } => self.label = Some(label.clone()),
            RequestMessage::LightSetColor { color, .. } => self.color = Some(*color),
            _ => {}
        }
    }
}

/// A serializable snapshot of a device, for callers that persist device lists.
///
/// Restoring a record gives a device handle without another discovery round.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub target: TargetAddress,
    pub address: SocketAddr,
    pub label: Option<String>,
    pub version: Option<VersionInfo>,
    pub firmware: Option<FirmwareVersion>,
    pub zone_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tiles: Vec<TileInfo>,
}

impl DeviceRecord {
    /// The kind of device the record describes; [`DeviceKind::Device`] if
    /// the product is unknown.
    pub fn kind(&self) -> DeviceKind {
        self.version
            .and_then(|v| v.product())
            .map_or(DeviceKind::Device, Product::kind)
    }

    pub(crate) fn status(&self) -> DeviceStatus {
        DeviceStatus {
            label: self.label.clone(),
            version: self.version,
            firmware: self.firmware,
            zone_count: self.zone_count,
            tiles: (!self.tiles.is_empty()).then(|| self.tiles.clone()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_from_light_state() {
        let mut status = DeviceStatus::default();
        status.update(&ResponseMessage::LightState {
            color: Color::RED,
            power: Power::On,
            label: "Kitchen".into(),
        });
        assert_eq!(status.color(), Some(Color::RED));
        assert_eq!(status.power(), Some(Power::On));
        assert_eq!(status.label(), Some("Kitchen"));

        status.update(&ResponseMessage::StatePower { level: Power::Off });
        assert_eq!(status.power(), Some(Power::Off));
        assert_eq!(status.label(), Some("Kitchen"));
    }

    #[test]
    fn test_apply_setter() {
        let mut status = DeviceStatus::default();
        status.apply(&RequestMessage::LightSetColor {
            color: Color::BLUE,
            duration: 0,
        });
        status.apply(&RequestMessage::GetPower);
        assert_eq!(status.color(), Some(Color::BLUE));
        assert_eq!(status.power(), None);
    }

    #[test]
    fn test_version_and_signal() {
        let mut status = DeviceStatus::default();
        status.update(&ResponseMessage::StateVersion {
            vendor: 1,
            product: 31,
            version: 0,
        });
        status.update(&ResponseMessage::StateWifiInfo {
            signal: 1e-5,
            tx: 0,
            rx: 0,
        });
        assert_eq!(status.product().map(|p| p.kind()), Some(DeviceKind::MultiZone));
        assert_eq!(status.wifi_signal_dbm(), Some(-50.0));
    }

    #[test]
    fn test_partial_chain_keeps_tiles() {
        let tile = TileInfo {
            width: 8,
            height: 8,
            user_x: 0.0,
            user_y: 0.0,
        };
        let mut status = DeviceStatus::default();
        status.update(&ResponseMessage::StateDeviceChain {
            start_index: 0,
            tiles: vec![tile],
            total_count: 1,
        });
        status.update(&ResponseMessage::StateDeviceChain {
            start_index: 3,
            tiles: vec![],
            total_count: 3,
        });
        assert_eq!(status.tiles().map(<[TileInfo]>::len), Some(1));
    }

    #[test]
    fn test_record_json() {
        let record = DeviceRecord {
            target: "d0:73:d5:01:02:03".parse().unwrap(),
            address: "192.168.1.20:56700".parse().unwrap(),
            label: Some("Desk".into()),
            version: Some(VersionInfo {
                vendor: 1,
                product: 55,
                version: 0,
            }),
            firmware: None,
            zone_count: None,
            tiles: vec![],
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["target"], "D0:73:D5:01:02:03");
        assert!(json.get("firmware").is_none());
        assert!(json.get("tiles").is_none());

        let back: DeviceRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
        assert_eq!(back.kind(), DeviceKind::TileChain);
        assert_eq!(back.status().label(), Some("Desk"));
    }
}
