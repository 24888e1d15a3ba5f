//! Device discovery via UDP broadcast.

use std::collections::HashSet;
use std::net::SocketAddr;

use futures::future::join_all;
use log::{debug, warn};
use serde::Serialize;

use crate::client::LanClient;
use crate::device::Device;
use crate::errors::Error;
use crate::light::Light;
use crate::message::{RequestMessage, ResponseMessage};
use crate::multizone::MultiZoneLight;
use crate::status::DeviceRecord;
use crate::tilechain::TileChain;
use crate::transport::Response;
use crate::types::{DeviceKind, TargetAddress};

type Result<T> = std::result::Result<T, Error>;

/// A device that answered a discovery broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DiscoveredDevice {
    /// MAC address of the device
    pub target: TargetAddress,
    /// Where the device listens
    pub address: SocketAddr,
    /// Service id from `StateService` (1 is UDP)
    pub service: u8,
}

impl DiscoveredDevice {
    fn from_response(response: &Response) -> Option<Self> {
        match response.message {
            ResponseMessage::StateService { service, port } if port != 0 => {
                let port = u16::try_from(port).ok()?;
                Some(DiscoveredDevice {
                    target: response.target,
                    address: SocketAddr::new(response.address.ip(), port),
                    service,
                })
            }
            _ => None,
        }
    }

    /// A plain device handle for this device.
    pub fn into_device(self, client: &LanClient) -> Device {
        Device::new(client, self.target, self.address)
    }
}

/// A device handle of the most specific kind its product supports.
#[derive(Debug, Clone)]
pub enum AnyDevice {
    Device(Device),
    Light(Light),
    MultiZone(MultiZoneLight),
    TileChain(TileChain),
}

impl AnyDevice {
    /// Wrap `device` according to its cached product.
    pub fn classify(device: Device) -> Self {
        match device.kind() {
            DeviceKind::Device => AnyDevice::Device(device),
            DeviceKind::Light => AnyDevice::Light(device.into()),
            DeviceKind::MultiZone => AnyDevice::MultiZone(device.into()),
            DeviceKind::TileChain => AnyDevice::TileChain(device.into()),
        }
    }

    /// Recreate a classified handle from a persisted record.
    pub fn restore(client: &LanClient, record: &DeviceRecord) -> Self {
        Self::classify(Device::restore(client, record))
    }

    pub fn device(&self) -> &Device {
        match self {
            AnyDevice::Device(device) => device,
            AnyDevice::Light(light) => light.device(),
            AnyDevice::MultiZone(strip) => strip.device(),
            AnyDevice::TileChain(chain) => chain.device(),
        }
    }

    pub fn kind(&self) -> DeviceKind {
        match self {
            AnyDevice::Device(_) => DeviceKind::Device,
            AnyDevice::Light(_) => DeviceKind::Light,
            AnyDevice::MultiZone(_) => DeviceKind::MultiZone,
            AnyDevice::TileChain(_) => DeviceKind::TileChain,
        }
    }

    /// The device as a light, unless it is a plain device.
    pub fn as_light(&self) -> Option<&Light> {
        match self {
            AnyDevice::Device(_) => None,
            AnyDevice::Light(light) => Some(light),
            AnyDevice::MultiZone(strip) => Some(&**strip),
            AnyDevice::TileChain(chain) => Some(&**chain),
        }
    }
}

impl LanClient {
    /// Broadcast `GetService` and collect one entry per responding device.
    ///
    /// Waits until every discovery attempt has timed out; devices that
    /// answer more than once are reported once.
    pub async fn discover(&self) -> Result<Vec<DiscoveredDevice>> {
        let policy = self.config().discovery_policy();
        let responses = self
            .connection()
            .send(
                self.config().broadcast_target(),
                TargetAddress::BROADCAST,
                &RequestMessage::GetService,
                &policy,
            )
            .await?;

        let mut seen = HashSet::new();
        let found: Vec<DiscoveredDevice> = responses
            .iter()
            .filter_map(DiscoveredDevice::from_response)
            .filter(|d| seen.insert(d.target))
            .collect();
        debug!("discovered {} device(s)", found.len());
        Ok(found)
    }

    /// Discover devices, then ask each one for its version and label.
    ///
    /// Devices that do not answer the follow-up requests are reported as
    /// plain [`AnyDevice::Device`] handles.
    pub async fn retrieve_device_information(&self) -> Result<Vec<AnyDevice>> {
        let found = self.discover().await?;
        let devices = join_all(found.into_iter().map(|d| async move {
            let device = d.into_device(self);
            let (version, label) =
                futures::join!(device.get_version(), device.get_label());
            for err in [version.err(), label.err()].into_iter().flatten() {
                warn!("incomplete information for {}: {err}", device.target());
            }
            AnyDevice::classify(device)
        }))
        .await;
        Ok(devices)
    }

    /// Find the device with MAC address `target`.
    pub async fn device_by_target(&self, target: TargetAddress) -> Result<Device> {
        let responses = self
            .connection()
            .send(
                self.config().broadcast_target(),
                target,
                &RequestMessage::GetService,
                &self.config().discovery_policy().expecting(Some(1)),
            )
            .await?;
        responses
            .iter()
            .find_map(DiscoveredDevice::from_response)
            .map(|d| d.into_device(self))
            .ok_or(Error::NoService(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeNetwork, FakeState, test_config};
    use crate::types::{FirmwareVersion, TileInfo};

    fn mixed_network() -> Vec<FakeState> {
        vec![
            FakeState::light(1),
            FakeState::multizone(2, 16, 31, FirmwareVersion::new(1, 22)),
            FakeState::tilechain(
                3,
                vec![TileInfo {
                    width: 8,
                    height: 8,
                    user_x: 0.0,
                    user_y: 0.0,
                }],
            ),
        ]
    }

    #[tokio::test]
    async fn test_discover_collects_every_device() {
        let network = FakeNetwork::spawn(mixed_network()).await;
        let client = LanClient::bind(test_config(&network)).await.unwrap();

        let mut found = client.discover().await.unwrap();
        found.sort_by_key(|d| d.target.to_string());
        assert_eq!(found.len(), 3);
        assert_eq!(found[0].target, network.target(0));
        assert_eq!(found[0].address, network.address());
        assert_eq!(found[0].service, 1);
        assert!(network.headers()[0].tagged);
    }

    #[tokio::test]
    async fn test_retrieve_device_information_classifies() {
        let network = FakeNetwork::spawn(mixed_network()).await;
        let client = LanClient::bind(test_config(&network)).await.unwrap();

        let mut devices = client.retrieve_device_information().await.unwrap();
        devices.sort_by_key(|d| d.device().target().to_string());
        let kinds: Vec<DeviceKind> = devices.iter().map(AnyDevice::kind).collect();
        assert_eq!(
            kinds,
            vec![DeviceKind::Light, DeviceKind::MultiZone, DeviceKind::TileChain]
        );
        assert_eq!(devices[1].device().label().as_deref(), Some("Strip 2"));
        assert!(devices[2].as_light().is_some());
    }

    #[tokio::test]
    async fn test_device_by_target() {
        let network = FakeNetwork::spawn(mixed_network()).await;
        let client = LanClient::bind(test_config(&network)).await.unwrap();

        let device = client.device_by_target(network.target(1)).await.unwrap();
        assert_eq!(device.target(), network.target(1));

        let missing = "d0:73:d5:ff:ff:ff".parse().unwrap();
        assert!(matches!(
            client.device_by_target(missing).await,
            Err(Error::NoResponse { .. })
        ));
    }

    #[tokio::test]
    async fn test_unusable_service_port() {
        let network = FakeNetwork::spawn(vec![
            FakeState::light(1),
            FakeState {
                service_port: Some(0),
                ..FakeState::light(2)
            },
        ])
        .await;
        let client = LanClient::bind(test_config(&network)).await.unwrap();

        let found = client.discover().await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].target, network.target(0));
        assert_eq!(
            client.device_by_target(network.target(1)).await.unwrap_err(),
            Error::NoService(network.target(1))
        );
    }

    #[tokio::test]
    async fn test_restore_classifies_record() {
        let network = FakeNetwork::spawn(mixed_network()).await;
        let client = LanClient::bind(test_config(&network)).await.unwrap();

        let strip = Device::new(&client, network.target(1), network.address());
        strip.get_version().await.unwrap();
        let restored = AnyDevice::restore(&client, &strip.record());
        assert_eq!(restored.kind(), DeviceKind::MultiZone);
    }
}
