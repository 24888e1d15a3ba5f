//! Device handles: the operations every LIFX device supports.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::debug;
use serde_json::{Value, json};

use crate::client::LanClient;
use crate::errors::Error;
use crate::message::{RequestMessage, ResponseMessage};
use crate::retry::RetryPolicy;
use crate::status::{DeviceRecord, DeviceStatus, VersionInfo};
use crate::transport::Response;
use crate::types::{DeviceKind, FirmwareVersion, Power, Product, TargetAddress};

type Result<T> = std::result::Result<T, Error>;

/// Milliseconds as carried in payloads, saturating.
pub(crate) fn millis(duration: Duration) -> u32 {
    u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
}

/// A device on the LAN, addressed by MAC and socket address.
///
/// Clones share the cached [`DeviceStatus`].
#[derive(Clone)]
pub struct Device {
    target: TargetAddress,
    address: SocketAddr,
    client: LanClient,
    policy: Option<RetryPolicy>,
    status: Arc<Mutex<DeviceStatus>>,
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("target", &self.target)
            .field("address", &self.address)
            .field("status", &self.status())
            .finish()
    }
}

impl Device {
    pub fn new(client: &LanClient, target: TargetAddress, address: SocketAddr) -> Self {
        Self::with_status(client, target, address, DeviceStatus::default())
    }

    pub(crate) fn with_status(
        client: &LanClient,
        target: TargetAddress,
        address: SocketAddr,
        status: DeviceStatus,
    ) -> Self {
        Device {
            target,
            address,
            client: client.clone(),
            policy: None,
            status: Arc::new(Mutex::new(status)),
        }
    }

    /// Recreate a device from a snapshot taken with [`Device::record`].
    pub fn restore(client: &LanClient, record: &DeviceRecord) -> Self {
        Self::with_status(client, record.target, record.address, record.status())
    }

    pub fn target(&self) -> TargetAddress {
        self.target
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    pub fn client(&self) -> &LanClient {
        &self.client
    }

    /// A snapshot of the cached state.
    pub fn status(&self) -> DeviceStatus {
        self.lock_status().clone()
    }

    /// The cached label.
    pub fn label(&self) -> Option<String> {
        self.lock_status().label().map(str::to_string)
    }

    /// The product, if the version has been retrieved.
    pub fn product(&self) -> Option<&'static Product> {
        self.lock_status().product()
    }

    pub fn kind(&self) -> DeviceKind {
        self.product().map_or(DeviceKind::Device, Product::kind)
    }

    /// A handle to the same device using `policy` for its requests.
    pub fn with_retry_policy(&self, policy: RetryPolicy) -> Self {
        Device {
            policy: Some(policy),
            ..self.clone()
        }
    }

    /// The policy for requests to this device.
    pub fn retry_policy(&self) -> RetryPolicy {
        self.policy
            .clone()
            .unwrap_or_else(|| self.client.config().request_policy())
    }

    pub async fn get_power(&self) -> Result<Power> {
        match self.request(RequestMessage::GetPower).await? {
            ResponseMessage::StatePower { level } => Ok(level),
            other => Err(unexpected(&other)),
        }
    }

    /// Switch the device on or off.
    ///
    /// A non-zero `duration` fades the light, which only light devices support.
    pub async fn set_power(&self, on: bool, duration: Duration) -> Result<()> {
        let level = Power::from(on);
        let message = if duration.is_zero() {
            RequestMessage::SetPower { level }
        } else {
            RequestMessage::LightSetPower {
                level,
                duration: millis(duration),
            }
        };
        self.request(message).await.map(|_| ())
    }

    pub async fn get_label(&self) -> Result<String> {
        match self.request(RequestMessage::GetLabel).await? {
            ResponseMessage::StateLabel { label } => Ok(label),
            other => Err(unexpected(&other)),
        }
    }

    /// Set the label; labels longer than 32 bytes are truncated.
    pub async fn set_label(&self, label: &str) -> Result<()> {
        self.request(RequestMessage::SetLabel {
            label: label.to_string(),
        })
        .await
        .map(|_| ())
    }

    pub async fn get_version(&self) -> Result<VersionInfo> {
        self.request(RequestMessage::GetVersion).await?;
        self.lock_status()
            .version()
            .ok_or_else(|| Error::malformed("version missing after StateVersion"))
    }

    pub async fn get_host_firmware(&self) -> Result<FirmwareVersion> {
        match self.request(RequestMessage::GetHostFirmware).await? {
            ResponseMessage::StateHostFirmware { version, .. } => Ok(version),
            other => Err(unexpected(&other)),
        }
    }

    /// Received wifi signal strength, in mW.
    pub async fn get_wifi_signal(&self) -> Result<f32> {
        match self.request(RequestMessage::GetWifiInfo).await? {
            ResponseMessage::StateWifiInfo { signal, .. } => Ok(signal),
            other => Err(unexpected(&other)),
        }
    }

    /// The product, retrieving the version if it is not cached yet.
    pub async fn resolve_product(&self) -> Result<Option<&'static Product>> {
        if let Some(product) = self.product() {
            return Ok(Some(product));
        }
        Ok(self.get_version().await?.product())
    }

    /// The firmware version, retrieving it if it is not cached yet.
    pub async fn resolve_firmware(&self) -> Result<FirmwareVersion> {
        let cached = self.lock_status().firmware();
        match cached {
            Some(firmware) => Ok(firmware),
            None => self.get_host_firmware().await,
        }
    }

    /// Stop the animation running on this device, if any.
    pub async fn end_animation(&self, interrupted: bool) {
        self.client.end_animation(self.target, interrupted).await;
    }

    /// A snapshot for persisting.
    pub fn record(&self) -> DeviceRecord {
        let status = self.lock_status();
        DeviceRecord {
            target: self.target,
            address: self.address,
            label: status.label().map(str::to_string),
            version: status.version(),
            firmware: status.firmware(),
            zone_count: status.zone_count(),
            tiles: status.tiles().map(<[_]>::to_vec).unwrap_or_default(),
        }
    }

    /// Cached state, product and transport history as JSON.
    ///
    /// Refreshes label, power, version, firmware and wifi signal first; any
    /// of these that fail are left out.
    pub async fn diagnostics(&self) -> Value {
        let _ = self.get_label().await;
        let _ = self.get_power().await;
        let _ = self.resolve_product().await;
        let _ = self.get_host_firmware().await;
        let _ = self.get_wifi_signal().await;

        let status = self.status();
        let mut diag = json!({
            "target": self.target.to_string(),
            "address": self.address.to_string(),
            "kind": self.kind().to_string(),
            "status": serde_json::to_value(&status).unwrap_or(Value::Null),
            "wifi_signal_dbm": status.wifi_signal_dbm(),
        });
        if let Some(product) = status.product() {
            diag["product"] = serde_json::to_value(product).unwrap_or(Value::Null);
        }
        diag["history"] =
            serde_json::to_value(self.client.history().await.summary()).unwrap_or(Value::Null);
        diag
    }

    /// Send a request and return the single response, updating the cache.
    pub(crate) async fn request(&self, message: RequestMessage) -> Result<ResponseMessage> {
        let policy = self.retry_policy();
        let mut responses = self.request_all(&message, &policy).await?;
        responses
            .pop()
            .map(|r| r.message)
            .ok_or(Error::NoResponse {
                target: self.target,
                message_type: crate::message::Message::message_type(&message),
                attempts: policy.attempts(),
                received: 0,
            })
    }

    /// Send a request expecting as many responses as `policy` says.
    pub(crate) async fn request_all(
        &self,
        message: &RequestMessage,
        policy: &RetryPolicy,
    ) -> Result<Vec<Response>> {
        let responses = self
            .client
            .connection()
            .send(self.address, self.target, message, policy)
            .await?;

        let mut status = self.lock_status();
        for response in &responses {
            if response.message.is_acknowledgement() {
                status.apply(message);
            } else {
                status.update(&response.message);
            }
        }
        Ok(responses)
    }

    /// Send a setter, acknowledged unless `transient`.
    pub(crate) async fn send_setter(&self, message: RequestMessage, transient: bool) -> Result<()> {
        if transient {
            self.fire(message).await
        } else {
            self.request(message).await.map(|_| ())
        }
    }

    /// Send a request without waiting for an acknowledgement.
    pub(crate) async fn fire(&self, message: RequestMessage) -> Result<()> {
        self.client
            .connection()
            .fire(self.address, self.target, &message)
            .await?;
        self.lock_status().apply(&message);
        Ok(())
    }

    pub(crate) fn lock_status(&self) -> MutexGuard<'_, DeviceStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn unexpected(message: &ResponseMessage) -> Error {
    use crate::message::Message;
    debug!("unexpected response {}", message.message_type());
    Error::malformed(format!("unexpected response {}", message.message_type()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageType;
    use crate::testing::{Behavior, FakeNetwork, FakeState, test_config};

    async fn device_on(network: &FakeNetwork, index: usize) -> Device {
        let client = LanClient::bind(test_config(network)).await.unwrap();
        Device::new(&client, network.target(index), network.address())
    }

    #[tokio::test]
    async fn test_power_round_trip() {
        let network = FakeNetwork::spawn(vec![FakeState::light(1)]).await;
        let device = device_on(&network, 0).await;

        assert_eq!(device.get_power().await.unwrap(), Power::Off);
        device.set_power(true, Duration::ZERO).await.unwrap();
        assert_eq!(device.status().power(), Some(Power::On));
        assert_eq!(network.state(0).power, Power::On);

        device
            .set_power(false, Duration::from_millis(1500))
            .await
            .unwrap();
        assert_eq!(
            network.requests().last(),
            Some(&RequestMessage::LightSetPower {
                level: Power::Off,
                duration: 1500
            })
        );
        assert_eq!(device.get_power().await.unwrap(), Power::Off);
    }

    #[tokio::test]
    async fn test_label_round_trip() {
        let network = FakeNetwork::spawn(vec![FakeState::light(7)]).await;
        let device = device_on(&network, 0).await;

        assert_eq!(device.get_label().await.unwrap(), "Light 7");
        device.set_label("Living room").await.unwrap();
        assert_eq!(device.label().as_deref(), Some("Living room"));
        assert_eq!(device.get_label().await.unwrap(), "Living room");
    }

    #[tokio::test]
    async fn test_version_and_firmware() {
        let network = FakeNetwork::spawn(vec![FakeState::multizone(
            1,
            16,
            32,
            FirmwareVersion::new(2, 80),
        )])
        .await;
        let device = device_on(&network, 0).await;

        let version = device.get_version().await.unwrap();
        assert_eq!(version.product, 32);
        assert_eq!(device.kind(), DeviceKind::MultiZone);
        assert_eq!(
            device.get_host_firmware().await.unwrap(),
            FirmwareVersion::new(2, 80)
        );
        assert!(device.get_wifi_signal().await.unwrap() > 0.0);
    }

    #[tokio::test]
    async fn test_unresponsive_device() {
        let network = FakeNetwork::spawn_with(vec![FakeState::light(1)], Behavior::silent()).await;
        let device = device_on(&network, 0)
            .await
            .with_retry_policy(RetryPolicy::unicast(2, Duration::from_millis(50)));

        let err = device.get_label().await.unwrap_err();
        assert_eq!(
            err,
            Error::NoResponse {
                target: network.target(0),
                message_type: MessageType::GetLabel,
                attempts: 2,
                received: 0,
            }
        );
        assert_eq!(network.datagrams(), 2);
    }

    #[tokio::test]
    async fn test_record_restore() {
        let network = FakeNetwork::spawn(vec![FakeState::light(3)]).await;
        let device = device_on(&network, 0).await;
        device.get_label().await.unwrap();
        device.get_version().await.unwrap();

        let record = device.record();
        assert_eq!(record.label.as_deref(), Some("Light 3"));
        assert_eq!(record.kind(), DeviceKind::Light);

        let json = serde_json::to_string(&record).unwrap();
        let restored = Device::restore(device.client(), &serde_json::from_str(&json).unwrap());
        assert_eq!(restored.target(), device.target());
        assert_eq!(restored.label().as_deref(), Some("Light 3"));
        assert_eq!(restored.kind(), DeviceKind::Light);
    }

    #[tokio::test]
    async fn test_diagnostics() {
        let network = FakeNetwork::spawn(vec![FakeState::light(2)]).await;
        let device = device_on(&network, 0).await;

        let diag = device.diagnostics().await;
        assert_eq!(diag["kind"], "Light");
        assert_eq!(diag["status"]["label"], "Light 2");
        assert_eq!(diag["product"]["name"], "LIFX A19");
        assert_eq!(diag["wifi_signal_dbm"], -50.0);
        assert!(diag["history"]["sent_count"].as_u64().unwrap() >= 5);
    }
}
