//! Client configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::{DurationMilliSeconds, serde_as};

use crate::retry::RetryPolicy;

/// Settings for a [`crate::LanClient`].
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```
/// use std::time::Duration;
/// use lifx_lan_rs::LanConfig;
///
/// let config: LanConfig = serde_json::from_str(r#"{"request_timeout": 500}"#).unwrap();
/// assert_eq!(config.request_timeout, Duration::from_millis(500));
/// assert_eq!(config.port, 56700);
/// ```
#[serde_as]
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanConfig {
    /// Port devices listen on.
    pub port: u16,
    /// Local address the client socket binds to.
    pub bind_address: SocketAddr,
    /// Destination of discovery broadcasts.
    pub broadcast_address: IpAddr,
    /// Fixed source id; a random non-zero id is chosen when unset.
    pub source: Option<u32>,
    pub request_attempts: u32,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub request_timeout: Duration,
    pub discovery_attempts: u32,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub discovery_timeout: Duration,
    /// Interval between animation frames, at most [`LanConfig::MAX_ANIMATION_TICK`].
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub animation_tick: Duration,
    /// Number of datagrams kept in the connection history.
    pub history_size: usize,
}

impl Default for LanConfig {
    fn default() -> Self {
        LanConfig {
            port: Self::DEFAULT_PORT,
            bind_address: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
            broadcast_address: IpAddr::V4(Ipv4Addr::BROADCAST),
            source: None,
            request_attempts: 2,
            request_timeout: Duration::from_millis(2500),
            discovery_attempts: 2,
            discovery_timeout: Duration::from_millis(2500),
            animation_tick: Self::MAX_ANIMATION_TICK,
            history_size: 100,
        }
    }
}

impl LanConfig {
    pub const DEFAULT_PORT: u16 = 56700;
    pub const MAX_ANIMATION_TICK: Duration = Duration::from_millis(100);

    /// Policy for requests to a single device.
    pub fn request_policy(&self) -> RetryPolicy {
        RetryPolicy::unicast(self.request_attempts, self.request_timeout)
    }

    /// Policy for broadcast discovery.
    pub fn discovery_policy(&self) -> RetryPolicy {
        RetryPolicy::broadcast(self.discovery_attempts, self.discovery_timeout)
    }

    /// The configured tick, clamped to `1ms..=100ms`.
    pub fn animation_tick(&self) -> Duration {
        self.animation_tick
            .clamp(Duration::from_millis(1), Self::MAX_ANIMATION_TICK)
    }

    pub fn broadcast_target(&self) -> SocketAddr {
        SocketAddr::new(self.broadcast_address, self.port)
    }
}
