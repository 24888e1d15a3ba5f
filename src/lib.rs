//! # lifx_lan_rs
//!
//! An async Rust client for LIFX lights, speaking the LIFX LAN protocol
//! over UDP.
//!
//! This crate provides a **runtime-agnostic** async API to discover LIFX
//! devices on your local network and control bulbs, multizone strips and
//! tile chains. It also runs client-side animations (wake-up fades, rolling
//! gradients) that push frames to the devices on a fixed tick.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//! use lifx_lan_rs::{AnyDevice, Color, LanClient, LanConfig};
//!
//! async fn make_everything_red() -> Result<(), lifx_lan_rs::Error> {
//!     let client = LanClient::bind(LanConfig::default()).await?;
//!     for device in client.retrieve_device_information().await? {
//!         if let Some(light) = device.as_light() {
//!             light.set_color(Color::RED, Duration::from_secs(1), false).await?;
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Runtime Agnostic**: Works with tokio, async-std, or smol async runtimes
//! - **Discovery**: Find devices with [`LanClient::discover`] and classify
//!   them with [`LanClient::retrieve_device_information`]
//! - **Colors**: HSBK colors with [`Color`], RGB and kelvin helpers with [`Kelvin`]
//! - **Multizone**: Per-zone colors on strips with [`MultiZoneLight`]
//!   and [`MultizoneColors`]
//! - **Tiles**: Canvas-wide colors on tile chains with [`TileChain`]
//!   and [`TileChainColors`]
//! - **Animations**: Wake-up fades and rolling gradients with [`Animation`]
//! - **Reliability**: Retries and response correlation per [`RetryPolicy`]
//! - **Persistence**: Snapshot devices with [`DeviceRecord`] and restore them
//!   without another discovery round
//!
//! ## Communication
//!
//! Devices listen on UDP port 56700. Every message carries a 36-byte
//! header; requests are correlated with their responses by source id,
//! sequence number and target MAC. Discovery broadcasts `GetService` and
//! waits for every attempt to time out.
//!
//! ## Runtime Selection
//!
//! This library is runtime-agnostic. Select your preferred runtime using feature flags:
//!
//! ### Using tokio (default)
//!
//! ```toml
//! [dependencies]
//! lifx-lan-rs = "0.1"
//! tokio = { version = "1", features = ["rt-multi-thread", "macros"] }
//! ```
//!
//! ### Using async-std
//!
//! ```toml
//! [dependencies]
//! lifx-lan-rs = { version = "0.1", default-features = false, features = ["runtime-async-std"] }
//! async-std = { version = "1.12", features = ["attributes"] }
//! ```
//!
//! ### Using smol
//!
//! ```toml
//! [dependencies]
//! lifx-lan-rs = { version = "0.1", default-features = false, features = ["runtime-smol"] }
//! smol = "2"
//! ```
//!
//! ## Feature Flags
//!
//! - `runtime-tokio` (default): Use the tokio async runtime
//! - `runtime-async-std`: Use the async-std runtime
//! - `runtime-smol`: Use the smol runtime

mod animation;
mod client;
mod config;
mod device;
mod discovery;
mod errors;
pub mod header;
mod history;
mod light;
pub mod message;
mod multizone;
mod retry;
pub mod runtime;
mod status;
mod tilechain;
mod transport;
mod types;

#[cfg(test)]
mod testing;

// Re-export public API
pub use animation::{
    Animation, AnimationFrame, AnimationHandle, AnimationOutcome, AnimationState, FrameSink,
    RollingAnimation,
};
pub use client::LanClient;
pub use config::LanConfig;
pub use device::Device;
pub use discovery::{AnyDevice, DiscoveredDevice};
pub use errors::Error;
pub use history::{Direction, HistoryEntry, HistorySummary, MessageHistory};
pub use light::Light;
pub use message::{ApplicationRequest, MessageType, RequestMessage, ResponseMessage};
pub use multizone::MultiZoneLight;
pub use retry::{ResponseCallback, RetryPolicy};
pub use status::{DeviceRecord, DeviceStatus, VersionInfo};
pub use tilechain::TileChain;
pub use transport::Response;
pub use types::{
    Color, DeviceKind, FirmwareVersion, Kelvin, MultizoneColors, Power, Product, TargetAddress,
    TileCanvas, TileChainColors, TileInfo, Vendor, white_from_rgb,
};
