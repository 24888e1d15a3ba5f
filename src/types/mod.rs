//! Value types for device state and light control parameters.

mod color;
mod kelvin;
mod multizone;
mod power;
mod product;
mod target;
mod tile;

pub use color::Color;
pub use kelvin::{Kelvin, white_from_rgb};
pub use multizone::MultizoneColors;
pub use power::Power;
pub use product::{DeviceKind, FirmwareVersion, Product, Vendor};
pub use target::TargetAddress;
pub use tile::{TileCanvas, TileChainColors, TileInfo};
