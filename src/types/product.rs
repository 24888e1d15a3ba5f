//! Vendor and product metadata reported by `StateVersion`.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

/// Device vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Vendor {
    Lifx,
    Unknown(u32),
}

impl Vendor {
    pub fn from_id(id: u32) -> Self {
        match id {
            1 => Vendor::Lifx,
            other => Vendor::Unknown(other),
        }
    }

    pub fn id(&self) -> u32 {
        match self {
            Vendor::Lifx => 1,
            Vendor::Unknown(id) => *id,
        }
    }
}

/// The device class a product belongs to, which decides the handle type
/// returned from discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
pub enum DeviceKind {
    Device,
    Light,
    MultiZone,
    TileChain,
}

/// Host firmware version.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct FirmwareVersion {
    pub major: u16,
    pub minor: u16,
}

impl FirmwareVersion {
    pub const fn new(major: u16, minor: u16) -> Self {
        FirmwareVersion { major, minor }
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Capabilities of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    pub id: u32,
    pub name: &'static str,
    pub color: bool,
    pub infrared: bool,
    pub multizone: bool,
    pub chain: bool,
    pub matrix: bool,
    /// Firmware from which the extended multizone messages are available.
    pub extended_multizone: Option<FirmwareVersion>,
}

const EXT_MZ_FIRMWARE: FirmwareVersion = FirmwareVersion::new(2, 77);
const NATIVE: FirmwareVersion = FirmwareVersion::new(0, 0);

macro_rules! product {
    ($id:expr, $name:expr, color=$color:expr, ir=$ir:expr, mz=$mz:expr, chain=$chain:expr, matrix=$matrix:expr, ext=$ext:expr) => {
        Product {
            id: $id,
            name: $name,
            color: $color,
            infrared: $ir,
            multizone: $mz,
            chain: $chain,
            matrix: $matrix,
            extended_multizone: $ext,
        }
    };
}

static LIFX_PRODUCTS: &[Product] = &[
    product!(1, "Original 1000", color=true, ir=false, mz=false, chain=false, matrix=false, ext=None),
    product!(3, "Color 650", color=true, ir=false, mz=false, chain=false, matrix=false, ext=None),
    product!(10, "White 800 (Low Voltage)", color=false, ir=false, mz=false, chain=false, matrix=false, ext=None),
    product!(11, "White 800 (High Voltage)", color=false, ir=false, mz=false, chain=false, matrix=false, ext=None),
    product!(18, "White 900 BR30 (Low Voltage)", color=false, ir=false, mz=false, chain=false, matrix=false, ext=None),
    product!(20, "Color 1000 BR30", color=true, ir=false, mz=false, chain=false, matrix=false, ext=None),
    product!(22, "Color 1000", color=true, ir=false, mz=false, chain=false, matrix=false, ext=None),
    product!(27, "LIFX A19", color=true, ir=false, mz=false, chain=false, matrix=false, ext=None),
    product!(28, "LIFX BR30", color=true, ir=false, mz=false, chain=false, matrix=false, ext=None),
    product!(29, "LIFX+ A19", color=true, ir=true, mz=false, chain=false, matrix=false, ext=None),
    product!(30, "LIFX+ BR30", color=true, ir=true, mz=false, chain=false, matrix=false, ext=None),
    product!(31, "LIFX Z", color=true, ir=false, mz=true, chain=false, matrix=false, ext=None),
    product!(32, "LIFX Z 2", color=true, ir=false, mz=true, chain=false, matrix=false, ext=Some(EXT_MZ_FIRMWARE)),
    product!(36, "LIFX Downlight", color=true, ir=false, mz=false, chain=false, matrix=false, ext=None),
    product!(37, "LIFX Downlight", color=true, ir=false, mz=false, chain=false, matrix=false, ext=None),
    product!(38, "LIFX Beam", color=true, ir=false, mz=true, chain=false, matrix=false, ext=Some(EXT_MZ_FIRMWARE)),
    product!(43, "LIFX A19", color=true, ir=false, mz=false, chain=false, matrix=false, ext=None),
    product!(44, "LIFX BR30", color=true, ir=false, mz=false, chain=false, matrix=false, ext=None),
    product!(45, "LIFX+ A19", color=true, ir=true, mz=false, chain=false, matrix=false, ext=None),
    product!(46, "LIFX+ BR30", color=true, ir=true, mz=false, chain=false, matrix=false, ext=None),
    product!(49, "LIFX Mini", color=true, ir=false, mz=false, chain=false, matrix=false, ext=None),
    product!(50, "LIFX Mini Day and Dusk", color=false, ir=false, mz=false, chain=false, matrix=false, ext=None),
    product!(51, "LIFX Mini White", color=false, ir=false, mz=false, chain=false, matrix=false, ext=None),
    product!(52, "LIFX GU10", color=true, ir=false, mz=false, chain=false, matrix=false, ext=None),
    product!(55, "LIFX Tile", color=true, ir=false, mz=false, chain=true, matrix=true, ext=None),
    product!(57, "LIFX Candle", color=true, ir=false, mz=false, chain=false, matrix=true, ext=None),
    product!(59, "LIFX Mini Color", color=true, ir=false, mz=false, chain=false, matrix=false, ext=None),
    product!(60, "LIFX Mini Day and Dusk", color=false, ir=false, mz=false, chain=false, matrix=false, ext=None),
    product!(61, "LIFX Mini White", color=false, ir=false, mz=false, chain=false, matrix=false, ext=None),
    product!(117, "LIFX Z", color=true, ir=false, mz=true, chain=false, matrix=false, ext=Some(NATIVE)),
    product!(118, "LIFX Z", color=true, ir=false, mz=true, chain=false, matrix=false, ext=Some(NATIVE)),
    product!(119, "LIFX Beam", color=true, ir=false, mz=true, chain=false, matrix=false, ext=Some(NATIVE)),
    product!(120, "LIFX Beam", color=true, ir=false, mz=true, chain=false, matrix=false, ext=Some(NATIVE)),
];

impl Product {
    /// Look up a product by vendor and product id.
    ///
    /// # Examples
    ///
    /// ```
    /// use lifx_lan_rs::{DeviceKind, Product};
    ///
    /// let beam = Product::lookup(1, 38).unwrap();
    /// assert_eq!(beam.name, "LIFX Beam");
    /// assert_eq!(beam.kind(), DeviceKind::MultiZone);
    /// assert!(Product::lookup(2, 38).is_none());
    /// ```
    pub fn lookup(vendor: u32, product: u32) -> Option<&'static Product> {
        if Vendor::from_id(vendor) != Vendor::Lifx {
            return None;
        }
        LIFX_PRODUCTS.iter().find(|p| p.id == product)
    }

    pub fn kind(&self) -> DeviceKind {
        if self.chain {
            DeviceKind::TileChain
        } else if self.multizone {
            DeviceKind::MultiZone
        } else {
            DeviceKind::Light
        }
    }

    /// Whether the extended multizone messages can be used with `firmware`.
    ///
    /// Unknown firmware only qualifies products that support them natively.
    pub fn supports_extended_multizone(&self, firmware: Option<FirmwareVersion>) -> bool {
        match self.extended_multizone {
            Some(min) => firmware.unwrap_or_default() >= min,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(Product::lookup(1, 55).unwrap().kind(), DeviceKind::TileChain);
        assert_eq!(Product::lookup(1, 31).unwrap().kind(), DeviceKind::MultiZone);
        assert_eq!(Product::lookup(1, 57).unwrap().kind(), DeviceKind::Light);
        assert!(Product::lookup(1, 9999).is_none());
        assert_eq!(DeviceKind::iter().count(), 4);
    }

    #[test]
    fn test_extended_multizone_firmware_gate() {
        let z2 = Product::lookup(1, 32).unwrap();
        assert!(!z2.supports_extended_multizone(None));
        assert!(!z2.supports_extended_multizone(Some(FirmwareVersion::new(2, 76))));
        assert!(z2.supports_extended_multizone(Some(FirmwareVersion::new(2, 77))));
        assert!(z2.supports_extended_multizone(Some(FirmwareVersion::new(3, 0))));

        let z = Product::lookup(1, 117).unwrap();
        assert!(z.supports_extended_multizone(None));
        assert!(!Product::lookup(1, 31).unwrap().supports_extended_multizone(None));
    }

    #[test]
    fn test_firmware_display() {
        assert_eq!(FirmwareVersion::new(2, 80).to_string(), "2.80");
    }
}
