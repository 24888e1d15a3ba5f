//! Device target (MAC) addresses.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::Error;

/// The 6-byte MAC address used in the header's `target` field.
///
/// On the wire the MAC occupies the low six bytes of a little-endian `u64`;
/// the remaining two bytes are reserved. An all-zero target addresses every
/// device on the network.
///
/// # Examples
///
/// ```
/// use std::str::FromStr;
/// use lifx_lan_rs::TargetAddress;
///
/// let target = TargetAddress::from_str("D0:73:D5:53:DC:A7").unwrap();
/// assert_eq!(target.to_string(), "D0:73:D5:53:DC:A7");
/// assert_eq!(TargetAddress::from_wire(target.to_wire()), target);
/// assert!(TargetAddress::BROADCAST.is_broadcast());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct TargetAddress([u8; 6]);

impl TargetAddress {
    /// The all-devices target used for tagged (broadcast) messages.
    pub const BROADCAST: TargetAddress = TargetAddress([0; 6]);

    pub const fn new(mac: [u8; 6]) -> Self {
        TargetAddress(mac)
    }

    pub fn mac(&self) -> [u8; 6] {
        self.0
    }

    pub fn is_broadcast(&self) -> bool {
        self.0 == [0; 6]
    }

    /// The value of the header `target` field.
    pub fn to_wire(&self) -> u64 {
        let mut bytes = [0u8; 8];
        bytes[..6].copy_from_slice(&self.0);
        u64::from_le_bytes(bytes)
    }

    /// Extracts the MAC from a header `target` field, ignoring the reserved bytes.
    pub fn from_wire(target: u64) -> Self {
        let bytes = target.to_le_bytes();
        let mut mac = [0u8; 6];
        mac.copy_from_slice(&bytes[..6]);
        TargetAddress(mac)
    }
}

impl fmt::Display for TargetAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            m[0], m[1], m[2], m[3], m[4], m[5]
        )
    }
}

impl FromStr for TargetAddress {
    type Err = Error;

    /// Parse from `D0:73:D5:53:DC:A7`, `d0-73-d5-53-dc-a7` or `D073D553DCA7`.
    fn from_str(s: &str) -> Result<Self, Error> {
        let hex: String = s.chars().filter(|c| *c != ':' && *c != '-').collect();
        if hex.len() != 12 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::InvalidTarget(s.to_string()));
        }
        let mut mac = [0u8; 6];
        for (i, slot) in mac.iter_mut().enumerate() {
            *slot = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
                .map_err(|_| Error::InvalidTarget(s.to_string()))?;
        }
        Ok(TargetAddress(mac))
    }
}

impl From<TargetAddress> for String {
    fn from(target: TargetAddress) -> Self {
        target.to_string()
    }
}

impl TryFrom<String> for TargetAddress {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Error> {
        value.parse()
    }
}
