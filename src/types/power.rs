//! Power level of a device.

use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Power state of a device.
///
/// Devices only accept 0 (off) and 65535 (on); any other level reported by a
/// device is kept as [`Power::Undefined`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum Power {
    On,
    Off,
    Undefined(u16),
}

impl Power {
    const LEVEL_ON: u16 = 65535;
    const LEVEL_OFF: u16 = 0;

    pub fn from_level(level: u16) -> Self {
        match level {
            Self::LEVEL_ON => Power::On,
            Self::LEVEL_OFF => Power::Off,
            other => Power::Undefined(other),
        }
    }

    pub fn level(&self) -> u16 {
        match self {
            Power::On => Self::LEVEL_ON,
            Power::Off => Self::LEVEL_OFF,
            Power::Undefined(level) => *level,
        }
    }

    pub fn is_on(&self) -> bool {
        *self == Power::On
    }

    pub fn is_off(&self) -> bool {
        *self == Power::Off
    }
}

impl From<bool> for Power {
    fn from(on: bool) -> Self {
        if on { Power::On } else { Power::Off }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels() {
        assert_eq!(Power::from_level(65535), Power::On);
        assert_eq!(Power::from_level(0), Power::Off);
        assert_eq!(Power::from_level(12), Power::Undefined(12));
        assert_eq!(Power::from(true).level(), 65535);
        assert!(Power::Off.is_off());
    }
}
