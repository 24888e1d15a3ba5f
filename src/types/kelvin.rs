//! Color temperature, and the mapping from a generic warm-to-cold slider.

use serde::{Deserialize, Serialize};

use super::Color;

/// Color temperature in Kelvin, with valid values from 1500K to 9000K.
///
/// Lower values produce warmer (more yellow/orange) light, while higher
/// values produce cooler (more blue) light. Typical values:
/// - 2700K: Warm white (incandescent-like)
/// - 3500K: Neutral white
/// - 6500K: Daylight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kelvin {
    pub(crate) kelvin: u16,
}

impl Default for Kelvin {
    fn default() -> Self {
        Kelvin {
            kelvin: Color::WHITE_TEMPERATURE,
        }
    }
}

impl Kelvin {
    const MIN: u16 = Color::MIN_KELVIN;
    const MAX: u16 = Color::MAX_KELVIN;

    /// Upper end of the slider scale used by [`Kelvin::from_progress`].
    pub const PROGRESS_MAX: u16 = 120;

    /// Get the kelvin value.
    pub fn kelvin(&self) -> u16 {
        self.kelvin
    }

    /// Create a new Kelvin with the given value.
    ///
    /// Returns `None` if value is outside the valid range (1500-9000).
    ///
    /// # Examples
    ///
    /// ```
    /// use lifx_lan_rs::Kelvin;
    ///
    /// assert!(Kelvin::create(1499).is_none());
    /// assert!(Kelvin::create(1500).is_some());
    /// assert!(Kelvin::create(9000).is_some());
    /// assert!(Kelvin::create(9001).is_none());
    /// ```
    pub fn create(kelvin: u16) -> Option<Self> {
        if (Self::MIN..=Self::MAX).contains(&kelvin) {
            Some(Kelvin { kelvin })
        } else {
            None
        }
    }

    /// Map a slider position in `0..=120` to a color temperature.
    ///
    /// The scale is piecewise linear with breakpoints at 3500K (position 72)
    /// and 5000K (position 96), giving the warm range more resolution. The
    /// breakpoints were tuned by eye against real bulbs and are not derived
    /// from any colorimetric model.
    ///
    /// # Examples
    ///
    /// ```
    /// use lifx_lan_rs::Kelvin;
    ///
    /// assert_eq!(Kelvin::from_progress(0).kelvin(), 1500);
    /// assert_eq!(Kelvin::from_progress(72).kelvin(), 3500);
    /// assert_eq!(Kelvin::from_progress(96).kelvin(), 5000);
    /// assert_eq!(Kelvin::from_progress(120).kelvin(), 9000);
    /// ```
    pub fn from_progress(progress: i32) -> Self {
        let kelvin = if progress <= 72 {
            1000 * progress / 36 + 1500
        } else if progress <= 96 {
            1000 * (progress - 72) / 16 + 3500
        } else {
            1000 * (progress - 96) / 6 + 5000
        };
        Kelvin {
            kelvin: kelvin.clamp(Self::MIN as i32, Self::MAX as i32) as u16,
        }
    }

    /// Inverse of [`Kelvin::from_progress`], clamped to `0..=120`.
    pub fn to_progress(&self) -> u16 {
        let kelvin = self.kelvin as i32;
        let progress = if kelvin <= 3500 {
            (kelvin - 1500) * 36 / 1000
        } else if kelvin <= 5000 {
            72 + (kelvin - 3500) * 16 / 1000
        } else {
            96 + (kelvin - 5000) * 6 / 1000
        };
        progress.clamp(0, Self::PROGRESS_MAX as i32) as u16
    }
}

/// Infer a white [`Color`] from an RGB sample of a brightness/temperature
/// gradient (warm orange through white to cold blue, darkening downwards).
///
/// The branch constants approximate how such a gradient is usually drawn and
/// should be validated against device firmware before being relied upon.
pub fn white_from_rgb(red: u8, green: u8, blue: u8) -> Color {
    let r = red as f64 / 255.0;
    let g = green as f64 / 255.0;
    let b = blue as f64 / 255.0;
    let value = r.max(g).max(b);

    let temperature = if b == 0.0 {
        if r == 0.0 { 0.0 } else { (g / r - 0.375) * 0.48 }
    } else if b < g {
        0.3 * (1.0 + b / g)
    } else if g == 0.0 {
        1.0
    } else {
        (1.0 - r / g) * 0.8 + 0.6
    };

    let mut brightness = (value - 1.0 / 16.0) * 16.0 / 15.0;
    if brightness <= 0.0 {
        brightness = 1.0 / u16::MAX as f64;
    }

    let kelvin = Kelvin::from_progress((temperature * Kelvin::PROGRESS_MAX as f64) as i32);
    Color::from_fractions(0.0, 0.0, brightness, kelvin.kelvin())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_is_clamped() {
        assert_eq!(Kelvin::from_progress(-10).kelvin(), 1500);
        assert_eq!(Kelvin::from_progress(500).kelvin(), 9000);
        assert_eq!(Kelvin { kelvin: 20000 }.to_progress(), 120);
        assert_eq!(Kelvin { kelvin: 100 }.to_progress(), 0);
    }

    #[test]
    fn test_progress_round_trip_on_breakpoints() {
        for progress in [0, 36, 72, 80, 96, 108, 120] {
            assert_eq!(Kelvin::from_progress(progress).to_progress() as i32, progress);
        }
    }

    #[test]
    fn test_progress_is_monotonic() {
        let mut last = 0;
        for progress in 0..=120 {
            let kelvin = Kelvin::from_progress(progress).kelvin();
            assert!(kelvin >= last);
            last = kelvin;
        }
    }

    #[test]
    fn test_white_from_rgb() {
        let white = white_from_rgb(255, 255, 255);
        assert_eq!(white.saturation(), 0);
        assert_eq!(white.brightness(), 65535);
        // (1 - 1) * 0.8 + 0.6 = 0.6 -> progress 72
        assert_eq!(white.kelvin(), 3500);

        let black = white_from_rgb(0, 0, 0);
        assert_eq!(black.brightness(), 1);
    }
}
