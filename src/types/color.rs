//! HSBK color representation.

use serde::{Deserialize, Serialize};

/// A color as understood by the lights: hue, saturation, brightness, kelvin.
///
/// All four channels are raw unsigned 16-bit protocol values:
/// - hue covers the color wheel, `0..=65535` maps to `0..360` degrees
/// - saturation and brightness are fractions of 65535
/// - kelvin is the white point, `1500..=9000` on current devices
///
/// [`Color::NONE`] (kelvin 0) is the sentinel for "no color", as reported by
/// lights that cannot display color.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub(crate) hue: u16,
    pub(crate) saturation: u16,
    pub(crate) brightness: u16,
    pub(crate) kelvin: u16,
}

impl Color {
    /// Neutral white point used for saturated colors.
    pub const WHITE_TEMPERATURE: u16 = 4000;
    pub const MIN_KELVIN: u16 = 1500;
    pub const MAX_KELVIN: u16 = 9000;

    pub const NONE: Color = Color::new(0, 0, 0, 0);
    pub const OFF: Color = Color::new(0, 0, 0, Self::WHITE_TEMPERATURE);
    pub const WHITE: Color = Color::new(0, 0, u16::MAX, Self::WHITE_TEMPERATURE);
    pub const RED: Color = Color::new(0, u16::MAX, u16::MAX, Self::WHITE_TEMPERATURE);
    pub const YELLOW: Color = Color::new(10923, u16::MAX, u16::MAX, Self::WHITE_TEMPERATURE);
    pub const GREEN: Color = Color::new(21845, u16::MAX, u16::MAX, Self::WHITE_TEMPERATURE);
    pub const CYAN: Color = Color::new(32768, u16::MAX, u16::MAX, Self::WHITE_TEMPERATURE);
    pub const BLUE: Color = Color::new(43690, u16::MAX, u16::MAX, Self::WHITE_TEMPERATURE);
    pub const MAGENTA: Color = Color::new(54613, u16::MAX, u16::MAX, Self::WHITE_TEMPERATURE);

    /// Create a color from raw protocol values.
    pub const fn new(hue: u16, saturation: u16, brightness: u16, kelvin: u16) -> Self {
        Color {
            hue,
            saturation,
            brightness,
            kelvin,
        }
    }

    /// Create a color from a hue in degrees and saturation/brightness fractions.
    ///
    /// Out of range values are wrapped (hue) or clamped (fractions).
    ///
    /// # Examples
    ///
    /// ```
    /// use lifx_lan_rs::Color;
    ///
    /// let color = Color::from_fractions(120.0, 1.0, 0.5, 3500);
    /// assert_eq!(color.hue(), 21845);
    /// assert_eq!(color.saturation(), 65535);
    /// assert_eq!(color.brightness(), 32768);
    /// ```
    pub fn from_fractions(hue_degrees: f64, saturation: f64, brightness: f64, kelvin: u16) -> Self {
        Color {
            hue: degrees_to_hue(hue_degrees),
            saturation: fraction_to_u16(saturation),
            brightness: fraction_to_u16(brightness),
            kelvin,
        }
    }

    /// Create a color from 8-bit RGB components, using HSV conversion.
    pub fn from_rgb(red: u8, green: u8, blue: u8, kelvin: u16) -> Self {
        let r = red as f64 / 255.0;
        let g = green as f64 / 255.0;
        let b = blue as f64 / 255.0;
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;

        let hue = if delta == 0.0 {
            0.0
        } else if max == r {
            60.0 * ((g - b) / delta).rem_euclid(6.0)
        } else if max == g {
            60.0 * ((b - r) / delta + 2.0)
        } else {
            60.0 * ((r - g) / delta + 4.0)
        };
        let saturation = if max == 0.0 { 0.0 } else { delta / max };

        Self::from_fractions(hue, saturation, max, kelvin)
    }

    /// Convert to 8-bit RGB, ignoring the white point.
    pub fn to_rgb(&self) -> (u8, u8, u8) {
        let h = self.hue_degrees() / 60.0;
        let s = self.saturation_fraction();
        let v = self.brightness_fraction();

        let i = h.floor() as i32;
        let f = h - i as f64;
        let p = v * (1.0 - s);
        let q = v * (1.0 - s * f);
        let t = v * (1.0 - s * (1.0 - f));

        let (r, g, b) = match i % 6 {
            0 => (v, t, p),
            1 => (q, v, p),
            2 => (p, v, t),
            3 => (p, q, v),
            4 => (t, p, v),
            _ => (v, p, q),
        };
        let to_byte = |x: f64| (x * 255.0).round().clamp(0.0, 255.0) as u8;
        (to_byte(r), to_byte(g), to_byte(b))
    }

    pub fn hue(&self) -> u16 {
        self.hue
    }

    pub fn saturation(&self) -> u16 {
        self.saturation
    }

    pub fn brightness(&self) -> u16 {
        self.brightness
    }

    pub fn kelvin(&self) -> u16 {
        self.kelvin
    }

    /// Hue in degrees, `0.0..360.0`.
    pub fn hue_degrees(&self) -> f64 {
        self.hue as f64 * 360.0 / 65536.0
    }

    /// Saturation as a fraction, `0.0..=1.0`.
    pub fn saturation_fraction(&self) -> f64 {
        self.saturation as f64 / u16::MAX as f64
    }

    /// Brightness as a fraction, `0.0..=1.0`.
    pub fn brightness_fraction(&self) -> f64 {
        self.brightness as f64 / u16::MAX as f64
    }

    /// Whether this is the "no color" sentinel.
    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }

    pub fn with_brightness(&self, brightness: u16) -> Self {
        Color {
            brightness,
            ..*self
        }
    }

    pub fn with_kelvin(&self, kelvin: u16) -> Self {
        Color { kelvin, ..*self }
    }

    /// Scale the brightness by `factor`, saturating at full brightness.
    ///
    /// # Examples
    ///
    /// ```
    /// use lifx_lan_rs::Color;
    ///
    /// assert_eq!(Color::RED.with_relative_brightness(0.5).brightness(), 32768);
    /// assert_eq!(Color::RED.with_relative_brightness(3.0).brightness(), 65535);
    /// ```
    pub fn with_relative_brightness(&self, factor: f64) -> Self {
        let brightness = (self.brightness as f64 * factor).round();
        self.with_brightness(brightness.clamp(0.0, u16::MAX as f64) as u16)
    }

    /// Blend towards `other`; `quota` 0 yields `self`, 1 yields `other`.
    ///
    /// Hue moves along the shorter arc of the color wheel, the other channels
    /// linearly.
    pub fn interpolate(&self, other: &Color, quota: f64) -> Self {
        let quota = quota.clamp(0.0, 1.0);

        let mut diff = other.hue as i32 - self.hue as i32;
        if diff > 32768 {
            diff -= 65536;
        } else if diff < -32768 {
            diff += 65536;
        }
        let hue = (self.hue as f64 + diff as f64 * quota).round() as i64;

        Color {
            hue: hue.rem_euclid(65536) as u16,
            saturation: lerp(self.saturation, other.saturation, quota),
            brightness: lerp(self.brightness, other.brightness, quota),
            kelvin: lerp(self.kelvin, other.kelvin, quota),
        }
    }
}

fn lerp(from: u16, to: u16, quota: f64) -> u16 {
    (from as f64 + (to as f64 - from as f64) * quota).round() as u16
}

fn degrees_to_hue(degrees: f64) -> u16 {
    let raw = (degrees.rem_euclid(360.0) * 65536.0 / 360.0).round() as u32;
    (raw % 65536) as u16
}

fn fraction_to_u16(fraction: f64) -> u16 {
    (fraction.clamp(0.0, 1.0) * u16::MAX as f64).round() as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degrees() {
        assert_eq!(Color::from_fractions(0.0, 1.0, 1.0, 3500).hue(), 0);
        assert_eq!(Color::from_fractions(360.0, 1.0, 1.0, 3500).hue(), 0);
        assert_eq!(Color::from_fractions(-120.0, 1.0, 1.0, 3500).hue(), 43691);
        assert!((Color::BLUE.hue_degrees() - 240.0).abs() < 0.01);
    }

    #[test]
    fn test_interpolate_endpoints() {
        let a = Color::new(1000, 0, 100, 2500);
        let b = Color::new(2000, 65535, 65535, 9000);
        assert_eq!(a.interpolate(&b, 0.0), a);
        assert_eq!(a.interpolate(&b, 1.0), b);
        let mid = a.interpolate(&b, 0.5);
        assert_eq!(mid.hue(), 1500);
        assert_eq!(mid.kelvin(), 5750);
    }

    #[test]
    fn test_interpolate_takes_short_arc() {
        let blue = Color::BLUE;
        let red = Color::RED;
        let between = blue.interpolate(&red, 0.5);
        // 240 -> 360 degrees, midpoint at 300 (magenta), not 120 (green)
        assert!((between.hue_degrees() - 300.0).abs() < 0.1);
    }

    #[test]
    fn test_relative_brightness_saturates() {
        let dim = Color::WHITE.with_brightness(1000);
        assert_eq!(dim.with_relative_brightness(0.0).brightness(), 0);
        assert_eq!(dim.with_relative_brightness(2.0).brightness(), 2000);
        assert_eq!(Color::WHITE.with_relative_brightness(1.5).brightness(), 65535);
    }

    #[test]
    fn test_rgb_conversion() {
        assert_eq!(Color::RED.to_rgb(), (255, 0, 0));
        let green = Color::from_rgb(0, 255, 0, 3500);
        assert_eq!(green.hue(), Color::GREEN.hue());
        assert_eq!(green.saturation(), 65535);
        assert_eq!(Color::from_rgb(0, 0, 0, 3500).brightness(), 0);
    }

    #[test]
    fn test_none_sentinel() {
        assert!(Color::NONE.is_none());
        assert!(!Color::OFF.is_none());
    }
}
