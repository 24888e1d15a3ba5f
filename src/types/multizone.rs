//! Color sequences for multizone strips.

use serde::{Deserialize, Serialize};

use super::Color;

/// Colors for the zones of a multizone light, independent of zone count.
///
/// Every variant answers [`MultizoneColors::color`] for any zone in
/// `0..count`, so the same value can be sent to strips of different length.
///
/// # Examples
///
/// ```
/// use lifx_lan_rs::{Color, MultizoneColors};
///
/// let gradient = MultizoneColors::interpolated(false, [Color::RED, Color::BLUE]);
/// assert_eq!(gradient.color(0, 16), Color::RED);
/// assert_eq!(gradient.color(15, 16), Color::BLUE);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MultizoneColors {
    /// The same color on every zone.
    Fixed(Color),
    /// One color per zone, stretched proportionally if the strip length differs.
    Exact(Vec<Color>),
    /// Keyframes spread evenly across the strip.
    ///
    /// Non-cyclic: the first keyframe is at zone 0 and the last at the final
    /// zone. Cyclic: keyframes are spaced `count / n` apart and the last one
    /// blends back into the first.
    Interpolated { colors: Vec<Color>, cyclic: bool },
}

impl Default for MultizoneColors {
    fn default() -> Self {
        MultizoneColors::Fixed(Color::OFF)
    }
}

impl MultizoneColors {
    pub fn interpolated(cyclic: bool, colors: impl Into<Vec<Color>>) -> Self {
        MultizoneColors::Interpolated {
            colors: colors.into(),
            cyclic,
        }
    }

    /// Color of `zone` on a strip of `count` zones.
    pub fn color(&self, zone: usize, count: usize) -> Color {
        self.color_at(zone as f64, count)
    }

    /// Color at a fractional zone position.
    ///
    /// Positions are wrapped into `0..count` for cyclic sequences and clamped
    /// to `0..=count-1` otherwise.
    pub fn color_at(&self, position: f64, count: usize) -> Color {
        if count == 0 {
            return Color::NONE;
        }
        let count_f = count as f64;

        match self {
            MultizoneColors::Fixed(color) => *color,
            MultizoneColors::Exact(colors) => {
                if colors.is_empty() {
                    return Color::NONE;
                }
                let position = position.rem_euclid(count_f).floor() as usize;
                let index = position * colors.len() / count;
                colors[index.min(colors.len() - 1)]
            }
            MultizoneColors::Interpolated { colors, cyclic } => {
                let n = colors.len();
                if n == 0 {
                    return Color::NONE;
                }
                if n == 1 || count == 1 {
                    return colors[0];
                }
                if *cyclic {
                    let x = position.rem_euclid(count_f) * n as f64 / count_f;
                    let index = (x.floor() as usize).min(n - 1);
                    let next = (index + 1) % n;
                    colors[index].interpolate(&colors[next], x - index as f64)
                } else {
                    let position = position.clamp(0.0, count_f - 1.0);
                    let x = position * (n - 1) as f64 / (count_f - 1.0);
                    let index = (x.floor() as usize).min(n - 2);
                    colors[index].interpolate(&colors[index + 1], x - index as f64)
                }
            }
        }
    }

    /// Render the sequence onto `count` zones.
    pub fn to_vec(&self, count: usize) -> Vec<Color> {
        (0..count).map(|zone| self.color(zone, count)).collect()
    }

    /// Render the sequence moved `offset` zones towards the end of the strip.
    ///
    /// Zones pushed past the end come back in at the start.
    pub fn shift(&self, offset: f64, count: usize) -> MultizoneColors {
        let count_f = count as f64;
        MultizoneColors::Exact(
            (0..count)
                .map(|zone| self.color_at((zone as f64 - offset).rem_euclid(count_f), count))
                .collect(),
        )
    }

    /// Scale the brightness of every color by `factor`.
    pub fn with_relative_brightness(&self, factor: f64) -> MultizoneColors {
        match self {
            MultizoneColors::Fixed(color) => {
                MultizoneColors::Fixed(color.with_relative_brightness(factor))
            }
            MultizoneColors::Exact(colors) => MultizoneColors::Exact(
                colors
                    .iter()
                    .map(|c| c.with_relative_brightness(factor))
                    .collect(),
            ),
            MultizoneColors::Interpolated { colors, cyclic } => MultizoneColors::Interpolated {
                colors: colors
                    .iter()
                    .map(|c| c.with_relative_brightness(factor))
                    .collect(),
                cyclic: *cyclic,
            },
        }
    }

    /// Blend with `other` zone by zone; `quota` 0 keeps `self`, 1 yields `other`.
    pub fn add(&self, other: &MultizoneColors, quota: f64, count: usize) -> MultizoneColors {
        MultizoneColors::Exact(
            (0..count)
                .map(|zone| self.color(zone, count).interpolate(&other.color(zone, count), quota))
                .collect(),
        )
    }

    /// Highest brightness over all zones of a strip of `count` zones.
    pub fn max_brightness(&self, count: usize) -> u16 {
        (0..count)
            .map(|zone| self.color(zone, count).brightness())
            .max()
            .unwrap_or(0)
    }
}

impl From<Color> for MultizoneColors {
    fn from(color: Color) -> Self {
        MultizoneColors::Fixed(color)
    }
}

impl From<Vec<Color>> for MultizoneColors {
    fn from(colors: Vec<Color>) -> Self {
        MultizoneColors::Exact(colors)
    }
}
