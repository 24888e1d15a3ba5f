//! Tile geometry and colors for tile chains.

use serde::{Deserialize, Serialize};

use super::{Color, MultizoneColors};

/// Geometry of one tile in a chain, as reported by `StateDeviceChain`.
///
/// `user_x`/`user_y` are the positions configured in the app, measured in
/// tile widths/heights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileInfo {
    pub width: u8,
    pub height: u8,
    pub user_x: f32,
    pub user_y: f32,
}

impl TileInfo {
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Furthest a tile may sit from the origin, in tile widths/heights.
///
/// Positions come from the device; anything further out (or not finite) is
/// clamped so the canvas stays small.
pub const MAX_TILE_OFFSET: f32 = 64.0;

fn pixel_offset(user: f32, size: u8) -> i64 {
    let user = if user.is_finite() {
        user.clamp(-MAX_TILE_OFFSET, MAX_TILE_OFFSET)
    } else {
        0.0
    };
    (user as f64 * size as f64).round() as i64
}

/// The tiles of a chain laid out on one pixel canvas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TileCanvas {
    tiles: Vec<TileInfo>,
    origins: Vec<(usize, usize)>,
    width: usize,
    height: usize,
}

impl TileCanvas {
    pub fn new(tiles: Vec<TileInfo>) -> Self {
        let raw: Vec<(i64, i64)> = tiles
            .iter()
            .map(|t| (pixel_offset(t.user_x, t.width), pixel_offset(t.user_y, t.height)))
            .collect();
        let min_x = raw.iter().map(|p| p.0).min().unwrap_or(0);
        let min_y = raw.iter().map(|p| p.1).min().unwrap_or(0);

        let origins: Vec<(usize, usize)> = raw
            .iter()
            .map(|(x, y)| {
                (
                    x.saturating_sub(min_x) as usize,
                    y.saturating_sub(min_y) as usize,
                )
            })
            .collect();
        let width = tiles
            .iter()
            .zip(&origins)
            .map(|(t, o)| o.0.saturating_add(t.width as usize))
            .max()
            .unwrap_or(0);
        let height = tiles
            .iter()
            .zip(&origins)
            .map(|(t, o)| o.1.saturating_add(t.height as usize))
            .max()
            .unwrap_or(0);

        TileCanvas {
            tiles,
            origins,
            width,
            height,
        }
    }

    pub fn tiles(&self) -> &[TileInfo] {
        &self.tiles
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Canvas position of the top-left pixel of tile `index`.
    pub fn origin(&self, index: usize) -> Option<(usize, usize)> {
        self.origins.get(index).copied()
    }

    /// Row-major colors for tile `index`, sampled from `colors` on this canvas.
    pub fn render_tile(&self, index: usize, colors: &TileChainColors) -> Vec<Color> {
        let (Some(tile), Some((ox, oy))) = (self.tiles.get(index), self.origin(index)) else {
            return Vec::new();
        };
        let mut out = Vec::with_capacity(tile.pixel_count());
        for y in 0..tile.height as usize {
            for x in 0..tile.width as usize {
                out.push(colors.color(ox + x, oy + y, self.width, self.height));
            }
        }
        out
    }
}

/// Colors for a tile chain, addressed by absolute canvas pixel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TileChainColors {
    Fixed(Color),
    /// A row-major pixel grid, scaled to the canvas.
    Exact {
        width: usize,
        height: usize,
        colors: Vec<Color>,
    },
    /// A zone sequence laid out left to right.
    Horizontal(MultizoneColors),
    /// A zone sequence laid out top to bottom.
    Vertical(MultizoneColors),
}

impl TileChainColors {
    /// Color of canvas pixel `(x, y)` on a `width` x `height` canvas.
    pub fn color(&self, x: usize, y: usize, width: usize, height: usize) -> Color {
        match self {
            TileChainColors::Fixed(color) => *color,
            TileChainColors::Exact {
                width: grid_width,
                height: grid_height,
                colors,
            } => {
                if width == 0 || height == 0 || *grid_width == 0 || *grid_height == 0 {
                    return Color::NONE;
                }
                let gx = (x * grid_width / width).min(grid_width - 1);
                let gy = (y * grid_height / height).min(grid_height - 1);
                colors
                    .get(gy * grid_width + gx)
                    .copied()
                    .unwrap_or(Color::NONE)
            }
            TileChainColors::Horizontal(colors) => colors.color(x, width),
            TileChainColors::Vertical(colors) => colors.color(y, height),
        }
    }

    pub fn with_relative_brightness(&self, factor: f64) -> TileChainColors {
        match self {
            TileChainColors::Fixed(color) => {
                TileChainColors::Fixed(color.with_relative_brightness(factor))
            }
            TileChainColors::Exact {
                width,
                height,
                colors,
            } => TileChainColors::Exact {
                width: *width,
                height: *height,
                colors: colors
                    .iter()
                    .map(|c| c.with_relative_brightness(factor))
                    .collect(),
            },
            TileChainColors::Horizontal(colors) => {
                TileChainColors::Horizontal(colors.with_relative_brightness(factor))
            }
            TileChainColors::Vertical(colors) => {
                TileChainColors::Vertical(colors.with_relative_brightness(factor))
            }
        }
    }

    /// Move the colors `offset` pixels along their axis on a `width` x
    /// `height` canvas, wrapping around.
    ///
    /// Fixed colors and pixel grids are returned unchanged.
    pub fn shift(&self, offset: f64, width: usize, height: usize) -> TileChainColors {
        match self {
            TileChainColors::Horizontal(colors) => {
                TileChainColors::Horizontal(colors.shift(offset, width))
            }
            TileChainColors::Vertical(colors) => {
                TileChainColors::Vertical(colors.shift(offset, height))
            }
            other => other.clone(),
        }
    }
}

impl From<Color> for TileChainColors {
    fn from(color: Color) -> Self {
        TileChainColors::Fixed(color)
    }
}
