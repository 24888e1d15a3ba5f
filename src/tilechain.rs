//! Tile chains: several pixel matrices laid out on one canvas.

use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use crate::animation::{AnimationFrame, FrameSink, RollingAnimation};
use crate::device::{Device, millis};
use crate::errors::Error;
use crate::light::Light;
use crate::message::{RequestMessage, ResponseMessage, TILE_PIXELS};
use crate::runtime::BoxFuture;
use crate::types::{Color, Power, TargetAddress, TileCanvas, TileChainColors};

type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone)]
pub struct TileChain {
    light: Light,
}

impl Deref for TileChain {
    type Target = Light;

    fn deref(&self) -> &Light {
        &self.light
    }
}

impl From<Light> for TileChain {
    fn from(light: Light) -> Self {
        TileChain { light }
    }
}

impl From<Device> for TileChain {
    fn from(device: Device) -> Self {
        TileChain {
            light: Light::from(device),
        }
    }
}

impl TileChain {
    /// The canvas of the cached chain, if it was retrieved.
    pub fn canvas(&self) -> Option<TileCanvas> {
        self.lock_status()
            .tiles()
            .map(|tiles| TileCanvas::new(tiles.to_vec()))
    }

    /// The cached tile colors.
    pub fn tile_colors(&self) -> Option<TileChainColors> {
        self.lock_status().tile_colors().cloned()
    }

    /// Retrieve the tiles of the chain and lay them out.
    pub async fn get_device_chain(&self) -> Result<TileCanvas> {
        match self.request(RequestMessage::GetDeviceChain).await? {
            ResponseMessage::StateDeviceChain { tiles, .. } => Ok(TileCanvas::new(tiles)),
            other => Err(Error::malformed(format!(
                "unexpected response to GetDeviceChain: {other:?}"
            ))),
        }
    }

    async fn resolve_canvas(&self) -> Result<TileCanvas> {
        match self.canvas() {
            Some(canvas) => Ok(canvas),
            None => self.get_device_chain().await,
        }
    }

    /// Row-major colors of tile `index`.
    pub async fn get_tile_colors(&self, index: usize) -> Result<Vec<Color>> {
        let canvas = self.resolve_canvas().await?;
        let tile = canvas.tiles().get(index).copied().ok_or_else(|| {
            Error::InvalidArgument(format!(
                "tile {index} out of range, chain has {}",
                canvas.tile_count()
            ))
        })?;

        let request = RequestMessage::Get64 {
            tile_index: index as u8,
            length: 1,
            x: 0,
            y: 0,
            width: tile.width,
        };
        match self.request(request).await? {
            ResponseMessage::State64 { mut colors, .. } => {
                colors.truncate(tile.pixel_count().min(TILE_PIXELS));
                Ok(colors)
            }
            other => Err(Error::malformed(format!(
                "unexpected response to Get64: {other:?}"
            ))),
        }
    }

    /// The whole canvas as one pixel grid.
    pub async fn get_colors(&self) -> Result<TileChainColors> {
        let canvas = self.resolve_canvas().await?;
        let (width, height) = (canvas.width(), canvas.height());
        let mut grid = vec![Color::NONE; width * height];

        for (index, tile) in canvas.tiles().iter().enumerate() {
            let colors = self.get_tile_colors(index).await?;
            let Some((ox, oy)) = canvas.origin(index) else {
                continue;
            };
            for (i, color) in colors.into_iter().enumerate() {
                let x = ox + i % tile.width as usize;
                let y = oy + i / tile.width as usize;
                if let Some(pixel) = grid.get_mut(y * width + x) {
                    *pixel = color;
                }
            }
        }

        let colors = TileChainColors::Exact {
            width,
            height,
            colors: grid,
        };
        self.lock_status().set_tile_colors(colors.clone());
        Ok(colors)
    }

    /// Paint `colors` across the canvas, one `Set64` per tile.
    pub async fn set_colors(
        &self,
        colors: &TileChainColors,
        duration: Duration,
        transient: bool,
    ) -> Result<()> {
        let canvas = self.resolve_canvas().await?;
        let duration = millis(duration);
        for (index, tile) in canvas.tiles().iter().enumerate() {
            let message = RequestMessage::Set64 {
                tile_index: index as u8,
                length: 1,
                x: 0,
                y: 0,
                width: tile.width,
                duration,
                colors: canvas.render_tile(index, colors),
            };
            self.send_setter(message, transient).await?;
        }
        self.lock_status().set_tile_colors(colors.clone());
        Ok(())
    }

    /// Scroll `colors` across the canvas, one full length every `cycle`.
    ///
    /// Only [`TileChainColors::Horizontal`] and [`TileChainColors::Vertical`]
    /// move; other colors are shown unchanged.
    pub async fn rolling_animation(
        &self,
        cycle: Duration,
        colors: TileChainColors,
    ) -> Result<RollingAnimation> {
        let canvas = self.resolve_canvas().await?;
        let (width, height) = (canvas.width(), canvas.height());
        let length = match colors {
            TileChainColors::Vertical(_) => height,
            _ => width,
        };

        Ok(RollingAnimation::new(
            self.client().clone(),
            Arc::new(self.clone()),
            cycle,
            move |phase| AnimationFrame::Tiles(colors.shift(phase * length as f64, width, height)),
        ))
    }
}

impl FrameSink for TileChain {
    fn target(&self) -> TargetAddress {
        self.device().target()
    }

    fn push_frame(&self, frame: AnimationFrame, duration: Duration) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            match frame {
                AnimationFrame::Tiles(colors) => self.set_colors(&colors, duration, true).await,
                AnimationFrame::Color(color) => {
                    self.set_colors(&TileChainColors::Fixed(color), duration, true)
                        .await
                }
                AnimationFrame::Power(on) => {
                    self.fire(RequestMessage::SetPower { level: Power::from(on) })
                        .await
                }
                AnimationFrame::Zones(_) => Err(Error::unsupported(self.target(), "zone frames")),
            }
        })
    }
}
