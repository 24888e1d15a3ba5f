//! Multizone lights (LIFX Z strips and Beams).

use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use log::debug;

use crate::animation::{AnimationFrame, FrameSink, RollingAnimation};
use crate::device::{Device, millis};
use crate::errors::Error;
use crate::light::Light;
use crate::message::{
    ApplicationRequest, EXTENDED_ZONES, MULTIZONE_BATCH, RequestMessage, ResponseMessage,
};
use crate::runtime::BoxFuture;
use crate::types::{Color, FirmwareVersion, MultizoneColors, Power, TargetAddress};

type Result<T> = std::result::Result<T, Error>;

/// A light with individually addressable zones.
///
/// Strips with extended multizone support get all zones in one message;
/// older firmware gets one `SetColorZones` per run of equal colors, applied
/// together by the last one.
#[derive(Debug, Clone)]
pub struct MultiZoneLight {
    light: Light,
}

impl Deref for MultiZoneLight {
    type Target = Light;

    fn deref(&self) -> &Light {
        &self.light
    }
}

impl From<Light> for MultiZoneLight {
    fn from(light: Light) -> Self {
        MultiZoneLight { light }
    }
}

impl From<Device> for MultiZoneLight {
    fn from(device: Device) -> Self {
        MultiZoneLight {
            light: Light::from(device),
        }
    }
}

impl MultiZoneLight {
    /// The cached zone count.
    pub fn zone_count(&self) -> Option<usize> {
        self.lock_status().zone_count()
    }

    /// The cached zone colors.
    pub fn zones(&self) -> Option<MultizoneColors> {
        self.lock_status().zones().cloned()
    }

    pub async fn get_zone_count(&self) -> Result<usize> {
        let response = self
            .request(RequestMessage::GetColorZones { start: 0, end: 0 })
            .await?;
        match response {
            ResponseMessage::StateZone { count, .. } | ResponseMessage::StateMultiZone { count, .. } => {
                Ok(count as usize)
            }
            other => Err(Error::malformed(format!(
                "unexpected response to GetColorZones: {other:?}"
            ))),
        }
    }

    async fn resolve_zone_count(&self) -> Result<usize> {
        match self.zone_count() {
            Some(count) => Ok(count),
            None => self.get_zone_count().await,
        }
    }

    /// Whether the strip understands the extended multizone messages.
    pub async fn supports_extended(&self) -> Result<bool> {
        let Some(product) = self.resolve_product().await? else {
            return Ok(false);
        };
        let firmware = match product.extended_multizone {
            None => return Ok(false),
            Some(min) if min > FirmwareVersion::default() => Some(self.resolve_firmware().await?),
            Some(_) => None,
        };
        Ok(product.supports_extended_multizone(firmware))
    }

    /// Read the color of every zone.
    pub async fn get_colors(&self) -> Result<MultizoneColors> {
        let count = self.resolve_zone_count().await?;
        let mut zones = vec![Color::NONE; count];

        if self.supports_extended().await? {
            let policy = self
                .retry_policy()
                .expecting(Some(count.div_ceil(EXTENDED_ZONES).max(1)));
            for response in self
                .request_all(&RequestMessage::GetExtendedColorZones, &policy)
                .await?
            {
                if let ResponseMessage::StateExtendedColorZones { index, colors, .. } =
                    response.message
                {
                    place(&mut zones, index as usize, colors);
                }
            }
        } else {
            let policy = self
                .retry_policy()
                .expecting(Some(count.div_ceil(MULTIZONE_BATCH).max(1)));
            let request = RequestMessage::GetColorZones {
                start: 0,
                end: u8::MAX,
            };
            for response in self.request_all(&request, &policy).await? {
                match response.message {
                    ResponseMessage::StateMultiZone { index, colors, .. } => {
                        place(&mut zones, index as usize, colors);
                    }
                    ResponseMessage::StateZone { index, color, .. } => {
                        place(&mut zones, index as usize, vec![color]);
                    }
                    _ => {}
                }
            }
        }

        let colors = MultizoneColors::Exact(zones);
        self.lock_status().set_zones(colors.clone());
        Ok(colors)
    }

    /// Show `colors` on the strip, fading over `duration`.
    ///
    /// Transient changes are not acknowledged.
    pub async fn set_colors(
        &self,
        colors: &MultizoneColors,
        duration: Duration,
        transient: bool,
    ) -> Result<()> {
        let count = self.resolve_zone_count().await?;
        let zones = colors.to_vec(count);
        let duration = millis(duration);

        if self.supports_extended().await? {
            let chunks: Vec<&[Color]> = zones.chunks(EXTENDED_ZONES).collect();
            let last = chunks.len().saturating_sub(1);
            for (i, chunk) in chunks.into_iter().enumerate() {
                let message = RequestMessage::SetExtendedColorZones {
                    duration,
                    apply: apply_if(i == last),
                    index: (i * EXTENDED_ZONES) as u16,
                    colors: chunk.to_vec(),
                };
                self.send_setter(message, transient).await?;
            }
        } else {
            let runs = runs(&zones);
            debug!("{} zones in {} runs", zones.len(), runs.len());
            let last = runs.len().saturating_sub(1);
            for (i, (start, end, color)) in runs.into_iter().enumerate() {
                let message = RequestMessage::SetColorZones {
                    start: start as u8,
                    end: end as u8,
                    color,
                    duration,
                    apply: apply_if(i == last),
                };
                self.send_setter(message, transient).await?;
            }
        }

        self.lock_status().set_zones(MultizoneColors::Exact(zones));
        Ok(())
    }

    /// Scroll `colors` along the strip, one full length every `cycle`.
    pub async fn rolling_animation(
        &self,
        cycle: Duration,
        colors: MultizoneColors,
    ) -> Result<RollingAnimation> {
        let count = self.resolve_zone_count().await?;
        // resolved once here so frames are pushed without extra round trips
        self.supports_extended().await?;

        Ok(RollingAnimation::new(
            self.client().clone(),
            Arc::new(self.clone()),
            cycle,
            move |phase| AnimationFrame::Zones(colors.shift(phase * count as f64, count)),
        ))
    }
}

fn apply_if(last: bool) -> ApplicationRequest {
    if last {
        ApplicationRequest::Apply
    } else {
        ApplicationRequest::NoApply
    }
}

fn place(zones: &mut [Color], index: usize, colors: Vec<Color>) {
    for (zone, color) in zones.iter_mut().skip(index).zip(colors) {
        *zone = color;
    }
}

/// Runs of equal colors as `(start, end, color)`, `end` inclusive.
fn runs(zones: &[Color]) -> Vec<(usize, usize, Color)> {
    let mut runs: Vec<(usize, usize, Color)> = Vec::new();
    for (zone, color) in zones.iter().enumerate() {
        match runs.last_mut() {
            Some((_, end, last)) if last == color => *end = zone,
            _ => runs.push((zone, zone, *color)),
        }
    }
    runs
}

impl FrameSink for MultiZoneLight {
    fn target(&self) -> TargetAddress {
        self.device().target()
    }

    fn push_frame(&self, frame: AnimationFrame, duration: Duration) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            match frame {
                AnimationFrame::Zones(colors) => self.set_colors(&colors, duration, true).await,
                AnimationFrame::Color(color) => {
                    self.set_colors(&MultizoneColors::Fixed(color), duration, true)
                        .await
                }
                AnimationFrame::Power(on) => {
                    self.fire(RequestMessage::SetPower { level: Power::from(on) })
                        .await
                }
                AnimationFrame::Tiles(_) => Err(Error::unsupported(self.target(), "tile frames")),
            }
        })
    }
}
