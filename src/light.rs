//! Lights: devices with a color.

use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use crate::animation::{Animation, AnimationFrame, AnimationHandle, AnimationOutcome, FrameSink};
use crate::device::{Device, millis};
use crate::errors::Error;
use crate::message::{RequestMessage, ResponseMessage};
use crate::runtime::BoxFuture;
use crate::types::{Color, Power, TargetAddress};

type Result<T> = std::result::Result<T, Error>;

/// A light bulb, strip or tile chain.
///
/// Dereferences to [`Device`] for the operations every device supports.
#[derive(Debug, Clone)]
pub struct Light {
    device: Device,
}

impl Deref for Light {
    type Target = Device;

    fn deref(&self) -> &Device {
        &self.device
    }
}

impl From<Device> for Light {
    fn from(device: Device) -> Self {
        Light { device }
    }
}

impl Light {
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// The cached color.
    pub fn color(&self) -> Option<Color> {
        self.lock_status().color()
    }

    /// Query the color; power and label are refreshed from the same response.
    pub async fn get_color(&self) -> Result<Color> {
        match self.request(RequestMessage::LightGet).await? {
            ResponseMessage::LightState { color, .. } => Ok(color),
            other => Err(Error::malformed(format!(
                "unexpected response to LightGet: {other:?}"
            ))),
        }
    }

    /// Change the color, fading over `duration`.
    ///
    /// A transient change is sent once without asking for an acknowledgement.
    pub async fn set_color(&self, color: Color, duration: Duration, transient: bool) -> Result<()> {
        let message = RequestMessage::LightSetColor {
            color,
            duration: millis(duration),
        };
        self.send_setter(message, transient).await
    }

    /// Wake up gently: power on at zero brightness and warmest white, then
    /// fade to `color` over `duration`.
    pub async fn wakeup(&self, duration: Duration, color: Color) -> AnimationHandle {
        self.wakeup_with(duration, color, |_| {}).await
    }

    /// [`Light::wakeup`] with a callback receiving the outcome.
    pub async fn wakeup_with(
        &self,
        duration: Duration,
        color: Color,
        on_end: impl FnOnce(&AnimationOutcome) + Send + 'static,
    ) -> AnimationHandle {
        let start = Color::new(color.hue(), color.saturation(), 0, Color::MIN_KELVIN);
        let mut first = true;
        let mut finished = false;
        let animation = Animation::new(move |elapsed| {
            if finished {
                return None;
            }
            if first {
                first = false;
                return Some(AnimationFrame::Color(start));
            }
            if elapsed >= duration {
                finished = true;
                return Some(AnimationFrame::Color(color));
            }
            let quota = elapsed.as_secs_f64() / duration.as_secs_f64();
            Some(AnimationFrame::Color(start.interpolate(&color, quota)))
        })
        .with_power_on()
        .on_end(on_end);

        self.client()
            .start_animation(Arc::new(self.clone()), animation)
            .await
    }
}

impl FrameSink for Light {
    fn target(&self) -> TargetAddress {
        self.device.target()
    }

    fn push_frame(&self, frame: AnimationFrame, duration: Duration) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            match frame {
                AnimationFrame::Color(color) => self.set_color(color, duration, true).await,
                AnimationFrame::Power(on) => {
                    self.fire(RequestMessage::SetPower { level: Power::from(on) })
                        .await
                }
                AnimationFrame::Zones(_) | AnimationFrame::Tiles(_) => {
                    Err(Error::unsupported(self.target(), "zone frames"))
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::LanClient;
    use crate::testing::{Behavior, FakeNetwork, FakeState, test_config};

    async fn light_on(network: &FakeNetwork) -> Light {
        let client = LanClient::bind(test_config(network)).await.unwrap();
        Light::from(Device::new(&client, network.target(0), network.address()))
    }

    #[tokio::test]
    async fn test_get_color_refreshes_state() {
        let network = FakeNetwork::spawn(vec![FakeState {
            color: Color::GREEN,
            power: Power::On,
            ..FakeState::light(1)
        }])
        .await;
        let light = light_on(&network).await;

        assert_eq!(light.get_color().await.unwrap(), Color::GREEN);
        assert_eq!(light.color(), Some(Color::GREEN));
        assert_eq!(light.status().power(), Some(Power::On));
        assert_eq!(light.label().as_deref(), Some("Light 1"));
    }

    #[tokio::test]
    async fn test_set_color_acknowledged() {
        let network = FakeNetwork::spawn(vec![FakeState::light(1)]).await;
        let light = light_on(&network).await;

        light
            .set_color(Color::BLUE, Duration::from_millis(500), false)
            .await
            .unwrap();
        assert_eq!(network.state(0).color, Color::BLUE);
        let header = network.headers()[0];
        assert!(header.ack_required);
        assert_eq!(
            network.requests()[0],
            RequestMessage::LightSetColor {
                color: Color::BLUE,
                duration: 500
            }
        );
    }

    #[tokio::test]
    async fn test_set_color_transient() {
        let network = FakeNetwork::spawn(vec![FakeState::light(1)]).await;
        let light = light_on(&network).await;

        light.set_color(Color::RED, Duration::ZERO, true).await.unwrap();
        network.wait_for_datagrams(1).await;
        assert!(!network.headers()[0].ack_required);
        assert_eq!(light.color(), Some(Color::RED));
    }

    #[tokio::test]
    async fn test_wakeup_ramps_and_powers_on() {
        let network = FakeNetwork::spawn(vec![FakeState::light(1)]).await;
        let light = light_on(&network).await;
        let target = Color::new(0, 0, u16::MAX, 3500);

        let outcome = light
            .wakeup(Duration::from_millis(120), target)
            .await
            .wait()
            .await;
        assert!(matches!(outcome, AnimationOutcome::Completed { interrupted: false }));
        // fire-and-forget frames may still be in flight
        tokio::time::sleep(Duration::from_millis(50)).await;

        let requests = network.requests();
        let colors: Vec<Color> = requests
            .iter()
            .filter_map(|r| match r {
                RequestMessage::LightSetColor { color, .. } => Some(*color),
                _ => None,
            })
            .collect();
        assert_eq!(colors[0].brightness(), 0);
        assert_eq!(colors[0].kelvin(), Color::MIN_KELVIN);
        assert!(colors.windows(2).all(|w| w[0].brightness() <= w[1].brightness()));
        assert_eq!(colors.last(), Some(&target));
        assert_eq!(requests[1], RequestMessage::SetPower { level: Power::On });
        assert_eq!(network.state(0).power, Power::On);
        assert_eq!(network.state(0).color, target);
    }

    #[tokio::test]
    async fn test_wakeup_does_not_wait_for_power_ack() {
        let network = FakeNetwork::spawn_with(vec![FakeState::light(1)], Behavior::silent()).await;
        let light = light_on(&network).await;

        let started = std::time::Instant::now();
        let outcome = light
            .wakeup(Duration::from_millis(100), Color::WHITE)
            .await
            .wait()
            .await;
        assert!(matches!(outcome, AnimationOutcome::Completed { interrupted: false }));
        // a waited SetPower would spend 2 x 200ms retrying
        assert!(started.elapsed() < Duration::from_millis(350));

        network.wait_for_datagrams(2).await;
        let power = network.headers().into_iter().zip(network.requests()).find(|(_, r)| {
            matches!(r, RequestMessage::SetPower { level: Power::On })
        });
        assert!(matches!(power, Some((header, _)) if !header.ack_required));
    }
}
