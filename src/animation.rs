//! Client-side animations.
//!
//! An [`Animation`] computes a frame from the time elapsed since it started;
//! a background task pushes one frame per tick to a [`FrameSink`] (a light,
//! strip or tile chain) until the animation finishes, is ended or a push
//! fails. Each device runs at most one animation per [`LanClient`]; starting
//! another ends the running one first.
//!
//! The outcome is delivered exactly once: to the end callback, if any, and
//! to [`AnimationHandle::wait`].

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::FutureExt;
use futures::channel::oneshot;
use futures::future::Shared;
use log::{debug, warn};
use strum_macros::Display;

use crate::client::LanClient;
use crate::errors::Error;
use crate::runtime::{self, BoxFuture, Instant};
use crate::types::{Color, MultizoneColors, TargetAddress, TileChainColors};

type Result<T> = std::result::Result<T, Error>;

static NEXT_ANIMATION_ID: AtomicU64 = AtomicU64::new(1);

/// One step of an animation.
#[derive(Debug, Clone, PartialEq)]
pub enum AnimationFrame {
    Color(Color),
    Zones(MultizoneColors),
    Tiles(TileChainColors),
    Power(bool),
}

impl AnimationFrame {
    pub fn with_relative_brightness(&self, factor: f64) -> AnimationFrame {
        match self {
            AnimationFrame::Color(color) => {
                AnimationFrame::Color(color.with_relative_brightness(factor))
            }
            AnimationFrame::Zones(colors) => {
                AnimationFrame::Zones(colors.with_relative_brightness(factor))
            }
            AnimationFrame::Tiles(colors) => {
                AnimationFrame::Tiles(colors.with_relative_brightness(factor))
            }
            AnimationFrame::Power(on) => AnimationFrame::Power(*on),
        }
    }
}

/// Something frames can be pushed to.
pub trait FrameSink: Send + Sync + 'static {
    fn target(&self) -> TargetAddress;

    /// Show `frame`, fading over `duration`. Must not wait for an acknowledgement.
    fn push_frame(&self, frame: AnimationFrame, duration: Duration) -> BoxFuture<'_, Result<()>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum AnimationState {
    Idle,
    Running,
    Stopping,
    Ended,
}

/// How an animation finished.
#[derive(Debug)]
pub enum AnimationOutcome {
    /// The animation ran out or was ended; `interrupted` is set when it was
    /// ended with `interrupted = true` or replaced by another animation.
    Completed { interrupted: bool },
    /// Pushing a frame failed.
    Failed(Error),
}

impl AnimationOutcome {
    pub fn is_interrupted(&self) -> bool {
        matches!(self, AnimationOutcome::Completed { interrupted: true })
    }
}

type FrameSource = Box<dyn FnMut(Duration) -> Option<AnimationFrame> + Send>;
type EndCallback = Box<dyn FnOnce(&AnimationOutcome) + Send>;

/// A frame source plus the options of a run.
pub struct Animation {
    source: FrameSource,
    power_on: bool,
    limit: Option<Duration>,
    on_end: Option<EndCallback>,
}

impl Animation {
    /// An animation showing `source(elapsed)` each tick until it returns `None`.
    pub fn new(source: impl FnMut(Duration) -> Option<AnimationFrame> + Send + 'static) -> Self {
        Animation {
            source: Box::new(source),
            power_on: false,
            limit: None,
            on_end: None,
        }
    }

    /// Switch the device on right after the first frame.
    pub fn with_power_on(mut self) -> Self {
        self.power_on = true;
        self
    }

    /// End the animation after `limit`.
    pub fn with_limit(mut self, limit: Duration) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn on_end(mut self, callback: impl FnOnce(&AnimationOutcome) + Send + 'static) -> Self {
        self.on_end = Some(Box::new(callback));
        self
    }
}

impl fmt::Debug for Animation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Animation")
            .field("power_on", &self.power_on)
            .field("limit", &self.limit)
            .field("on_end", &self.on_end.is_some())
            .finish()
    }
}

struct Control {
    state: Mutex<AnimationState>,
    interrupted: AtomicBool,
}

impl Control {
    fn lock(&self) -> MutexGuard<'_, AnimationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state(&self) -> AnimationState {
        *self.lock()
    }

    fn set(&self, state: AnimationState) {
        *self.lock() = state;
    }

    /// Ask the task to stop at the next tick boundary.
    fn request_end(&self, interrupted: bool) {
        let mut state = self.lock();
        if matches!(*state, AnimationState::Idle | AnimationState::Running) {
            self.interrupted.store(interrupted, Ordering::SeqCst);
            *state = AnimationState::Stopping;
        }
    }

    fn is_stopping(&self) -> bool {
        self.state() == AnimationState::Stopping
    }
}

type EndedSignal = Shared<oneshot::Receiver<()>>;

/// Registry entry of a running animation.
pub(crate) struct RunningAnimation {
    id: u64,
    control: Arc<Control>,
    ended: EndedSignal,
}

/// Handle to a started animation.
pub struct AnimationHandle {
    target: TargetAddress,
    control: Arc<Control>,
    outcome: oneshot::Receiver<AnimationOutcome>,
    ended: EndedSignal,
}

impl AnimationHandle {
    pub fn target(&self) -> TargetAddress {
        self.target
    }

    pub fn state(&self) -> AnimationState {
        self.control.state()
    }

    /// Stop at the next tick; no frames are sent afterwards.
    pub fn end(&self, interrupted: bool) {
        self.control.request_end(interrupted);
    }

    /// Wait until the animation task has finished, without taking the outcome.
    pub async fn ended(&self) {
        let _ = self.ended.clone().await;
    }

    /// The outcome, if the animation has finished.
    pub fn try_outcome(&mut self) -> Option<AnimationOutcome> {
        self.outcome.try_recv().ok().flatten()
    }

    /// Wait for the outcome.
    pub async fn wait(self) -> AnimationOutcome {
        self.outcome
            .await
            .unwrap_or(AnimationOutcome::Failed(Error::ConnectionClosed))
    }
}

impl fmt::Debug for AnimationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimationHandle")
            .field("target", &self.target)
            .field("state", &self.state())
            .finish()
    }
}

impl LanClient {
    /// Run `animation` on `sink`, ending whatever runs on the same device.
    ///
    /// The previous animation reports `interrupted = true` and has ended
    /// before the new one pushes its first frame.
    pub async fn start_animation(
        &self,
        sink: Arc<dyn FrameSink>,
        animation: Animation,
    ) -> AnimationHandle {
        let target = sink.target();
        let mut registry = self.animations().lock().await;
        if let Some(previous) = registry.remove(&target) {
            debug!("replacing animation {} on {target}", previous.id);
            previous.control.request_end(true);
            let _ = previous.ended.await;
        }

        let id = NEXT_ANIMATION_ID.fetch_add(1, Ordering::Relaxed);
        let control = Arc::new(Control {
            state: Mutex::new(AnimationState::Idle),
            interrupted: AtomicBool::new(false),
        });
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let (ended_tx, ended_rx) = oneshot::channel();
        let ended = ended_rx.shared();

        registry.insert(
            target,
            RunningAnimation {
                id,
                control: control.clone(),
                ended: ended.clone(),
            },
        );
        control.set(AnimationState::Running);
        drop(registry);

        debug!("starting animation {id} on {target}");
        runtime::spawn(run(
            self.clone(),
            id,
            sink,
            animation,
            control.clone(),
            outcome_tx,
            ended_tx,
        ))
        .detach();

        AnimationHandle {
            target,
            control,
            outcome: outcome_rx,
            ended,
        }
    }

    /// End the animation running on `target`, if any, and wait until it has
    /// stopped.
    pub async fn end_animation(&self, target: TargetAddress, interrupted: bool) {
        let running = self
            .animations()
            .lock()
            .await
            .get(&target)
            .map(|r| (r.control.clone(), r.ended.clone()));
        if let Some((control, ended)) = running {
            control.request_end(interrupted);
            let _ = ended.await;
        }
    }

    /// State of the animation on `target`; `None` if none is registered.
    pub async fn animation_state(&self, target: TargetAddress) -> Option<AnimationState> {
        self.animations()
            .lock()
            .await
            .get(&target)
            .map(|r| r.control.state())
    }

    /// Targets with a running animation.
    pub async fn animated_targets(&self) -> Vec<TargetAddress> {
        self.animations().lock().await.keys().copied().collect()
    }
}

async fn run(
    client: LanClient,
    id: u64,
    sink: Arc<dyn FrameSink>,
    mut animation: Animation,
    control: Arc<Control>,
    outcome_tx: oneshot::Sender<AnimationOutcome>,
    ended_tx: oneshot::Sender<()>,
) {
    let target = sink.target();
    let tick = client.config().animation_tick();
    let started = Instant::now();
    let mut first = true;

    let outcome = loop {
        if control.is_stopping() {
            break AnimationOutcome::Completed {
                interrupted: control.interrupted.load(Ordering::SeqCst),
            };
        }
        let elapsed = started.elapsed();
        if animation.limit.is_some_and(|limit| elapsed >= limit) {
            break AnimationOutcome::Completed { interrupted: false };
        }
        let Some(frame) = (animation.source)(elapsed) else {
            break AnimationOutcome::Completed { interrupted: false };
        };

        if let Err(e) = sink.push_frame(frame, tick).await {
            warn!("animation {id} on {target} failed: {e}");
            break AnimationOutcome::Failed(Error::animation_tick(target, e));
        }
        if first && animation.power_on {
            if let Err(e) = sink.push_frame(AnimationFrame::Power(true), Duration::ZERO).await {
                warn!("animation {id} on {target} could not power on: {e}");
                break AnimationOutcome::Failed(Error::animation_tick(target, e));
            }
        }
        first = false;
        runtime::sleep(tick).await;
    };

    control.set(AnimationState::Ended);
    debug!("animation {id} on {target} ended: {outcome:?}");
    if let Some(callback) = animation.on_end.take() {
        callback(&outcome);
    }
    let _ = outcome_tx.send(outcome);
    let _ = ended_tx.send(());

    let mut registry = client.animations().lock().await;
    if registry.get(&target).is_some_and(|r| r.id == id) {
        registry.remove(&target);
    }
}

/// Position in `[0, 1)` of a periodic animation after `elapsed`.
pub(crate) fn phase(elapsed: Duration, cycle: Duration) -> f64 {
    if cycle.is_zero() {
        return 0.0;
    }
    (elapsed.as_secs_f64() / cycle.as_secs_f64()).fract()
}

type Render = Box<dyn Fn(f64) -> AnimationFrame + Send>;

/// Builder for an endless animation scrolling colors across a device.
///
/// Returned by `rolling_animation` on strips and tile chains.
pub struct RollingAnimation {
    client: LanClient,
    sink: Arc<dyn FrameSink>,
    cycle: Duration,
    render: Render,
    brightness: Option<f64>,
    limit: Option<Duration>,
    on_end: Option<EndCallback>,
}

impl RollingAnimation {
    /// `render` maps the phase in `[0, 1)` to a frame; the phase advances
    /// by one every `cycle`.
    pub(crate) fn new(
        client: LanClient,
        sink: Arc<dyn FrameSink>,
        cycle: Duration,
        render: impl Fn(f64) -> AnimationFrame + Send + 'static,
    ) -> Self {
        RollingAnimation {
            client,
            sink,
            cycle,
            render: Box::new(render),
            brightness: None,
            limit: None,
            on_end: None,
        }
    }

    /// Scale every frame's brightness by `factor`.
    pub fn brightness(mut self, factor: f64) -> Self {
        self.brightness = Some(factor);
        self
    }

    pub fn limit(mut self, limit: Duration) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn on_end(mut self, callback: impl FnOnce(&AnimationOutcome) + Send + 'static) -> Self {
        self.on_end = Some(Box::new(callback));
        self
    }

    pub async fn start(self) -> AnimationHandle {
        let RollingAnimation {
            client,
            sink,
            cycle,
            render,
            brightness,
            limit,
            on_end,
        } = self;

        let mut animation = Animation::new(move |elapsed| {
            let frame = render(phase(elapsed, cycle));
            Some(match brightness {
                Some(factor) => frame.with_relative_brightness(factor),
                None => frame,
            })
        });
        animation.limit = limit;
        animation.on_end = on_end;
        client.start_animation(sink, animation).await
    }
}

/// Live animations of one client, keyed by device.
pub(crate) type Registry = HashMap<TargetAddress, RunningAnimation>;

#[cfg(test)]
mod tests {
    use std::net::{Ipv4Addr, SocketAddr};

    use super::*;
    use crate::config::LanConfig;

    /// Records frames; fails every push once `fail_after` frames were accepted.
    struct RecordingSink {
        target: TargetAddress,
        log: Arc<Mutex<Vec<String>>>,
        fail_after: Option<usize>,
        frames: Mutex<usize>,
    }

    impl RecordingSink {
        fn new(n: u8, log: &Arc<Mutex<Vec<String>>>) -> Self {
            RecordingSink {
                target: TargetAddress::new([0xd0, 0x73, 0xd5, 0, 0, n]),
                log: log.clone(),
                fail_after: None,
                frames: Mutex::new(0),
            }
        }
    }

    impl FrameSink for RecordingSink {
        fn target(&self) -> TargetAddress {
            self.target
        }

        fn push_frame(&self, frame: AnimationFrame, _duration: Duration) -> BoxFuture<'_, Result<()>> {
            Box::pin(async move {
                let mut frames = self.frames.lock().unwrap();
                if self.fail_after.is_some_and(|n| *frames >= n) {
                    return Err(Error::ConnectionClosed);
                }
                *frames += 1;
                self.log.lock().unwrap().push(format!("{frame:?}"));
                Ok(())
            })
        }
    }

    async fn client() -> LanClient {
        LanClient::bind(LanConfig {
            bind_address: SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
            animation_tick: Duration::from_millis(10),
            ..Default::default()
        })
        .await
        .unwrap()
    }

    fn forever(label: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Animation {
        let log = log.clone();
        let mut first = true;
        Animation::new(move |_| {
            if first {
                first = false;
                log.lock().unwrap().push(format!("{label} first tick"));
            }
            Some(AnimationFrame::Color(Color::RED))
        })
    }

    #[tokio::test]
    async fn test_finite_animation_completes() {
        let client = client().await;
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::new(RecordingSink::new(1, &log));
        let animation = Animation::new(|elapsed| {
            (elapsed < Duration::from_millis(50)).then_some(AnimationFrame::Color(Color::BLUE))
        });

        let handle = client.start_animation(sink.clone(), animation).await;
        assert_eq!(handle.state(), AnimationState::Running);
        let outcome = handle.wait().await;

        assert!(matches!(outcome, AnimationOutcome::Completed { interrupted: false }));
        assert!(*sink.frames.lock().unwrap() >= 1);
        // the task deregisters right after delivering the outcome
        for _ in 0..100 {
            if client.animated_targets().await.is_empty() {
                break;
            }
            runtime::sleep(Duration::from_millis(5)).await;
        }
        assert!(client.animated_targets().await.is_empty());
    }

    #[tokio::test]
    async fn test_end_stops_at_tick_boundary() {
        let client = client().await;
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::new(RecordingSink::new(1, &log));
        let (tx, rx) = oneshot::channel();

        let animation = forever("A", &log).on_end(move |outcome| {
            let _ = tx.send(outcome.is_interrupted());
        });
        let handle = client.start_animation(sink.clone(), animation).await;
        runtime::sleep(Duration::from_millis(35)).await;

        handle.end(false);
        handle.ended().await;
        assert_eq!(handle.state(), AnimationState::Ended);
        assert!(!rx.await.unwrap());

        let frames = *sink.frames.lock().unwrap();
        runtime::sleep(Duration::from_millis(40)).await;
        assert_eq!(*sink.frames.lock().unwrap(), frames);
        assert!(matches!(
            handle.wait().await,
            AnimationOutcome::Completed { interrupted: false }
        ));
    }

    #[tokio::test]
    async fn test_replacing_reports_interrupted_before_next_starts() {
        let client = client().await;
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::new(RecordingSink::new(1, &log));

        let end_log = log.clone();
        let a = forever("A", &log).on_end(move |outcome| {
            end_log
                .lock()
                .unwrap()
                .push(format!("A ended interrupted={}", outcome.is_interrupted()));
        });
        let handle_a = client.start_animation(sink.clone(), a).await;
        runtime::sleep(Duration::from_millis(30)).await;

        let handle_b = client.start_animation(sink.clone(), forever("B", &log)).await;
        assert_eq!(handle_a.state(), AnimationState::Ended);
        assert!(handle_a.wait().await.is_interrupted());

        runtime::sleep(Duration::from_millis(30)).await;
        let entries: Vec<String> = log
            .lock()
            .unwrap()
            .iter()
            .filter(|e| !e.starts_with("Color"))
            .cloned()
            .collect();
        assert_eq!(
            entries,
            vec!["A first tick", "A ended interrupted=true", "B first tick"]
        );
        assert_eq!(
            client.animation_state(sink.target()).await,
            Some(AnimationState::Running)
        );

        client.end_animation(sink.target(), true).await;
        assert!(handle_b.wait().await.is_interrupted());
    }

    #[tokio::test]
    async fn test_failed_tick_ends_animation() {
        let client = client().await;
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::new(RecordingSink {
            fail_after: Some(2),
            ..RecordingSink::new(2, &log)
        });

        let handle = client.start_animation(sink.clone(), forever("A", &log)).await;
        match handle.wait().await {
            AnimationOutcome::Failed(Error::AnimationTick { target, source }) => {
                assert_eq!(target, sink.target());
                assert_eq!(*source, Error::ConnectionClosed);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(*sink.frames.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_power_on_after_first_frame_and_limit() {
        let client = client().await;
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::new(RecordingSink::new(3, &log));
        let animation = Animation::new(|_| Some(AnimationFrame::Color(Color::GREEN)))
            .with_power_on()
            .with_limit(Duration::from_millis(40));

        let outcome = client.start_animation(sink, animation).await.wait().await;
        assert!(matches!(outcome, AnimationOutcome::Completed { interrupted: false }));

        let log = log.lock().unwrap();
        assert!(log[0].starts_with("Color"));
        assert_eq!(log[1], "Power(true)");
        assert_eq!(log.iter().filter(|e| e.starts_with("Power")).count(), 1);
    }

    #[test]
    fn test_phase() {
        let cycle = Duration::from_secs(10);
        assert_eq!(phase(Duration::ZERO, cycle), 0.0);
        assert!((phase(Duration::from_secs(12), cycle) - 0.2).abs() < 1e-9);
        assert_eq!(phase(Duration::from_secs(3), Duration::ZERO), 0.0);
    }
}
