//! Per-frame tick loop.
//!
//! The loop samples the media clock at a fixed rate while playback runs and
//! feeds the timing engine. Render state is published over a
//! [`tokio::sync::watch`] channel, so subscribers only see the latest value.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

use crate::caption::Caption;
use crate::style::AnimationStyle;
use crate::timing::{TimingEngine, TimingState};

/// Default sampling rate, roughly one display refresh.
pub const DEFAULT_FRAME_RATE: f64 = 60.0;

/// Read-only view of a media element's playback position.
pub trait MediaClock: Send + Sync + 'static {
    /// Current playhead position in seconds.
    fn current_time(&self) -> f64;

    /// `true` while paused or ended.
    fn is_paused(&self) -> bool;
}

/// Clock driven by the host: it calls [`SharedClock::set_time`] whenever the
/// media element reports a new position.
#[derive(Debug)]
pub struct SharedClock {
    time_bits: AtomicU64,
    paused: AtomicBool,
}

impl SharedClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            time_bits: AtomicU64::new(0f64.to_bits()),
            paused: AtomicBool::new(true),
        }
    }

    pub fn set_time(&self, seconds: f64) {
        self.time_bits.store(seconds.to_bits(), Ordering::Relaxed);
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Relaxed);
    }
}

impl Default for SharedClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaClock for SharedClock {
    fn current_time(&self) -> f64 {
        f64::from_bits(self.time_bits.load(Ordering::Relaxed))
    }

    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }
}

/// Wall-clock playback from `offset` seconds, ending at `duration`.
#[derive(Debug)]
pub struct WallClock {
    started: Instant,
    offset: f64,
    duration: f64,
}

impl WallClock {
    #[must_use]
    pub fn new(offset: f64, duration: f64) -> Self {
        Self {
            started: Instant::now(),
            offset,
            duration,
        }
    }
}

impl MediaClock for WallClock {
    fn current_time(&self) -> f64 {
        (self.offset + self.started.elapsed().as_secs_f64()).min(self.duration)
    }

    fn is_paused(&self) -> bool {
        self.current_time() >= self.duration
    }
}

/// Media element events the loop reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    Play,
    Playing,
    Seeked,
    Pause,
    Ended,
}

impl PlaybackEvent {
    fn starts_loop(self) -> bool {
        matches!(self, Self::Play | Self::Playing | Self::Seeked)
    }
}

/// A restartable fixed-rate task.
///
/// Starting always aborts the previous task first, so at most one tick
/// chain exists. Dropping the loop stops it.
#[derive(Debug)]
pub struct TickLoop {
    period: Duration,
    handle: Option<JoinHandle<()>>,
}

impl TickLoop {
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            handle: None,
        }
    }

    /// Build a loop ticking `hz` times per second. Non-positive rates fall
    /// back to [`DEFAULT_FRAME_RATE`].
    #[must_use]
    pub fn with_rate(hz: f64) -> Self {
        let hz = if hz.is_finite() && hz > 0.0 {
            hz
        } else {
            DEFAULT_FRAME_RATE
        };
        Self::new(Duration::from_secs_f64(1.0 / hz))
    }

    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Spawn `tick` on the current runtime. The task ends when `tick`
    /// returns `false`. Must be called within a tokio runtime.
    pub fn start<F>(&mut self, mut tick: F)
    where
        F: FnMut() -> bool + Send + 'static,
    {
        self.stop();
        let period = self.period;
        self.handle = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if !tick() {
                    break;
                }
            }
        }));
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for TickLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Debug, Clone)]
struct TimingInputs {
    captions: Arc<[Caption]>,
    style: AnimationStyle,
}

/// Connects a media clock to the timing engine.
pub struct Player<C: MediaClock> {
    clock: Arc<C>,
    engine: Arc<Mutex<TimingEngine>>,
    inputs: watch::Sender<TimingInputs>,
    state: Arc<watch::Sender<TimingState>>,
    ticker: TickLoop,
}

impl<C: MediaClock> Player<C> {
    #[must_use]
    pub fn new(clock: Arc<C>) -> Self {
        let (inputs, _) = watch::channel(TimingInputs {
            captions: Arc::from(Vec::new()),
            style: AnimationStyle::default(),
        });
        let (state, _) = watch::channel(TimingState::default());
        Self {
            clock,
            engine: Arc::new(Mutex::new(TimingEngine::new())),
            inputs,
            state: Arc::new(state),
            ticker: TickLoop::with_rate(DEFAULT_FRAME_RATE),
        }
    }

    /// Set the sampling rate in Hz.
    #[must_use]
    pub fn with_frame_rate(mut self, hz: f64) -> Self {
        self.ticker = TickLoop::with_rate(hz);
        self
    }

    /// Replace the caption sequence wholesale and recompute immediately.
    pub fn set_captions(&self, captions: impl Into<Arc<[Caption]>>) {
        let captions = captions.into();
        debug!(count = captions.len(), "player captions replaced");
        self.inputs.send_modify(|inputs| inputs.captions = captions);
        self.refresh();
    }

    pub fn set_style(&self, style: AnimationStyle) {
        self.inputs.send_modify(|inputs| inputs.style = style);
        self.refresh();
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<TimingState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn state(&self) -> TimingState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.ticker.is_running()
    }

    /// Start or stop the tick loop in response to a media event.
    pub fn handle_event(&mut self, event: PlaybackEvent) {
        if event.starts_loop() {
            debug!(?event, "tick loop started");
            self.start();
        } else {
            debug!(?event, "tick loop stopped");
            self.ticker.stop();
        }
    }

    /// Recompute once at the clock's current position.
    pub fn refresh(&self) {
        step(self.clock.as_ref(), &self.engine, &self.inputs.subscribe(), &self.state);
    }

    fn start(&mut self) {
        let clock = Arc::clone(&self.clock);
        let engine = Arc::clone(&self.engine);
        let inputs = self.inputs.subscribe();
        let state = Arc::clone(&self.state);
        self.ticker.start(move || {
            step(clock.as_ref(), &engine, &inputs, &state);
            // One last frame after pause so seeks while paused still render.
            !clock.is_paused()
        });
    }
}

fn step<C: MediaClock>(
    clock: &C,
    engine: &Mutex<TimingEngine>,
    inputs: &watch::Receiver<TimingInputs>,
    state: &watch::Sender<TimingState>,
) {
    let time = clock.current_time();
    let mut engine = engine.lock().unwrap_or_else(PoisonError::into_inner);
    let changed = {
        let inputs = inputs.borrow();
        engine.tick(time, &inputs.captions, inputs.style)
    };
    if changed {
        trace!(time, caption = ?engine.state().caption, "render state changed");
        state.send_replace(engine.state().clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caption::Word;

    fn captions() -> Vec<Caption> {
        vec![Caption::new(
            0.5,
            3.0,
            vec![Word::new("Assalam", 0.5, 1.1), Word::new("o", 1.1, 1.3)],
        )]
    }

    fn player(clock: &Arc<SharedClock>) -> Player<SharedClock> {
        let player = Player::new(Arc::clone(clock)).with_frame_rate(1000.0);
        player.set_style(AnimationStyle::Karaoke);
        player.set_captions(captions());
        player
    }

    async fn next_state(rx: &mut watch::Receiver<TimingState>) -> TimingState {
        tokio::time::timeout(Duration::from_secs(2), rx.changed())
            .await
            .expect("state change timed out")
            .expect("sender dropped");
        rx.borrow_and_update().clone()
    }

    #[test]
    fn rate_falls_back_to_default() {
        assert_eq!(
            TickLoop::with_rate(0.0).period(),
            Duration::from_secs_f64(1.0 / DEFAULT_FRAME_RATE)
        );
        assert_eq!(TickLoop::with_rate(100.0).period(), Duration::from_millis(10));
    }

    #[test]
    fn shared_clock_round_trips_time() {
        let clock = SharedClock::new();
        assert!(clock.is_paused());
        clock.set_time(1.25);
        assert!((clock.current_time() - 1.25).abs() < f64::EPSILON);
    }

    #[test]
    fn wall_clock_stops_at_duration() {
        let clock = WallClock::new(5.0, 5.0);
        assert!(clock.is_paused());
        assert!((clock.current_time() - 5.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn set_captions_recomputes_immediately() {
        let clock = Arc::new(SharedClock::new());
        clock.set_time(1.2);
        let player = player(&clock);
        let state = player.state();
        assert_eq!(state.caption, Some(0));
        assert_eq!(state.active_word, Some(1));
    }

    #[tokio::test]
    async fn loop_follows_the_clock() {
        let clock = Arc::new(SharedClock::new());
        let mut player = player(&clock);
        let mut rx = player.subscribe();

        clock.set_paused(false);
        player.handle_event(PlaybackEvent::Play);
        assert!(player.is_running());

        clock.set_time(0.6);
        let state = next_state(&mut rx).await;
        assert_eq!(state.active_word, Some(0));

        clock.set_time(1.2);
        let state = next_state(&mut rx).await;
        assert_eq!(state.active_word, Some(1));

        clock.set_time(4.0);
        let state = next_state(&mut rx).await;
        assert!(state.is_idle());
    }

    #[tokio::test]
    async fn pause_and_end_stop_the_loop() {
        let clock = Arc::new(SharedClock::new());
        clock.set_paused(false);
        let mut player = player(&clock);

        player.handle_event(PlaybackEvent::Playing);
        assert!(player.is_running());
        player.handle_event(PlaybackEvent::Pause);
        assert!(!player.is_running());

        player.handle_event(PlaybackEvent::Play);
        player.handle_event(PlaybackEvent::Ended);
        assert!(!player.is_running());
    }

    #[tokio::test]
    async fn repeated_starts_keep_one_loop() {
        let clock = Arc::new(SharedClock::new());
        clock.set_paused(false);
        let mut player = player(&clock);
        for _ in 0..5 {
            player.handle_event(PlaybackEvent::Play);
        }
        assert!(player.is_running());
        player.handle_event(PlaybackEvent::Pause);
        assert!(!player.is_running());
    }

    #[tokio::test]
    async fn seek_while_paused_renders_once() {
        let clock = Arc::new(SharedClock::new());
        let mut player = player(&clock);
        let mut rx = player.subscribe();

        clock.set_time(2.5);
        player.handle_event(PlaybackEvent::Seeked);
        let state = next_state(&mut rx).await;
        assert_eq!(state.caption, Some(0));
        assert_eq!(state.active_word, None);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!player.is_running());
    }

    #[tokio::test]
    async fn dropping_loop_aborts_task() {
        let ticks = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&ticks);
        {
            let mut ticker = TickLoop::with_rate(1000.0);
            ticker.start(move || {
                counter.fetch_add(1, Ordering::Relaxed);
                true
            });
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        let after_drop = ticks.load(Ordering::Relaxed);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(ticks.load(Ordering::Relaxed), after_drop);
    }
}
