use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use tracing::warn;

use rucap::media;
use rucap::playback::WallClock;
use rucap::{
    compose, AnimationStyle, Caption, Config, MediaClock, PlacementController, PlaybackEvent,
    Player, Scene, Size, TimingEngine, TimingState,
};

use super::read_captions;

/// Box height assumed when resolving pixel geometry for a terminal preview.
const PREVIEW_BOX_HEIGHT: f64 = 48.0;

/// Upper bound on sampled frames when stepping through a script.
const MAX_STEPS: u32 = 1_000_000;

pub struct PreviewOptions {
    pub style: AnimationStyle,
    pub at: Vec<f64>,
    pub step: f64,
    pub realtime: bool,
    pub video: Option<PathBuf>,
    pub container: Size,
    pub json: bool,
}

pub async fn cmd_preview(config: &Config, input: &str, opts: PreviewOptions) -> Result<()> {
    if !(opts.step.is_finite() && opts.step > 0.0) {
        bail!("--step must be positive");
    }

    let captions = read_captions(input).await?;
    let controller = layout(&opts).await;
    let placement = controller.placement();

    let scene = Scene {
        captions: &captions,
        style: opts.style,
        settings: &config.appearance,
        placement: &placement,
        layout: Some((controller.container(), PREVIEW_BOX_HEIGHT)),
    };

    if !opts.json {
        eprintln!("🎞  {} captions, style: {}", captions.len(), opts.style.display_name());
        eprintln!(
            "   Box: left {} top {} width {:.0}px ({})",
            placement.left.css(),
            placement.top.css(),
            placement.width,
            placement.anchor.css_transform()
        );
    }

    if opts.realtime {
        play_realtime(config, &scene, &captions, opts.json).await
    } else {
        step_through(&scene, &captions, &opts)
    }
}

/// Default caption box layout for the video, if it can be probed.
async fn layout(opts: &PreviewOptions) -> PlacementController {
    let mut controller = PlacementController::new();
    let video_size = match &opts.video {
        Some(path) => match media::probe(path).await {
            Ok(meta) => meta.size(),
            Err(e) => {
                warn!(error = %e, "probe failed, assuming container aspect ratio");
                opts.container
            }
        },
        None => opts.container,
    };
    controller.relayout(video_size, opts.container);
    controller
}

fn end_time(captions: &[Caption]) -> f64 {
    captions.iter().map(|c| c.end).fold(0.0, f64::max)
}

fn print_frame(scene: &Scene<'_>, state: &TimingState, time: f64, json: bool) -> Result<()> {
    let frame = compose(scene, state, time);
    if json {
        println!("{}", serde_json::to_string(&frame)?);
    } else {
        println!("{time:>8.2}s  {}", frame.to_text());
    }
    Ok(())
}

/// Deterministic stepping: prints only when the render state changes, or
/// every requested `--at` time.
fn step_through(scene: &Scene<'_>, captions: &[Caption], opts: &PreviewOptions) -> Result<()> {
    let mut engine = TimingEngine::new();

    if !opts.at.is_empty() {
        for &time in &opts.at {
            engine.tick(time, captions, opts.style);
            print_frame(scene, engine.state(), time, opts.json)?;
        }
        return Ok(());
    }

    let end = end_time(captions) + opts.step;
    for i in 0..=step_count(end, opts.step)? {
        let time = f64::from(i) * opts.step;
        if engine.tick(time, captions, opts.style) {
            print_frame(scene, engine.state(), time, opts.json)?;
        }
    }
    Ok(())
}

/// Index of the last sample at or before `end`.
fn step_count(end: f64, step: f64) -> Result<u32> {
    let steps = (end / step).floor();
    if !(steps.is_finite() && steps <= f64::from(MAX_STEPS)) {
        bail!("--step {step} is too small for a {end:.2}s script");
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Ok(steps.max(0.0) as u32)
}

/// Wall-clock playback through the tick loop.
async fn play_realtime(
    config: &Config,
    scene: &Scene<'_>,
    captions: &[Caption],
    json: bool,
) -> Result<()> {
    let clock = Arc::new(WallClock::new(0.0, end_time(captions)));
    let mut player = Player::new(Arc::clone(&clock)).with_frame_rate(config.frame_rate);
    let mut rx = player.subscribe();
    player.set_style(scene.style);
    player.set_captions(captions.to_vec());
    player.handle_event(PlaybackEvent::Play);

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = rx.borrow_and_update().clone();
                print_frame(scene, &state, clock.current_time(), json)?;
            }
            () = tokio::time::sleep(Duration::from_millis(100)) => {
                if !player.is_running() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                player.handle_event(PlaybackEvent::Pause);
                break;
            }
        }
    }

    player.handle_event(PlaybackEvent::Ended);
    Ok(())
}
