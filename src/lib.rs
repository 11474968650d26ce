//! `rucap` - Animated caption overlays for generated Roman Urdu scripts
//!
//! # Features
//!
//! - **Caption generation**: free-text video description in, timestamped
//!   word-level script out (Gemini, or a JSON file for offline replay)
//! - **Timing engine**: per-frame active phrase, active word and typewriter
//!   reveal with change detection
//! - **Placement**: letterbox-aware default layout, drag and edge resize with
//!   clamping and a width floor
//! - **Styling**: 13 phrase- and word-level animation styles, outline,
//!   background, font and alignment settings
//! - **Export**: SRT, `WebVTT` and ASS (with `\k` karaoke)
//!
//! # Example
//!
//! ```rust,no_run
//! use rucap::{AnimationStyle, CaptionSource, FileSource, TimingEngine};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let captions = FileSource::new("captions.json").generate("").await?;
//!     let mut engine = TimingEngine::new();
//!     if engine.tick(1.2, &captions, AnimationStyle::Karaoke) {
//!         println!("{:?}", engine.state());
//!     }
//!     Ok(())
//! }
//! ```

pub mod caption;
pub mod config;
pub mod error;
pub mod export;
pub mod media;
pub mod placement;
pub mod playback;
pub mod session;
pub mod source;
pub mod style;
pub mod surface;
pub mod timing;

pub use caption::{parse_captions, validate_captions, Caption, Word};
pub use config::Config;
pub use error::{CaptionError, MediaError, SessionError, SourceError};
pub use export::{AssWriter, ExportFormat, SrtWriter, SubtitleWriter, VttWriter};
pub use placement::{Edge, Placement, PlacementController, Point, Size};
pub use playback::{MediaClock, PlaybackEvent, Player, TickLoop};
pub use session::{GenerationStatus, Session};
pub use source::{CaptionSource, FileSource, GeminiSource};
pub use style::{AnimationStyle, CosmeticSettings, RenderMode, StyleResolver};
pub use surface::{compose, Frame, Scene};
pub use timing::{TimingEngine, TimingState};

/// Version of rucap
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
