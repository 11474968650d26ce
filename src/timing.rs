//! Per-frame caption timing.
//!
//! Pure lookups over the caption sequence plus a small stateful engine that
//! recomputes the render state every tick and reports whether it changed.
//!
//! Phrases use a closed interval `[start, end]`, words a half-open interval
//! `[start, end)`. At a phrase's `end` the phrase is still active while the
//! word ending at the same instant no longer is.

use serde::Serialize;

use crate::caption::{Caption, Word};
use crate::style::AnimationStyle;

/// First caption containing `time`, if any. Linear scan; first match wins.
#[must_use]
pub fn find_active_caption(captions: &[Caption], time: f64) -> Option<usize> {
    captions.iter().position(|c| c.contains(time))
}

/// First word with `start <= time < end`, if any.
#[must_use]
pub fn active_word_index(words: &[Word], time: f64) -> Option<usize> {
    words
        .iter()
        .position(|w| time >= w.start && time < w.end)
}

/// Write the typewriter reveal text for `time` into `out`.
///
/// Finished words contribute their full text plus a trailing space. The
/// word under the playhead contributes a prefix proportional to its
/// progress, rounded up to whole characters, and ends the scan. A word not
/// yet reached also ends the scan.
pub fn typewriter_reveal(words: &[Word], time: f64, out: &mut String) {
    out.clear();
    for word in words {
        if time >= word.end {
            out.push_str(&word.text);
            out.push(' ');
        } else if time >= word.start {
            let duration = word.end - word.start;
            let progress = if duration > 0.0 {
                (time - word.start) / duration
            } else {
                1.0
            };
            let chars = word.text.chars().count();
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
            let shown = ((progress * chars as f64).ceil().max(0.0) as usize).min(chars);
            out.extend(word.text.chars().take(shown));
            break;
        } else {
            break;
        }
    }
}

/// Identity of a mounted caption. A new key restarts the entry animation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CaptionKey {
    pub start: f64,
    pub style: AnimationStyle,
}

/// Render state produced by the timing engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimingState {
    /// Index of the active caption in the sequence.
    pub caption: Option<usize>,
    pub key: Option<CaptionKey>,
    /// Active word for word-level styles other than typewriter.
    pub active_word: Option<usize>,
    /// Accumulated typewriter text.
    pub reveal: String,
}

impl TimingState {
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.caption.is_none()
    }
}

/// Stateful wrapper that recomputes [`TimingState`] each tick.
///
/// The reveal buffer is reused across ticks so steady-state playback does
/// not allocate.
#[derive(Debug, Default)]
pub struct TimingEngine {
    state: TimingState,
    scratch: String,
}

impl TimingEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> &TimingState {
        &self.state
    }

    pub fn reset(&mut self) {
        self.state = TimingState::default();
    }

    /// Recompute the render state for `time`. Returns `true` if it changed.
    pub fn tick(&mut self, time: f64, captions: &[Caption], style: AnimationStyle) -> bool {
        let Some(index) = find_active_caption(captions, time) else {
            if self.state.is_idle() && self.state.reveal.is_empty() {
                return false;
            }
            self.reset();
            return true;
        };

        let caption = &captions[index];
        let key = CaptionKey {
            start: caption.start,
            style,
        };

        let mut changed = self.state.caption != Some(index) || self.state.key != Some(key);
        self.state.caption = Some(index);
        self.state.key = Some(key);

        let word = match style {
            AnimationStyle::Typewriter => {
                typewriter_reveal(&caption.words, time, &mut self.scratch);
                if self.scratch != self.state.reveal {
                    std::mem::swap(&mut self.scratch, &mut self.state.reveal);
                    changed = true;
                }
                None
            }
            s if s.is_word_level() => active_word_index(&caption.words, time),
            _ => None,
        };

        if style != AnimationStyle::Typewriter && !self.state.reveal.is_empty() {
            self.state.reveal.clear();
            changed = true;
        }

        if self.state.active_word != word {
            self.state.active_word = word;
            changed = true;
        }

        changed
    }
}
