//! Presentation surface: composes timing state, resolved styles and the
//! caption box geometry into one renderable [`Frame`].
//!
//! The surface owns no timing state. Hosts serialise the frame (e.g. to a
//! web view) or print it with [`Frame::to_text`].

use serde::Serialize;

use crate::caption::Caption;
use crate::placement::{Placement, Rect, Size};
use crate::style::{
    font_stylesheet_url, AnimationStyle, CosmeticSettings, FontLink, PhraseStyle, RenderMode,
    StyleResolver, Transition, WordStyle,
};
use crate::timing::{CaptionKey, TimingState};

/// CSS geometry of the caption box.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxStyle {
    pub left: String,
    pub top: String,
    pub width: String,
    pub transform: &'static str,
}

impl From<&Placement> for BoxStyle {
    fn from(p: &Placement) -> Self {
        Self {
            left: p.left.css(),
            top: p.top.css(),
            width: format!("{}px", p.width),
            transform: p.anchor.css_transform(),
        }
    }
}

/// What the caption box shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Content<'a> {
    /// No active caption: the box is not mounted.
    Empty,
    /// Whole phrase with one entry transition.
    Phrase { text: String },
    /// Individually styled words.
    Words { words: Vec<WordStyle<'a>> },
    /// Typewriter text followed by a blinking caret.
    Reveal { text: &'a str, caret: Transition },
}

/// Everything needed to draw the caption layer at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame<'a> {
    pub time: f64,
    /// Identity of the mounted caption; a new key replays the entry animation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<CaptionKey>,
    pub placement: BoxStyle,
    /// Pixel rectangle of the box, when the container size is known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rect: Option<Rect>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phrase: Option<PhraseStyle>,
    pub content: Content<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font: Option<FontLink>,
}

impl Frame<'_> {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self.content, Content::Empty)
    }

    /// Plain-text rendering. The active word is wrapped in brackets and
    /// words not yet reached are omitted.
    #[must_use]
    pub fn to_text(&self) -> String {
        match &self.content {
            Content::Empty => String::new(),
            Content::Phrase { text } => text.clone(),
            Content::Words { words } => words
                .iter()
                .filter(|w| w.visible)
                .map(|w| {
                    if w.active {
                        format!("[{}]", w.text)
                    } else {
                        w.text.to_string()
                    }
                })
                .collect::<Vec<_>>()
                .join(" "),
            Content::Reveal { text, .. } => format!("{text}\u{258c}"),
        }
    }
}

/// Inputs that stay fixed between frames.
#[derive(Debug, Clone, Copy)]
pub struct Scene<'a> {
    pub captions: &'a [Caption],
    pub style: AnimationStyle,
    pub settings: &'a CosmeticSettings,
    pub placement: &'a Placement,
    /// Rendered container size and measured box height, if known.
    pub layout: Option<(Size, f64)>,
}

/// Compose the frame for `time` from the timing engine's current state.
#[must_use]
pub fn compose<'a>(scene: &Scene<'a>, state: &'a TimingState, time: f64) -> Frame<'a> {
    let placement = BoxStyle::from(scene.placement);
    let rect = scene
        .layout
        .map(|(container, height)| scene.placement.resolve(container, height));
    let font = font_stylesheet_url(&scene.settings.font_family);

    let Some(caption) = state.caption.and_then(|i| scene.captions.get(i)) else {
        return Frame {
            time,
            key: None,
            placement,
            rect,
            phrase: None,
            content: Content::Empty,
            font,
        };
    };

    let resolver = StyleResolver::new(scene.style, scene.settings);
    let content = match (scene.style.render_mode(), scene.style) {
        (RenderMode::Phrase, _) => Content::Phrase {
            text: caption.text(),
        },
        (RenderMode::Word, AnimationStyle::Typewriter) => Content::Reveal {
            text: &state.reveal,
            caret: resolver.caret(),
        },
        (RenderMode::Word, _) => Content::Words {
            words: resolver.words(&caption.words, state.active_word, time),
        },
    };

    Frame {
        time,
        key: state.key,
        placement,
        rect,
        phrase: Some(resolver.phrase()),
        content,
        font,
    }
}
