//! Caption styling: animation styles, cosmetic settings and the resolver
//! that turns them into concrete presentation attributes.
//!
//! The resolver is a pure mapping and never fails. Malformed colours fall
//! back to black, non-positive speeds fall back to 1.0.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::caption::Word;

static HEX_COLOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^#?([a-f\d]{2})([a-f\d]{2})([a-f\d]{2})$").expect("valid hex colour regex")
});

/// Base duration of phrase-level entry transitions, in seconds.
pub const PHRASE_BASE_DURATION: f64 = 0.5;

/// Fixed soft drop-shadow layered under every caption.
const DROP_SHADOW: &str = "2px 2px 4px rgba(0,0,0,0.5)";

/// How an animation style drives the caption text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// The whole phrase animates in as one unit.
    Phrase,
    /// Each word is driven by the playhead crossing its own `start`.
    Word,
}

/// Closed set of caption animation styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnimationStyle {
    #[default]
    Fade,
    Pop,
    Slide,
    Glow,
    Typewriter,
    Zoom,
    Blur,
    Karaoke,
    BubblePop,
    Highlight,
    WordPulse,
    Bounce,
    Blink,
}

impl AnimationStyle {
    /// Every style, in selector order.
    pub const ALL: [AnimationStyle; 13] = [
        Self::Fade,
        Self::Pop,
        Self::Slide,
        Self::Glow,
        Self::Typewriter,
        Self::Zoom,
        Self::Blur,
        Self::Karaoke,
        Self::BubblePop,
        Self::Highlight,
        Self::WordPulse,
        Self::Bounce,
        Self::Blink,
    ];

    /// Stable identifier used in config files and on the command line.
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::Fade => "fade",
            Self::Pop => "pop",
            Self::Slide => "slide",
            Self::Glow => "glow",
            Self::Typewriter => "typewriter",
            Self::Zoom => "zoom",
            Self::Blur => "blur",
            Self::Karaoke => "karaoke",
            Self::BubblePop => "bubble-pop",
            Self::Highlight => "highlight",
            Self::WordPulse => "word-pulse",
            Self::Bounce => "bounce",
            Self::Blink => "blink",
        }
    }

    /// Human-readable name shown in the style picker.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Fade => "Fade Up",
            Self::Pop => "Pop In",
            Self::Slide => "Slide In",
            Self::Glow => "Glow",
            Self::Typewriter => "Typewriter",
            Self::Zoom => "Zoom",
            Self::Blur => "Blur In",
            Self::Karaoke => "Karaoke",
            Self::BubblePop => "Bubble Pop",
            Self::Highlight => "Highlight",
            Self::WordPulse => "Word Pulse",
            Self::Bounce => "Bounce",
            Self::Blink => "Blink",
        }
    }

    #[must_use]
    pub fn render_mode(self) -> RenderMode {
        match self {
            Self::Fade | Self::Pop | Self::Slide | Self::Zoom | Self::Blur => RenderMode::Phrase,
            Self::Glow
            | Self::Typewriter
            | Self::Karaoke
            | Self::BubblePop
            | Self::Highlight
            | Self::WordPulse
            | Self::Bounce
            | Self::Blink => RenderMode::Word,
        }
    }

    #[must_use]
    pub fn is_word_level(self) -> bool {
        self.render_mode() == RenderMode::Word
    }

    /// Entry transition class for phrase-level styles.
    #[must_use]
    pub fn phrase_class(self) -> Option<&'static str> {
        match self {
            Self::Fade => Some("animate-fade-in-up"),
            Self::Pop => Some("animate-pop-in"),
            Self::Slide => Some("animate-slide-from-bottom"),
            Self::Zoom => Some("animate-zoom-in-out"),
            Self::Blur => Some("animate-blur-in"),
            _ => None,
        }
    }

    /// Transition class and base duration applied to the active word.
    fn word_transition(self) -> Option<(&'static str, f64)> {
        match self {
            Self::BubblePop => Some(("animate-bubble-pop-in", 0.5)),
            Self::WordPulse => Some(("animate-word-pulse", 0.4)),
            Self::Glow => Some(("animate-glow", 1.5)),
            Self::Bounce => Some(("animate-word-bounce-in", 0.6)),
            Self::Blink => Some(("animate-blink", 2.0)),
            _ => None,
        }
    }
}

impl fmt::Display for AnimationStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for AnimationStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|style| style.id() == needle)
            .ok_or_else(|| format!("unknown animation style: {s}"))
    }
}

/// Horizontal text alignment inside the caption box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

impl TextAlign {
    #[must_use]
    pub fn css(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
        }
    }
}

impl FromStr for TextAlign {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "left" => Ok(Self::Left),
            "center" | "centre" => Ok(Self::Center),
            "right" => Ok(Self::Right),
            other => Err(format!("unknown alignment: {other}")),
        }
    }
}

/// 8-bit RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    /// Parse `#rrggbb` or `rrggbb` (case-insensitive).
    #[must_use]
    pub fn parse(hex: &str) -> Option<Self> {
        let caps = HEX_COLOR.captures(hex.trim())?;
        let channel = |i: usize| u8::from_str_radix(&caps[i], 16).ok();
        Some(Self {
            r: channel(1)?,
            g: channel(2)?,
            b: channel(3)?,
        })
    }

    #[must_use]
    pub fn parse_or_black(hex: &str) -> Self {
        Self::parse(hex).unwrap_or(Self::BLACK)
    }

    /// CSS `rgba()` with the given alpha, clamped to `[0, 1]`.
    #[must_use]
    pub fn with_alpha(self, alpha: f64) -> String {
        let alpha = if alpha.is_finite() { alpha.clamp(0.0, 1.0) } else { 1.0 };
        format!("rgba({}, {}, {}, {alpha})", self.r, self.g, self.b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Flat bundle of independent cosmetic settings.
///
/// Disabled toggles suppress the visual effect of their dependent fields,
/// but those fields keep their last value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CosmeticSettings {
    pub color: String,
    pub scale: f64,
    pub text_align: TextAlign,
    pub show_bg: bool,
    pub bg_color: String,
    pub bg_opacity: f64,
    pub show_outline: bool,
    pub outline_color: String,
    pub outline_width: f64,
    pub font_family: String,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub highlight_color: String,
    pub karaoke_color: String,
    pub glow_color: String,
    pub animation_speed: f64,
}

impl Default for CosmeticSettings {
    fn default() -> Self {
        Self {
            color: "#FFFFFF".to_string(),
            scale: 1.0,
            text_align: TextAlign::Center,
            show_bg: true,
            bg_color: "#000000".to_string(),
            bg_opacity: 0.6,
            show_outline: true,
            outline_color: "#000000".to_string(),
            outline_width: 1.0,
            font_family: "'Poppins', sans-serif".to_string(),
            bold: true,
            italic: false,
            underline: false,
            highlight_color: "#8A2BE2".to_string(),
            karaoke_color: "#E95420".to_string(),
            glow_color: "#F97316".to_string(),
            animation_speed: 1.0,
        }
    }
}

impl CosmeticSettings {
    /// Speed multiplier with non-positive or non-finite values treated as 1.
    #[must_use]
    pub fn effective_speed(&self) -> f64 {
        if self.animation_speed.is_finite() && self.animation_speed > 0.0 {
            self.animation_speed
        } else {
            1.0
        }
    }

    /// Caption box background: transparent when disabled, otherwise the
    /// configured colour composited with the configured opacity.
    #[must_use]
    pub fn background_color(&self) -> String {
        if !self.show_bg {
            return "transparent".to_string();
        }
        Rgb::parse_or_black(&self.bg_color).with_alpha(self.bg_opacity)
    }

    /// Outline approximated by four diagonal same-colour shadows, layered
    /// over the fixed drop-shadow.
    #[must_use]
    pub fn text_shadow(&self) -> String {
        if !self.show_outline || self.outline_width.is_nan() || self.outline_width <= 0.0 {
            return DROP_SHADOW.to_string();
        }

        let w = self.outline_width.round();
        let color = Rgb::parse_or_black(&self.outline_color);
        format!(
            "-{w}px -{w}px 0 {color}, {w}px -{w}px 0 {color}, \
             -{w}px {w}px 0 {color}, {w}px {w}px 0 {color}, {DROP_SHADOW}"
        )
    }

    #[must_use]
    pub fn font_size(&self) -> String {
        format!("calc((0.4rem + 1vw) * {})", self.scale)
    }
}

/// A one-shot or looping CSS-equivalent transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transition {
    pub class: &'static str,
    pub duration_secs: f64,
}

/// Attributes applied to the caption paragraph as a whole.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhraseStyle {
    pub color: String,
    pub background: String,
    pub text_shadow: String,
    pub font_size: String,
    pub font_family: String,
    pub font_weight: &'static str,
    pub font_style: &'static str,
    pub text_decoration: &'static str,
    pub text_align: TextAlign,
    /// Entry transition, present for phrase-level styles only.
    pub transition: Option<Transition>,
}

/// Attributes for one word of a word-level caption.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordStyle<'a> {
    pub text: &'a str,
    pub visible: bool,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_radius_px: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub glow_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<Transition>,
}

impl<'a> WordStyle<'a> {
    fn plain(text: &'a str, visible: bool) -> Self {
        Self {
            text,
            visible,
            active: false,
            color: None,
            scale: None,
            background: None,
            border_radius_px: None,
            glow_color: None,
            transition: None,
        }
    }
}

/// Maps an animation style plus cosmetic settings to presentation attributes.
#[derive(Debug, Clone, Copy)]
pub struct StyleResolver<'s> {
    style: AnimationStyle,
    settings: &'s CosmeticSettings,
}

impl<'s> StyleResolver<'s> {
    #[must_use]
    pub fn new(style: AnimationStyle, settings: &'s CosmeticSettings) -> Self {
        Self { style, settings }
    }

    fn scaled(&self, base: f64) -> f64 {
        base / self.settings.effective_speed()
    }

    #[must_use]
    pub fn phrase(&self) -> PhraseStyle {
        let s = self.settings;
        PhraseStyle {
            color: Rgb::parse_or_black(&s.color).to_string(),
            background: s.background_color(),
            text_shadow: s.text_shadow(),
            font_size: s.font_size(),
            font_family: s.font_family.clone(),
            font_weight: if s.bold { "bold" } else { "normal" },
            font_style: if s.italic { "italic" } else { "normal" },
            text_decoration: if s.underline { "underline" } else { "none" },
            text_align: s.text_align,
            transition: self.style.phrase_class().map(|class| Transition {
                class,
                duration_secs: self.scaled(PHRASE_BASE_DURATION),
            }),
        }
    }

    /// Per-word attributes. A word stays hidden until the playhead reaches
    /// its `start`; decoration applies to the active word only.
    #[must_use]
    pub fn words<'w>(
        &self,
        words: &'w [Word],
        active: Option<usize>,
        time: f64,
    ) -> Vec<WordStyle<'w>> {
        words
            .iter()
            .enumerate()
            .map(|(i, word)| {
                let visible = time >= word.start;
                let mut out = WordStyle::plain(&word.text, visible);
                if visible && active == Some(i) {
                    self.decorate_active(&mut out);
                }
                out
            })
            .collect()
    }

    fn decorate_active(&self, word: &mut WordStyle<'_>) {
        let s = self.settings;
        word.active = true;
        match self.style {
            AnimationStyle::Karaoke => {
                word.color = Some(Rgb::parse_or_black(&s.karaoke_color).to_string());
                word.scale = Some(1.1);
            }
            AnimationStyle::Highlight => {
                word.background = Some(Rgb::parse_or_black(&s.highlight_color).to_string());
                word.border_radius_px = Some(5);
            }
            AnimationStyle::Glow => {
                word.glow_color = Some(Rgb::parse_or_black(&s.glow_color).to_string());
            }
            _ => {}
        }
        if let Some((class, base)) = self.style.word_transition() {
            word.transition = Some(Transition {
                class,
                duration_secs: self.scaled(base),
            });
        }
    }

    /// Blinking caret shown after typewriter reveal text. Not speed-scaled.
    #[must_use]
    pub fn caret(&self) -> Transition {
        Transition {
            class: "animate-blink-caret",
            duration_secs: 1.0,
        }
    }
}

/// Stylesheet link for a web font family list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FontLink {
    pub id: String,
    pub href: String,
}

/// First family of a CSS font list with quotes stripped and whitespace
/// collapsed, e.g. `'Noto Nastaliq Urdu', serif` gives `Noto Nastaliq Urdu`.
#[must_use]
pub fn primary_font_family(font_family: &str) -> Option<String> {
    let name = font_family
        .split(',')
        .next()
        .unwrap_or_default()
        .replace(['\'', '"'], "");
    let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
    (!name.is_empty()).then_some(name)
}

/// Resolve the stylesheet link for the first family in a CSS font list.
///
/// Returns `None` when no usable family name remains, in which case no
/// stylesheet should be injected.
#[must_use]
pub fn font_stylesheet_url(font_family: &str) -> Option<FontLink> {
    let name = primary_font_family(font_family)?;
    let parts: Vec<&str> = name.split_whitespace().collect();

    let family = parts
        .iter()
        .map(|p| urlencoding::encode(p).into_owned())
        .collect::<Vec<_>>()
        .join("+");

    Some(FontLink {
        id: format!("font-link-{}", parts.join("-")),
        href: format!(
            "https://fonts.googleapis.com/css2?family={family}:ital,wght@0,400;0,700;1,400;1,700&display=swap"
        ),
    })
}
