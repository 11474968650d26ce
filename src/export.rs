//! Subtitle export.
//!
//! Writes a caption script as SRT, WebVTT or ASS for use outside the
//! overlay. Only ASS carries styling: the cosmetic settings become its
//! default style and karaoke gets per-word `\k` timing.

use std::fmt::{self, Write as FmtWrite};
use std::path::Path;
use std::str::FromStr;

use anyhow::Result;
use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::info;

use crate::caption::Caption;
use crate::style::{primary_font_family, AnimationStyle, CosmeticSettings, Rgb, TextAlign};

/// Output subtitle format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// `SubRip` (.srt): phrase text only
    #[default]
    Srt,
    /// `WebVTT` (.vtt): phrase text only
    Vtt,
    /// Advanced `SubStation` Alpha (.ass): styling and `\k` karaoke
    Ass,
}

impl ExportFormat {
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Srt => "srt",
            Self::Vtt => "vtt",
            Self::Ass => "ass",
        }
    }

    /// Guess the format from a file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()?.to_str()?.parse().ok()
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "srt" => Ok(Self::Srt),
            "vtt" | "webvtt" => Ok(Self::Vtt),
            "ass" | "ssa" => Ok(Self::Ass),
            other => Err(format!("unknown subtitle format: {other}")),
        }
    }
}

/// Seconds to whole milliseconds; negative and non-finite times become 0.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_ms(seconds: f64) -> u64 {
    if seconds.is_finite() && seconds > 0.0 {
        (seconds * 1000.0).round() as u64
    } else {
        0
    }
}

fn split_ms(ms: u64) -> (u64, u64, u64, u64) {
    (
        ms / 3_600_000,
        (ms % 3_600_000) / 60_000,
        (ms % 60_000) / 1000,
        ms % 1000,
    )
}

/// `HH:MM:SS,mmm`
fn srt_time(ms: u64) -> String {
    let (h, m, s, ms) = split_ms(ms);
    format!("{h:02}:{m:02}:{s:02},{ms:03}")
}

/// `HH:MM:SS.mmm`
fn vtt_time(ms: u64) -> String {
    let (h, m, s, ms) = split_ms(ms);
    format!("{h:02}:{m:02}:{s:02}.{ms:03}")
}

/// `H:MM:SS.cc`
fn ass_time(ms: u64) -> String {
    let (h, m, s, ms) = split_ms(ms);
    format!("{h}:{m:02}:{s:02}.{:02}", ms / 10)
}

/// Renders a caption script into one subtitle format.
#[async_trait]
pub trait SubtitleWriter: Send + Sync {
    fn format(&self) -> ExportFormat;

    /// Render the whole document.
    fn render(&self, captions: &[Caption]) -> Result<String>;

    async fn write_to_file(&self, captions: &[Caption], path: &Path) -> Result<()> {
        let content = self.render(captions)?;
        fs::write(path, content).await?;
        info!(
            path = %path.display(),
            format = ?self.format(),
            count = captions.len(),
            "subtitles written"
        );
        Ok(())
    }

    async fn write_to(
        &self,
        captions: &[Caption],
        writer: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<()> {
        let content = self.render(captions)?;
        writer.write_all(content.as_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SrtWriter;

impl SubtitleWriter for SrtWriter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Srt
    }

    fn render(&self, captions: &[Caption]) -> Result<String> {
        let mut output = String::new();
        for (i, caption) in captions.iter().enumerate() {
            writeln!(output, "{}", i + 1)?;
            writeln!(
                output,
                "{} --> {}",
                srt_time(to_ms(caption.start)),
                srt_time(to_ms(caption.end))
            )?;
            writeln!(output, "{}", caption.text())?;
            writeln!(output)?;
        }
        Ok(output)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct VttWriter;

impl SubtitleWriter for VttWriter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Vtt
    }

    fn render(&self, captions: &[Caption]) -> Result<String> {
        let mut output = String::from("WEBVTT\n\n");
        for caption in captions {
            writeln!(
                output,
                "{} --> {}",
                vtt_time(to_ms(caption.start)),
                vtt_time(to_ms(caption.end))
            )?;
            writeln!(output, "{}", vtt_escape(&caption.text()))?;
            writeln!(output)?;
        }
        Ok(output)
    }
}

fn vtt_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// `&HAABBGGRR`; alpha 0 is opaque.
fn ass_color(rgb: Rgb, alpha: u8) -> String {
    format!("&H{alpha:02X}{:02X}{:02X}{:02X}", rgb.b, rgb.g, rgb.r)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn ass_alpha(opacity: f64) -> u8 {
    ((1.0 - opacity.clamp(0.0, 1.0)) * 255.0).round() as u8
}

fn ass_escape(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('{', "\\{")
        .replace('}', "\\}")
        .replace('\n', "\\N")
}

/// Centiseconds, as used by `\k` tags.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn centis(seconds: f64) -> u64 {
    if seconds.is_finite() && seconds > 0.0 {
        (seconds * 100.0).round() as u64
    } else {
        0
    }
}

/// ASS writer. The default style mirrors the cosmetic settings.
#[derive(Debug, Clone)]
pub struct AssWriter {
    pub style: AnimationStyle,
    pub settings: CosmeticSettings,
}

impl AssWriter {
    #[must_use]
    pub fn new(style: AnimationStyle, settings: CosmeticSettings) -> Self {
        Self { style, settings }
    }

    /// The `Style:` line for the default style.
    #[must_use]
    pub fn style_line(&self) -> String {
        let s = &self.settings;
        let text = Rgb::parse_or_black(&s.color);
        // Karaoke fills from Secondary to Primary as each `\k` elapses.
        let (primary, secondary) = if self.style == AnimationStyle::Karaoke {
            (Rgb::parse_or_black(&s.karaoke_color), text)
        } else {
            (text, text)
        };
        let (border_style, back) = if s.show_bg {
            (3, ass_color(Rgb::parse_or_black(&s.bg_color), ass_alpha(s.bg_opacity)))
        } else {
            (1, ass_color(Rgb::BLACK, 0x80))
        };
        let outline = if s.show_outline {
            s.outline_width.max(0.0)
        } else {
            0.0
        };
        let alignment = match s.text_align {
            TextAlign::Left => 1,
            TextAlign::Center => 2,
            TextAlign::Right => 3,
        };
        let flag = |on: bool| if on { -1 } else { 0 };
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let font_size = (48.0 * s.scale.max(0.1)).round() as u32;

        format!(
            "Style: Default,{},{font_size},{},{},{},{back},{},{},{},0,100,100,0,0,{border_style},{outline},1,{alignment},20,20,20,0",
            primary_font_family(&s.font_family).unwrap_or_else(|| "Arial".to_string()),
            ass_color(primary, 0),
            ass_color(secondary, 0),
            ass_color(Rgb::parse_or_black(&s.outline_color), 0),
            flag(s.bold),
            flag(s.italic),
            flag(s.underline),
        )
    }

    fn header(&self) -> Result<String> {
        let mut header = String::new();
        writeln!(header, "[Script Info]")?;
        writeln!(header, "Title: rucap captions")?;
        writeln!(header, "ScriptType: v4.00+")?;
        writeln!(header, "PlayResX: 1920")?;
        writeln!(header, "PlayResY: 1080")?;
        writeln!(header, "ScaledBorderAndShadow: yes")?;
        writeln!(header)?;
        writeln!(header, "[V4+ Styles]")?;
        writeln!(
            header,
            "Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, \
             OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, \
             ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, \
             MarginL, MarginR, MarginV, Encoding"
        )?;
        writeln!(header, "{}", self.style_line())?;
        writeln!(header)?;
        writeln!(header, "[Events]")?;
        writeln!(
            header,
            "Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text"
        )?;
        Ok(header)
    }

    /// Dialogue text for one caption.
    fn dialogue_text(&self, caption: &Caption) -> Result<String, fmt::Error> {
        let text = match self.style {
            AnimationStyle::Karaoke => {
                let mut text = String::new();
                let mut cursor = caption.start;
                for (i, word) in caption.words.iter().enumerate() {
                    let gap = centis(word.start - cursor);
                    if gap > 0 {
                        write!(text, "{{\\k{gap}}}")?;
                    }
                    if i > 0 {
                        text.push(' ');
                    }
                    write!(text, "{{\\k{}}}{}", centis(word.duration()), ass_escape(&word.text))?;
                    cursor = word.end;
                }
                text
            }
            AnimationStyle::Fade => {
                let fade = to_ms(0.5 / self.settings.effective_speed());
                format!("{{\\fad({fade},0)}}{}", ass_escape(&caption.text()))
            }
            _ => ass_escape(&caption.text()),
        };
        Ok(text)
    }
}

impl SubtitleWriter for AssWriter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Ass
    }

    fn render(&self, captions: &[Caption]) -> Result<String> {
        let mut output = self.header()?;
        for caption in captions {
            writeln!(
                output,
                "Dialogue: 0,{},{},Default,,0,0,0,,{}",
                ass_time(to_ms(caption.start)),
                ass_time(to_ms(caption.end)),
                self.dialogue_text(caption)?
            )?;
        }
        Ok(output)
    }
}

/// Writer for `format`, carrying the style choices where the format can.
#[must_use]
pub fn writer_for(
    format: ExportFormat,
    style: AnimationStyle,
    settings: &CosmeticSettings,
) -> Box<dyn SubtitleWriter> {
    match format {
        ExportFormat::Srt => Box::new(SrtWriter),
        ExportFormat::Vtt => Box::new(VttWriter),
        ExportFormat::Ass => Box::new(AssWriter::new(style, settings.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caption::Word;

    fn captions() -> Vec<Caption> {
        vec![
            Caption::new(
                0.5,
                3.0,
                vec![
                    Word::new("Assalam", 0.5, 1.1),
                    Word::new("o", 1.1, 1.3),
                    Word::new("Alaikum,", 1.5, 2.0),
                ],
            ),
            Caption::new(3661.5, 3662.0, vec![Word::new("{bye}", 3661.5, 3662.0)]),
        ]
    }

    #[test]
    fn time_formats() {
        assert_eq!(srt_time(3_661_500), "01:01:01,500");
        assert_eq!(vtt_time(61_000), "00:01:01.000");
        assert_eq!(ass_time(3_661_500), "1:01:01.50");
        assert_eq!(to_ms(-2.0), 0);
        assert_eq!(to_ms(f64::NAN), 0);
        assert_eq!(to_ms(1.2345), 1235);
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(ExportFormat::from_path(Path::new("a.SRT")), Some(ExportFormat::Srt));
        assert_eq!(ExportFormat::from_path(Path::new("a.vtt")), Some(ExportFormat::Vtt));
        assert_eq!(ExportFormat::from_path(Path::new("a.ass")), Some(ExportFormat::Ass));
        assert_eq!(ExportFormat::from_path(Path::new("a.txt")), None);
        assert_eq!(ExportFormat::Vtt.extension(), "vtt");
    }

    #[test]
    fn srt_output() {
        let out = SrtWriter.render(&captions()).unwrap();
        assert!(out.starts_with("1\n00:00:00,500 --> 00:00:03,000\nAssalam o Alaikum,\n\n2\n"));
        assert!(out.contains("01:01:01,500 --> 01:01:02,000"));
    }

    #[test]
    fn vtt_output() {
        let out = VttWriter.render(&captions()).unwrap();
        assert!(out.starts_with("WEBVTT\n\n00:00:00.500 --> 00:00:03.000\nAssalam o Alaikum,\n"));
    }

    #[test]
    fn vtt_escapes_markup() {
        let captions = vec![Caption::new(0.0, 1.0, vec![Word::new("a<b", 0.0, 1.0)])];
        let out = VttWriter.render(&captions).unwrap();
        assert!(out.contains("a&lt;b"));
    }

    #[test]
    fn ass_style_mirrors_settings() {
        let mut settings = CosmeticSettings::default();
        settings.color = "#112233".to_string();
        settings.bg_opacity = 0.6;
        settings.text_align = TextAlign::Right;
        let line = AssWriter::new(AnimationStyle::Pop, settings).style_line();

        assert!(line.starts_with("Style: Default,Poppins,48,&H00332211,&H00332211,&H00000000,&H66000000,-1,0,0,"));
        assert!(line.contains(",3,1,1,3,20,20,20,0"));
    }

    #[test]
    fn ass_without_background_uses_outline_border() {
        let mut settings = CosmeticSettings::default();
        settings.show_bg = false;
        settings.show_outline = false;
        let line = AssWriter::new(AnimationStyle::Fade, settings).style_line();
        assert!(line.contains(",1,0,1,2,20,20,20,0"));
    }

    #[test]
    fn ass_karaoke_tags() {
        let writer = AssWriter::new(AnimationStyle::Karaoke, CosmeticSettings::default());
        let out = writer.render(&captions()).unwrap();
        assert!(out.contains(
            "Dialogue: 0,0:00:00.50,0:00:03.00,Default,,0,0,0,,{\\k60}Assalam {\\k20}o{\\k20} {\\k50}Alaikum,"
        ));
        assert!(writer.style_line().contains("&H002054E9,&H00FFFFFF"));
        assert!(out.contains("\\{bye\\}"));
    }

    #[test]
    fn ass_fade_scales_with_speed() {
        let mut settings = CosmeticSettings::default();
        settings.animation_speed = 2.0;
        let out = AssWriter::new(AnimationStyle::Fade, settings)
            .render(&captions())
            .unwrap();
        assert!(out.contains(",,{\\fad(250,0)}Assalam o Alaikum,"));
    }

    #[test]
    fn writer_selection_matches_format() {
        let settings = CosmeticSettings::default();
        for format in [ExportFormat::Srt, ExportFormat::Vtt, ExportFormat::Ass] {
            assert_eq!(writer_for(format, AnimationStyle::Karaoke, &settings).format(), format);
        }
    }

    #[tokio::test]
    async fn write_to_file_round_trip() {
        let path = std::env::temp_dir().join(format!("rucap-{}.srt", uuid::Uuid::new_v4()));
        SrtWriter.write_to_file(&captions(), &path).await.unwrap();
        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(written.contains("Assalam o Alaikum,"));
        tokio::fs::remove_file(path).await.ok();
    }

    #[tokio::test]
    async fn write_to_buffer() {
        let mut buf: Vec<u8> = Vec::new();
        SrtWriter.write_to(&captions(), &mut buf).await.unwrap();
        assert!(String::from_utf8(buf).unwrap().starts_with("1\n"));
    }
}
