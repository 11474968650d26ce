mod export;
mod generate;
mod preview;
mod styles;

pub use export::cmd_export;
pub use generate::cmd_generate;
pub use preview::{cmd_preview, PreviewOptions};
pub use styles::cmd_styles;

use anyhow::{Context, Result};
use tokio::io::AsyncReadExt;

use rucap::{parse_captions, Caption, CaptionSource, FileSource, Size};

/// Parse `WIDTHxHEIGHT`.
pub fn parse_size(s: &str) -> Result<Size, String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s}"))?;
    let width: f64 = w.trim().parse().map_err(|_| format!("bad width: {w}"))?;
    let height: f64 = h.trim().parse().map_err(|_| format!("bad height: {h}"))?;
    if width <= 0.0 || height <= 0.0 {
        return Err(format!("size must be positive: {s}"));
    }
    Ok(Size::new(width, height))
}

/// Read a caption script from a file, or stdin for `-`.
async fn read_captions(input: &str) -> Result<Vec<Caption>> {
    if input == "-" {
        let mut json = String::new();
        tokio::io::stdin()
            .read_to_string(&mut json)
            .await
            .context("failed to read captions from stdin")?;
        return Ok(parse_captions(&json)?);
    }
    Ok(FileSource::new(input).generate("").await?)
}
