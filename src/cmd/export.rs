use std::path::Path;

use anyhow::{anyhow, Result};

use rucap::export::writer_for;
use rucap::{AnimationStyle, Config, ExportFormat};

use super::read_captions;

pub async fn cmd_export(
    config: &Config,
    input: &str,
    output: &str,
    format: Option<ExportFormat>,
    style: AnimationStyle,
) -> Result<()> {
    let captions = read_captions(input).await?;

    let to_stdout = output == "-";
    let format = match format {
        Some(f) => f,
        None if to_stdout => ExportFormat::Srt,
        None => ExportFormat::from_path(Path::new(output)).ok_or_else(|| {
            anyhow!("cannot infer subtitle format from {output}; pass --format")
        })?,
    };

    let writer = writer_for(format, style, &config.appearance);
    if to_stdout {
        writer.write_to(&captions, &mut tokio::io::stdout()).await?;
    } else {
        writer.write_to_file(&captions, Path::new(output)).await?;
        eprintln!(
            "✅ Wrote {} captions as {} to {output}",
            captions.len(),
            format.extension()
        );
    }
    Ok(())
}
