use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::warn;

use rucap::media::{self, VideoFile};
use rucap::{CaptionSource, Config, FileSource, Session};

pub async fn cmd_generate(
    config: &Config,
    video: &Path,
    description: &str,
    from: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    if !video.is_file() {
        bail!("video not found: {}", video.display());
    }
    let file = VideoFile::from_path(video)?;

    let metadata = match media::probe(video).await {
        Ok(meta) => Some(meta),
        Err(e) => {
            warn!(error = %e, "skipping video probe");
            None
        }
    };

    let mut session = Session::new(config.appearance.clone());
    session.style = config.style;
    session.load_video(file, metadata);
    session.set_description(description);

    let source: Box<dyn CaptionSource> = match from {
        Some(path) => Box::new(FileSource::new(path)),
        None => Box::new(config.gemini_source()?),
    };

    eprintln!("🎬 Generating captions for {}", video.display());
    if let Some(meta) = metadata {
        eprintln!("   Video: {}x{}, {:.1}s", meta.width, meta.height, meta.duration);
    }
    eprintln!("   Source: {}", source.name());

    session.generate(source.as_ref()).await?;

    let rows = session.results();
    eprintln!("\n✅ {} captions", rows.len());
    for row in &rows {
        eprintln!("   {}  {}", row.time_range, row.text);
    }

    let json = serde_json::to_string_pretty(session.captions().unwrap_or_default())?;
    match output {
        Some(path) => {
            tokio::fs::write(path, json)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("   Output: {}", path.display());
        }
        None => println!("{json}"),
    }

    Ok(())
}
