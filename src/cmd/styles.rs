use anyhow::Result;
use serde_json::json;

use rucap::{AnimationStyle, RenderMode};

pub fn cmd_styles(as_json: bool) -> Result<()> {
    if as_json {
        let styles: Vec<_> = AnimationStyle::ALL
            .iter()
            .map(|s| {
                json!({
                    "id": s.id(),
                    "name": s.display_name(),
                    "mode": s.render_mode(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&styles)?);
        return Ok(());
    }

    println!("{:<12} {:<14} MODE", "ID", "NAME");
    for style in AnimationStyle::ALL {
        let mode = match style.render_mode() {
            RenderMode::Phrase => "phrase",
            RenderMode::Word => "word",
        };
        println!("{:<12} {:<14} {mode}", style.id(), style.display_name());
    }
    Ok(())
}
