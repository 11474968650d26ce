//! `rucap` CLI - Generate, preview and export animated captions

mod cmd;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use rucap::{AnimationStyle, ExportFormat};

#[derive(Parser)]
#[command(name = "rucap")]
#[command(about = "Animated Roman Urdu captions from a video description")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.config/rucap/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More logging (-v debug, -vv trace). `RUST_LOG` overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a caption script for a video from its description
    Generate {
        /// Video file the captions are for
        #[arg(long)]
        video: PathBuf,

        /// What happens in the video
        #[arg(short, long)]
        description: String,

        /// Replay a caption JSON file instead of calling the API
        #[arg(long)]
        from: Option<PathBuf>,

        /// Write the caption JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Step through a caption script and show what is on screen
    Preview {
        /// Caption JSON file ("-" for stdin)
        captions: String,

        /// Animation style (default from config)
        #[arg(short, long)]
        style: Option<AnimationStyle>,

        /// Sample only these times (seconds)
        #[arg(long, value_delimiter = ',')]
        at: Vec<f64>,

        /// Sampling step in seconds
        #[arg(long, default_value = "0.05")]
        step: f64,

        /// Play back in real time instead of stepping
        #[arg(long)]
        realtime: bool,

        /// Video to lay the caption box out for (probed with ffprobe)
        #[arg(long)]
        video: Option<PathBuf>,

        /// Rendered container size, e.g. 1280x720
        #[arg(long, value_parser = cmd::parse_size, default_value = "1280x720")]
        container: rucap::Size,

        /// Print frames as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Convert a caption script to SRT, WebVTT or ASS
    Export {
        /// Caption JSON file ("-" for stdin)
        captions: String,

        /// Output file ("-" for stdout)
        #[arg(short, long)]
        output: String,

        /// Output format (default: from the output extension)
        #[arg(short, long)]
        format: Option<ExportFormat>,

        /// Animation style (default from config)
        #[arg(short, long)]
        style: Option<AnimationStyle>,
    },

    /// List animation styles
    Styles {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "rucap=debug,info",
        _ => "rucap=trace,debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = rucap::config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Generate {
            video,
            description,
            from,
            output,
        } => {
            cmd::cmd_generate(&config, &video, &description, from.as_deref(), output.as_deref())
                .await?;
        }
        Commands::Preview {
            captions,
            style,
            at,
            step,
            realtime,
            video,
            container,
            json,
        } => {
            let opts = cmd::PreviewOptions {
                style: style.unwrap_or(config.style),
                at,
                step,
                realtime,
                video,
                container,
                json,
            };
            cmd::cmd_preview(&config, &captions, opts).await?;
        }
        Commands::Export {
            captions,
            output,
            format,
            style,
        } => {
            cmd::cmd_export(
                &config,
                &captions,
                &output,
                format,
                style.unwrap_or(config.style),
            )
            .await?;
        }
        Commands::Styles { json } => {
            cmd::cmd_styles(json)?;
        }
    }

    Ok(())
}
