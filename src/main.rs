// SPDX-License-Identifier: MPL-2.0

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "framegrab")]
#[command(about = "Video capture and recording for experiment control rigs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available capture devices
    List,

    /// Show the encoder fallback chain and the default selection
    Encoders,

    /// Print the gst-launch fragment a codec spec resolves to
    LaunchLine {
        /// Codec specification string, e.g. "DEFAULTenc Videobitrate=4000"
        spec: String,
    },

    /// Record video to a movie file
    Record {
        /// Capture device index (from 'framegrab list')
        #[arg(short, long)]
        camera: Option<u32>,

        /// Use the synthetic test pattern instead of a device
        #[arg(long)]
        test: bool,

        /// Recording duration in seconds
        #[arg(short, long, default_value = "10")]
        duration: u64,

        /// Output file path (default: videos directory, timestamped)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Codec specification string (default: configured default spec)
        #[arg(long)]
        codec: Option<String>,

        /// Record an audio track
        #[arg(short, long)]
        audio: bool,

        /// Capture width in pixels (needs --height)
        #[arg(long)]
        width: Option<u32>,

        /// Capture height in pixels (needs --width)
        #[arg(long)]
        height: Option<u32>,

        /// Capture rate in frames per second
        #[arg(long)]
        fps: Option<f64>,
    },

    /// Capture without recording and report delivery statistics
    Monitor {
        /// Capture device index (from 'framegrab list')
        #[arg(short, long)]
        camera: Option<u32>,

        /// Use the synthetic test pattern instead of a device
        #[arg(long)]
        test: bool,

        /// Capture duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set RUST_LOG to control log level, e.g. RUST_LOG=framegrab=debug
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::List => cli::list_devices(),
        Commands::Encoders => cli::show_encoders(),
        Commands::LaunchLine { spec } => cli::show_launch_line(&spec),
        Commands::Record {
            camera,
            test,
            duration,
            output,
            codec,
            audio,
            width,
            height,
            fps,
        } => {
            let size = match (width, height) {
                (Some(width), Some(height)) => Some((width, height)),
                (None, None) => None,
                _ => return Err("both --width and --height are required".into()),
            };
            cli::record(camera, test, duration, output, codec, audio, size, fps)
        }
        Commands::Monitor {
            camera,
            test,
            duration,
        } => cli::monitor(camera, test, duration),
    }
}
