//! Lenscast CLI: drive the camera publish pipeline from the command line.
//!
//! Usage:
//!   lenscast simulate [OPTIONS]          Run a pipeline against in-memory collaborators
//!   lenscast crop --source WxH [OPTIONS] Show the clamped viewport and crop window
//!   lenscast config [--write]            Show (or save) the effective configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use lenscast_common::config::AppConfig;

mod commands;

use commands::{parse_center, parse_size};

#[derive(Parser)]
#[command(
    name = "lenscast",
    about = "Zoom, pan, and republish a live camera feed",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full pipeline against a synthetic feed and an in-memory transport
    Simulate {
        /// Output width (defaults to config)
        #[arg(long)]
        width: Option<u32>,

        /// Output height (defaults to config)
        #[arg(long)]
        height: Option<u32>,

        /// Target FPS (defaults to config)
        #[arg(long)]
        fps: Option<u32>,

        /// Synthetic source size
        #[arg(long, default_value = "1920x1080", value_parser = parse_size)]
        source: (u32, u32),

        /// Display refreshes to drive
        #[arg(long, default_value = "30")]
        ticks: usize,

        /// Zoom to apply after start
        #[arg(long)]
        zoom: Option<f64>,

        /// Crop center to apply after start, as CX,CY
        #[arg(long, value_parser = parse_center)]
        center: Option<(f64, f64)>,

        /// Render only every Nth refresh (defaults to config)
        #[arg(long)]
        every: Option<u32>,

        /// Size queries that report no metadata before the source is ready
        #[arg(long, default_value = "0")]
        metadata_delay: u32,

        /// Signal feed end after this many refreshes
        #[arg(long)]
        end_after: Option<usize>,

        /// JSON-lines file of input samples to replay before rendering
        #[arg(long)]
        input: Option<PathBuf>,

        /// Write the last published frame as PNG
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the final snapshot as JSON
        #[arg(long)]
        json: bool,

        /// Pace refreshes at the configured FPS instead of running flat out
        #[arg(long)]
        realtime: bool,
    },

    /// Show the crop window for a viewport on a source
    Crop {
        /// Source size as WxH
        #[arg(long, value_parser = parse_size)]
        source: (u32, u32),

        /// Requested zoom
        #[arg(long, default_value = "1.0")]
        zoom: f64,

        /// Requested center as CX,CY
        #[arg(long, default_value = "0.5,0.5", value_parser = parse_center)]
        center: (f64, f64),

        /// Minimum zoom
        #[arg(long, default_value = "1.0")]
        min: f64,

        /// Maximum zoom
        #[arg(long, default_value = "4.0")]
        max: f64,
    },

    /// Show the effective configuration
    Config {
        /// Save the effective configuration to the config file
        #[arg(long)]
        write: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let app_config = AppConfig::load();
    let mut logging = app_config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    lenscast_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Simulate {
            width,
            height,
            fps,
            source,
            ticks,
            zoom,
            center,
            every,
            metadata_delay,
            end_after,
            input,
            output,
            json,
            realtime,
        } => {
            let mut pipeline = app_config.pipeline.clone();
            if let Some(width) = width {
                pipeline.width = width;
            }
            if let Some(height) = height {
                pipeline.height = height;
            }
            if let Some(fps) = fps {
                pipeline.fps = fps;
            }
            if let Some(every) = every {
                pipeline.render_every_n_frames = every;
            }
            if cli.verbose {
                pipeline.debug = true;
            }

            commands::simulate::run(commands::simulate::SimulateOptions {
                pipeline,
                source,
                ticks,
                zoom,
                center,
                metadata_delay,
                end_after,
                input,
                output,
                json,
                realtime,
            })
            .await
        }
        Commands::Crop {
            source,
            zoom,
            center,
            min,
            max,
        } => commands::crop::run(source, zoom, center, min, max),
        Commands::Config { write } => commands::config::run(&app_config, write),
    }
}
