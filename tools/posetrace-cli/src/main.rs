//! Posetrace CLI: run the landmark pipeline over recorded or synthetic feeds.
//!
//! Usage:
//!   posetrace replay <FRAMES>      Run the pipeline over a recorded JSONL stream
//!   posetrace simulate [OPTIONS]   Drive the pipeline from a live synthetic feed
//!   posetrace check-config <PATH>  Validate a pipeline config file
//!   posetrace init-config [PATH]   Write the default pipeline config

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use posetrace_common::config::AppConfig;
use posetrace_frame_source::sources::Dropout;
use posetrace_landmark_model::viewport::FitMode;

mod commands;

#[derive(Parser)]
#[command(
    name = "posetrace",
    about = "Stable on-screen landmarks from a noisy detector",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Pipeline config file (defaults to the app config's, then built-ins)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Render surface options shared by the pipeline-driving commands.
#[derive(clap::Args, Debug, Clone)]
pub struct SurfaceArgs {
    /// Canvas width in pixels
    #[arg(long)]
    canvas_width: Option<u32>,

    /// Canvas height in pixels
    #[arg(long)]
    canvas_height: Option<u32>,

    /// How the video is fitted into the canvas
    #[arg(long, value_enum, default_value = "contain")]
    fit: FitArg,

    /// Override the config's mirror flag
    #[arg(long)]
    mirror: Option<bool>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum FitArg {
    Contain,
    Cover,
}

impl From<FitArg> for FitMode {
    fn from(arg: FitArg) -> Self {
        match arg {
            FitArg::Contain => FitMode::Contain,
            FitArg::Cover => FitMode::Cover,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline over a recorded frame stream
    Replay {
        /// Path to a JSONL frame stream
        frames: PathBuf,

        /// Write per-frame output here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Only print relation start/end events
        #[arg(long)]
        events_only: bool,

        #[command(flatten)]
        surface: SurfaceArgs,
    },

    /// Drive the pipeline from a synthetic detector running on its own task
    Simulate {
        /// How long to run (seconds)
        #[arg(short, long, default_value = "5.0")]
        duration: f64,

        /// Detector rate
        #[arg(long, default_value = "30")]
        fps: u32,

        /// Render tick rate (defaults to the app config's)
        #[arg(long)]
        tick_hz: Option<u32>,

        /// Number of hands to generate
        #[arg(long, default_value = "2")]
        hands: usize,

        /// Scheduled detection gap, class:start_frame:frames (repeatable)
        #[arg(long = "dropout")]
        dropouts: Vec<Dropout>,

        /// Record the detector stream to this JSONL file
        #[arg(long)]
        record: Option<PathBuf>,

        #[command(flatten)]
        surface: SurfaceArgs,
    },

    /// Validate a pipeline config file
    CheckConfig {
        /// Path to the config file
        path: PathBuf,
    },

    /// Write the default pipeline config
    InitConfig {
        /// Output path
        #[arg(default_value = "posetrace.json")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,

        /// Also write the application config to its standard location
        #[arg(long)]
        app: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let app = AppConfig::load();

    // Initialize logging
    let mut logging = app.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    posetrace_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Replay {
            frames,
            output,
            events_only,
            surface,
        } => {
            let config = commands::load_pipeline_config(cli.config.as_deref(), &app)?;
            commands::replay::run(frames, output, events_only, config, &surface, &app)
        }
        Commands::Simulate {
            duration,
            fps,
            tick_hz,
            hands,
            dropouts,
            record,
            surface,
        } => {
            let config = commands::load_pipeline_config(cli.config.as_deref(), &app)?;
            commands::simulate::run(commands::simulate::SimulateOptions {
                duration_secs: duration,
                fps,
                tick_hz: tick_hz.unwrap_or(app.render.tick_hz),
                hands,
                dropouts,
                record,
                config,
                surface,
                app,
            })
            .await
        }
        Commands::CheckConfig { path } => commands::check_config::run(path),
        Commands::InitConfig { path, force, app: write_app } => {
            commands::init_config::run(path, force, write_app.then_some(&app))
        }
    }
}
