//! folderlapse CLI — Turn folders of photos into timelapse videos.
//!
//! Usage:
//!   folderlapse render --root <DIR> --out <DIR> [OPTIONS]   One video per folder
//!   folderlapse check                                       Check ffmpeg and encoders

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use folderlapse_common::config::Defaults;
use folderlapse_common::error::LapseError;

mod commands;

#[derive(Parser)]
#[command(
    name = "folderlapse",
    about = "Turn folders of timestamped photos into one timelapse video per folder",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    json_logs: bool,

    /// Defaults file (instead of $XDG_CONFIG_HOME/folderlapse/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render one video per source folder
    Render(commands::render::RenderArgs),

    /// Check ffmpeg availability and supported codecs
    Check,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let defaults = match &cli.config {
        Some(path) => Defaults::load_from(path),
        None => Defaults::load(),
    };

    // Initialize logging
    let mut logging = defaults.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    if cli.json_logs {
        logging.json = true;
    }
    folderlapse_common::logging::init_logging(&logging);

    let result = match cli.command {
        Commands::Render(args) => commands::render::run(args, &defaults),
        Commands::Check => commands::check::run(&defaults),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            let code = e.downcast_ref::<LapseError>().map_or(1, LapseError::exit_code);
            ExitCode::from(code)
        }
    }
}
