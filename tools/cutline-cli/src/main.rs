//! Cutline CLI: create, inspect, and render timeline projects.
//!
//! Usage:
//!   cutline init <NAME>            Create a new project
//!   cutline import <PATH> <FILE>   Add a media file to the end of a track
//!   cutline info <PATH>            Show project information
//!   cutline validate <PATH>        Validate a project bundle
//!   cutline compile <PATH>         Print the FFmpeg command for a project
//!   cutline export <PATH>          Render a project and persist the result
//!   cutline status <PATH> <JOB>    Show a render job's status
//!   cutline cancel <PATH> <JOB>    Cancel a render job
//!   cutline cleanup <PATH> <JOB>   Remove a finished job's files

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use cutline_common::{AppConfig, LoggingConfig};
use cutline_project_model::MediaKind;
use uuid::Uuid;

mod commands;

#[derive(Parser)]
#[command(
    name = "cutline",
    about = "Timeline editing and FFmpeg rendering",
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

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Video,
    Audio,
    Image,
}

impl From<KindArg> for MediaKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Video => MediaKind::Video,
            KindArg::Audio => MediaKind::Audio,
            KindArg::Image => MediaKind::Image,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new empty project
    Init {
        /// Project name
        name: String,

        /// Parent directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Import a media file and append it to a track of its kind
    Import {
        /// Path to the project directory
        path: PathBuf,

        /// Media file to import
        file: PathBuf,

        #[arg(long, value_enum, default_value = "video")]
        kind: KindArg,

        /// Source duration in seconds
        #[arg(long)]
        duration: f64,
    },

    /// Show project information
    Info {
        /// Path to the project directory
        path: PathBuf,
    },

    /// Validate a project bundle
    Validate {
        /// Path to the project directory
        path: PathBuf,
    },

    /// Compile a project and print the FFmpeg command
    Compile {
        /// Path to the project directory
        path: PathBuf,

        /// Print the render plan as JSON instead
        #[arg(long)]
        plan: bool,
    },

    /// Render a project and move the result into renders/
    Export {
        /// Path to the project directory
        path: PathBuf,

        /// Output format: mp4, webm, gif, mov
        #[arg(long)]
        format: Option<String>,

        /// Output frame rate
        #[arg(long)]
        fps: Option<u32>,

        /// Leave the artifact in the job directory
        #[arg(long)]
        no_persist: bool,
    },

    /// Show the status of a render job
    Status {
        /// Path to the project directory
        path: PathBuf,

        job: Uuid,
    },

    /// Cancel a render job and delete its files
    Cancel {
        /// Path to the project directory
        path: PathBuf,

        job: Uuid,
    },

    /// Remove the files of a finished render job
    Cleanup {
        /// Path to the project directory
        path: PathBuf,

        job: Uuid,

        /// Keep the rendered artifact
        #[arg(long)]
        preserve_artifact: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load();
    let level = if cli.verbose {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };
    cutline_common::logging::init_logging(&LoggingConfig {
        level,
        ..config.logging.clone()
    });

    match cli.command {
        Commands::Init { name, output } => commands::init::run(name, output),
        Commands::Import {
            path,
            file,
            kind,
            duration,
        } => commands::import::run(path, file, kind.into(), duration, &config),
        Commands::Info { path } => commands::info::run(path),
        Commands::Validate { path } => commands::validate::run(path),
        Commands::Compile { path, plan } => commands::compile::run(path, plan, &config),
        Commands::Export {
            path,
            format,
            fps,
            no_persist,
        } => commands::export::run(path, format, fps, !no_persist, &config).await,
        Commands::Status { path, job } => commands::status::run(path, job, &config).await,
        Commands::Cancel { path, job } => commands::cancel::run(path, job, &config).await,
        Commands::Cleanup {
            path,
            job,
            preserve_artifact,
        } => commands::cleanup::run(path, job, preserve_artifact, &config).await,
    }
}
