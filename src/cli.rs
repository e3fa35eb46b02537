use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "reelpress")]
#[command(author, version, about = "Single-page video transcode form backed by ffmpeg")]
pub struct Cli {
    /// Path to config file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the transcode form over HTTP
    Serve {
        /// Host to bind to (overrides the config file)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Transcode a single file without the web form
    Run {
        /// Input video
        #[arg(required = true)]
        input: PathBuf,

        /// File holding the ffmpeg options, one or more per line
        #[arg(long)]
        options_file: Option<PathBuf>,

        /// Output extension (also selects the container)
        #[arg(long)]
        ext: Option<String>,

        /// Where to write the output (defaults to the input's directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
