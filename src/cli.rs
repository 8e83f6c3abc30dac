use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pixelforge")]
#[command(author, version, about = "Image filter service with a persisted catalog")]
pub struct Cli {
    /// Path to config file
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
    /// Start the HTTP server
    Start {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Create the image directory and an empty catalog
    Init,

    /// Apply one filter to a local file without touching the catalog
    Apply {
        /// Image to read
        #[arg(required = true)]
        input: PathBuf,

        /// Filter to apply (invert, blur, gray, sobel)
        #[arg(short, long)]
        action: String,

        /// Where to write the result (defaults to <action>_<input name>)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
