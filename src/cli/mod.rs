pub mod init;
pub mod list;
pub mod serve;
pub mod upload;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "photos")]
#[command(version)]
#[command(about = "A small photo host with cached thumbnails", long_about = None)]
pub struct Cli {
    #[arg(short, long, default_value = "photos.toml", env = "PHOTOS_CONFIG")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default configuration and data directories
    Init {
        #[arg(default_value = ".")]
        path: PathBuf,
    },
    /// Serve the photo API
    Serve {
        #[arg(short = 'H', long)]
        host: Option<String>,
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Store a new photo
    Upload {
        file: PathBuf,
        #[arg(short = 'm', long, default_value = "")]
        comment: String,
        /// Override the detected MIME type
        #[arg(long)]
        mime: Option<String>,
        #[arg(long)]
        unpublished: bool,
    },
    /// List published photos, newest first
    List {
        #[arg(long, default_value = "1")]
        page: usize,
    },
}
