use super::app_config::LogLevel;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "pixload",
    version,
    about = "Load images through a cached, cancellable pipeline",
    long_about = None
)]
pub struct CliArgs {
    /// Images to load: paths, URLs, file:// URIs or integer resource ids.
    #[arg(required = true, value_name = "INPUT")]
    pub inputs: Vec<String>,

    /// Target width in pixels.
    #[arg(long, requires = "height")]
    pub width: Option<u32>,

    /// Target height in pixels.
    #[arg(long, requires = "width")]
    pub height: Option<u32>,

    /// Convert to grayscale.
    #[arg(long)]
    pub grayscale: bool,

    /// Apply a Gaussian blur with this sigma.
    #[arg(long, value_name = "SIGMA")]
    pub blur: Option<f32>,

    /// Load every input this many times.
    #[arg(long, default_value_t = 1, value_name = "N")]
    pub repeat: u32,

    /// Bypass the memory cache.
    #[arg(long)]
    pub no_cache: bool,

    /// Strong memory cache budget in bytes.
    #[arg(long, value_name = "BYTES")]
    pub memory_cache_size: Option<usize>,

    /// Directory integer resource ids resolve against.
    #[arg(long, value_name = "PATH")]
    pub resource_dir: Option<PathBuf>,

    /// Configuration file path.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,
}
