use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "Datagen")]
#[command(about = "Self-play position generation and teacher labeling")]
#[command(version)]
pub struct Args {
    /// JSON run configuration
    #[arg(short, long)]
    pub config: PathBuf,

    /// Directory for the batch files
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Overrides the seed from the config
    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long, default_value_t = false)]
    pub no_progress: bool,

    /// Log engine traffic and per-game results
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}
