use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "sharpcut", about = "Extract the sharpest keyframe of each scene in a video")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Select keyframes from a video file.
    Extract {
        /// Path to the input video file (MP4, etc.).
        #[arg(short, long)]
        input: PathBuf,

        /// Directory to write keyframe JPEGs and the manifest into.
        #[arg(short, long)]
        output: PathBuf,

        /// TOML file with selection parameters. Flags below override it.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Maximum number of keyframes to keep.
        #[arg(long)]
        max_scenes: Option<usize>,

        /// Frames searched on each side of a detected change.
        #[arg(long)]
        window_radius: Option<u32>,

        /// Compare every Nth frame.
        #[arg(short, long)]
        sample_stride: Option<u32>,

        /// Minimum seconds between accepted scene changes.
        #[arg(long)]
        min_interval: Option<f64>,

        /// Directory to save annotated frames for each accepted change.
        #[arg(long)]
        debug_frames: Option<PathBuf>,

        /// TrueType font for debug frame text.
        #[arg(long)]
        font: Option<PathBuf>,
    },
}
