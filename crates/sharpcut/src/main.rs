mod cli;

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::info;

use sharpcut_core::config::SelectionConfig;
use sharpcut_core::pipeline::{self, ScoredFrame, Selection};
use sharpcut_core::video::decoder::VideoDecoder;

const MANIFEST_NAME: &str = "keyframes.json";

/// One manifest entry per written keyframe.
#[derive(Serialize)]
struct ManifestEntry<'a> {
    file: &'a str,
    index: u32,
    timestamp: f64,
    clarity: f64,
    change_magnitude: f64,
    clearest_index: u32,
    width: u32,
    height: u32,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = cli::Cli::parse();

    match cli.command {
        cli::Command::Extract {
            input,
            output,
            config,
            max_scenes,
            window_radius,
            sample_stride,
            min_interval,
            debug_frames,
            font,
        } => {
            let mut selection_config = match &config {
                Some(path) => SelectionConfig::load(path)
                    .with_context(|| format!("failed to load {}", path.display()))?,
                None => SelectionConfig::default(),
            };
            if let Some(cap) = max_scenes {
                selection_config.output_cap = cap;
            }
            if let Some(radius) = window_radius {
                selection_config.window_radius = radius;
            }
            if let Some(stride) = sample_stride {
                selection_config.sample_stride = stride;
            }
            if let Some(interval) = min_interval {
                selection_config.min_interval_seconds = interval;
            }
            if debug_frames.is_some() {
                selection_config.debug_frames_dir = debug_frames;
            }
            if font.is_some() {
                selection_config.debug_font = font;
            }

            info!(?input, ?output, ?config, "starting keyframe extraction");

            let mut decoder = VideoDecoder::open(&input).context("failed to open video")?;
            let selection = pipeline::select_keyframes(&mut decoder, &selection_config)
                .context("keyframe selection failed")?;

            let Selection::Keyframes(frames) = selection else {
                bail!("no scenes detected in {}", input.display());
            };

            write_keyframes(&frames, &output)?;

            info!(keyframe_count = frames.len(), ?output, "extraction complete");
            Ok(())
        }
    }
}

/// Write each payload as `scene_{n}.jpg` plus a JSON manifest describing them.
fn write_keyframes(frames: &[ScoredFrame], output: &Path) -> Result<()> {
    std::fs::create_dir_all(output)
        .with_context(|| format!("failed to create output directory {}", output.display()))?;

    let names: Vec<String> = (1..=frames.len()).map(|n| format!("scene_{n}.jpg")).collect();

    for (frame, name) in frames.iter().zip(&names) {
        let path = output.join(name);
        std::fs::write(&path, &frame.payload)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(?path, index = frame.index, bytes = frame.payload.len(), "keyframe written");
    }

    let manifest: Vec<ManifestEntry> = frames
        .iter()
        .zip(&names)
        .map(|(frame, name)| ManifestEntry {
            file: name,
            index: frame.index,
            timestamp: frame.timestamp,
            clarity: frame.clarity,
            change_magnitude: frame.change_magnitude,
            clearest_index: frame.clearest_index,
            width: frame.width,
            height: frame.height,
        })
        .collect();

    let path = output.join(MANIFEST_NAME);
    let json = serde_json::to_string_pretty(&manifest).context("failed to serialize manifest")?;
    std::fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;

    info!(?path, entries = manifest.len(), "manifest written");
    Ok(())
}
