use std::path::{Path, PathBuf};

use ab_glyph::{FontVec, PxScale};
use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use tracing::{debug, info, warn};

use crate::analysis::scene::SceneChange;
use crate::refine::ClearestFrame;
use crate::video::frame::Frame;

const TEXT_SCALE: f32 = 28.0;
const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const TEXT_LINE_HEIGHT: i32 = 30;

const GRID_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const HOT_BLOCK_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
/// Thickness of the hottest-block outline (pixels).
const HOT_BLOCK_LINE: u32 = 3;

/// Writes annotated images of accepted scene changes.
pub struct DebugRenderer {
    dir: PathBuf,
    font: Option<FontVec>,
}

impl DebugRenderer {
    pub fn new(dir: &Path, font_path: Option<&Path>) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create debug frames directory {}", dir.display()))?;
        info!(?dir, "debug frames directory ready");

        let font = font_path.and_then(Self::load_font);
        Ok(Self {
            dir: dir.to_path_buf(),
            font,
        })
    }

    /// Save the detection frame with the block grid, the hottest block and a text summary.
    pub fn save_scene(
        &self,
        frame: &Frame,
        change: &SceneChange,
        grid_size: u32,
        clearest: &ClearestFrame,
    ) -> Result<PathBuf> {
        let mut img = frame.image.clone();
        draw_grid(&mut img, grid_size, change.hottest_block);
        self.draw_text_overlay(&mut img, frame, change, clearest);

        let path = self.dir.join(format!("scene_{:08}.png", frame.frame_number));
        img.save(&path)
            .with_context(|| format!("failed to save debug frame to {}", path.display()))?;

        debug!(?path, "saved debug frame");
        Ok(path)
    }

    fn draw_text_overlay(
        &self,
        img: &mut RgbImage,
        frame: &Frame,
        change: &SceneChange,
        clearest: &ClearestFrame,
    ) {
        let Some(font) = &self.font else { return };
        let scale = PxScale::from(TEXT_SCALE);
        let x = 10;
        let mut y = 10;

        let lines = [
            format!("F:{} T:{:.2}s", frame.frame_number, frame.timestamp_seconds),
            format!("change:{:.3} block:{:.3}", change.change_rate, change.max_block_change),
            format!(
                "clearest:F{} clarity:{:.1}",
                clearest.frame.frame_number, clearest.clarity
            ),
        ];
        for line in &lines {
            draw_text_mut(img, TEXT_COLOR, x, y, scale, font, line);
            y += TEXT_LINE_HEIGHT;
        }
    }

    fn load_font(path: &Path) -> Option<FontVec> {
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                warn!(?path, error = %e, "failed to read font file");
                return None;
            }
        };
        match FontVec::try_from_vec(data) {
            Ok(font) => {
                info!(?path, "loaded debug font");
                Some(font)
            }
            Err(e) => {
                warn!(?path, error = %e, "failed to parse font file");
                None
            }
        }
    }
}

/// Outline every grid block, then the hottest one in a thicker contrasting line.
fn draw_grid(img: &mut RgbImage, grid_size: u32, hottest: (u32, u32)) {
    let (w, h) = img.dimensions();
    if grid_size == 0 {
        return;
    }
    let block_w = w / grid_size;
    let block_h = h / grid_size;
    if block_w == 0 || block_h == 0 {
        return;
    }

    for row in 0..grid_size {
        for col in 0..grid_size {
            let rect = Rect::at((col * block_w) as i32, (row * block_h) as i32)
                .of_size(block_w, block_h);
            draw_hollow_rect_mut(img, rect, GRID_COLOR);
        }
    }

    let (row, col) = hottest;
    for inset in 0..HOT_BLOCK_LINE.min(block_w / 2).min(block_h / 2) {
        let rect = Rect::at((col * block_w + inset) as i32, (row * block_h + inset) as i32)
            .of_size(block_w - 2 * inset, block_h - 2 * inset);
        draw_hollow_rect_mut(img, rect, HOT_BLOCK_COLOR);
    }
}
