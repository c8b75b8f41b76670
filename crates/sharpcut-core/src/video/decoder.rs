use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use anyhow::{bail, Context, Result};
use image::RgbImage;
use tracing::{debug, error, info, warn};

use super::frame::Frame;
use super::FrameSource;

/// Video metadata obtained by probing with ffprobe.
struct ProbeResult {
    width: u32,
    height: u32,
    fps: f64,
    nb_frames: Option<u32>,
}

fn parse_rate(value: &str) -> Result<f64> {
    if let Some((num, den)) = value.split_once('/') {
        let num: f64 = num.parse().context("failed to parse fps numerator")?;
        let den: f64 = den.parse().context("failed to parse fps denominator")?;
        Ok(if den > 0.0 { num / den } else { 0.0 })
    } else {
        value.parse().context("failed to parse fps")
    }
}

/// Parse ffprobe's `key=value` stream output.
fn parse_probe_output(stdout: &str) -> Result<ProbeResult> {
    let mut width = None;
    let mut height = None;
    let mut fps = None;
    let mut nb_frames = None;

    for line in stdout.lines() {
        let Some((key, value)) = line.trim().split_once('=') else {
            continue;
        };
        match key {
            "width" => width = Some(value.parse::<u32>().context("failed to parse width")?),
            "height" => height = Some(value.parse::<u32>().context("failed to parse height")?),
            "r_frame_rate" => fps = Some(parse_rate(value)?),
            // "N/A" for containers that don't store a frame count.
            "nb_frames" => nb_frames = value.parse::<u32>().ok(),
            _ => {}
        }
    }

    let (Some(width), Some(height), Some(fps)) = (width, height, fps) else {
        bail!("unexpected ffprobe output: {stdout}");
    };
    Ok(ProbeResult {
        width,
        height,
        fps,
        nb_frames,
    })
}

fn probe(path: &Path) -> Result<ProbeResult> {
    info!(?path, "probing video metadata with ffprobe");

    let output = Command::new("ffprobe")
        .args([
            "-v", "error",
            "-select_streams", "v:0",
            "-show_entries", "stream=width,height,r_frame_rate,nb_frames",
            "-of", "default=noprint_wrappers=1",
        ])
        .arg(path)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .context("failed to run ffprobe, is ffmpeg installed?")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        error!(%stderr, ?path, "ffprobe failed");
        bail!("ffprobe failed: {stderr}");
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let result = parse_probe_output(&stdout)?;

    if result.fps <= 0.0 {
        warn!(fps = result.fps, ?path, "video has non-positive fps, timestamps will be 0.0");
    }

    info!(
        width = result.width,
        height = result.height,
        fps = result.fps,
        nb_frames = ?result.nb_frames,
        "probe completed"
    );
    Ok(result)
}

/// `-ss` value for an input-side seek that makes `start_frame` the first frame out.
///
/// ffmpeg drops every frame whose pts is below the seek time, so the value must not
/// exceed the frame's pts after rounding to microseconds. Aiming half a frame early
/// keeps it strictly between the previous frame's pts and the target's.
fn seek_start_arg(start_frame: u32, fps: f64) -> String {
    let start_seconds = (start_frame as f64 - 0.5).max(0.0) / fps;
    format!("{start_seconds:.6}")
}

fn spawn_ffmpeg(path: &Path, start_frame: u32, fps: f64) -> Result<Child> {
    let mut command = Command::new("ffmpeg");
    command.args(["-v", "error"]);
    if start_frame > 0 && fps > 0.0 {
        command.arg("-ss").arg(seek_start_arg(start_frame, fps));
    }
    command
        .arg("-i")
        .arg(path)
        .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"])
        .stdout(Stdio::piped())
        .stderr(Stdio::null());

    debug!(?path, start_frame, "spawning ffmpeg decoder process");
    command
        .spawn()
        .context("failed to spawn ffmpeg, is ffmpeg installed?")
}

/// Decodes video frames by piping raw RGB24 data from the ffmpeg CLI.
///
/// Seeking restarts the ffmpeg process at the requested frame.
pub struct VideoDecoder {
    path: PathBuf,
    child: Child,
    width: u32,
    height: u32,
    fps: f64,
    nb_frames: Option<u32>,
    next_frame_number: u32,
    frame_bytes: usize,
}

impl VideoDecoder {
    /// Open a video file for decoding from the first frame.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_at_frame(path, 0)
    }

    /// Open a video file so that the first read returns `start_frame`.
    pub fn open_at_frame(path: &Path, start_frame: u32) -> Result<Self> {
        if !path.exists() {
            bail!("video file does not exist: {}", path.display());
        }

        let info = probe(path)?;
        if info.width == 0 || info.height == 0 {
            bail!("invalid video dimensions: {}x{}", info.width, info.height);
        }

        let child = spawn_ffmpeg(path, start_frame, info.fps)?;
        let frame_bytes = (info.width as usize) * (info.height as usize) * 3;

        info!(
            width = info.width,
            height = info.height,
            fps = info.fps,
            start_frame,
            frame_bytes,
            "video decoder opened"
        );

        Ok(Self {
            path: path.to_path_buf(),
            child,
            width: info.width,
            height: info.height,
            fps: info.fps,
            nb_frames: info.nb_frames,
            next_frame_number: start_frame,
            frame_bytes,
        })
    }

    fn stop_child(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

impl FrameSource for VideoDecoder {
    /// Read the next frame from the ffmpeg pipe, or `None` if the video is finished.
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let stdout = self
            .child
            .stdout
            .as_mut()
            .context("ffmpeg stdout not available")?;

        let mut buf = vec![0u8; self.frame_bytes];
        let mut read = 0;

        while read < self.frame_bytes {
            match stdout.read(&mut buf[read..]) {
                Ok(0) => {
                    if read == 0 {
                        info!(next_frame = self.next_frame_number, "video stream ended");
                        return Ok(None);
                    }
                    error!(
                        read_bytes = read,
                        expected_bytes = self.frame_bytes,
                        frame = self.next_frame_number,
                        "ffmpeg stream ended mid-frame"
                    );
                    bail!(
                        "ffmpeg stream ended mid-frame (read {read}/{} bytes)",
                        self.frame_bytes,
                    );
                }
                Ok(n) => read += n,
                Err(e) => {
                    error!(frame = self.next_frame_number, %e, "failed to read from ffmpeg pipe");
                    return Err(e).context("failed to read from ffmpeg pipe");
                }
            }
        }

        let image = RgbImage::from_raw(self.width, self.height, buf)
            .context("failed to create RgbImage from raw frame data")?;

        let frame = Frame::new(image, self.next_frame_number, self.fps);
        self.next_frame_number += 1;

        debug!(
            frame_number = frame.frame_number,
            timestamp_seconds = frame.timestamp_seconds,
            "decoded frame"
        );

        Ok(Some(frame))
    }

    fn seek(&mut self, frame_number: u32) -> Result<()> {
        if frame_number == self.next_frame_number {
            return Ok(());
        }
        debug!(from = self.next_frame_number, to = frame_number, "seeking decoder");
        self.stop_child();
        self.child = spawn_ffmpeg(&self.path, frame_number, self.fps)
            .with_context(|| format!("failed to seek to frame {frame_number}"))?;
        self.next_frame_number = frame_number;
        Ok(())
    }

    fn position(&self) -> u32 {
        self.next_frame_number
    }

    fn fps(&self) -> f64 {
        self.fps
    }

    fn frame_count(&self) -> Option<u32> {
        self.nb_frames
    }
}

impl Drop for VideoDecoder {
    fn drop(&mut self) {
        info!(next_frame = self.next_frame_number, "closing video decoder");
        self.stop_child();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_probe_output() {
        let out = "width=1920\nheight=1080\nr_frame_rate=30000/1001\nnb_frames=300\n";
        let info = parse_probe_output(out).unwrap();
        assert_eq!(info.width, 1920);
        assert_eq!(info.height, 1080);
        assert!((info.fps - 29.97).abs() < 0.01);
        assert_eq!(info.nb_frames, Some(300));
    }

    #[test]
    fn missing_frame_count_is_none() {
        let out = "width=640\nheight=360\nr_frame_rate=25/1\nnb_frames=N/A\n";
        let info = parse_probe_output(out).unwrap();
        assert_eq!(info.nb_frames, None);
        assert_eq!(info.fps, 25.0);
    }

    #[test]
    fn zero_denominator_rate_is_zero() {
        assert_eq!(parse_rate("0/0").unwrap(), 0.0);
    }

    #[test]
    fn incomplete_probe_output_is_rejected() {
        assert!(parse_probe_output("width=640\n").is_err());
    }

    #[test]
    fn seek_start_lands_between_neighbouring_frames() {
        for fps in [24.0, 25.0, 30.0, 30000.0 / 1001.0, 60.0, 60000.0 / 1001.0, 120.0] {
            for n in 1..2000u32 {
                let start: f64 = seek_start_arg(n, fps).parse().unwrap();
                let pts = n as f64 / fps;
                let previous_pts = (n - 1) as f64 / fps;
                assert!(start <= pts, "fps {fps} frame {n}: start {start} after pts {pts}");
                assert!(
                    start > previous_pts,
                    "fps {fps} frame {n}: start {start} admits previous frame at {previous_pts}"
                );
            }
        }
    }

    #[test]
    fn open_missing_file_fails() {
        assert!(VideoDecoder::open(Path::new("/nonexistent/video.mp4")).is_err());
    }
}
