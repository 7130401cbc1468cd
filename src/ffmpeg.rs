//! Helpers for driving the `ffmpeg` / `ffprobe` command line tools.
//!
//! Video frames cross the process boundary as raw packed `rgb24`, so one frame
//! is always exactly `width * height * 3` bytes.

use crate::error::{KeyError, Result};
use std::io::Read;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

/// Frame rate assumed when the container does not report one
pub const DEFAULT_FPS: f64 = 30.0;

/// Stream properties reported by ffprobe
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

impl VideoInfo {
    pub fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

/// Check whether `binary` can be launched
pub fn command_exists(binary: &str) -> bool {
    Command::new(binary)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Probe the first video stream of `path`
pub fn probe(path: &Path) -> Result<VideoInfo> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,r_frame_rate",
            "-of",
            "csv=p=0:s=x",
        ])
        .arg(path)
        .output()
        .map_err(|e| KeyError::codec(format!("Failed to start ffprobe: {}", e)))?;

    if !output.status.success() {
        return Err(KeyError::codec(format!(
            "No decoder for this video file: {}",
            path.display()
        )));
    }

    let raw = String::from_utf8_lossy(&output.stdout);
    parse_probe_line(raw.lines().next().unwrap_or_default()).ok_or_else(|| {
        KeyError::codec(format!("No video stream found in {}", path.display()))
    })
}

/// Parse `WIDTHxHEIGHTxNUM/DEN` as printed by ffprobe
fn parse_probe_line(line: &str) -> Option<VideoInfo> {
    let mut parts = line.trim().split('x');
    let width = parts.next()?.parse::<u32>().ok()?;
    let height = parts.next()?.parse::<u32>().ok()?;
    if width == 0 || height == 0 {
        return None;
    }

    let fps = parts
        .next()
        .and_then(parse_rational)
        .filter(|fps| fps.is_finite() && *fps > 0.0)
        .unwrap_or(DEFAULT_FPS);

    Some(VideoInfo { width, height, fps })
}

fn parse_rational(value: &str) -> Option<f64> {
    match value.split_once('/') {
        Some((num, den)) => {
            let num = num.parse::<f64>().ok()?;
            let den = den.parse::<f64>().ok()?;
            (den != 0.0).then(|| num / den)
        }
        None => value.parse::<f64>().ok(),
    }
}

/// Arguments decoding `path` to raw rgb24 on stdout
pub fn decode_args(path: &Path) -> Vec<String> {
    vec![
        "-v".into(),
        "error".into(),
        "-nostdin".into(),
        // Keep the probed (coded) geometry; rotation metadata would swap it
        "-noautorotate".into(),
        "-i".into(),
        path.display().to_string(),
        "-an".into(),
        "-f".into(),
        "rawvideo".into(),
        "-pix_fmt".into(),
        "rgb24".into(),
        "-".into(),
    ]
}

/// Arguments encoding raw rgb24 from stdin into `path`
pub fn encode_args(path: &Path, width: u32, height: u32, fps: f64) -> Vec<String> {
    vec![
        "-y".into(),
        "-v".into(),
        "error".into(),
        "-f".into(),
        "rawvideo".into(),
        "-pix_fmt".into(),
        "rgb24".into(),
        "-s".into(),
        format!("{}x{}", width, height),
        "-r".into(),
        format!("{}", fps),
        "-i".into(),
        "-".into(),
        "-an".into(),
        // yuv420p needs even dimensions
        "-vf".into(),
        "pad=ceil(iw/2)*2:ceil(ih/2)*2".into(),
        "-c:v".into(),
        "mpeg4".into(),
        "-q:v".into(),
        "2".into(),
        "-pix_fmt".into(),
        "yuv420p".into(),
        path.display().to_string(),
    ]
}

/// Read one full frame into `buf`
///
/// Returns `Ok(false)` on a clean end of stream. A stream that ends in the
/// middle of a frame is also treated as exhausted; the partial frame is dropped.
pub fn read_frame<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    if filled > 0 && filled < buf.len() {
        tracing::warn!(
            "Dropping truncated frame ({} of {} bytes)",
            filled,
            buf.len()
        );
    }
    Ok(filled == buf.len())
}

/// Error out unless a finished ffmpeg process exited cleanly
pub fn check_exit(status: ExitStatus) -> std::io::Result<()> {
    if status.success() {
        Ok(())
    } else {
        Err(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("ffmpeg exited with {}", status),
        ))
    }
}
