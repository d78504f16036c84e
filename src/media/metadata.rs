//! Asset loading from ffmpeg stream metadata.

use std::path::Path;
use std::process::Command;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::ToolsConfig;
use crate::error::{EditorError, Result};
use crate::geometry::{AffineTransform, Size};
use crate::media::{MediaAsset, MediaTrack};
use crate::time::Rational;

#[derive(Debug, Deserialize)]
struct MetadataReport {
    format: ContainerInfo,
    #[serde(default)]
    streams: Vec<StreamInfo>,
}

#[derive(Debug, Deserialize)]
struct ContainerInfo {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamInfo {
    index: u32,
    codec_type: String,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    time_base: Option<String>,
    duration_ts: Option<i64>,
    #[serde(default)]
    tags: StreamTags,
    #[serde(default)]
    side_data_list: Vec<SideData>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamTags {
    rotate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SideData {
    rotation: Option<f64>,
}

/// Read a media file's metadata and build its read-only asset handle
pub fn load_asset(path: &Path, tools: &ToolsConfig) -> Result<MediaAsset> {
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} does not exist", path.display()),
        )
        .into());
    }

    let output = Command::new(&tools.ffprobe)
        .args(["-v", "error", "-print_format", "json", "-show_format", "-show_streams"])
        .arg(path)
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                EditorError::ToolNotFound { tool: tools.ffprobe.display().to_string() }
            } else {
                EditorError::Io(e)
            }
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(EditorError::decode(format!(
            "ffprobe could not read {}: {}",
            path.display(),
            stderr.trim()
        )));
    }

    parse_metadata_json(path, &output.stdout)
}

fn parse_metadata_json(path: &Path, json: &[u8]) -> Result<MediaAsset> {
    let report: MetadataReport = serde_json::from_slice(json)
        .map_err(|e| EditorError::decode(format!("invalid ffprobe output: {}", e)))?;

    let mut tracks = Vec::new();
    let mut longest_stream = Rational::ZERO;

    for stream in report.streams {
        if let Some(duration) = stream_duration(&stream) {
            longest_stream = longest_stream.max(duration);
        }

        match stream.codec_type.as_str() {
            "video" => {
                let natural_size = Size::new(
                    stream.width.unwrap_or(0) as f64,
                    stream.height.unwrap_or(0) as f64,
                );
                let mut track = MediaTrack::video(stream.index, natural_size)
                    .with_transform(orientation(&stream));
                if let Some(rate) = stream.r_frame_rate.as_deref().and_then(parse_ratio) {
                    if rate.is_positive() {
                        track = track.with_frame_rate(rate);
                    }
                }
                tracks.push(track);
            }
            "audio" => tracks.push(MediaTrack::audio(stream.index)),
            other => debug!("Ignoring {} stream #{}", other, stream.index),
        }
    }

    // Container duration first: it is what players and trimmers show
    let duration = report
        .format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<Rational>().ok())
        .unwrap_or_else(|| {
            warn!("No container duration for {}, using longest stream", path.display());
            longest_stream
        });

    debug!(
        "Loaded {}: duration {} ({:.3}s), {} tracks",
        path.display(),
        duration,
        duration.as_seconds_f64(),
        tracks.len()
    );

    Ok(MediaAsset::new(path, duration, tracks))
}

fn stream_duration(stream: &StreamInfo) -> Option<Rational> {
    let ticks = stream.duration_ts?;
    let time_base = parse_ratio(stream.time_base.as_deref()?)?;
    Some(Rational::from_integer(ticks) * time_base)
}

fn parse_ratio(text: &str) -> Option<Rational> {
    let (num, den) = text.split_once('/')?;
    let num: i64 = num.trim().parse().ok()?;
    let den: i64 = den.trim().parse().ok()?;
    (den != 0).then(|| Rational::new(num, den))
}

/// Display rotation from the display matrix side data or the legacy `rotate` tag
fn orientation(stream: &StreamInfo) -> AffineTransform {
    let degrees = stream
        .side_data_list
        .iter()
        .find_map(|sd| sd.rotation)
        .or_else(|| stream.tags.rotate.as_deref().and_then(|r| r.trim().parse::<f64>().ok()))
        .unwrap_or(0.0);

    if degrees == 0.0 {
        return AffineTransform::IDENTITY;
    }

    // Snap quarter turns so render sizes come out exact
    let quarter_turns = (degrees / 90.0).round();
    if (degrees - quarter_turns * 90.0).abs() < 1e-6 {
        match (quarter_turns as i64).rem_euclid(4) {
            0 => AffineTransform::IDENTITY,
            1 => AffineTransform { a: 0.0, b: 1.0, c: -1.0, d: 0.0, tx: 0.0, ty: 0.0 },
            2 => AffineTransform { a: -1.0, b: 0.0, c: 0.0, d: -1.0, tx: 0.0, ty: 0.0 },
            _ => AffineTransform { a: 0.0, b: -1.0, c: 1.0, d: 0.0, tx: 0.0, ty: 0.0 },
        }
    } else {
        AffineTransform::rotation(degrees.to_radians())
    }
}
