//! Sequential frame extraction.
//!
//! Frames are decoded by an `ffmpeg` child process into packed RGB24 on its
//! stdout and sliced into [`Frame`]s one at a time. The reader is lazy,
//! forward-only and single pass; open a new one for another pass.

use std::io::{self, Read};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};
use std::thread::JoinHandle;

use tracing::{debug, warn};

use crate::config::ToolsConfig;
use crate::error::{EditorError, Result};
use crate::media::MediaAsset;
use crate::time::Rational;
use crate::video::Frame;

/// Default thumbnail position, clamped into short clips
pub const THUMBNAIL_TIME_SECS: i64 = 10;

/// Lazy iterator of fixed-size RGB24 frames read from any byte source
pub struct FrameReader<R> {
    source: R,
    width: u32,
    height: u32,
    frames_read: u64,
    finished: bool,
}

impl<R: Read> FrameReader<R> {
    pub fn new(source: R, width: u32, height: u32) -> Self {
        Self {
            source,
            width,
            height,
            frames_read: 0,
            finished: false,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }

    fn read_frame(&mut self) -> Result<Option<Frame>> {
        let len = self.frame_len();
        if len == 0 {
            return Err(EditorError::decode(format!(
                "invalid frame size {}x{}",
                self.width, self.height
            )));
        }

        let mut buffer = vec![0u8; len];
        let mut filled = 0;
        while filled < len {
            match self.source.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(EditorError::decode(e.to_string())),
            }
        }

        if filled == 0 {
            return Ok(None);
        }
        if filled < len {
            return Err(EditorError::decode(format!(
                "truncated frame {}: got {} of {} bytes",
                self.frames_read, filled, len
            )));
        }

        Frame::from_rgb_bytes(self.width, self.height, buffer)
            .map(Some)
            .ok_or_else(|| EditorError::decode("frame buffer size mismatch"))
    }
}

impl<R: Read> Iterator for FrameReader<R> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.read_frame() {
            Ok(Some(frame)) => {
                self.frames_read += 1;
                Some(Ok(frame))
            }
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

/// Stdout of a decoding `ffmpeg` process.
///
/// End of stream reports the process exit status: a failed decoder turns
/// into a read error carrying its stderr. Dropping the pipe early kills the
/// process.
pub struct DecoderPipe {
    child: Child,
    stdout: ChildStdout,
    stderr: Option<JoinHandle<String>>,
    exited: bool,
}

impl DecoderPipe {
    pub fn spawn(mut command: Command) -> Result<Self> {
        let program = command.get_program().to_string_lossy().into_owned();
        debug!("Spawning decoder: {:?}", command);

        let mut child = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == io::ErrorKind::NotFound {
                    EditorError::ToolNotFound { tool: program }
                } else {
                    EditorError::Io(e)
                }
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EditorError::decode("decoder stdout unavailable"))?;
        let stderr = child.stderr.take().map(|mut pipe| {
            std::thread::spawn(move || {
                let mut text = String::new();
                let _ = pipe.read_to_string(&mut text);
                text
            })
        });

        Ok(Self { child, stdout, stderr, exited: false })
    }

    fn finish(&mut self) -> io::Result<()> {
        self.exited = true;
        let status = self.child.wait()?;
        let stderr = self
            .stderr
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if status.success() {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::Other,
                format!("decoder exited with {}: {}", status, stderr.trim()),
            ))
        }
    }
}

impl Read for DecoderPipe {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.exited {
            return Ok(0);
        }
        let n = self.stdout.read(buf)?;
        if n == 0 {
            self.finish()?;
        }
        Ok(n)
    }
}

impl Drop for DecoderPipe {
    fn drop(&mut self) {
        if !self.exited {
            if let Err(e) = self.child.kill() {
                warn!("Failed to stop decoder process: {}", e);
            }
            let _ = self.child.wait();
        }
    }
}

/// Frame size the decoder emits: render size rounded to whole pixels
pub fn decoded_frame_size(asset: &MediaAsset) -> Result<(u32, u32)> {
    let size = asset.render_size()?;
    let width = size.width.round() as u32;
    let height = size.height.round() as u32;
    if width == 0 || height == 0 {
        return Err(EditorError::decode(format!(
            "video track of {} reports no frame size",
            asset.path().display()
        )));
    }
    Ok((width, height))
}

/// Build the `ffmpeg` command that decodes the first video stream of
/// `input` to raw RGB24 on stdout, orientation applied, no frame resampling.
pub fn decoder_command(tools: &ToolsConfig, input: &Path, start: Option<Rational>) -> Command {
    raw_decoder(tools, input, start, None)
}

/// Like [`decoder_command`] but resampled to a constant `frame_rate`, so
/// frame `n` is presented at `n / frame_rate` seconds even for
/// variable-frame-rate sources.
pub fn constant_rate_decoder_command(tools: &ToolsConfig, input: &Path, frame_rate: Rational) -> Command {
    raw_decoder(tools, input, None, Some(frame_rate))
}

fn raw_decoder(tools: &ToolsConfig, input: &Path, start: Option<Rational>, frame_rate: Option<Rational>) -> Command {
    let mut command = Command::new(&tools.ffmpeg);
    command.args(["-v", "error", "-nostdin"]);
    if let Some(start) = start.filter(|s| s.is_positive()) {
        command.arg("-ss").arg(format!("{:.6}", start.as_seconds_f64()));
    }
    command.arg("-i").arg(input).args(["-map", "0:v:0"]);
    match frame_rate {
        Some(rate) => command.args(["-fps_mode", "cfr", "-r"]).arg(rate.to_string()),
        None => command.args(["-fps_mode", "passthrough"]),
    };
    command.args(["-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"]);
    command
}

/// Open a lazy frame sequence over the asset's first video track
pub fn extract_frames(asset: &MediaAsset, tools: &ToolsConfig) -> Result<FrameReader<DecoderPipe>> {
    extract_frames_from(asset, Rational::ZERO, tools)
}

/// Same as [`extract_frames`], starting at `start`
pub fn extract_frames_from(
    asset: &MediaAsset,
    start: Rational,
    tools: &ToolsConfig,
) -> Result<FrameReader<DecoderPipe>> {
    asset.video_track()?;
    let (width, height) = decoded_frame_size(asset)?;
    let pipe = DecoderPipe::spawn(decoder_command(tools, asset.path(), Some(start)))?;
    Ok(FrameReader::new(pipe, width, height))
}

/// Decode every frame into memory
pub fn collect_frames(asset: &MediaAsset, tools: &ToolsConfig) -> Result<Vec<Frame>> {
    extract_frames(asset, tools)?.collect()
}

/// Where a thumbnail is taken: 10 s in, or mid-clip for shorter assets
pub fn thumbnail_time(asset: &MediaAsset) -> Rational {
    let preferred = Rational::from_integer(THUMBNAIL_TIME_SECS);
    if preferred < asset.duration() {
        preferred
    } else {
        (asset.duration() / Rational::from_integer(2)).max(Rational::ZERO)
    }
}

/// Single oriented frame at `at` (see [`thumbnail_time`])
pub fn thumbnail(asset: &MediaAsset, at: Rational, tools: &ToolsConfig) -> Result<Frame> {
    let mut frames = extract_frames_from(asset, at, tools)?;
    match frames.next() {
        Some(frame) => frame,
        None => Err(EditorError::decode(format!(
            "no frame decoded at {:.3}s of {}",
            at.as_seconds_f64(),
            asset.path().display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size;
    use crate::media::MediaTrack;
    use std::io::Cursor;

    fn raw_frames(count: u8, width: u32, height: u32) -> Vec<u8> {
        (0..count)
            .flat_map(|i| vec![i; (width * height * 3) as usize])
            .collect()
    }

    fn args(command: &Command) -> Vec<String> {
        command.get_args().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn test_decoder_keeps_source_timing_by_default() {
        let args = args(&decoder_command(&ToolsConfig::default(), Path::new("in.mov"), None));
        assert!(args.windows(2).any(|w| w[0] == "-fps_mode" && w[1] == "passthrough"));
        assert!(!args.iter().any(|a| a == "-r"));
    }

    #[test]
    fn test_constant_rate_decoder_resamples() {
        let command = constant_rate_decoder_command(
            &ToolsConfig::default(),
            Path::new("in.mov"),
            Rational::new(30000, 1001),
        );
        let args = args(&command);
        assert!(args.windows(2).any(|w| w[0] == "-fps_mode" && w[1] == "cfr"));
        assert!(args.windows(2).any(|w| w[0] == "-r" && w[1] == "30000/1001"));
        assert_eq!(args.last().map(String::as_str), Some("pipe:1"));
    }

    #[test]
    fn test_reads_frames_in_order_then_ends() {
        let reader = FrameReader::new(Cursor::new(raw_frames(3, 4, 2)), 4, 2);
        let frames: Vec<Frame> = reader.collect::<Result<_>>().unwrap();

        assert_eq!(frames.len(), 3);
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame.dimensions(), (4, 2));
            assert_eq!(frame.get_pixel(0, 0), [i as u8; 3]);
        }
    }

    #[test]
    fn test_truncated_stream_is_decode_error_and_fuses() {
        let mut bytes = raw_frames(1, 2, 2);
        bytes.extend_from_slice(&[1, 2, 3]);
        let mut reader = FrameReader::new(Cursor::new(bytes), 2, 2);

        assert!(reader.next().unwrap().is_ok());
        assert!(matches!(reader.next(), Some(Err(EditorError::Decode { .. }))));
        assert!(reader.next().is_none());
        assert_eq!(reader.frames_read(), 1);
    }

    #[test]
    fn test_empty_stream_yields_nothing() {
        let mut reader = FrameReader::new(Cursor::new(Vec::new()), 2, 2);
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_extract_without_video_track_fails_before_spawning() {
        let asset = MediaAsset::new("song.m4a", Rational::from_integer(3), vec![MediaTrack::audio(0)]);
        let tools = ToolsConfig {
            ffmpeg: "/nonexistent/ffmpeg".into(),
            ffprobe: "/nonexistent/ffprobe".into(),
        };
        assert!(matches!(extract_frames(&asset, &tools), Err(EditorError::NoVideoTrack { .. })));
    }

    #[test]
    fn test_thumbnail_time_clamps_into_short_clips() {
        let long = MediaAsset::new("a.mp4", Rational::from_integer(30), vec![MediaTrack::video(0, Size::new(2.0, 2.0))]);
        let short = MediaAsset::new("b.mp4", Rational::from_integer(4), vec![MediaTrack::video(0, Size::new(2.0, 2.0))]);
        assert_eq!(thumbnail_time(&long), Rational::from_integer(10));
        assert_eq!(thumbnail_time(&short), Rational::from_integer(2));
    }
}
