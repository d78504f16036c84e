//! Renderer that drives the external `ffmpeg` tool.
//!
//! Compositions are expressed as a `filter_complex` (trim, re-time, fill gaps,
//! concatenate). Overlays add a generated text layer composited over the
//! video. Per-frame filters decode raw frames, run the callback in process and
//! pipe the results into an encoder.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::composition::{Composition, TrackItem};
use crate::config::{ExportConfig, ToolsConfig};
use crate::error::{EditorError, Result};
use crate::export::{is_cancelled, CancellationToken, Container, ExportSource, RenderJob, Renderer};
use crate::filters::FrameProcessor;
use crate::media::{load_asset, MediaAsset, TrackKind};
use crate::overlay::RenderTree;
use crate::time::Rational;
use crate::video::frames::{constant_rate_decoder_command, decoded_frame_size};
use crate::video::{DecoderPipe, FrameReader};

/// Frame rate used for generated video when the source reports none
pub const DEFAULT_FRAME_RATE: i64 = 30;
pub const AUDIO_SAMPLE_RATE: u32 = 48_000;
const AUDIO_BITRATE: &str = "256k";
const POLL_INTERVAL: Duration = Duration::from_millis(100);
const STDERR_TAIL_LINES: usize = 6;

/// Seconds with microsecond precision, as ffmpeg options expect
fn secs(t: Rational) -> String {
    format!("{:.6}", t.as_seconds_f64())
}

fn even(value: f64) -> u32 {
    let rounded = value.round().max(2.0) as u32;
    rounded - rounded % 2
}

/// `0xRRGGBB@alpha`
pub fn ffmpeg_color(rgba: [u8; 4]) -> String {
    format!(
        "0x{:02X}{:02X}{:02X}@{:.3}",
        rgba[0],
        rgba[1],
        rgba[2],
        rgba[3] as f64 / 255.0
    )
}

/// Quote a value for use inside a filtergraph option
fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

/// Split a playback speed into `atempo` stages, each within 0.5..=2.0
pub fn atempo_chain(speed: f64) -> Vec<f64> {
    let mut stages = Vec::new();
    if !(speed.is_finite() && speed > 0.0) {
        return stages;
    }
    let mut remaining = speed;
    while remaining > 2.0 {
        stages.push(2.0);
        remaining /= 2.0;
    }
    while remaining < 0.5 {
        stages.push(0.5);
        remaining /= 0.5;
    }
    if (remaining - 1.0).abs() > 1e-9 {
        stages.push(remaining);
    }
    stages
}

/// Inputs plus filter chains feeding one video and one optional audio output
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterGraph {
    pub inputs: Vec<PathBuf>,
    pub chains: Vec<String>,
    /// `-map` target for video: a `[label]` or an input stream specifier
    pub video: Option<String>,
    pub audio: Option<String>,
}

impl FilterGraph {
    fn input_index(&mut self, path: &Path) -> usize {
        match self.inputs.iter().position(|p| p == path) {
            Some(index) => index,
            None => {
                self.inputs.push(path.to_path_buf());
                self.inputs.len() - 1
            }
        }
    }

    /// Pass an asset's first video and audio streams straight through
    pub fn for_asset(asset: &MediaAsset) -> Result<Self> {
        let video = asset.video_track()?;
        let mut graph = FilterGraph::default();
        let input = graph.input_index(asset.path());
        graph.video = Some(format!("{}:{}", input, video.index));
        graph.audio = asset
            .first_track(TrackKind::Audio)
            .map(|audio| format!("{}:{}", input, audio.index));
        Ok(graph)
    }

    /// Express a composition's first video and audio tracks as trims,
    /// re-timings and gap fillers joined by `concat`.
    pub fn for_composition(composition: &Composition) -> Result<Self> {
        let video_track = composition
            .first_track(TrackKind::Video)
            .ok_or_else(|| EditorError::export_failed("composition has no video track"))?;
        let size = composition
            .render_size()
            .ok_or_else(|| EditorError::export_failed("composition video track is empty"))?;
        let (width, height) = (even(size.width), even(size.height));

        let frame_rate = video_track
            .segments()
            .iter()
            .find_map(|s| s.source.track(s.source_track).and_then(|t| t.frame_rate))
            .unwrap_or_else(|| Rational::from_integer(DEFAULT_FRAME_RATE));

        let mut graph = FilterGraph::default();
        let mut labels = String::new();
        let mut count = 0;
        for (i, item) in video_track.timeline().into_iter().enumerate() {
            let label = format!("[v{}]", i);
            let chain = match item {
                TrackItem::Segment(segment) => {
                    let input = graph.input_index(segment.source.path());
                    let stretch = segment
                        .target
                        .duration()
                        .checked_div(segment.source_range.duration())
                        .unwrap_or(Rational::ONE);
                    format!(
                        "[{}:{}]trim=start={}:end={},setpts=(PTS-STARTPTS)*{},scale={}:{},setsar=1,format=yuv420p{}",
                        input,
                        segment.source_track,
                        secs(segment.source_range.start()),
                        secs(segment.source_range.end()),
                        stretch,
                        width,
                        height,
                        label
                    )
                }
                TrackItem::Gap(gap) => format!(
                    "color=c=black:s={}x{}:r={}:d={},setsar=1,format=yuv420p{}",
                    width,
                    height,
                    frame_rate,
                    secs(gap.duration()),
                    label
                ),
            };
            graph.chains.push(chain);
            labels.push_str(&label);
            count += 1;
        }
        graph.chains.push(format!("{}concat=n={}:v=1:a=0[vcomp]", labels, count));
        graph.video = Some("[vcomp]".to_string());

        if let Some(audio_track) = composition.first_track(TrackKind::Audio) {
            let audio_format = format!(
                "aformat=sample_fmts=fltp:sample_rates={}:channel_layouts=stereo",
                AUDIO_SAMPLE_RATE
            );
            let mut labels = String::new();
            let mut count = 0;
            for (i, item) in audio_track.timeline().into_iter().enumerate() {
                let label = format!("[a{}]", i);
                let chain = match item {
                    TrackItem::Segment(segment) => {
                        let input = graph.input_index(segment.source.path());
                        let mut filters = vec![
                            format!(
                                "atrim=start={}:end={}",
                                secs(segment.source_range.start()),
                                secs(segment.source_range.end())
                            ),
                            "asetpts=PTS-STARTPTS".to_string(),
                        ];
                        filters.extend(
                            atempo_chain(segment.speed().as_seconds_f64())
                                .into_iter()
                                .map(|tempo| format!("atempo={:.6}", tempo)),
                        );
                        filters.push(audio_format.clone());
                        format!("[{}:{}]{}{}", input, segment.source_track, filters.join(","), label)
                    }
                    TrackItem::Gap(gap) => format!(
                        "anullsrc=r={}:cl=stereo,atrim=duration={},{}{}",
                        AUDIO_SAMPLE_RATE,
                        secs(gap.duration()),
                        audio_format,
                        label
                    ),
                };
                graph.chains.push(chain);
                labels.push_str(&label);
                count += 1;
            }
            graph.chains.push(format!("{}concat=n={}:v=0:a=1[acomp]", labels, count));
            graph.audio = Some("[acomp]".to_string());
        }

        Ok(graph)
    }

    /// Composite the render tree's text layer over the current video output.
    ///
    /// Render space is bottom-up; ffmpeg's is top-down, so the layer centre
    /// is flipped here. A positive render-space rotation is counter-clockwise,
    /// which `rotate` expresses as a negative angle.
    pub fn add_overlay(&mut self, tree: &RenderTree, textfile: &Path, duration: Rational) -> Result<()> {
        let base = match self.video.take() {
            Some(label) if label.starts_with('[') => label,
            Some(stream) => format!("[{}]", stream),
            None => return Err(EditorError::export_failed("no video to draw the overlay on")),
        };

        let layer = &tree.text_layer;
        let (width, height) = (even(layer.frame.size.width), even(layer.frame.size.height));
        let scale = layer.transform.scale_factor();
        let (scaled_w, scaled_h) = (even(width as f64 * scale), even(height as f64 * scale));
        let angle = -layer.transform.rotation_angle();
        let center = layer.transformed_center();
        let center_y = tree.size.height - center.y;
        let begin = secs(layer.opacity.begin);
        let end = secs(layer.opacity.end());

        self.chains.push(format!(
            "color=c={}:s={}x{}:r={}:d={},format=rgba,\
             drawtext=textfile={}:expansion=none:font={}:fontsize={}:fontcolor={}:x=(w-text_w)/2:y=0,\
             scale={}:{},rotate={:.6}:ow=rotw({:.6}):oh=roth({:.6}):c=none,\
             fade=t=out:st={}:d={}:alpha=1[txt]",
            ffmpeg_color(layer.style.background_color),
            width,
            height,
            tree.frame_rate,
            secs(duration),
            quote(&textfile.to_string_lossy()),
            quote(&layer.style.font_family),
            layer.style.font_size,
            ffmpeg_color(layer.style.text_color),
            scaled_w,
            scaled_h,
            angle,
            angle,
            angle,
            begin,
            secs(layer.opacity.duration),
        ));
        self.chains.push(format!("{}fps={},format=yuv420p[base]", base, tree.frame_rate));
        self.chains.push(format!(
            "[base][txt]overlay=x={:.3}-overlay_w/2:y={:.3}-overlay_h/2:enable='between(t,{},{})':eof_action=pass,format=yuv420p[vover]",
            center.x, center_y, begin, end
        ));
        self.video = Some("[vover]".to_string());
        Ok(())
    }

    pub fn filter_complex(&self) -> Option<String> {
        (!self.chains.is_empty()).then(|| self.chains.join(";"))
    }

    /// `-map` arguments; plain stream audio is mapped optionally
    fn map_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(video) = &self.video {
            args.extend(["-map".to_string(), video.clone()]);
        }
        if let Some(audio) = &self.audio {
            let target = if audio.starts_with('[') { audio.clone() } else { format!("{}?", audio) };
            args.extend(["-map".to_string(), target]);
        }
        args
    }
}

/// A running `ffmpeg` process whose stderr is collected in the background.
/// Dropping it before it exits kills the process.
struct FfmpegProcess {
    child: Child,
    stderr: Option<JoinHandle<String>>,
    exited: bool,
}

impl FfmpegProcess {
    fn spawn(mut command: Command, stdin: Stdio) -> Result<Self> {
        let program = command.get_program().to_string_lossy().into_owned();
        debug!("Running {:?}", command);

        let mut child = command
            .stdin(stdin)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == io::ErrorKind::NotFound {
                    EditorError::ToolNotFound { tool: program }
                } else {
                    EditorError::Io(e)
                }
            })?;

        let stderr = child.stderr.take().map(|mut pipe| {
            std::thread::spawn(move || {
                let mut text = String::new();
                let _ = pipe.read_to_string(&mut text);
                text
            })
        });

        Ok(Self { child, stderr, exited: false })
    }

    fn take_stdin(&mut self) -> Option<ChildStdin> {
        self.child.stdin.take()
    }

    fn stderr_text(&mut self) -> String {
        self.stderr
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default()
    }

    fn kill(&mut self) {
        if !self.exited {
            if let Err(e) = self.child.kill() {
                warn!("Failed to stop ffmpeg: {}", e);
            }
            let _ = self.child.wait();
            self.exited = true;
        }
    }

    fn failure(&mut self, status: Option<ExitStatus>) -> EditorError {
        let stderr = self.stderr_text();
        let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
        if lines.is_empty() {
            if let Some(status) = status {
                debug!("ffmpeg exited with {} and no diagnostics", status);
            }
            return EditorError::export_failed_unknown();
        }
        let tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n");
        EditorError::export_failed(tail)
    }

    /// Wait for exit, killing the process if `cancel` is set meanwhile
    fn wait(mut self, cancel: &CancellationToken) -> Result<()> {
        loop {
            if is_cancelled(cancel) {
                self.kill();
                return Err(EditorError::Cancelled);
            }
            if let Some(status) = self.child.try_wait()? {
                self.exited = true;
                if status.success() {
                    return Ok(());
                }
                return Err(self.failure(Some(status)));
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    /// Kill the process and return the error it reported, if any
    fn abort(mut self) -> EditorError {
        self.kill();
        self.failure(None)
    }
}

impl Drop for FfmpegProcess {
    fn drop(&mut self) {
        self.kill();
    }
}

/// Renders jobs with the `ffmpeg` command-line tool
pub struct FfmpegRenderer {
    tools: ToolsConfig,
    export: ExportConfig,
}

impl FfmpegRenderer {
    pub fn new(tools: ToolsConfig, export: ExportConfig) -> Self {
        Self { tools, export }
    }

    /// Video/audio encoder settings and the output, shared by every path
    fn encoder_args(&self, job: &RenderJob, audio: AudioMode) -> Vec<String> {
        let mut args = vec!["-c:v".to_string(), self.export.video_codec.clone()];
        if self.export.video_codec.starts_with("libx26") {
            args.extend([
                "-crf".to_string(),
                self.export.crf().to_string(),
                "-preset".to_string(),
                "slow".to_string(),
            ]);
        }
        args.extend([
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-threads".to_string(),
            self.export.encoder_threads.to_string(),
        ]);
        match audio {
            AudioMode::Encode => args.extend([
                "-c:a".to_string(),
                self.export.audio_codec.clone(),
                "-b:a".to_string(),
                AUDIO_BITRATE.to_string(),
            ]),
            AudioMode::Copy => args.extend(["-c:a".to_string(), "copy".to_string()]),
        }
        args.extend(["-f".to_string(), job.container.format_name().to_string()]);
        if job.fast_start {
            args.extend(["-movflags".to_string(), "+faststart".to_string()]);
        }
        args.push(job.output.to_string_lossy().into_owned());
        args
    }

    /// Full argument list for a job without a per-frame callback.
    ///
    /// Overlay text is written to `workdir` so it needs no escaping.
    pub fn build_args(&self, job: &RenderJob, workdir: &Path) -> Result<Vec<String>> {
        let (mut graph, duration) = match &job.source {
            ExportSource::Asset(asset) => (FilterGraph::for_asset(asset)?, asset.duration()),
            ExportSource::Composition(composition) => {
                (FilterGraph::for_composition(composition)?, composition.duration())
            }
        };

        if let Some(tree) = &job.render_tree {
            let textfile = workdir.join("overlay.txt");
            fs::write(&textfile, &tree.text_layer.content)?;
            graph.add_overlay(tree, &textfile, duration)?;
        }

        let mut args: Vec<String> = ["-v", "error", "-nostdin", "-y"].iter().map(|s| s.to_string()).collect();
        for input in &graph.inputs {
            args.push("-i".to_string());
            args.push(input.to_string_lossy().into_owned());
        }
        if let Some(filter) = graph.filter_complex() {
            args.extend(["-filter_complex".to_string(), filter]);
        }
        args.extend(graph.map_args());
        args.extend(self.encoder_args(job, AudioMode::Encode));
        Ok(args)
    }

    fn run(&self, args: Vec<String>, cancel: &CancellationToken) -> Result<()> {
        let mut command = Command::new(&self.tools.ffmpeg);
        command.args(&args);
        FfmpegProcess::spawn(command, Stdio::null())?.wait(cancel)
    }

    /// Decode, run `processor` on every frame, and re-encode with the
    /// source audio copied across.
    fn render_with_processor(
        &self,
        job: &RenderJob,
        processor: &dyn FrameProcessor,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let workdir = tempfile::tempdir()?;

        // Anything beyond a plain asset is composed into an intermediate first
        let source: MediaAsset = match (&job.source, &job.render_tree) {
            (ExportSource::Asset(asset), None) => asset.as_ref().clone(),
            _ => {
                let mut composed = job.clone();
                composed.frame_processor = None;
                composed.output = workdir.path().join("composed.mov");
                composed.container = Container::Mov;
                composed.fast_start = false;
                info!("   Composing intermediate for per-frame processing");
                self.run(self.build_args(&composed, workdir.path())?, cancel)?;
                load_asset(&composed.output, &self.tools)?
            }
        };

        let (width, height) = decoded_frame_size(&source)?;
        let frame_rate = source
            .video_track()?
            .frame_rate
            .unwrap_or_else(|| Rational::from_integer(DEFAULT_FRAME_RATE));

        // Decode at the same constant rate the encoder stamps, so video stays
        // aligned with the copied audio on variable-frame-rate sources
        let decoder = DecoderPipe::spawn(constant_rate_decoder_command(&self.tools, source.path(), frame_rate))?;
        let frames = FrameReader::new(decoder, width, height);

        let mut command = Command::new(&self.tools.ffmpeg);
        command
            .args(["-v", "error", "-y", "-f", "rawvideo", "-pix_fmt", "rgb24"])
            .arg("-s")
            .arg(format!("{}x{}", width, height))
            .arg("-r")
            .arg(frame_rate.to_string())
            .args(["-i", "pipe:0", "-i"])
            .arg(source.path())
            .args(["-map", "0:v:0", "-map", "1:a?"])
            .args(self.encoder_args(job, AudioMode::Copy));

        let mut encoder = FfmpegProcess::spawn(command, Stdio::piped())?;
        let mut stdin = encoder
            .take_stdin()
            .ok_or_else(|| EditorError::export_failed("encoder stdin unavailable"))?;

        info!("🎨 Applying {} to {}x{} frames", processor.label(), width, height);
        let mut written = 0u64;
        for frame in frames {
            if is_cancelled(cancel) {
                encoder.kill();
                return Err(EditorError::Cancelled);
            }
            let processed = processor.process(frame?)?;
            if processed.dimensions() != (width, height) {
                encoder.kill();
                return Err(EditorError::export_failed(format!(
                    "frame processor changed frame size from {}x{} to {}x{}",
                    width,
                    height,
                    processed.width(),
                    processed.height()
                )));
            }
            if let Err(e) = stdin.write_all(processed.as_rgb_bytes()) {
                debug!("Encoder stopped accepting frames: {}", e);
                drop(stdin);
                return Err(encoder.abort());
            }
            written += 1;
        }
        drop(stdin);

        if written == 0 {
            encoder.kill();
            return Err(EditorError::decode(format!("no frames decoded from {}", source.path().display())));
        }
        info!("   Encoded {} frames", written);
        encoder.wait(cancel)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AudioMode {
    Encode,
    Copy,
}

impl Renderer for FfmpegRenderer {
    fn render(&self, job: &RenderJob, cancel: &CancellationToken) -> Result<()> {
        info!("Rendering {} ({})", job.output.display(), job.container.format_name());
        match &job.frame_processor {
            Some(processor) => self.render_with_processor(job, processor.as_ref(), cancel),
            None => {
                let workdir = tempfile::tempdir()?;
                let args = self.build_args(job, workdir.path())?;
                self.run(args, cancel)
            }
        }
    }
}
