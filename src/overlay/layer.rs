use serde::{Deserialize, Serialize};

use crate::config::OverlayConfig;
use crate::geometry::{AffineTransform, Point, Rect, Size};
use crate::time::Rational;

/// Text appearance for an overlay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayStyle {
    pub font_family: String,
    /// Font size in render-space points
    pub font_size: f64,
    /// RGBA
    pub text_color: [u8; 4],
    /// RGBA box behind the text
    pub background_color: [u8; 4],
}

impl OverlayStyle {
    pub fn from_config(config: &OverlayConfig) -> Self {
        Self {
            font_family: config.font_family.clone(),
            font_size: config.font_size,
            text_color: config.text_color,
            background_color: config.background_color,
        }
    }

    pub fn with_text_color(mut self, color: [u8; 4]) -> Self {
        self.text_color = color;
        self
    }
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self::from_config(&OverlayConfig::default())
    }
}

/// Accumulated pan / pinch / rotate gesture state for an overlay.
///
/// Translation and rotation accumulate additively, scale multiplicatively.
/// Nothing is clamped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlayTransform {
    /// UI-space points, y pointing down
    pub translation: Point,
    pub scale: f64,
    /// Radians
    pub rotation: f64,
}

impl OverlayTransform {
    pub const IDENTITY: OverlayTransform = OverlayTransform {
        translation: Point { x: 0.0, y: 0.0 },
        scale: 1.0,
        rotation: 0.0,
    };

    pub fn new(translation: Point, scale: f64, rotation: f64) -> Self {
        Self { translation, scale, rotation }
    }

    /// Apply a pan delta
    pub fn translate_by(&mut self, dx: f64, dy: f64) {
        self.translation.x += dx;
        self.translation.y += dy;
    }

    /// Apply a pinch delta
    pub fn scale_by(&mut self, factor: f64) {
        self.scale *= factor;
    }

    /// Apply a rotation delta
    pub fn rotate_by(&mut self, radians: f64) {
        self.rotation += radians;
    }
}

impl Default for OverlayTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Linear opacity animation from `from` to `to` over `[begin, begin + duration)`.
///
/// The layer's resting opacity is zero, and the animation holds its final
/// value once finished, so the layer is invisible outside the window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpacityAnimation {
    pub begin: Rational,
    pub duration: Rational,
    pub from: f64,
    pub to: f64,
}

impl OpacityAnimation {
    /// Opaque-to-transparent fade across the window
    pub fn fade_out(begin: Rational, duration: Rational) -> Self {
        Self { begin, duration, from: 1.0, to: 0.0 }
    }

    pub fn end(&self) -> Rational {
        self.begin + self.duration
    }

    /// Layer opacity at timeline time `t`
    pub fn opacity_at(&self, t: Rational) -> f64 {
        if t < self.begin {
            return 0.0;
        }
        if t >= self.end() {
            return self.to;
        }
        let progress = ((t - self.begin) / self.duration).as_seconds_f64();
        self.from + (self.to - self.from) * progress
    }

    /// `(time, opacity)` pairs bounding the fade
    pub fn keyframes(&self) -> [(Rational, f64); 2] {
        [(self.begin, self.from), (self.end(), self.to)]
    }
}

/// The composited video, covering the whole render area
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoLayer {
    pub frame: Rect,
}

/// Text drawn over the video.
///
/// `frame` is in render space with a bottom-up y axis. `transform` applies
/// about the frame's centre.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayer {
    pub content: String,
    pub style: OverlayStyle,
    pub frame: Rect,
    pub transform: AffineTransform,
    pub opacity: OpacityAnimation,
}

impl TextLayer {
    /// Centre of the transformed layer, in bottom-up render space
    pub fn transformed_center(&self) -> Point {
        let center = self.frame.center();
        let offset = self.transform.translation();
        Point::new(center.x + offset.x, center.y + offset.y)
    }
}

/// Layer tree composited over the video during an overlay export
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTree {
    pub size: Size,
    /// Output frames per second while compositing
    pub frame_rate: u32,
    pub video_layer: VideoLayer,
    pub text_layer: TextLayer,
}
