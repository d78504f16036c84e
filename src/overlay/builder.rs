use tracing::debug;

use crate::config::OverlayConfig;
use crate::error::{EditorError, Result};
use crate::geometry::{AffineTransform, Rect, Size};
use crate::overlay::{
    OpacityAnimation, OverlayStyle, OverlayTransform, RenderTree, TextLayer, VideoLayer,
};
use crate::time::{Rational, TimeRange, DEFAULT_TIMESCALE};

/// Everything the editor hands over for a text overlay
#[derive(Debug, Clone, PartialEq)]
pub struct TextOverlayRequest {
    pub text: String,
    pub style: OverlayStyle,
    /// Text box in UI (view) space, y pointing down
    pub frame: Rect,
    /// On-screen player bounds when the overlay was authored; `None` means
    /// the view matched the video size
    pub container_size: Option<Size>,
    pub transform: OverlayTransform,
    pub start: Rational,
    pub end: Rational,
}

/// Maps a UI-space overlay into render space and anchors it in time
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayLayerBuilder {
    zero_start_bias: Rational,
    zero_start_window: Rational,
    frame_rate: u32,
}

impl OverlayLayerBuilder {
    pub fn new(config: &OverlayConfig, frame_rate: u32) -> Self {
        Self {
            zero_start_bias: Rational::from_seconds(config.zero_start_bias, DEFAULT_TIMESCALE),
            zero_start_window: Rational::from_seconds(config.zero_start_window, DEFAULT_TIMESCALE),
            frame_rate,
        }
    }

    /// View-to-render scale factors `(x, y)`
    pub fn coordinate_ratios(render_size: Size, container_size: Size) -> (f64, f64) {
        (
            render_size.width / container_size.width,
            render_size.height / container_size.height,
        )
    }

    /// Map a top-down UI-space rect into bottom-up render space
    pub fn map_rect(frame: Rect, container_size: Size, render_size: Size) -> Rect {
        let (x_ratio, y_ratio) = Self::coordinate_ratios(render_size, container_size);
        Rect::new(
            frame.origin.x * x_ratio,
            (container_size.height - frame.origin.y - frame.size.height) * y_ratio,
            frame.size.width * x_ratio,
            frame.size.height * y_ratio,
        )
    }

    /// Gesture state as a render-space matrix: translate (ratio-scaled,
    /// y negated for the flipped axis), then scale, then rotate.
    pub fn render_transform(transform: &OverlayTransform, x_ratio: f64, y_ratio: f64) -> AffineTransform {
        AffineTransform::IDENTITY
            .translated_by(transform.translation.x * x_ratio, -transform.translation.y * y_ratio)
            .scaled_by(transform.scale, transform.scale)
            .rotated_by(transform.rotation)
    }

    /// Fade from opaque to transparent across `[start, end)`.
    ///
    /// Windows starting within the zero-start window get their begin time
    /// pushed forward by the bias. The fade keeps the window's length, so it
    /// then ends at `end + bias`.
    pub fn opacity_animation(&self, start: Rational, end: Rational) -> Result<OpacityAnimation> {
        let window = TimeRange::from_start_end(start, end)?;
        if window.is_empty() || start.is_negative() {
            return Err(EditorError::invalid_range(format!(
                "overlay window {} must be non-empty and start at or after zero",
                window
            )));
        }

        let begin = if start < self.zero_start_window {
            start + self.zero_start_bias
        } else {
            start
        };
        Ok(OpacityAnimation::fade_out(begin, window.duration()))
    }

    /// Build the render tree for `request` over a video of `render_size`
    pub fn build(&self, render_size: Size, request: &TextOverlayRequest) -> Result<RenderTree> {
        if render_size.is_empty() {
            return Err(EditorError::invalid_range("video render size is empty"));
        }
        let container = request
            .container_size
            .filter(|size| !size.is_empty())
            .unwrap_or(render_size);

        let (x_ratio, y_ratio) = Self::coordinate_ratios(render_size, container);
        let frame = Self::map_rect(request.frame, container, render_size);
        let transform = Self::render_transform(&request.transform, x_ratio, y_ratio);
        let opacity = self.opacity_animation(request.start, request.end)?;

        debug!(
            "Overlay \"{}\": view {:?} -> render {:?}, ratios ({:.3}, {:.3}), fade {} + {}",
            request.text, request.frame, frame, x_ratio, y_ratio, opacity.begin, opacity.duration
        );

        Ok(RenderTree {
            size: render_size,
            frame_rate: self.frame_rate,
            video_layer: VideoLayer { frame: Rect::from_size(render_size) },
            text_layer: TextLayer {
                content: request.text.clone(),
                style: request.style.clone(),
                frame,
                transform,
                opacity,
            },
        })
    }
}

impl Default for OverlayLayerBuilder {
    fn default() -> Self {
        Self::new(&OverlayConfig::default(), 30)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn request(frame: Rect, container: Size) -> TextOverlayRequest {
        TextOverlayRequest {
            text: "Hello".to_string(),
            style: OverlayStyle::default(),
            frame,
            container_size: Some(container),
            transform: OverlayTransform::IDENTITY,
            start: Rational::from_integer(2),
            end: Rational::from_integer(5),
        }
    }

    #[test]
    fn test_top_of_view_maps_to_bottom_up_origin() {
        let view = Size::new(1920.0, 1080.0);
        let mapped = OverlayLayerBuilder::map_rect(Rect::new(100.0, 0.0, 300.0, 120.0), view, view);
        assert_eq!(mapped.origin.y, view.height - 120.0);
        assert_eq!(mapped.origin.x, 100.0);
        assert_eq!(mapped.size, Size::new(300.0, 120.0));
    }

    #[test]
    fn test_mapping_scales_with_ratios() {
        let render = Size::new(1920.0, 1080.0);
        let view = Size::new(480.0, 270.0);
        let mapped = OverlayLayerBuilder::map_rect(Rect::new(10.0, 20.0, 100.0, 50.0), view, render);
        assert_eq!(mapped, Rect::new(40.0, 800.0, 400.0, 200.0));
    }

    #[test]
    fn test_mapping_is_scale_covariant() {
        let render = Size::new(1280.0, 720.0);
        let small = OverlayLayerBuilder::map_rect(
            Rect::new(40.0, 30.0, 200.0, 60.0),
            Size::new(640.0, 360.0),
            render,
        );
        let large = OverlayLayerBuilder::map_rect(
            Rect::new(80.0, 60.0, 400.0, 120.0),
            Size::new(1280.0, 720.0),
            render,
        );
        let halved_frame_doubled_view = OverlayLayerBuilder::map_rect(
            Rect::new(20.0, 15.0, 100.0, 30.0),
            Size::new(320.0, 180.0),
            render,
        );
        assert_eq!(small, large);
        assert_eq!(small, halved_frame_doubled_view);
    }

    #[test]
    fn test_transform_order_translate_scale_rotate() {
        let transform = OverlayTransform::new(Point::new(10.0, 20.0), 2.0, std::f64::consts::FRAC_PI_2);
        let matrix = OverlayLayerBuilder::render_transform(&transform, 2.0, 3.0);

        // Translation is ratio-scaled with y negated, and not affected by scale
        assert!(approx(matrix.tx, 20.0));
        assert!(approx(matrix.ty, -60.0));
        assert!(approx(matrix.scale_factor(), 2.0));
        assert!(approx(matrix.rotation_angle(), std::f64::consts::FRAC_PI_2));

        // A point on the x axis rotates onto y, then scales
        let p = matrix.apply(Point::new(1.0, 0.0));
        assert!(approx(p.x, 20.0));
        assert!(approx(p.y, -58.0));
    }

    #[test]
    fn test_zero_start_bias() {
        let builder = OverlayLayerBuilder::default();
        let bias = Rational::new(1, 10);

        let early = builder.opacity_animation(Rational::ZERO, Rational::from_integer(3)).unwrap();
        assert_eq!(early.begin, bias);
        assert_eq!(early.duration, Rational::from_integer(3));
        assert_eq!(early.end(), Rational::from_integer(3) + bias);

        let near = builder.opacity_animation(Rational::new(1, 2), Rational::from_integer(3)).unwrap();
        assert_eq!(near.begin, Rational::new(1, 2) + bias);

        let later = builder.opacity_animation(Rational::from_integer(1), Rational::from_integer(3)).unwrap();
        assert_eq!(later.begin, Rational::from_integer(1));
        assert_eq!(later.end(), Rational::from_integer(3));
    }

    #[test]
    fn test_bias_can_be_disabled() {
        let config = OverlayConfig { zero_start_bias: 0.0, ..OverlayConfig::default() };
        let builder = OverlayLayerBuilder::new(&config, 30);
        let fade = builder.opacity_animation(Rational::ZERO, Rational::ONE).unwrap();
        assert_eq!(fade.begin, Rational::ZERO);
    }

    #[test]
    fn test_inverted_window_is_rejected() {
        let builder = OverlayLayerBuilder::default();
        let err = builder.opacity_animation(Rational::from_integer(4), Rational::from_integer(2));
        assert!(matches!(err, Err(EditorError::InvalidRange { .. })));
        assert!(builder.opacity_animation(Rational::ONE, Rational::ONE).is_err());
    }

    #[test]
    fn test_build_render_tree() {
        let builder = OverlayLayerBuilder::default();
        let render = Size::new(1080.0, 1920.0);
        let tree = builder
            .build(render, &request(Rect::new(0.0, 0.0, 540.0, 96.0), Size::new(540.0, 960.0)))
            .unwrap();

        assert_eq!(tree.size, render);
        assert_eq!(tree.frame_rate, 30);
        assert_eq!(tree.video_layer.frame, Rect::from_size(render));
        assert_eq!(tree.text_layer.frame, Rect::new(0.0, 1728.0, 1080.0, 192.0));
        assert!(tree.text_layer.transform.is_identity());
        assert_eq!(tree.text_layer.opacity.begin, Rational::from_integer(2));
        assert_eq!(tree.text_layer.content, "Hello");
    }

    #[test]
    fn test_missing_container_uses_video_size() {
        let builder = OverlayLayerBuilder::default();
        let render = Size::new(640.0, 480.0);
        let mut req = request(Rect::new(10.0, 10.0, 100.0, 40.0), Size::default());
        req.container_size = None;
        let tree = builder.build(render, &req).unwrap();
        assert_eq!(tree.text_layer.frame, Rect::new(10.0, 430.0, 100.0, 40.0));
    }
}
