//! 2D geometry shared by media orientation and overlay layout.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Size after `transform`, with absolute width and height
    pub fn applying(&self, transform: &AffineTransform) -> Size {
        let w = transform.a * self.width + transform.c * self.height;
        let h = transform.b * self.width + transform.d * self.height;
        Size::new(w.abs(), h.abs())
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    pub fn from_size(size: Size) -> Self {
        Self { origin: Point::default(), size }
    }

    pub fn center(&self) -> Point {
        Point::new(
            self.origin.x + self.size.width / 2.0,
            self.origin.y + self.size.height / 2.0,
        )
    }
}

/// 2x3 affine matrix in CoreGraphics convention:
/// `x' = a*x + c*y + tx`, `y' = b*x + d*y + ty`.
///
/// `translated_by`, `scaled_by` and `rotated_by` prepend the new operation,
/// so a chain applies to points from the last call back to the first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub tx: f64,
    pub ty: f64,
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl AffineTransform {
    pub const IDENTITY: AffineTransform = AffineTransform {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    /// Counter-clockwise rotation by `angle` radians (y-up space)
    pub fn rotation(angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self { a: cos, b: sin, c: -sin, d: cos, tx: 0.0, ty: 0.0 }
    }

    pub fn translated_by(&self, x: f64, y: f64) -> Self {
        Self {
            tx: self.a * x + self.c * y + self.tx,
            ty: self.b * x + self.d * y + self.ty,
            ..*self
        }
    }

    pub fn scaled_by(&self, sx: f64, sy: f64) -> Self {
        Self {
            a: self.a * sx,
            b: self.b * sx,
            c: self.c * sy,
            d: self.d * sy,
            ..*self
        }
    }

    pub fn rotated_by(&self, angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self {
            a: cos * self.a + sin * self.c,
            b: cos * self.b + sin * self.d,
            c: cos * self.c - sin * self.a,
            d: cos * self.d - sin * self.b,
            tx: self.tx,
            ty: self.ty,
        }
    }

    pub fn apply(&self, point: Point) -> Point {
        Point::new(
            self.a * point.x + self.c * point.y + self.tx,
            self.b * point.x + self.d * point.y + self.ty,
        )
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    pub fn translation(&self) -> Point {
        Point::new(self.tx, self.ty)
    }

    /// Uniform scale factor, assuming no shear
    pub fn scale_factor(&self) -> f64 {
        (self.a * self.a + self.b * self.b).sqrt()
    }

    /// Rotation angle in radians, assuming no shear
    pub fn rotation_angle(&self) -> f64 {
        self.b.atan2(self.a)
    }

    /// Whether the transform swaps width and height (quarter turn)
    pub fn is_quarter_turn(&self) -> bool {
        self.a.abs() < 1e-9 && self.d.abs() < 1e-9 && self.b.abs() > 0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_translate_scale_rotate_decomposes() {
        let t = AffineTransform::IDENTITY
            .translated_by(30.0, -20.0)
            .scaled_by(2.0, 2.0)
            .rotated_by(0.5);

        assert!(approx(t.tx, 30.0));
        assert!(approx(t.ty, -20.0));
        assert!(approx(t.scale_factor(), 2.0));
        assert!(approx(t.rotation_angle(), 0.5));
    }

    #[test]
    fn test_chain_applies_last_operation_first() {
        let t = AffineTransform::IDENTITY.translated_by(10.0, 0.0).scaled_by(2.0, 2.0);
        let p = t.apply(Point::new(1.0, 1.0));
        assert!(approx(p.x, 12.0));
        assert!(approx(p.y, 2.0));
    }

    #[test]
    fn test_size_applying_quarter_turn_swaps_dimensions() {
        let portrait = AffineTransform::rotation(std::f64::consts::FRAC_PI_2);
        let size = Size::new(1920.0, 1080.0).applying(&portrait);
        assert!(approx(size.width, 1080.0));
        assert!(approx(size.height, 1920.0));
        assert!(portrait.is_quarter_turn());
        assert!(!AffineTransform::IDENTITY.is_quarter_turn());
    }
}
