use image::{ImageBuffer, Rgb, RgbImage};

/// Represents a single decoded video frame
///
/// A thin wrapper around an RGB image buffer; filters and the frame
/// pipeline work on this type.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    buffer: RgbImage,
}

impl Frame {
    /// Create a new frame from an RGB image buffer
    pub fn new(buffer: RgbImage) -> Self {
        Self { buffer }
    }

    /// Create a new frame with the given dimensions filled with the specified color
    pub fn new_filled(width: u32, height: u32, color: [u8; 3]) -> Self {
        let buffer = ImageBuffer::from_fn(width, height, |_, _| Rgb(color));
        Self { buffer }
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.buffer.dimensions()
    }

    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 3] {
        self.buffer.get_pixel(x, y).0
    }

    pub fn as_image(&self) -> &RgbImage {
        &self.buffer
    }

    /// Packed RGB24 bytes, row-major, as an encoder expects on stdin
    pub fn as_rgb_bytes(&self) -> &[u8] {
        self.buffer.as_raw()
    }

    /// Create a frame from raw RGB bytes; `None` if the length does not match
    pub fn from_rgb_bytes(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        ImageBuffer::from_raw(width, height, data).map(|buffer| Self { buffer })
    }

    /// Save the frame as a PNG file
    pub fn save_png<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), image::ImageError> {
        self.buffer.save_with_format(path, image::ImageFormat::Png)
    }
}

impl From<RgbImage> for Frame {
    fn from(buffer: RgbImage) -> Self {
        Self::new(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_bytes_roundtrip_checks_length() {
        let frame = Frame::new_filled(3, 2, [10, 20, 30]);
        let bytes = frame.as_rgb_bytes().to_vec();
        assert_eq!(bytes.len(), 18);
        assert_eq!(Frame::from_rgb_bytes(3, 2, bytes.clone()), Some(frame));
        assert!(Frame::from_rgb_bytes(4, 2, bytes).is_none());
    }
}
