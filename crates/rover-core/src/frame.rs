//! Camera frame types.
//!
//! A frame is an opaque byte buffer plus a pixel-format tag. The buffer is
//! owned by the camera subsystem and only borrowed for the duration of one
//! broadcast call - the broadcaster never retains a reference past that
//! call, so the producer can reclaim or reuse the buffer immediately after.

use serde::{Deserialize, Serialize};

/// Pixel format tag reported by the camera driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// JPEG-compressed frame. The only format served to stream clients.
    Jpeg,
    /// Raw RGB565, used by some sensors before the JPEG encoder is up.
    Rgb565,
    /// 8-bit grayscale.
    Grayscale,
    /// YUV 4:2:2.
    Yuv422,
}

impl PixelFormat {
    /// Whether the broadcaster will accept a frame in this format.
    pub fn is_streamable(self) -> bool {
        matches!(self, PixelFormat::Jpeg)
    }
}

/// One captured camera frame, lent out by the producer.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    /// Raw frame bytes.
    pub data: &'a [u8],
    /// Pixel format the bytes are encoded in.
    pub format: PixelFormat,
}

impl<'a> Frame<'a> {
    /// Wrap a borrowed buffer as a frame.
    pub fn new(data: &'a [u8], format: PixelFormat) -> Self {
        Self { data, format }
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the frame carries no payload.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether this frame is JPEG-tagged and may be broadcast.
    pub fn is_jpeg(&self) -> bool {
        self.format == PixelFormat::Jpeg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn jpeg_frames_are_streamable() {
        let frame = Frame::new(&[0xFF, 0xD8, 0xFF, 0xD9], PixelFormat::Jpeg);
        assert!(frame.is_jpeg());
        assert_eq!(frame.len(), 4);
    }

    #[test]
    fn non_jpeg_formats_are_not_streamable() {
        assert!(!PixelFormat::Rgb565.is_streamable());
        assert!(!PixelFormat::Grayscale.is_streamable());
        assert!(!PixelFormat::Yuv422.is_streamable());
        assert!(PixelFormat::Jpeg.is_streamable());
    }
}
