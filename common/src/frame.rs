/// Pixel layout of a frame buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// Packed 8-bit RGB, 3 bytes per pixel.
    Rgb8,
    /// 8-bit luminance, 1 byte per pixel.
    Luma8,
}

impl PixelFormat {
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Rgb8 => 3,
            PixelFormat::Luma8 => 1,
        }
    }
}

/// One captured camera image.
///
/// Row-major, tightly packed: `data.len() == width * height * format.channels()`.
/// The buffer is never mutated after construction.
#[derive(Debug, Clone)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    format: PixelFormat,
    /// Capture sequence number assigned by the source.
    seq: u64,
}

impl Frame {
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        format: PixelFormat,
        seq: u64,
    ) -> Result<Self, FrameError> {
        let expected = width as usize * height as usize * format.channels();
        if data.len() != expected {
            return Err(FrameError::SizeMismatch {
                got: data.len(),
                expected,
                width,
                height,
            });
        }
        Ok(Self {
            data,
            width,
            height,
            format,
            seq,
        })
    }

    /// Create an RGB frame (what the camera produces).
    pub fn rgb(data: Vec<u8>, width: u32, height: u32, seq: u64) -> Result<Self, FrameError> {
        Self::new(data, width, height, PixelFormat::Rgb8, seq)
    }

    /// Create a single-channel luminance frame.
    pub fn luma(data: Vec<u8>, width: u32, height: u32, seq: u64) -> Result<Self, FrameError> {
        Self::new(data, width, height, PixelFormat::Luma8, seq)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame buffer is {got} bytes, expected {expected} for {width}x{height}")]
    SizeMismatch {
        got: usize,
        expected: usize,
        width: u32,
        height: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_frame_accepts_exact_size() {
        let frame = Frame::rgb(vec![0; 4 * 2 * 3], 4, 2, 7).unwrap();
        assert_eq!(frame.width(), 4);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.format(), PixelFormat::Rgb8);
        assert_eq!(frame.seq(), 7);
    }

    #[test]
    fn luma_frame_rejects_short_buffer() {
        let err = Frame::luma(vec![0; 5], 3, 2, 0).unwrap_err();
        assert!(matches!(
            err,
            FrameError::SizeMismatch {
                got: 5,
                expected: 6,
                ..
            }
        ));
    }

    #[test]
    fn rgb_buffer_is_not_a_luma_frame() {
        assert!(Frame::luma(vec![0; 12], 2, 2, 0).is_err());
    }
}
