//! Canonical in-memory image: 8-bit straight RGBA, row-major, origin top-left.

/// Number of samples per pixel (R, G, B, A).
pub const CHANNELS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    #[error("buffer length {actual} does not match {width}x{height}x4 = {expected}")]
    LengthMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

/// A width × height array of RGBA samples.
///
/// Invariant: `data.len() == width * height * 4`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Fully transparent black buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; byte_len(width, height)],
        }
    }

    /// Buffer with every pixel set to `pixel`.
    pub fn filled(width: u32, height: u32, pixel: [u8; 4]) -> Self {
        let data = pixel
            .iter()
            .copied()
            .cycle()
            .take(byte_len(width, height))
            .collect();
        Self {
            width,
            height,
            data,
        }
    }

    /// Wrap raw RGBA bytes, checking the length invariant.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self, BufferError> {
        let expected = byte_len(width, height);
        if data.len() != expected {
            return Err(BufferError::LengthMismatch {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// True for zero-area buffers.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Sample at (x, y), or `None` outside the buffer.
    pub fn get(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.offset(x, y);
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    /// Overwrite the sample at (x, y).
    ///
    /// # Panics
    ///
    /// Panics if (x, y) lies outside the buffer.
    pub fn set(&mut self, x: u32, y: u32, pixel: [u8; 4]) {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x}, {y}) out of bounds for {}x{} buffer",
            self.width,
            self.height
        );
        let i = self.offset(x, y);
        self.data[i..i + CHANNELS].copy_from_slice(&pixel);
    }

    /// Raw bytes of row `y`.
    pub fn row(&self, y: u32) -> &[u8] {
        let stride = self.stride();
        let start = y as usize * stride;
        &self.data[start..start + stride]
    }

    /// Iterate pixels in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = [u8; 4]> + '_ {
        self.data
            .chunks_exact(CHANNELS)
            .map(|p| [p[0], p[1], p[2], p[3]])
    }

    pub(crate) fn stride(&self) -> usize {
        self.width as usize * CHANNELS
    }

    pub(crate) fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * CHANNELS
    }
}

fn byte_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * CHANNELS
}
