//! Values carried over connections between nodes.

/// An RGB pixel with components in `0.0..=255.0`.
pub type Rgb = [f32; 3];

/// A block of pixels laid out row-major over `num_rows` rows.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    pixels: Vec<Rgb>,
    num_rows: usize,
}

impl PixelBuffer {
    /// Creates a black buffer of `num_pixels` pixels on `num_rows` rows.
    ///
    /// A row count of zero is treated as one row.
    pub fn new(num_pixels: usize, num_rows: usize) -> Self {
        Self {
            pixels: vec![[0.0; 3]; num_pixels],
            num_rows: num_rows.max(1),
        }
    }

    /// Creates a buffer with every pixel set to `color`.
    pub fn filled(num_pixels: usize, num_rows: usize, color: Rgb) -> Self {
        Self {
            pixels: vec![color; num_pixels],
            num_rows: num_rows.max(1),
        }
    }

    pub fn from_pixels(pixels: Vec<Rgb>, num_rows: usize) -> Self {
        Self {
            pixels,
            num_rows: num_rows.max(1),
        }
    }

    pub fn num_pixels(&self) -> usize {
        self.pixels.len()
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_cols(&self) -> usize {
        self.pixels.len() / self.num_rows
    }

    /// `(rows, cols)` of the panel this buffer describes.
    pub fn shape(&self) -> (usize, usize) {
        (self.num_rows, self.num_cols())
    }

    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [Rgb] {
        &mut self.pixels
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&Rgb> {
        if row >= self.num_rows {
            return None;
        }
        let cols = self.num_cols();
        if col >= cols {
            return None;
        }
        self.pixels.get(row * cols + col)
    }

    /// Multiplies every component by `factor`, clamping to the valid range.
    pub fn scale(&mut self, factor: f32) {
        for px in &mut self.pixels {
            for c in px.iter_mut() {
                *c = (*c * factor).clamp(0.0, 255.0);
            }
        }
    }

    pub fn fill(&mut self, color: Rgb) {
        self.pixels.fill(color);
    }
}

/// A block of mono audio samples.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// The value held in a node's input or output slot for one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Pixels(PixelBuffer),
    Audio(AudioBuffer),
}

impl Signal {
    pub fn as_pixels(&self) -> Option<&PixelBuffer> {
        match self {
            Signal::Pixels(buf) => Some(buf),
            Signal::Audio(_) => None,
        }
    }

    pub fn as_audio(&self) -> Option<&AudioBuffer> {
        match self {
            Signal::Audio(buf) => Some(buf),
            Signal::Pixels(_) => None,
        }
    }

    pub fn into_pixels(self) -> Option<PixelBuffer> {
        match self {
            Signal::Pixels(buf) => Some(buf),
            Signal::Audio(_) => None,
        }
    }
}

impl From<PixelBuffer> for Signal {
    fn from(buf: PixelBuffer) -> Self {
        Signal::Pixels(buf)
    }
}

impl From<AudioBuffer> for Signal {
    fn from(buf: AudioBuffer) -> Self {
        Signal::Audio(buf)
    }
}
