use crate::error::{EvaluationError, MetricResult};

fn column_height(pixels: usize) -> MetricResult<u32> {
    u32::try_from(pixels).map_err(|_| EvaluationError::ColumnTooTall { pixels })
}

/// Row-major 2-D array of packed label pixel values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelImage {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl LabelImage {
    /// Wraps a row-major pixel buffer.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluationError::PixelCountMismatch`] when the buffer length
    /// differs from `width * height`.
    pub fn new(width: u32, height: u32, pixels: Vec<u32>) -> MetricResult<Self> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(EvaluationError::PixelCountMismatch {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Builds an image by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> u32) -> Self {
        let pixels = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| f(x, y))
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Single-column image, the layout used by hand-written fixtures.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluationError::ColumnTooTall`] when the buffer is longer
    /// than `u32::MAX`.
    pub fn column(pixels: Vec<u32>) -> MetricResult<Self> {
        let height = column_height(pixels.len())?;
        Ok(Self {
            width: 1,
            height,
            pixels,
        })
    }

    pub const fn width(&self) -> u32 {
        self.width
    }

    pub const fn height(&self) -> u32 {
        self.height
    }

    pub const fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixel_count(&self) -> usize {
        self.pixels.len()
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// Packed value at `(x, y)`, `None` outside the image.
    pub fn get(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// Iterator over the rows of the image.
    pub fn rows(&self) -> impl Iterator<Item = &[u32]> {
        self.pixels.chunks(self.width.max(1) as usize)
    }

    /// Checks that `other` has the same dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluationError::DimensionMismatch`] when the sizes differ.
    pub fn ensure_same_dimensions(&self, other: &Self) -> MetricResult<()> {
        if self.dimensions() != other.dimensions() {
            return Err(EvaluationError::DimensionMismatch {
                gt_width: self.width,
                gt_height: self.height,
                prediction_width: other.width,
                prediction_height: other.height,
            });
        }
        Ok(())
    }
}
