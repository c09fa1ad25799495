use std::fmt;

use crate::{
    color::Color,
    font::{Glyph, GLYPH_WIDTH},
};

/// Layout of a linear framebuffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Geometry {
    pub width: usize,
    pub height: usize,
    /// Bytes from the start of one row to the start of the next.
    pub stride: usize,
    pub bytes_per_pixel: usize,
}

impl Geometry {
    /// A tightly packed RGB565 layout, mostly useful for off-screen surfaces.
    pub fn packed(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            stride: width * 2,
            bytes_per_pixel: 2,
        }
    }

    /// Bytes needed to back every visible row. Saturates on layouts too
    /// large to address.
    pub fn visible_len(&self) -> usize {
        match self.height {
            0 => 0,
            height => (height - 1)
                .saturating_mul(self.stride)
                .saturating_add(self.row_len()),
        }
    }

    fn row_len(&self) -> usize {
        self.width.saturating_mul(self.bytes_per_pixel)
    }

    fn check(&self, buffer_len: usize) -> Result<(), LayoutError> {
        if !matches!(self.bytes_per_pixel, 2 | 4) {
            return Err(LayoutError::UnsupportedPixelSize(self.bytes_per_pixel));
        }
        if self.height > 1 && self.stride < self.row_len() {
            return Err(LayoutError::StrideTooShort {
                stride: self.stride,
                row: self.row_len(),
            });
        }
        let needed = self.visible_len();
        if buffer_len < needed || needed == usize::MAX {
            return Err(LayoutError::BufferTooShort {
                length: buffer_len,
                needed,
            });
        }
        Ok(())
    }

    fn offset(&self, x: i32, y: i32) -> Option<usize> {
        let x = usize::try_from(x).ok().filter(|&x| x < self.width)?;
        let y = usize::try_from(y).ok().filter(|&y| y < self.height)?;
        Some(y * self.stride + x * self.bytes_per_pixel)
    }
}

/// Bounds-checked drawing over any byte buffer laid out as `geometry`
/// describes. Every write is clipped to the visible area.
pub struct Surface<B> {
    buffer: B,
    geometry: Geometry,
}

/// A geometry that does not fit the buffer it is meant to describe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutError {
    /// Only 16 and 32 bit pixels can be drawn.
    UnsupportedPixelSize(usize),
    StrideTooShort { stride: usize, row: usize },
    BufferTooShort { length: usize, needed: usize },
}

impl Surface<Vec<u8>> {
    /// A zeroed, tightly packed RGB565 surface.
    pub fn in_memory(width: usize, height: usize) -> Self {
        let geometry = Geometry::packed(width, height);
        Self {
            buffer: vec![0; geometry.visible_len()],
            geometry,
        }
    }
}

impl<B> Surface<B>
where
    B: AsRef<[u8]> + AsMut<[u8]>,
{
    /// Fails unless `buffer` holds every visible row of `geometry`.
    pub fn new(buffer: B, geometry: Geometry) -> Result<Self, LayoutError> {
        geometry.check(buffer.as_ref().len())?;
        Ok(Self { buffer, geometry })
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn width(&self) -> usize {
        self.geometry.width
    }

    pub fn height(&self) -> usize {
        self.geometry.height
    }

    pub fn bytes(&self) -> &[u8] {
        self.buffer.as_ref()
    }

    /// The bytes backing the visible rows only.
    pub fn visible_bytes(&self) -> &[u8] {
        &self.buffer.as_ref()[..self.geometry.visible_len()]
    }

    pub fn set_pixel(&mut self, x: i32, y: i32, color: Color) {
        let Some(offset) = self.geometry.offset(x, y) else {
            return;
        };
        let bytes_per_pixel = self.geometry.bytes_per_pixel;
        let encoded = match bytes_per_pixel {
            2 => u32::from(color.0),
            _ => color.to_xrgb8888(),
        }
        .to_le_bytes();
        if let Some(pixel) = self
            .buffer
            .as_mut()
            .get_mut(offset..offset + bytes_per_pixel)
        {
            pixel.copy_from_slice(&encoded[..bytes_per_pixel]);
        }
    }

    pub fn get_pixel(&self, x: i32, y: i32) -> Option<Color> {
        let offset = self.geometry.offset(x, y)?;
        let pixel = self
            .buffer
            .as_ref()
            .get(offset..offset + self.geometry.bytes_per_pixel)?;
        match pixel {
            &[low, high] => Some(Color(u16::from_le_bytes([low, high]))),
            &[b, g, r, _] => Some(Color::new(r >> 3, g >> 2, b >> 3)),
            _ => None,
        }
    }

    /// Fills the half-open rectangle `[x, x + width) × [y, y + height)`.
    pub fn fill_rect(&mut self, x: i32, y: i32, width: i32, height: i32, color: Color) {
        let x_range = Self::clip(x, width, self.geometry.width);
        let y_range = Self::clip(y, height, self.geometry.height);
        for row in y_range {
            for column in x_range.clone() {
                self.set_pixel(column, row, color);
            }
        }
    }

    /// Draws the one pixel wide outline of the half-open rectangle
    /// `[x, x + width) × [y, y + height)`.
    pub fn draw_rect(&mut self, x: i32, y: i32, width: i32, height: i32, color: Color) {
        if width <= 0 || height <= 0 {
            return;
        }
        let right = x.saturating_add(width - 1);
        let bottom = y.saturating_add(height - 1);
        self.fill_rect(x, y, width, 1, color);
        self.fill_rect(x, bottom, width, 1, color);
        self.fill_rect(x, y.saturating_add(1), 1, height - 2, color);
        self.fill_rect(right, y.saturating_add(1), 1, height - 2, color);
    }

    /// Draws `text` left to right with a fixed advance of one glyph width.
    /// Only the set bits of each glyph are written.
    pub fn draw_text(&mut self, x: i32, y: i32, text: &str, color: Color) {
        for (index, character) in text.chars().enumerate() {
            let origin_x = x.saturating_add((index * GLYPH_WIDTH) as i32);
            let glyph = Glyph::lookup(character);
            for (column, row) in glyph.set_pixels() {
                self.set_pixel(
                    origin_x.saturating_add(column as i32),
                    y.saturating_add(row as i32),
                    color,
                );
            }
        }
    }

    pub fn clear(&mut self, color: Color) {
        let width = i32::try_from(self.geometry.width).unwrap_or(i32::MAX);
        let height = i32::try_from(self.geometry.height).unwrap_or(i32::MAX);
        self.fill_rect(0, 0, width, height, color);
    }

    fn clip(start: i32, length: i32, limit: usize) -> std::ops::Range<i32> {
        let limit = i32::try_from(limit).unwrap_or(i32::MAX);
        let end = start.saturating_add(length.max(0)).min(limit);
        start.max(0)..end.max(0)
    }
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutError::UnsupportedPixelSize(bytes) => {
                write!(f, "unsupported pixel size of {} bytes", bytes)
            }
            LayoutError::StrideTooShort { stride, row } => {
                write!(f, "stride of {} bytes is shorter than a {} byte row", stride, row)
            }
            LayoutError::BufferTooShort { length, needed } => {
                write!(f, "buffer of {} bytes cannot hold {} bytes of pixels", length, needed)
            }
        }
    }
}

impl std::error::Error for LayoutError {}
