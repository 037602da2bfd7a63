//! The canonical pixel buffer every codec path starts or ends at.

use alloc::string::ToString;
use alloc::vec;
use alloc::vec::Vec;

use rgb::Rgba;

use crate::error::{PixelDataError, SizeError};

/// Row-major RGBA8 image. Always holds exactly `width * height` pixels.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    pixels: Vec<Rgba<u8>>,
}

impl PixelBuffer {
    /// Wraps `pixels`, which must hold exactly `width * height` entries.
    pub fn new(width: u32, height: u32, pixels: Vec<Rgba<u8>>) -> Result<Self, SizeError> {
        let expected = area(width, height);
        if pixels.len() != expected {
            return Err(SizeError::PixelCountMismatch {
                expected,
                found: pixels.len(),
            });
        }
        Ok(PixelBuffer { width, height, pixels })
    }

    /// A buffer of one repeated color.
    pub fn filled(width: u32, height: u32, px: Rgba<u8>) -> Self {
        PixelBuffer {
            width,
            height,
            pixels: vec![px; area(width, height)],
        }
    }

    /// A fully transparent black buffer.
    pub fn transparent(width: u32, height: u32) -> Self {
        Self::filled(width, height, Rgba::new(0, 0, 0, 0))
    }

    /// Takes up to `width * height` pixels, padding a short sequence with
    /// transparent black.
    pub fn from_padded(
        width: u32,
        height: u32,
        pixels: impl IntoIterator<Item = Rgba<u8>>,
    ) -> Self {
        let n = area(width, height);
        let mut buf: Vec<Rgba<u8>> = pixels.into_iter().take(n).collect();
        buf.resize(n, Rgba::new(0, 0, 0, 0));
        PixelBuffer {
            width,
            height,
            pixels: buf,
        }
    }

    /// Reads tightly packed R, G, B, A bytes.
    pub fn from_rgba_bytes(width: u32, height: u32, bytes: &[u8]) -> Result<Self, SizeError> {
        let pixels: &[Rgba<u8>] =
            bytemuck::try_cast_slice(bytes).map_err(|_| SizeError::NotPixelAligned(bytes.len()))?;
        Self::new(width, height, pixels.to_vec())
    }

    /// Parses comma- or whitespace-separated hex bytes (`0xff` or `ff`) as
    /// RGBA quadruples, then pads or truncates to the geometry.
    pub fn from_hex_text(width: u32, height: u32, text: &str) -> Result<Self, PixelDataError> {
        let mut values = Vec::new();
        for token in text.split(|c: char| c == ',' || c.is_whitespace()) {
            if token.is_empty() {
                continue;
            }
            let digits = token
                .strip_prefix("0x")
                .or_else(|| token.strip_prefix("0X"))
                .unwrap_or(token);
            let v = u8::from_str_radix(digits, 16)
                .map_err(|_| PixelDataError::BadToken(token.to_string()))?;
            values.push(v);
        }
        if values.len() % 4 != 0 {
            return Err(PixelDataError::NotRgba(values.len()));
        }
        if values.len() / 4 != area(width, height) {
            log::debug!(
                "hex data holds {} pixels for a {width}x{height} image; padding/truncating",
                values.len() / 4
            );
        }
        let pixels = values.chunks_exact(4).map(|c| Rgba::new(c[0], c[1], c[2], c[3]));
        Ok(Self::from_padded(width, height, pixels))
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn pixels(&self) -> &[Rgba<u8>] {
        &self.pixels
    }

    #[inline]
    pub fn pixels_mut(&mut self) -> &mut [Rgba<u8>] {
        &mut self.pixels
    }

    pub fn into_pixels(self) -> Vec<Rgba<u8>> {
        self.pixels
    }

    /// The pixels as R, G, B, A bytes.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.pixels.as_slice())
    }

    pub fn get(&self, x: u32, y: u32) -> Option<Rgba<u8>> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(y as usize * self.width as usize + x as usize).copied()
    }

    /// Row slices, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[Rgba<u8>]> {
        self.pixels.chunks_exact(self.width.max(1) as usize)
    }

    pub(crate) fn rows_mut(&mut self) -> impl Iterator<Item = &mut [Rgba<u8>]> {
        self.pixels.chunks_exact_mut(self.width.max(1) as usize)
    }

    /// True when every pixel has alpha 0. Usually means the wrong color
    /// format was chosen for decoding.
    pub fn is_fully_transparent(&self) -> bool {
        self.pixels.iter().all(|p| p.a == 0)
    }
}

#[inline]
fn area(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_checks_pixel_count() {
        assert!(PixelBuffer::new(2, 2, vec![Rgba::new(0, 0, 0, 0); 4]).is_ok());
        assert_eq!(
            PixelBuffer::new(2, 2, vec![Rgba::new(0, 0, 0, 0); 3]),
            Err(SizeError::PixelCountMismatch { expected: 4, found: 3 })
        );
    }

    #[test]
    fn padded_ingestion() {
        let short = PixelBuffer::from_padded(2, 2, [Rgba::new(1, 2, 3, 4)]);
        assert_eq!(short.pixels().len(), 4);
        assert_eq!(short.get(1, 1), Some(Rgba::new(0, 0, 0, 0)));
        let long = PixelBuffer::from_padded(1, 1, vec![Rgba::new(9, 9, 9, 9); 5]);
        assert_eq!(long.pixels(), &[Rgba::new(9, 9, 9, 9)]);
    }

    #[test]
    fn hex_text() {
        let img = PixelBuffer::from_hex_text(2, 1, "0xff,0x00,0x00,0xff, 00 ff 00 80").unwrap();
        assert_eq!(img.pixels(), &[Rgba::new(255, 0, 0, 255), Rgba::new(0, 255, 0, 128)]);
        assert_eq!(
            PixelBuffer::from_hex_text(1, 1, "0xff,0x00,0x00"),
            Err(PixelDataError::NotRgba(3))
        );
        assert_eq!(
            PixelBuffer::from_hex_text(1, 1, "0xff,0xzz,0,0"),
            Err(PixelDataError::BadToken("0xzz".into()))
        );
    }

    #[test]
    fn rgba_bytes_view() {
        let img = PixelBuffer::from_rgba_bytes(1, 2, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        assert_eq!(img.get(0, 1), Some(Rgba::new(5, 6, 7, 8)));
        assert_eq!(img.as_bytes(), &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(
            PixelBuffer::from_rgba_bytes(1, 1, &[1, 2, 3]),
            Err(SizeError::NotPixelAligned(3))
        );
    }

    #[test]
    fn transparency_check() {
        assert!(PixelBuffer::transparent(3, 3).is_fully_transparent());
        let mut img = PixelBuffer::transparent(3, 3);
        img.pixels_mut()[4].a = 1;
        assert!(!img.is_fully_transparent());
        assert_eq!(PixelBuffer::transparent(0, 4).rows().count(), 0);
    }
}
