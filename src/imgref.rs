//! Whole-image conversions between [`PixelBuffer`] and [`imgref`] types.
//!
//! Strided sources are copied row by row, so the padding of an `ImgRef`
//! never reaches the codec.
//!
//! ```rust
//! use rgb::Rgba;
//! use ::imgref::ImgVec;
//! use lvpack::{PixelBuffer, imgref};
//!
//! let img = ImgVec::new(vec![Rgba::new(255u8, 0, 128, 200); 4], 2, 2);
//! let buf: PixelBuffer = imgref::from_imgref(img.as_ref()).unwrap();
//! let back: ImgVec<Rgba<u8>> = buf.into();
//! assert_eq!(back.buf()[3], Rgba::new(255, 0, 128, 200));
//! ```

use alloc::vec::Vec;

use imgref::{ImgRef, ImgVec};
use rgb::{Bgra, Rgba};

use crate::error::SizeError;
use crate::pixel::PixelBuffer;
use crate::swizzle;

fn dims(width: usize, height: usize) -> Result<(u32, u32), SizeError> {
    match (u32::try_from(width), u32::try_from(height)) {
        (Ok(w), Ok(h)) => Ok((w, h)),
        _ => Err(SizeError::TooLarge { width, height }),
    }
}

// ---------------------------------------------------------------------------
// Into the codec
// ---------------------------------------------------------------------------

/// Copies `img` into a tightly packed [`PixelBuffer`].
pub fn from_imgref(img: ImgRef<'_, Rgba<u8>>) -> Result<PixelBuffer, SizeError> {
    let (w, h) = dims(img.width(), img.height())?;
    let mut pixels = Vec::with_capacity(img.width() * img.height());
    for row in img.rows() {
        pixels.extend_from_slice(row);
    }
    PixelBuffer::new(w, h, pixels)
}

/// Copies a BGRA image, swapping B and R on the way.
pub fn from_bgra_imgref(img: ImgRef<'_, Bgra<u8>>) -> Result<PixelBuffer, SizeError> {
    let (w, h) = dims(img.width(), img.height())?;
    let mut out = PixelBuffer::transparent(w, h);
    for (src, dst) in img.rows().zip(out.rows_mut()) {
        swizzle::copy_swap_br(bytemuck::cast_slice(src), bytemuck::cast_slice_mut(dst));
    }
    Ok(out)
}

impl TryFrom<ImgRef<'_, Rgba<u8>>> for PixelBuffer {
    type Error = SizeError;

    fn try_from(img: ImgRef<'_, Rgba<u8>>) -> Result<Self, SizeError> {
        from_imgref(img)
    }
}

// ---------------------------------------------------------------------------
// Out of the codec
// ---------------------------------------------------------------------------

impl From<PixelBuffer> for ImgVec<Rgba<u8>> {
    fn from(buf: PixelBuffer) -> Self {
        let (w, h) = (buf.width() as usize, buf.height() as usize);
        ImgVec::new_stride(buf.into_pixels(), w, h, w.max(1))
    }
}

impl PixelBuffer {
    /// Borrows the pixels as an unpadded image.
    pub fn as_imgref(&self) -> ImgRef<'_, Rgba<u8>> {
        let w = self.width() as usize;
        ImgRef::new_stride(self.pixels(), w, self.height() as usize, w.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn strided_source_drops_padding() {
        let a = Rgba::new(1u8, 2, 3, 4);
        let pad = Rgba::new(9u8, 9, 9, 9);
        // 2x2 with one padding pixel per row.
        let img = ImgVec::new_stride(vec![a, a, pad, a, a, pad], 2, 2, 3);
        let buf = from_imgref(img.as_ref()).unwrap();
        assert_eq!(buf.pixels(), &[a; 4]);
        assert_eq!(PixelBuffer::try_from(img.as_ref()).unwrap(), buf);
    }

    #[test]
    fn bgra_source_is_swapped() {
        let img = ImgVec::new(vec![Bgra { b: 3u8, g: 2, r: 1, a: 4 }; 2], 1, 2);
        let buf = from_bgra_imgref(img.as_ref()).unwrap();
        assert_eq!(buf.pixels(), &[Rgba::new(1, 2, 3, 4); 2]);
    }

    #[test]
    fn back_to_imgvec() {
        let buf = PixelBuffer::filled(3, 2, Rgba::new(5, 6, 7, 8));
        let view = buf.as_imgref();
        assert_eq!((view.width(), view.height()), (3, 2));
        assert_eq!(view.rows().count(), 2);

        let img: ImgVec<Rgba<u8>> = buf.clone().into();
        assert_eq!(img.width(), 3);
        assert_eq!(img.height(), 2);
        assert_eq!(from_imgref(img.as_ref()).unwrap(), buf);
    }
}
