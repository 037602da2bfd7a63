//! Canonical RGBA to packed bytes.
//!
//! [`encode`] dispatches once per image on the format's [`Layout`]:
//! byte-aligned layouts convert row by row (whole-row byte shuffles where no
//! per-pixel policy applies), alpha-only and indexed layouts quantize to
//! values and hand them to the bit packer.

use alloc::vec;
use alloc::vec::Vec;

use crate::bits;
use crate::error::EncodeError;
use crate::format::direct::{self, PixelPolicy};
use crate::format::{BitDepth, ColorDepth, Layout, PixelFormat, SourceVersion};
use crate::palette::Palette;
use crate::pixel::PixelBuffer;
use crate::swizzle;

/// Packed pixel data of one format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedBuffer {
    pub format: PixelFormat,
    pub bytes: Vec<u8>,
    /// Bytes per row when larger than the format's minimal row.
    pub row_stride: Option<u32>,
}

impl PackedBuffer {
    pub fn new(format: PixelFormat, bytes: Vec<u8>) -> Self {
        PackedBuffer {
            format,
            bytes,
            row_stride: None,
        }
    }

    pub fn with_row_stride(mut self, row_stride: u32) -> Self {
        self.row_stride = Some(row_stride);
        self
    }

    /// Bytes per line when rendering this buffer as source text: one pixel
    /// row, or `None` when the width is unknown.
    pub fn row_len(&self, width: u32) -> Option<usize> {
        let min = self.format.min_row_bytes(width);
        if min == 0 {
            return None;
        }
        Some(self.row_stride.unwrap_or(min).max(min) as usize)
    }
}

/// Settings shared by every pixel of one [`encode`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Alpha at or above this is opaque where alpha folds to one bit.
    pub alpha_threshold: u8,
    /// Color word, in the destination bit depth, that marks transparency.
    pub chroma_key: Option<u32>,
    /// Emit RGB565 words byte-swapped, including depth-16 palette entries.
    pub swap16: bool,
    /// Byte order of 32-bit pixels.
    pub source_version: SourceVersion,
    /// Declared depth; sets the palette entry stride of indexed formats.
    pub color_depth: ColorDepth,
    pub row_stride: Option<u32>,
    /// Palette for indexed formats. Built from the image when absent.
    pub palette: Option<Palette>,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        EncodeOptions {
            alpha_threshold: 128,
            chroma_key: None,
            swap16: false,
            source_version: SourceVersion::default(),
            color_depth: ColorDepth::default(),
            row_stride: None,
            palette: None,
        }
    }
}

impl EncodeOptions {
    pub fn with_alpha_threshold(mut self, threshold: u8) -> Self {
        self.alpha_threshold = threshold;
        self
    }

    pub fn with_chroma_key(mut self, key: u32) -> Self {
        self.chroma_key = Some(key);
        self
    }

    pub fn with_swap16(mut self, swap16: bool) -> Self {
        self.swap16 = swap16;
        self
    }

    pub fn with_source_version(mut self, version: SourceVersion) -> Self {
        self.source_version = version;
        self
    }

    pub fn with_color_depth(mut self, depth: ColorDepth) -> Self {
        self.color_depth = depth;
        self
    }

    pub fn with_row_stride(mut self, stride: u32) -> Self {
        self.row_stride = Some(stride);
        self
    }

    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = Some(palette);
        self
    }

    fn policy(&self) -> PixelPolicy {
        PixelPolicy {
            alpha_threshold: self.alpha_threshold,
            chroma_key: self.chroma_key,
            bgra: self.source_version.is_bgra(),
        }
    }
}

/// Encodes `image` into `format`.
///
/// With `swap16` set, the RGB565 layouts are written in their swapped
/// variant and the returned buffer's format says so. An empty geometry
/// yields an empty buffer.
pub fn encode(
    image: &PixelBuffer,
    format: PixelFormat,
    options: &EncodeOptions,
) -> Result<PackedBuffer, EncodeError> {
    let format = if options.swap16 { format.swapped() } else { format };
    let (width, height) = (image.width(), image.height());
    let min_row = format.min_row_bytes(width);
    let stride = bits::check_stride(min_row, options.row_stride)?;

    let bytes = if width == 0 || height == 0 {
        Vec::new()
    } else {
        match format.layout() {
            Layout::Direct { bytes_per_pixel } => {
                encode_direct(image, format, bytes_per_pixel as usize, stride as usize, options)
            }
            Layout::Alpha(depth) => {
                let values: Vec<u8> = image
                    .pixels()
                    .iter()
                    .map(|px| quantize_alpha(px.a, depth, options.alpha_threshold))
                    .collect();
                bits::pack(&values, depth, width, height, Some(stride))?
            }
            Layout::Indexed(depth) => encode_indexed(image, depth, stride, options)?,
        }
    };

    Ok(PackedBuffer {
        format,
        bytes,
        row_stride: options.row_stride,
    })
}

fn encode_direct(
    image: &PixelBuffer,
    format: PixelFormat,
    bpp: usize,
    stride: usize,
    options: &EncodeOptions,
) -> Vec<u8> {
    let policy = options.policy();
    let min_row = image.width() as usize * bpp;
    let mut out = vec![0u8; stride * image.height() as usize];

    for (src, dst) in image.rows().zip(out.chunks_exact_mut(stride)) {
        let dst = &mut dst[..min_row];
        let opaque = src.iter().all(|px| px.a >= policy.alpha_threshold);
        let bytes: &[u8] = bytemuck::cast_slice(src);
        match format {
            PixelFormat::Argb8888 if policy.chroma_key.is_none() => {
                copy_32(bytes, dst, policy.bgra)
            }
            PixelFormat::Xrgb8888 if policy.chroma_key.is_none() && opaque => {
                copy_32(bytes, dst, policy.bgra);
                swizzle::fill_alpha(dst);
            }
            PixelFormat::Rgb888 if policy.chroma_key.is_none() && opaque => {
                swizzle::rgba_to_rgb(bytes, dst)
            }
            _ => {
                for (&px, cell) in src.iter().zip(dst.chunks_exact_mut(bpp)) {
                    direct::encode_pixel(format, px, &policy, cell);
                }
            }
        }
    }
    out
}

#[inline]
fn copy_32(src: &[u8], dst: &mut [u8], bgra: bool) {
    if bgra {
        swizzle::copy_swap_br(src, dst);
    } else {
        dst.copy_from_slice(src);
    }
}

/// Nearest code whose expansion (`code * 255 / mask`) is closest to `a`;
/// one bit is a hard cut at `threshold` instead.
pub(crate) fn quantize_alpha(a: u8, depth: BitDepth, threshold: u8) -> u8 {
    match depth {
        BitDepth::One => (a >= threshold) as u8,
        BitDepth::Two => ((a as u16 + 42) / 85) as u8,
        BitDepth::Four => ((a as u16 + 8) / 17) as u8,
        BitDepth::Eight => a,
    }
}

fn encode_indexed(
    image: &PixelBuffer,
    depth: BitDepth,
    stride: u32,
    options: &EncodeOptions,
) -> Result<Vec<u8>, EncodeError> {
    let palette = match &options.palette {
        Some(p) => {
            p.check_size(depth)?;
            p.clone()
        }
        None => Palette::build(image, depth),
    };
    let mut out = palette.to_bytes(options.color_depth, options.swap16);
    // Match against the entries as a decoder will read them back, which
    // differs from `palette` when the stride quantizes color.
    let stored = Palette::read_available(&out, depth, options.color_depth, options.swap16);
    let indices: Vec<u8> = image.pixels().iter().map(|&px| stored.nearest(px)).collect();
    out.extend(bits::pack(&indices, depth, image.width(), image.height(), Some(stride))?);
    Ok(out)
}

/// Value-level access for callers that already hold palette indices or
/// alpha codes: packs them without any color matching.
pub fn encode_values(
    values: &[u8],
    format: PixelFormat,
    width: u32,
    height: u32,
    palette: Option<&Palette>,
    options: &EncodeOptions,
) -> Result<PackedBuffer, EncodeError> {
    let depth = match format.layout() {
        Layout::Alpha(d) | Layout::Indexed(d) => d,
        Layout::Direct { bytes_per_pixel } => {
            return Err(EncodeError::InvalidBitDepth(bytes_per_pixel * 8));
        }
    };
    let mut bytes = Vec::new();
    if let (Layout::Indexed(_), Some(palette)) = (format.layout(), palette) {
        palette.check_size(depth)?;
        bytes = palette.to_bytes(options.color_depth, options.swap16);
    }
    bytes.extend(bits::pack(values, depth, width, height, options.row_stride)?);
    Ok(PackedBuffer {
        format,
        bytes,
        row_stride: options.row_stride,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rgb::Rgba;

    fn px(r: u8, g: u8, b: u8, a: u8) -> Rgba<u8> {
        Rgba::new(r, g, b, a)
    }

    #[test]
    fn rgb565_a8_scenario() {
        let img = PixelBuffer::new(
            2,
            2,
            vec![px(255, 0, 0, 255), px(0, 255, 0, 255), px(0, 0, 255, 255), px(0, 0, 0, 0)],
        )
        .unwrap();
        let packed = encode(&img, PixelFormat::Rgb565A8, &EncodeOptions::default()).unwrap();
        assert_eq!(
            packed.bytes,
            [0x00, 0xF8, 0xFF, 0xE0, 0x07, 0xFF, 0x1F, 0x00, 0xFF, 0x00, 0x00, 0x00]
        );
        assert_eq!(packed.format, PixelFormat::Rgb565A8);

        let opts = EncodeOptions::default().with_swap16(true);
        let swapped = encode(&img, PixelFormat::Rgb565A8, &opts).unwrap();
        assert_eq!(swapped.format, PixelFormat::Rgb565A8Swapped);
        assert_eq!(&swapped.bytes[..3], &[0xF8, 0x00, 0xFF]);
    }

    #[test]
    fn thirty_two_bit_source_versions() {
        let img = PixelBuffer::new(1, 1, vec![px(1, 2, 3, 4)]).unwrap();
        let v8 = encode(&img, PixelFormat::Argb8888, &EncodeOptions::default()).unwrap();
        assert_eq!(v8.bytes, [1, 2, 3, 4]);
        let v7 = EncodeOptions::default().with_source_version(SourceVersion::V7);
        assert_eq!(encode(&img, PixelFormat::Argb8888, &v7).unwrap().bytes, [3, 2, 1, 4]);
    }

    #[test]
    fn bulk_and_per_pixel_paths_agree() {
        let img = PixelBuffer::new(
            3,
            1,
            vec![px(10, 20, 30, 255), px(40, 50, 60, 255), px(70, 80, 90, 255)],
        )
        .unwrap();
        for version in [SourceVersion::V7, SourceVersion::V8] {
            let opts = EncodeOptions::default().with_source_version(version);
            for format in [PixelFormat::Rgb888, PixelFormat::Xrgb8888, PixelFormat::Argb8888] {
                let bulk = encode(&img, format, &opts).unwrap();
                let mut slow = vec![0u8; bulk.bytes.len()];
                let bpp = format.min_row_bytes(1) as usize;
                for (&p, cell) in img.pixels().iter().zip(slow.chunks_exact_mut(bpp)) {
                    direct::encode_pixel(format, p, &opts.policy(), cell);
                }
                assert_eq!(bulk.bytes, slow, "{format:?} {version:?}");
            }
        }
    }

    #[test]
    fn transparent_pixels_in_opaque_formats() {
        let img = PixelBuffer::new(2, 1, vec![px(9, 9, 9, 255), px(200, 100, 50, 0)]).unwrap();
        let out = encode(&img, PixelFormat::Xrgb8888, &EncodeOptions::default()).unwrap();
        assert_eq!(out.bytes, [9, 9, 9, 0xFF, 0, 0, 0, 0xFF]);
        let keyed = EncodeOptions::default().with_chroma_key(0xFF00FF);
        let out = encode(&img, PixelFormat::Rgb888, &keyed).unwrap();
        assert_eq!(out.bytes, [9, 9, 9, 0xFF, 0x00, 0xFF]);
    }

    #[test]
    fn alpha_quantization_is_nearest() {
        for a in 0..=255u8 {
            for depth in [BitDepth::Two, BitDepth::Four] {
                let mul = 255 / depth.mask() as i32;
                let code = quantize_alpha(a, depth, 128) as i32;
                let err = (code * mul - a as i32).abs();
                assert!(err * 2 <= mul, "a={a} depth={depth:?} code={code}");
            }
        }
        assert_eq!(quantize_alpha(127, BitDepth::One, 128), 0);
        assert_eq!(quantize_alpha(128, BitDepth::One, 128), 1);
        assert_eq!(quantize_alpha(10, BitDepth::One, 5), 1);
    }

    #[test]
    fn alpha_rows_are_packed() {
        let pixels = vec![px(0, 0, 0, 255), px(0, 0, 0, 0), px(0, 0, 0, 170)];
        let img = PixelBuffer::new(3, 1, pixels).unwrap();
        let out =
            encode(&img, PixelFormat::Alpha(BitDepth::Two), &EncodeOptions::default()).unwrap();
        assert_eq!(out.bytes, [0b11_00_10_00]);
    }

    #[test]
    fn indexed_writes_palette_then_indices() {
        let red = px(255, 0, 0, 255);
        let blue = px(0, 0, 255, 255);
        let img = PixelBuffer::new(3, 1, vec![red, blue, red]).unwrap();
        let opts = EncodeOptions::default().with_color_depth(ColorDepth::ThirtyTwo);
        let out = encode(&img, PixelFormat::Indexed(BitDepth::One), &opts).unwrap();
        assert_eq!(out.bytes, [0, 0, 255, 255, 255, 0, 0, 255, 0b0100_0000]);
    }

    #[test]
    fn supplied_palette_must_fit() {
        let img = PixelBuffer::transparent(2, 2);
        let opts = EncodeOptions::default().with_palette(Palette::new(vec![px(0, 0, 0, 0); 3]));
        assert_eq!(
            encode(&img, PixelFormat::Indexed(BitDepth::Two), &opts),
            Err(EncodeError::PaletteSize { expected: 4, found: 3 })
        );
    }

    #[test]
    fn stride_pads_rows() {
        let img = PixelBuffer::filled(2, 2, px(255, 255, 255, 255));
        let opts = EncodeOptions::default().with_row_stride(8);
        let out = encode(&img, PixelFormat::Rgb888, &opts).unwrap();
        assert_eq!(out.bytes.len(), 16);
        assert_eq!(&out.bytes[6..8], &[0, 0]);
        assert_eq!(out.row_stride, Some(8));

        let short = EncodeOptions::default().with_row_stride(5);
        assert_eq!(
            encode(&img, PixelFormat::Rgb888, &short),
            Err(EncodeError::InvalidStride { stride: 5, min: 6 })
        );
    }

    #[test]
    fn empty_image_is_empty() {
        let img = PixelBuffer::transparent(0, 3);
        for format in PixelFormat::ALL {
            assert!(encode(&img, format, &EncodeOptions::default()).unwrap().bytes.is_empty());
        }
    }

    #[test]
    fn known_values_pack_directly() {
        let pal = Palette::new(vec![px(0, 0, 0, 255), px(255, 255, 255, 255)]);
        let opts = EncodeOptions::default().with_color_depth(ColorDepth::ThirtyTwo);
        let out =
            encode_values(&[1, 0, 1], PixelFormat::Indexed(BitDepth::One), 3, 1, Some(&pal), &opts)
                .unwrap();
        assert_eq!(&out.bytes[8..], &[0b1010_0000]);
        assert_eq!(
            encode_values(&[0], PixelFormat::Rgb332, 1, 1, None, &opts),
            Err(EncodeError::InvalidBitDepth(8))
        );
    }
}
