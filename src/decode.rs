//! Packed bytes plus header metadata back to canonical RGBA.
//!
//! Decoding is best effort. Only missing geometry and unusable format tags
//! fail outright; short data and palette overruns produce a partial image
//! and a [`Warning`] for each kind of damage.

use alloc::borrow::Cow;
use alloc::collections::BTreeMap;
use alloc::vec;
use alloc::vec::Vec;

use rgb::Rgba;

use crate::bits::{self, Rows};
use crate::encode::PackedBuffer;
use crate::error::DecodeError;
use crate::format::direct::{self, PixelPolicy};
use crate::format::{BitDepth, ColorDepth, ColorFormatTag, Layout, PixelFormat, SourceVersion};
use crate::palette::Palette;
use crate::pixel::PixelBuffer;
use crate::swizzle;

/// Largest width or height an LVGL image header can hold (11 bits).
pub const MAX_DIMENSION: u32 = 2047;

/// Everything a decoder needs to know besides the bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDescriptor {
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
    /// Declared payload size; bytes past it are not read.
    pub data_size: Option<u32>,
    pub color_depth: ColorDepth,
    pub swap16: bool,
    pub source_version: SourceVersion,
    /// Color word decoded as fully transparent.
    pub chroma_key: Option<u32>,
    /// Color table for indexed data that carries indices only. When set,
    /// the bytes start at the first pixel row and indices past the end of
    /// this table are reported rather than read.
    pub palette: Option<Palette>,
}

impl ImageDescriptor {
    pub fn new(format: PixelFormat, width: u32, height: u32) -> Self {
        ImageDescriptor {
            format,
            width,
            height,
            data_size: None,
            color_depth: ColorDepth::default(),
            swap16: false,
            source_version: SourceVersion::default(),
            chroma_key: None,
            palette: None,
        }
    }

    /// Resolves a `LV_IMG_CF_*` tag against the target build settings.
    /// Chroma-keyed tags get the format's default key.
    pub fn from_tag(
        tag: ColorFormatTag,
        width: u32,
        height: u32,
        depth: ColorDepth,
        swap16: bool,
    ) -> Result<Self, DecodeError> {
        let format = PixelFormat::resolve(tag, depth, swap16)?;
        let chroma_key = match tag {
            ColorFormatTag::TrueColorChromaKeyed => format.default_chroma_key(),
            _ => None,
        };
        Ok(ImageDescriptor {
            color_depth: depth,
            swap16,
            chroma_key,
            ..Self::new(format, width, height)
        })
    }

    pub fn with_data_size(mut self, data_size: u32) -> Self {
        self.data_size = Some(data_size);
        self
    }

    pub fn with_color_depth(mut self, depth: ColorDepth) -> Self {
        self.color_depth = depth;
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

    pub fn with_chroma_key(mut self, key: Option<u32>) -> Self {
        self.chroma_key = key;
        self
    }

    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = Some(palette);
        self
    }
}

/// Recoverable damage found while decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// Only the first `complete_rows` rows were present; the rest are
    /// transparent.
    TruncatedData { complete_rows: u32, height: u32 },
    /// `pixels` pixels referenced `index`, which the palette does not hold.
    /// They were left transparent.
    PaletteIndexOutOfRange { index: u8, pixels: usize },
}

/// A decoded image and whatever went wrong on the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub image: PixelBuffer,
    pub warnings: Vec<Warning>,
}

impl Decoded {
    /// True when every row was present.
    pub fn is_complete(&self) -> bool {
        self.truncation().is_none()
    }

    /// `(complete_rows, height)` when the data ran short.
    pub fn truncation(&self) -> Option<(u32, u32)> {
        self.warnings.iter().find_map(|w| match *w {
            Warning::TruncatedData { complete_rows, height } => Some((complete_rows, height)),
            _ => None,
        })
    }

    /// The image, or [`DecodeError::TruncatedData`] if rows are missing.
    pub fn into_complete(self) -> Result<PixelBuffer, DecodeError> {
        match self.truncation() {
            Some((complete_rows, height)) => Err(DecodeError::TruncatedData {
                complete_rows,
                height,
            }),
            None => Ok(self.image),
        }
    }
}

/// Decodes `packed` using the layout and geometry of `descriptor`.
///
/// The descriptor's format wins over the one recorded on the buffer.
pub fn decode(packed: &PackedBuffer, descriptor: &ImageDescriptor) -> Result<Decoded, DecodeError> {
    let (width, height) = (descriptor.width, descriptor.height);
    if width == 0 || height == 0 {
        return Err(DecodeError::MissingGeometry);
    }
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(DecodeError::TooLarge { width, height });
    }
    let format = descriptor.format;
    if packed.format != format {
        log::debug!("decoding {:?} bytes as {format:?}", packed.format);
    }

    let mut data = packed.bytes.as_slice();
    if let Some(limit) = descriptor.data_size {
        if (limit as usize) < data.len() {
            data = &data[..limit as usize];
        }
    }

    let policy = PixelPolicy {
        alpha_threshold: 0,
        chroma_key: descriptor.chroma_key,
        bgra: descriptor.source_version.is_bgra(),
    };
    let mut image = PixelBuffer::transparent(width, height);
    let mut warnings = Vec::new();

    let complete_rows = match format.layout() {
        Layout::Direct { bytes_per_pixel } => {
            let rows = row_reader(data, format, width, height, packed.row_stride);
            let complete = rows.available();
            decode_direct(rows, format, bytes_per_pixel as usize, &policy, &mut image);
            complete
        }
        Layout::Alpha(depth) => {
            let rows = row_reader(data, format, width, height, packed.row_stride);
            let complete = rows.available();
            let mul = 255 / depth.mask();
            let mut values = vec![0u8; width as usize];
            for ((_, row), dst) in rows.zip(image.rows_mut()) {
                bits::unpack_row(row, depth, &mut values);
                for (px, &v) in dst.iter_mut().zip(&values) {
                    *px = Rgba::new(0, 0, 0, v * mul);
                }
            }
            complete
        }
        Layout::Indexed(depth) => {
            let (palette, pixels) = match &descriptor.palette {
                Some(p) => (Cow::Borrowed(p), data),
                None => {
                    let offset = format.data_offset(descriptor.color_depth);
                    let (table, pixels) = data.split_at(offset.min(data.len()));
                    let (color_depth, swap16) = (descriptor.color_depth, descriptor.swap16);
                    let p = Palette::read_available(table, depth, color_depth, swap16);
                    (Cow::Owned(p), pixels)
                }
            };
            let rows = row_reader(pixels, format, width, height, packed.row_stride);
            let complete = rows.available();
            decode_indexed(rows, depth, &palette, &mut image, &mut warnings);
            complete
        }
    };

    if complete_rows < height {
        log::debug!("{format:?}: {complete_rows} of {height} rows present");
        warnings.insert(0, Warning::TruncatedData { complete_rows, height });
    }
    Ok(Decoded { image, warnings })
}

fn row_reader(
    data: &[u8],
    format: PixelFormat,
    width: u32,
    height: u32,
    row_stride: Option<u32>,
) -> Rows<'_> {
    let min_row = format.min_row_bytes(width);
    let stride = bits::read_stride(min_row, row_stride);
    Rows::new(data, min_row as usize, stride, height)
}

fn decode_direct(
    rows: Rows<'_>,
    format: PixelFormat,
    bpp: usize,
    policy: &PixelPolicy,
    image: &mut PixelBuffer,
) {
    let bulk = policy.chroma_key.is_none();
    for ((_, src), dst) in rows.zip(image.rows_mut()) {
        match format {
            PixelFormat::Argb8888 | PixelFormat::Xrgb8888 if bulk => {
                let out: &mut [u8] = bytemuck::cast_slice_mut(dst);
                if policy.bgra {
                    swizzle::copy_swap_br(src, out);
                } else {
                    out.copy_from_slice(src);
                }
                if format == PixelFormat::Xrgb8888 {
                    swizzle::fill_alpha(out);
                }
            }
            PixelFormat::Rgb888 if bulk => swizzle::rgb_to_rgba(src, bytemuck::cast_slice_mut(dst)),
            _ => {
                for (cell, px) in src.chunks_exact(bpp).zip(dst.iter_mut()) {
                    *px = direct::decode_pixel(format, cell, policy);
                }
            }
        }
    }
}

fn decode_indexed(
    rows: Rows<'_>,
    depth: BitDepth,
    palette: &Palette,
    image: &mut PixelBuffer,
    warnings: &mut Vec<Warning>,
) {
    let mut missing: BTreeMap<u8, usize> = BTreeMap::new();
    let mut indices = vec![0u8; image.width() as usize];
    for ((_, row), dst) in rows.zip(image.rows_mut()) {
        bits::unpack_row(row, depth, &mut indices);
        for (px, &i) in dst.iter_mut().zip(&indices) {
            match palette.get(i) {
                Some(color) => *px = color,
                None => *missing.entry(i).or_insert(0) += 1,
            }
        }
    }
    for (index, pixels) in missing {
        log::warn!(
            "palette index {index} used by {pixels} pixels but the table has {} entries",
            palette.len()
        );
        warnings.push(Warning::PaletteIndexOutOfRange { index, pixels });
    }
}

/// Outcome of decoding the same bytes under one candidate tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub tag: ColorFormatTag,
    pub result: Result<Decoded, DecodeError>,
}

impl Comparison {
    /// Decoded in full to something with at least one visible pixel.
    pub fn is_plausible(&self) -> bool {
        matches!(&self.result, Ok(d) if d.is_complete() && !d.image.is_fully_transparent())
    }
}

/// Decodes `bytes` under every `LV_IMG_CF_*` tag, for spotting which
/// format some unlabelled data was written in.
///
/// Geometry, depth, byte order and version come from `template`; its
/// format is replaced per tag. The chroma key applies to the chroma-keyed
/// tag only, falling back to the format's default key.
pub fn compare(bytes: &[u8], template: &ImageDescriptor) -> Vec<Comparison> {
    ColorFormatTag::ALL
        .iter()
        .map(|&tag| {
            let result =
                PixelFormat::resolve(tag, template.color_depth, template.swap16).and_then(|format| {
                    let chroma_key = match tag {
                        ColorFormatTag::TrueColorChromaKeyed => {
                            template.chroma_key.or(format.default_chroma_key())
                        }
                        _ => None,
                    };
                    let descriptor = ImageDescriptor {
                        format,
                        chroma_key,
                        ..template.clone()
                    };
                    let packed = PackedBuffer::new(format, bytes.to_vec());
                    decode(&packed, &descriptor)
                });
            if let Err(e) = &result {
                log::debug!("{tag}: {e}");
            }
            Comparison { tag, result }
        })
        .collect()
}
