// ---------------------------------------------------------------------------
// Format registry.
//
// Every pixel layout the codec understands is one `PixelFormat` variant with
// one row in `PixelFormat::info`. Encoder and decoder dispatch on the
// returned `Layout` once per image; per-pixel conversion for byte-aligned
// layouts lives in `direct`, bit-packed layouts go through `crate::bits`.
// ---------------------------------------------------------------------------

use alloc::borrow::Cow;
use alloc::format;
use alloc::string::{String, ToString};

use crate::error::{DecodeError, EncodeError};

pub(crate) mod direct;

// ===========================================================================
// Tags
// ===========================================================================

/// Width of one packed value in the bit-packed layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BitDepth {
    One = 1,
    Two = 2,
    Four = 4,
    Eight = 8,
}

impl BitDepth {
    /// All widths, narrowest first.
    pub const ALL: [BitDepth; 4] = [BitDepth::One, BitDepth::Two, BitDepth::Four, BitDepth::Eight];

    pub const fn new(bits: u8) -> Result<Self, EncodeError> {
        match bits {
            1 => Ok(BitDepth::One),
            2 => Ok(BitDepth::Two),
            4 => Ok(BitDepth::Four),
            8 => Ok(BitDepth::Eight),
            other => Err(EncodeError::InvalidBitDepth(other)),
        }
    }

    #[inline]
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// Mask selecting one value, e.g. `0b11` for two bits.
    #[inline]
    pub const fn mask(self) -> u8 {
        ((1u16 << self.bits()) - 1) as u8
    }

    /// Number of distinct values, `2^bits`.
    #[inline]
    pub const fn levels(self) -> usize {
        1 << self.bits()
    }

    /// Minimal bytes holding one row of `width` values.
    #[inline]
    pub const fn row_bytes(self, width: u32) -> u32 {
        ((width as u64 * self.bits() as u64).div_ceil(8)) as u32
    }
}

impl TryFrom<u8> for BitDepth {
    type Error = EncodeError;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        BitDepth::new(bits)
    }
}

/// Declared `LV_COLOR_DEPTH` of the target build.
///
/// Selects the true-color layout a descriptor resolves to and the byte
/// stride of palette entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorDepth {
    One,
    Eight,
    #[default]
    Sixteen,
    TwentyFour,
    ThirtyTwo,
}

impl ColorDepth {
    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            1 => Some(ColorDepth::One),
            8 => Some(ColorDepth::Eight),
            16 => Some(ColorDepth::Sixteen),
            24 => Some(ColorDepth::TwentyFour),
            32 => Some(ColorDepth::ThirtyTwo),
            _ => None,
        }
    }

    pub const fn bits(self) -> u8 {
        match self {
            ColorDepth::One => 1,
            ColorDepth::Eight => 8,
            ColorDepth::Sixteen => 16,
            ColorDepth::TwentyFour => 24,
            ColorDepth::ThirtyTwo => 32,
        }
    }

    /// Bytes per palette entry: color word plus alpha, or B, G, R, A.
    pub const fn palette_stride(self) -> usize {
        match self {
            ColorDepth::One | ColorDepth::Eight => 2,
            ColorDepth::Sixteen => 3,
            ColorDepth::TwentyFour | ColorDepth::ThirtyTwo => 4,
        }
    }

    /// `LV_COLOR_SIZE`, in bits.
    pub const fn color_size(self) -> u8 {
        match self {
            ColorDepth::One | ColorDepth::Eight => 8,
            ColorDepth::Sixteen => 16,
            ColorDepth::TwentyFour => 24,
            ColorDepth::ThirtyTwo => 32,
        }
    }

    /// `LV_IMG_PX_SIZE_ALPHA_BYTE`: bytes of one true-color-alpha pixel.
    pub const fn px_size_alpha_byte(self) -> u8 {
        match self {
            ColorDepth::One | ColorDepth::Eight => 2,
            ColorDepth::Sixteen => 3,
            ColorDepth::TwentyFour => 3,
            ColorDepth::ThirtyTwo => 4,
        }
    }
}

/// Library generation that produced 32-bit data.
///
/// v7 stores 32-bit pixels as B, G, R, A; v8 and later as R, G, B, A.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SourceVersion {
    V7,
    #[default]
    V8,
}

impl SourceVersion {
    #[inline]
    pub const fn is_bgra(self) -> bool {
        matches!(self, SourceVersion::V7)
    }
}

/// The `LV_IMG_CF_*` color format tag of an image descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorFormatTag {
    Raw,
    RawAlpha,
    RawChromaKeyed,
    TrueColor,
    TrueColorAlpha,
    TrueColorChromaKeyed,
    Indexed(BitDepth),
    Alpha(BitDepth),
}

impl ColorFormatTag {
    /// Every tag, in `LV_IMG_CF_*` numbering order.
    pub const ALL: [ColorFormatTag; 14] = [
        ColorFormatTag::Raw,
        ColorFormatTag::RawAlpha,
        ColorFormatTag::RawChromaKeyed,
        ColorFormatTag::TrueColor,
        ColorFormatTag::TrueColorAlpha,
        ColorFormatTag::TrueColorChromaKeyed,
        ColorFormatTag::Indexed(BitDepth::One),
        ColorFormatTag::Indexed(BitDepth::Two),
        ColorFormatTag::Indexed(BitDepth::Four),
        ColorFormatTag::Indexed(BitDepth::Eight),
        ColorFormatTag::Alpha(BitDepth::One),
        ColorFormatTag::Alpha(BitDepth::Two),
        ColorFormatTag::Alpha(BitDepth::Four),
        ColorFormatTag::Alpha(BitDepth::Eight),
    ];

    pub const fn name(self) -> &'static str {
        use BitDepth::*;
        match self {
            ColorFormatTag::Raw => "LV_IMG_CF_RAW",
            ColorFormatTag::RawAlpha => "LV_IMG_CF_RAW_ALPHA",
            ColorFormatTag::RawChromaKeyed => "LV_IMG_CF_RAW_CHROMA_KEYED",
            ColorFormatTag::TrueColor => "LV_IMG_CF_TRUE_COLOR",
            ColorFormatTag::TrueColorAlpha => "LV_IMG_CF_TRUE_COLOR_ALPHA",
            ColorFormatTag::TrueColorChromaKeyed => "LV_IMG_CF_TRUE_COLOR_CHROMA_KEYED",
            ColorFormatTag::Indexed(One) => "LV_IMG_CF_INDEXED_1BIT",
            ColorFormatTag::Indexed(Two) => "LV_IMG_CF_INDEXED_2BIT",
            ColorFormatTag::Indexed(Four) => "LV_IMG_CF_INDEXED_4BIT",
            ColorFormatTag::Indexed(Eight) => "LV_IMG_CF_INDEXED_8BIT",
            ColorFormatTag::Alpha(One) => "LV_IMG_CF_ALPHA_1BIT",
            ColorFormatTag::Alpha(Two) => "LV_IMG_CF_ALPHA_2BIT",
            ColorFormatTag::Alpha(Four) => "LV_IMG_CF_ALPHA_4BIT",
            ColorFormatTag::Alpha(Eight) => "LV_IMG_CF_ALPHA_8BIT",
        }
    }

    /// Numeric value of the tag in the descriptor header.
    pub fn code(self) -> u8 {
        // Codes start at 1 (0 is LV_IMG_CF_UNKNOWN).
        Self::ALL.iter().position(|&t| t == self).map_or(0, |i| i as u8 + 1)
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get((code as usize).checked_sub(1)?).copied()
    }

    /// Looks a tag up by its `LV_IMG_CF_*` name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.name() == name)
    }

    /// `data_size` initializer written into a descriptor for this tag.
    pub(crate) fn data_size_expr(self, width: u32, height: u32, byte_len: usize) -> String {
        match self {
            ColorFormatTag::TrueColor | ColorFormatTag::TrueColorChromaKeyed => {
                format!("{width} * {height} * LV_COLOR_SIZE / 8")
            }
            ColorFormatTag::TrueColorAlpha => {
                format!("{width} * {height} * LV_IMG_PX_SIZE_ALPHA_BYTE")
            }
            _ => byte_len.to_string(),
        }
    }
}

impl core::fmt::Display for ColorFormatTag {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

// ===========================================================================
// Pixel formats
// ===========================================================================

/// A concrete byte/bit layout of packed pixel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// Color byte (R3 G3 B2) followed by an opaque/transparent alpha byte.
    A8R3G3B2,
    /// RGB565 little-endian word followed by an alpha byte.
    Rgb565A8,
    /// RGB565 word with its two bytes swapped, followed by an alpha byte.
    Rgb565A8Swapped,
    /// RGB565 little-endian word, no alpha.
    Rgb565,
    /// RGB565 word with its two bytes swapped, no alpha.
    Rgb565Swapped,
    /// One R3 G3 B2 byte, no alpha.
    Rgb332,
    /// R, G, B bytes, no alpha.
    Rgb888,
    /// Four bytes, alpha byte ignored; BGRA or RGBA order by [`SourceVersion`].
    Xrgb8888,
    /// Four bytes with alpha; BGRA or RGBA order by [`SourceVersion`].
    Argb8888,
    /// Alpha only, MSB-first packed; color is black.
    Alpha(BitDepth),
    /// Palette table followed by MSB-first packed indices.
    Indexed(BitDepth),
}

/// How a format's bytes are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Whole bytes per pixel.
    Direct { bytes_per_pixel: u8 },
    /// Packed alpha values.
    Alpha(BitDepth),
    /// Palette plus packed indices.
    Indexed(BitDepth),
}

/// Registry row for one [`PixelFormat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatInfo {
    pub layout: Layout,
    /// Whether per-pixel alpha survives encoding.
    pub has_alpha: bool,
    /// Width of the color word compared against a chroma key; 0 if none.
    pub color_bits: u8,
    /// Tag a descriptor for this data carries.
    pub tag: ColorFormatTag,
    /// Human-readable layout, written as a comment above the bytes.
    pub description: &'static str,
}

impl PixelFormat {
    /// Every byte-aligned format followed by the packed ones.
    pub const ALL: [PixelFormat; 17] = [
        PixelFormat::A8R3G3B2,
        PixelFormat::Rgb565A8,
        PixelFormat::Rgb565A8Swapped,
        PixelFormat::Rgb565,
        PixelFormat::Rgb565Swapped,
        PixelFormat::Rgb332,
        PixelFormat::Rgb888,
        PixelFormat::Xrgb8888,
        PixelFormat::Argb8888,
        PixelFormat::Alpha(BitDepth::One),
        PixelFormat::Alpha(BitDepth::Two),
        PixelFormat::Alpha(BitDepth::Four),
        PixelFormat::Alpha(BitDepth::Eight),
        PixelFormat::Indexed(BitDepth::One),
        PixelFormat::Indexed(BitDepth::Two),
        PixelFormat::Indexed(BitDepth::Four),
        PixelFormat::Indexed(BitDepth::Eight),
    ];

    pub const fn info(self) -> FormatInfo {
        use ColorFormatTag as Tag;
        const fn direct(
            bytes_per_pixel: u8,
            has_alpha: bool,
            color_bits: u8,
            tag: ColorFormatTag,
            description: &'static str,
        ) -> FormatInfo {
            FormatInfo {
                layout: Layout::Direct { bytes_per_pixel },
                has_alpha,
                color_bits,
                tag,
                description,
            }
        }
        match self {
            PixelFormat::A8R3G3B2 => direct(
                2,
                true,
                8,
                Tag::TrueColorAlpha,
                "Pixel format: Alpha 8 bit, Red: 3 bit, Green: 3 bit, Blue: 2 bit",
            ),
            PixelFormat::Rgb565A8 => direct(
                3,
                true,
                16,
                Tag::TrueColorAlpha,
                "Pixel format: Alpha 8 bit, Red: 5 bit, Green: 6 bit, Blue: 5 bit",
            ),
            PixelFormat::Rgb565A8Swapped => direct(
                3,
                true,
                16,
                Tag::TrueColorAlpha,
                "Pixel format: Alpha 8 bit, Red: 5 bit, Green: 6 bit, Blue: 5 bit  BUT the 2 color bytes are swapped",
            ),
            PixelFormat::Rgb565 => direct(
                2,
                false,
                16,
                Tag::TrueColor,
                "Pixel format: Red: 5 bit, Green: 6 bit, Blue: 5 bit",
            ),
            PixelFormat::Rgb565Swapped => direct(
                2,
                false,
                16,
                Tag::TrueColor,
                "Pixel format: Red: 5 bit, Green: 6 bit, Blue: 5 bit  BUT the 2 bytes are swapped",
            ),
            PixelFormat::Rgb332 => direct(
                1,
                false,
                8,
                Tag::TrueColor,
                "Pixel format: Red: 3 bit, Green: 3 bit, Blue: 2 bit",
            ),
            PixelFormat::Rgb888 => direct(
                3,
                false,
                24,
                Tag::TrueColor,
                "Pixel format: Red: 8 bit, Green: 8 bit, Blue: 8 bit",
            ),
            PixelFormat::Xrgb8888 => direct(
                4,
                false,
                24,
                Tag::TrueColor,
                "Pixel format: Fix 0xFF: 8 bit, Red: 8 bit, Green: 8 bit, Blue: 8 bit",
            ),
            PixelFormat::Argb8888 => direct(
                4,
                true,
                24,
                Tag::TrueColorAlpha,
                "Pixel format: Alpha 8 bit, Red: 8 bit, Green: 8 bit, Blue: 8 bit",
            ),
            PixelFormat::Alpha(depth) => FormatInfo {
                layout: Layout::Alpha(depth),
                has_alpha: true,
                color_bits: 0,
                tag: Tag::Alpha(depth),
                description: "Pixel format: Alpha only",
            },
            PixelFormat::Indexed(depth) => FormatInfo {
                layout: Layout::Indexed(depth),
                has_alpha: true,
                color_bits: 0,
                tag: Tag::Indexed(depth),
                description: "Pixel format: Palette followed by indices",
            },
        }
    }

    #[inline]
    pub const fn layout(self) -> Layout {
        self.info().layout
    }

    #[inline]
    pub const fn has_alpha(self) -> bool {
        self.info().has_alpha
    }

    /// Bits one pixel occupies in the pixel rows (palette excluded).
    pub const fn bits_per_pixel(self) -> u8 {
        match self.layout() {
            Layout::Direct { bytes_per_pixel } => bytes_per_pixel * 8,
            Layout::Alpha(d) | Layout::Indexed(d) => d.bits(),
        }
    }

    /// Minimal bytes of one pixel row of `width` pixels.
    pub const fn min_row_bytes(self, width: u32) -> u32 {
        match self.layout() {
            Layout::Direct { bytes_per_pixel } => width.saturating_mul(bytes_per_pixel as u32),
            Layout::Alpha(d) | Layout::Indexed(d) => d.row_bytes(width),
        }
    }

    /// Bytes preceding the first pixel row: the palette table for indexed data.
    pub const fn data_offset(self, depth: ColorDepth) -> usize {
        match self.layout() {
            Layout::Indexed(d) => d.levels() * depth.palette_stride(),
            _ => 0,
        }
    }

    /// Total packed size for the geometry, stride and palette depth.
    ///
    /// The final row only needs its minimal bytes; padding after it is optional.
    pub fn packed_len(
        self,
        width: u32,
        height: u32,
        row_stride: Option<u32>,
        depth: ColorDepth,
    ) -> usize {
        if width == 0 || height == 0 {
            return 0;
        }
        let min = self.min_row_bytes(width) as usize;
        let stride = row_stride.map_or(min, |s| (s as usize).max(min));
        self.data_offset(depth) + (height as usize - 1) * stride + min
    }

    /// The byte-swapped counterpart of an RGB565 layout; other formats are
    /// returned unchanged.
    pub const fn swapped(self) -> Self {
        match self {
            PixelFormat::Rgb565 => PixelFormat::Rgb565Swapped,
            PixelFormat::Rgb565A8 => PixelFormat::Rgb565A8Swapped,
            other => other,
        }
    }

    /// Default transparent color of a chroma-keyed image: magenta in the
    /// format's own color word width.
    pub const fn default_chroma_key(self) -> Option<u32> {
        match self {
            PixelFormat::Rgb332 | PixelFormat::A8R3G3B2 => Some(0xE3),
            PixelFormat::Rgb565
            | PixelFormat::Rgb565Swapped
            | PixelFormat::Rgb565A8
            | PixelFormat::Rgb565A8Swapped => Some(0xF81F),
            PixelFormat::Rgb888 | PixelFormat::Xrgb8888 | PixelFormat::Argb8888 => Some(0xFF_00FF),
            PixelFormat::Alpha(_) | PixelFormat::Indexed(_) => None,
        }
    }

    /// Maps a descriptor's color format tag and the target build settings
    /// to a concrete layout.
    pub fn resolve(
        tag: ColorFormatTag,
        depth: ColorDepth,
        swap16: bool,
    ) -> Result<Self, DecodeError> {
        let rgb565 = |with_alpha: bool| match (with_alpha, swap16) {
            (true, false) => PixelFormat::Rgb565A8,
            (true, true) => PixelFormat::Rgb565A8Swapped,
            (false, false) => PixelFormat::Rgb565,
            (false, true) => PixelFormat::Rgb565Swapped,
        };
        let format = match tag {
            ColorFormatTag::TrueColor | ColorFormatTag::TrueColorChromaKeyed => match depth {
                ColorDepth::One | ColorDepth::Eight => PixelFormat::Rgb332,
                ColorDepth::Sixteen => rgb565(false),
                ColorDepth::TwentyFour => PixelFormat::Rgb888,
                ColorDepth::ThirtyTwo => PixelFormat::Xrgb8888,
            },
            ColorFormatTag::TrueColorAlpha => match depth {
                ColorDepth::One | ColorDepth::Eight => PixelFormat::A8R3G3B2,
                ColorDepth::Sixteen => rgb565(true),
                ColorDepth::TwentyFour => PixelFormat::Rgb888,
                ColorDepth::ThirtyTwo => PixelFormat::Argb8888,
            },
            ColorFormatTag::Indexed(d) => PixelFormat::Indexed(d),
            ColorFormatTag::Alpha(d) => PixelFormat::Alpha(d),
            ColorFormatTag::Raw | ColorFormatTag::RawAlpha | ColorFormatTag::RawChromaKeyed => {
                return Err(DecodeError::UnsupportedFormat(tag.name().to_string()));
            }
        };
        Ok(format)
    }

    /// Conditional-compilation guard the format's bytes are emitted under
    /// in a multi-depth listing. Depth-independent formats have none.
    pub fn guard(self) -> Option<Guard> {
        const DEPTH_8: &str = "LV_COLOR_DEPTH == 1 || LV_COLOR_DEPTH == 8";
        const DEPTH_16: &str = "LV_COLOR_DEPTH == 16";
        const NO_SWAP: &str = "LV_COLOR_16_SWAP == 0";
        let guard = match self {
            PixelFormat::A8R3G3B2 | PixelFormat::Rgb332 => Guard::new(DEPTH_8),
            PixelFormat::Rgb565A8 | PixelFormat::Rgb565 => {
                Guard::new(DEPTH_16).nested(Branch::If(NO_SWAP.into()))
            }
            PixelFormat::Rgb565A8Swapped | PixelFormat::Rgb565Swapped => {
                Guard::new(DEPTH_16).nested(Branch::Else(NO_SWAP.into()))
            }
            PixelFormat::Rgb888 => Guard::new("LV_COLOR_DEPTH == 24"),
            PixelFormat::Xrgb8888 | PixelFormat::Argb8888 => Guard::new("LV_COLOR_DEPTH == 32"),
            PixelFormat::Alpha(_) | PixelFormat::Indexed(_) => return None,
        };
        Some(guard)
    }
}

// ===========================================================================
// Compilation guards
// ===========================================================================

/// Inner branch of a nested guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Branch {
    /// `#if cond` (or `#elif cond` after a sibling).
    If(Cow<'static, str>),
    /// `#else` following the sibling whose condition is carried here.
    Else(Cow<'static, str>),
}

/// A `#if` condition wrapping one byte run, optionally with one nested level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guard {
    pub outer: Cow<'static, str>,
    pub inner: Option<Branch>,
}

impl Guard {
    pub fn new(outer: impl Into<Cow<'static, str>>) -> Self {
        Guard {
            outer: outer.into(),
            inner: None,
        }
    }

    pub fn nested(mut self, inner: Branch) -> Self {
        self.inner = Some(inner);
        self
    }

    /// Key the parser assigns to bytes under this guard.
    pub fn key(&self) -> String {
        match &self.inner {
            None => self.outer.to_string(),
            Some(Branch::If(c)) => join_conditions([self.outer.as_ref(), c.as_ref()]),
            Some(Branch::Else(c)) => join_conditions([self.outer.as_ref(), negate(c).as_str()]),
        }
    }
}

/// `!(cond)`, the key of an `#else` after `cond`.
pub(crate) fn negate(cond: &str) -> String {
    format!("!({cond})")
}

/// Joins nesting levels with `&&`, parenthesizing any level that contains `||`.
pub(crate) fn join_conditions<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    let mut out = String::new();
    for part in parts {
        if !out.is_empty() {
            out.push_str(" && ");
        }
        if part.contains("||") {
            out.push('(');
            out.push_str(part);
            out.push(')');
        } else {
            out.push_str(part);
        }
    }
    out
}
