//! Per-pixel conversion for the byte-aligned layouts.
//!
//! Channel quantization truncates to the top bits. Expansion back to 8 bits
//! uses `round(code * 255 / (2^N - 1))` for 3- and 5-bit channels, `code * 85`
//! for 2-bit blue, and a plain left shift for 6-bit green, so that
//! RGB565 `0x07E0` decodes to green 252 as historical images expect.

use rgb::Rgba;

use super::PixelFormat;

/// Alpha and chroma-key policy shared by every pixel of one encode/decode call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PixelPolicy {
    pub alpha_threshold: u8,
    pub chroma_key: Option<u32>,
    pub bgra: bool,
}

const TRANSPARENT: Rgba<u8> = Rgba {
    r: 0,
    g: 0,
    b: 0,
    a: 0,
};

// ===========================================================================
// Channel quantization
// ===========================================================================

#[inline]
pub(crate) const fn expand3(code: u32) -> u8 {
    ((code * 255 + 3) / 7) as u8
}

#[inline]
pub(crate) const fn expand5(code: u32) -> u8 {
    ((code * 255 + 15) / 31) as u8
}

#[inline]
pub(crate) const fn expand6(code: u32) -> u8 {
    (code << 2) as u8
}

#[inline]
pub(crate) const fn rgb332(px: Rgba<u8>) -> u32 {
    ((px.r as u32 >> 5) << 5) | ((px.g as u32 >> 5) << 2) | (px.b as u32 >> 6)
}

#[inline]
pub(crate) const fn rgb565(px: Rgba<u8>) -> u32 {
    ((px.r as u32 >> 3) << 11) | ((px.g as u32 >> 2) << 5) | (px.b as u32 >> 3)
}

#[inline]
pub(crate) const fn expand_rgb332(word: u32, a: u8) -> Rgba<u8> {
    Rgba {
        r: expand3((word >> 5) & 0x7),
        g: expand3((word >> 2) & 0x7),
        b: ((word & 0x3) * 85) as u8,
        a,
    }
}

#[inline]
pub(crate) const fn expand_rgb565(word: u32, a: u8) -> Rgba<u8> {
    Rgba {
        r: expand5((word >> 11) & 0x1F),
        g: expand6((word >> 5) & 0x3F),
        b: expand5(word & 0x1F),
        a,
    }
}

#[inline]
const fn rgb888(px: Rgba<u8>) -> u32 {
    (px.r as u32) << 16 | (px.g as u32) << 8 | px.b as u32
}

#[inline]
const fn expand_rgb888(word: u32, a: u8) -> Rgba<u8> {
    Rgba {
        r: (word >> 16) as u8,
        g: (word >> 8) as u8,
        b: word as u8,
        a,
    }
}

// ===========================================================================
// Words
// ===========================================================================

/// Quantized color of `px` in the format's destination bit depth, before
/// alpha is attached. This is the value a chroma key is compared against.
pub(crate) fn color_word(format: PixelFormat, px: Rgba<u8>) -> u32 {
    match format {
        PixelFormat::A8R3G3B2 | PixelFormat::Rgb332 => rgb332(px),
        PixelFormat::Rgb565A8
        | PixelFormat::Rgb565A8Swapped
        | PixelFormat::Rgb565
        | PixelFormat::Rgb565Swapped => rgb565(px),
        PixelFormat::Rgb888 | PixelFormat::Xrgb8888 | PixelFormat::Argb8888 => rgb888(px),
        PixelFormat::Alpha(_) | PixelFormat::Indexed(_) => 0,
    }
}

fn expand(format: PixelFormat, word: u32, a: u8) -> Rgba<u8> {
    match format {
        PixelFormat::A8R3G3B2 | PixelFormat::Rgb332 => expand_rgb332(word, a),
        PixelFormat::Rgb565A8
        | PixelFormat::Rgb565A8Swapped
        | PixelFormat::Rgb565
        | PixelFormat::Rgb565Swapped => expand_rgb565(word, a),
        _ => expand_rgb888(word, a),
    }
}

/// Writes `word` and `alpha` in the format's byte order. `out` is exactly
/// one pixel long.
fn store(format: PixelFormat, word: u32, alpha: u8, bgra: bool, out: &mut [u8]) {
    let [w0, w1, w2, _] = word.to_le_bytes();
    match format {
        PixelFormat::Rgb332 => out[0] = w0,
        PixelFormat::A8R3G3B2 => out.copy_from_slice(&[w0, alpha]),
        PixelFormat::Rgb565 => out.copy_from_slice(&[w0, w1]),
        PixelFormat::Rgb565Swapped => out.copy_from_slice(&[w1, w0]),
        PixelFormat::Rgb565A8 => out.copy_from_slice(&[w0, w1, alpha]),
        PixelFormat::Rgb565A8Swapped => out.copy_from_slice(&[w1, w0, alpha]),
        PixelFormat::Rgb888 => out.copy_from_slice(&[w2, w1, w0]),
        PixelFormat::Xrgb8888 | PixelFormat::Argb8888 => {
            let a = if format == PixelFormat::Argb8888 { alpha } else { 0xFF };
            if bgra {
                out.copy_from_slice(&[w0, w1, w2, a]);
            } else {
                out.copy_from_slice(&[w2, w1, w0, a]);
            }
        }
        PixelFormat::Alpha(_) | PixelFormat::Indexed(_) => {}
    }
}

/// Reads the color word and stored alpha of one pixel.
fn load(format: PixelFormat, px: &[u8], bgra: bool) -> (u32, u8) {
    let le16 = |lo: u8, hi: u8| u32::from(u16::from_le_bytes([lo, hi]));
    let join = |r: u8, g: u8, b: u8| (r as u32) << 16 | (g as u32) << 8 | b as u32;
    match format {
        PixelFormat::Rgb332 => (px[0] as u32, 0xFF),
        PixelFormat::A8R3G3B2 => (px[0] as u32, px[1]),
        PixelFormat::Rgb565 => (le16(px[0], px[1]), 0xFF),
        PixelFormat::Rgb565Swapped => (le16(px[1], px[0]), 0xFF),
        PixelFormat::Rgb565A8 => (le16(px[0], px[1]), px[2]),
        PixelFormat::Rgb565A8Swapped => (le16(px[1], px[0]), px[2]),
        PixelFormat::Rgb888 => (join(px[0], px[1], px[2]), 0xFF),
        PixelFormat::Xrgb8888 | PixelFormat::Argb8888 => {
            let word = if bgra {
                join(px[2], px[1], px[0])
            } else {
                join(px[0], px[1], px[2])
            };
            let a = if format == PixelFormat::Argb8888 { px[3] } else { 0xFF };
            (word, a)
        }
        PixelFormat::Alpha(_) | PixelFormat::Indexed(_) => (0, 0),
    }
}

// ===========================================================================
// Pixels
// ===========================================================================

/// Encodes one pixel into `out`, which is exactly `bytes_per_pixel` long.
pub(crate) fn encode_pixel(
    format: PixelFormat,
    px: Rgba<u8>,
    policy: &PixelPolicy,
    out: &mut [u8],
) {
    let word = color_word(format, px);
    let opaque = px.a >= policy.alpha_threshold;
    if format.has_alpha() {
        if policy.chroma_key == Some(word) {
            out.fill(0);
            return;
        }
        match format {
            // Alpha folds to fully opaque or fully transparent.
            PixelFormat::A8R3G3B2 if opaque => store(format, word, 0xFF, policy.bgra, out),
            PixelFormat::A8R3G3B2 => out.fill(0),
            _ => store(format, word, px.a, policy.bgra, out),
        }
    } else {
        // Without an alpha channel the key color is the only transparent value.
        let word = if opaque { word } else { policy.chroma_key.unwrap_or(0) };
        store(format, word, 0xFF, policy.bgra, out);
    }
}

/// Decodes one pixel from `px`, which is exactly `bytes_per_pixel` long.
pub(crate) fn decode_pixel(format: PixelFormat, px: &[u8], policy: &PixelPolicy) -> Rgba<u8> {
    let (word, a) = load(format, px, policy.bgra);
    if policy.chroma_key == Some(word) {
        return TRANSPARENT;
    }
    expand(format, word, a)
}
