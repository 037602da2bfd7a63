//! Color tables for the indexed formats.
//!
//! On the wire a palette is `2^bits` entries whose width is set by the
//! declared color depth, not by the entries themselves:
//!
//! | depth  | bytes | layout                              |
//! |--------|-------|-------------------------------------|
//! | 1, 8   | 2     | R3 G3 B2 byte, alpha                |
//! | 16     | 3     | RGB565 word (LE unless swapped), alpha |
//! | 24, 32 | 4     | B, G, R, A                          |

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use rgb::Rgba;

use crate::error::PaletteError;
use crate::format::direct::{expand_rgb332, expand_rgb565, rgb332, rgb565};
use crate::format::{BitDepth, ColorDepth};
use crate::pixel::PixelBuffer;

/// Ordered color table; an index is a position.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Palette {
    entries: Vec<Rgba<u8>>,
}

impl Palette {
    pub fn new(entries: Vec<Rgba<u8>>) -> Self {
        Palette { entries }
    }

    #[inline]
    pub fn entries(&self) -> &[Rgba<u8>] {
        &self.entries
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at `index`, or `None` past the end of the table.
    #[inline]
    pub fn get(&self, index: u8) -> Option<Rgba<u8>> {
        self.entries.get(index as usize).copied()
    }

    /// Builds a `2^bits`-entry palette from the most frequent colors of
    /// `image`, first appearance breaking ties. Unused slots are transparent
    /// black.
    pub fn build(image: &PixelBuffer, depth: BitDepth) -> Self {
        let mut counts: BTreeMap<[u8; 4], (usize, usize)> = BTreeMap::new();
        for (i, px) in image.pixels().iter().enumerate() {
            let slot = counts.entry([px.r, px.g, px.b, px.a]).or_insert((0, i));
            slot.0 += 1;
        }
        let mut ranked: Vec<([u8; 4], (usize, usize))> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.0.cmp(&a.1.0).then(a.1.1.cmp(&b.1.1)));
        if ranked.len() > depth.levels() {
            log::debug!(
                "{} distinct colors for a {}-entry palette; keeping the most frequent",
                ranked.len(),
                depth.levels()
            );
        }
        let mut entries: Vec<Rgba<u8>> = ranked
            .into_iter()
            .take(depth.levels())
            .map(|([r, g, b, a], _)| Rgba::new(r, g, b, a))
            .collect();
        entries.resize(depth.levels(), Rgba::new(0, 0, 0, 0));
        Palette { entries }
    }

    /// Loads exactly `2^bits` entries from the start of `raw`.
    pub fn from_bytes(
        raw: &[u8],
        depth: BitDepth,
        color_depth: ColorDepth,
        swap16: bool,
    ) -> Result<Self, PaletteError> {
        let stride = color_depth.palette_stride();
        let expected = depth.levels() * stride;
        if raw.len() < expected {
            return Err(PaletteError::TooShort {
                expected,
                found: raw.len(),
            });
        }
        Ok(Self::read_available(&raw[..expected], depth, color_depth, swap16))
    }

    /// Loads as many whole entries as `raw` holds, at most `2^bits`.
    pub(crate) fn read_available(
        raw: &[u8],
        depth: BitDepth,
        color_depth: ColorDepth,
        swap16: bool,
    ) -> Self {
        let entries = raw
            .chunks_exact(color_depth.palette_stride())
            .take(depth.levels())
            .map(|e| read_entry(e, swap16))
            .collect();
        Palette { entries }
    }

    /// Serializes every entry with the stride of `color_depth`.
    pub fn to_bytes(&self, color_depth: ColorDepth, swap16: bool) -> Vec<u8> {
        let stride = color_depth.palette_stride();
        let mut out = Vec::with_capacity(self.entries.len() * stride);
        for &px in &self.entries {
            match stride {
                2 => out.extend_from_slice(&[rgb332(px) as u8, px.a]),
                3 => {
                    let [lo, hi] = (rgb565(px) as u16).to_le_bytes();
                    if swap16 {
                        out.extend_from_slice(&[hi, lo, px.a]);
                    } else {
                        out.extend_from_slice(&[lo, hi, px.a]);
                    }
                }
                _ => out.extend_from_slice(&[px.b, px.g, px.r, px.a]),
            }
        }
        out
    }

    /// Checks the table has exactly `2^bits` entries.
    pub fn check_size(&self, depth: BitDepth) -> Result<(), PaletteError> {
        if self.entries.len() != depth.levels() {
            return Err(PaletteError::WrongSize {
                expected: depth.levels(),
                found: self.entries.len(),
            });
        }
        Ok(())
    }

    /// Index of the closest entry by squared RGBA distance; the lowest
    /// index wins a tie.
    pub fn nearest(&self, px: Rgba<u8>) -> u8 {
        let dist = |e: &Rgba<u8>| {
            let d = |a: u8, b: u8| (a as i32 - b as i32).pow(2) as u32;
            d(e.r, px.r) + d(e.g, px.g) + d(e.b, px.b) + d(e.a, px.a)
        };
        let mut best = (0usize, u32::MAX);
        for (i, e) in self.entries.iter().enumerate() {
            let dd = dist(e);
            if dd < best.1 {
                best = (i, dd);
                if dd == 0 {
                    break;
                }
            }
        }
        best.0 as u8
    }
}

fn read_entry(e: &[u8], swap16: bool) -> Rgba<u8> {
    match *e {
        [c, a] => expand_rgb332(c as u32, a),
        [lo, hi, a] => {
            let (lo, hi) = if swap16 { (hi, lo) } else { (lo, hi) };
            expand_rgb565(u16::from_le_bytes([lo, hi]) as u32, a)
        }
        [b, g, r, a] => Rgba::new(r, g, b, a),
        _ => Rgba::new(0, 0, 0, 0),
    }
}
