// ---------------------------------------------------------------------------
// Sub-byte value packing with row stride.
//
// Values are stored MSB-first within each byte and every row starts on a
// byte boundary. A row stride longer than the minimal row leaves zero
// padding at the end of each row on pack and is skipped on unpack.
// ---------------------------------------------------------------------------

use alloc::vec;
use alloc::vec::Vec;

use crate::error::EncodeError;
use crate::format::BitDepth;

// ===========================================================================
// Validation helpers
// ===========================================================================

/// Effective stride for packing: the requested one, or the minimal row.
#[inline]
pub(crate) fn check_stride(min_row: u32, row_stride: Option<u32>) -> Result<u32, EncodeError> {
    match row_stride {
        Some(stride) if stride < min_row => Err(EncodeError::InvalidStride {
            stride,
            min: min_row,
        }),
        Some(stride) => Ok(stride),
        None => Ok(min_row),
    }
}

/// Effective stride for reading. A stride shorter than a row cannot be
/// honored, so reading falls back to the minimal row.
#[inline]
pub(crate) fn read_stride(min_row: u32, row_stride: Option<u32>) -> usize {
    match row_stride {
        Some(stride) if stride < min_row => {
            log::debug!("row stride {stride} shorter than minimal row {min_row}; ignoring it");
            min_row as usize
        }
        Some(stride) => stride as usize,
        None => min_row as usize,
    }
}

// ===========================================================================
// Rows
// ===========================================================================

/// Complete rows of a packed buffer.
///
/// Yields `(y, row)` where `row` is exactly `min_row` bytes; padding is never
/// exposed. Iteration stops at the first row whose minimal bytes are not all
/// present.
pub(crate) struct Rows<'a> {
    data: &'a [u8],
    min_row: usize,
    stride: usize,
    height: u32,
    y: u32,
}

impl<'a> Rows<'a> {
    pub(crate) fn new(data: &'a [u8], min_row: usize, stride: usize, height: u32) -> Self {
        Rows {
            data,
            min_row,
            stride,
            height,
            y: 0,
        }
    }

    /// Number of rows whose minimal bytes are present.
    pub(crate) fn available(&self) -> u32 {
        if self.min_row == 0 {
            return self.height;
        }
        if self.data.len() < self.min_row {
            return 0;
        }
        let fit = (self.data.len() - self.min_row) / self.stride.max(1) + 1;
        fit.min(self.height as usize) as u32
    }
}

impl<'a> Iterator for Rows<'a> {
    type Item = (u32, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        if self.y >= self.height {
            return None;
        }
        let start = self.y as usize * self.stride;
        let row = self.data.get(start..start + self.min_row)?;
        let y = self.y;
        self.y += 1;
        Some((y, row))
    }
}

// ===========================================================================
// Pack / unpack
// ===========================================================================

/// Packs `width * height` values of `depth` bits, MSB-first, one byte-aligned
/// row at a time.
///
/// Values are masked to `depth` bits. An empty geometry packs to an empty
/// buffer. `row_stride`, when given, must be at least the minimal row length;
/// the extra bytes of each row are zero.
pub fn pack(
    values: &[u8],
    depth: BitDepth,
    width: u32,
    height: u32,
    row_stride: Option<u32>,
) -> Result<Vec<u8>, EncodeError> {
    if width == 0 || height == 0 {
        return Ok(Vec::new());
    }
    let min_row = depth.row_bytes(width);
    let stride = check_stride(min_row, row_stride)? as usize;
    let expected = width as usize * height as usize;
    if values.len() != expected {
        return Err(EncodeError::ValueCount {
            expected,
            found: values.len(),
        });
    }

    let mut out = vec![0u8; stride * height as usize];
    for (row_values, row) in values
        .chunks_exact(width as usize)
        .zip(out.chunks_exact_mut(stride))
    {
        pack_row(row_values, depth, &mut row[..min_row as usize]);
    }
    Ok(out)
}

/// Packs one row of values into `dst`, which is exactly the minimal row long.
pub(crate) fn pack_row(values: &[u8], depth: BitDepth, dst: &mut [u8]) {
    let bits = depth.bits() as usize;
    if depth == BitDepth::Eight {
        dst.copy_from_slice(values);
        return;
    }
    let per_byte = 8 / bits;
    for (chunk, byte) in values.chunks(per_byte).zip(dst.iter_mut()) {
        let mut acc = 0u8;
        for (i, &v) in chunk.iter().enumerate() {
            acc |= (v & depth.mask()) << (8 - bits * (i + 1));
        }
        *byte = acc;
    }
}

/// Unpacks one minimal row into `dst`, one value per element.
pub(crate) fn unpack_row(row: &[u8], depth: BitDepth, dst: &mut [u8]) {
    let bits = depth.bits() as usize;
    if depth == BitDepth::Eight {
        dst.copy_from_slice(&row[..dst.len()]);
        return;
    }
    let per_byte = 8 / bits;
    for (chunk, &byte) in dst.chunks_mut(per_byte).zip(row.iter()) {
        for (i, v) in chunk.iter_mut().enumerate() {
            *v = (byte >> (8 - bits * (i + 1))) & depth.mask();
        }
    }
}

/// Result of [`unpack`].
///
/// `values` always holds `width * height` entries; values of rows that were
/// not fully present are zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unpacked {
    pub values: Vec<u8>,
    /// Rows whose minimal bytes were all present.
    pub complete_rows: u32,
    /// The data ran out before the last row.
    pub truncated: bool,
}

/// Inverse of [`pack`].
///
/// Running out of bytes is not an error: the result reports how many rows
/// were complete and the caller decides whether that is enough.
pub fn unpack(
    data: &[u8],
    depth: BitDepth,
    width: u32,
    height: u32,
    row_stride: Option<u32>,
) -> Unpacked {
    let mut values = vec![0u8; width as usize * height as usize];
    if width == 0 || height == 0 {
        return Unpacked {
            values,
            complete_rows: height,
            truncated: false,
        };
    }
    let min_row = depth.row_bytes(width);
    let stride = read_stride(min_row, row_stride);
    let rows = Rows::new(data, min_row as usize, stride, height);
    let complete_rows = rows.available();
    for ((_, row), dst) in rows.zip(values.chunks_exact_mut(width as usize)) {
        unpack_row(row, depth, dst);
    }
    let truncated = complete_rows < height;
    if truncated {
        log::debug!("packed data holds {complete_rows} of {height} rows");
    }
    Unpacked {
        values,
        complete_rows,
        truncated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn msb_first_two_bit() {
        let packed = pack(&[0, 1, 2, 3], BitDepth::Two, 4, 1, None).unwrap();
        assert_eq!(packed, [0b00_01_10_11]);
    }

    #[test]
    fn rows_start_on_byte_boundary() {
        // 3 one-bit values per row -> one byte per row, low bits unused.
        let packed = pack(&[1, 0, 1, 1, 1, 1], BitDepth::One, 3, 2, None).unwrap();
        assert_eq!(packed, [0b1010_0000, 0b1110_0000]);
        let back = unpack(&packed, BitDepth::One, 3, 2, None);
        assert_eq!(back.values, [1, 0, 1, 1, 1, 1]);
        assert!(!back.truncated);
    }

    #[test]
    fn values_are_masked() {
        let packed = pack(&[0xFF, 0x10], BitDepth::Four, 2, 1, None).unwrap();
        assert_eq!(packed, [0xF0]);
    }

    #[test]
    fn stride_padding_is_zero_and_skipped() {
        let packed = pack(&[0xA, 0xB, 0xC, 0xD], BitDepth::Four, 2, 2, Some(3)).unwrap();
        assert_eq!(packed, [0xAB, 0, 0, 0xCD, 0, 0]);
        let mut garbage = packed.clone();
        garbage[1] = 0x55;
        garbage[2] = 0x77;
        let back = unpack(&garbage, BitDepth::Four, 2, 2, Some(3));
        assert_eq!(back.values, [0xA, 0xB, 0xC, 0xD]);
    }

    #[test]
    fn stride_equal_to_minimum_matches_none() {
        let values: Vec<u8> = (0..30u8).map(|v| v % 4).collect();
        let a = pack(&values, BitDepth::Two, 5, 6, None).unwrap();
        let b = pack(&values, BitDepth::Two, 5, 6, Some(2)).unwrap();
        assert_eq!(a, b);
        assert_eq!(unpack(&a, BitDepth::Two, 5, 6, None), unpack(&a, BitDepth::Two, 5, 6, Some(2)));
    }

    #[test]
    fn empty_geometry_packs_empty() {
        assert_eq!(pack(&[], BitDepth::One, 0, 5, None).unwrap(), Vec::<u8>::new());
        assert_eq!(pack(&[], BitDepth::Eight, 5, 0, Some(9)).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn short_stride_rejected() {
        assert_eq!(
            pack(&[0; 16], BitDepth::Eight, 4, 4, Some(3)),
            Err(EncodeError::InvalidStride { stride: 3, min: 4 })
        );
    }

    #[test]
    fn wrong_value_count_rejected() {
        assert_eq!(
            pack(&[0; 5], BitDepth::Eight, 2, 2, None),
            Err(EncodeError::ValueCount { expected: 4, found: 5 })
        );
    }

    #[test]
    fn truncated_mid_row() {
        let values: Vec<u8> = (0..12).collect();
        let packed = pack(&values, BitDepth::Eight, 4, 3, None).unwrap();
        let back = unpack(&packed[..10], BitDepth::Eight, 4, 3, None);
        assert!(back.truncated);
        assert_eq!(back.complete_rows, 2);
        assert_eq!(&back.values[..8], &values[..8]);
        assert_eq!(&back.values[8..], &[0, 0, 0, 0]);
    }

    #[test]
    fn last_row_padding_optional() {
        let packed = pack(&[1, 2, 3, 4], BitDepth::Eight, 2, 2, Some(4)).unwrap();
        // Drop only the final row's padding.
        let back = unpack(&packed[..6], BitDepth::Eight, 2, 2, Some(4));
        assert!(!back.truncated);
        assert_eq!(back.values, [1, 2, 3, 4]);
    }
}
