// ---------------------------------------------------------------------------
// Row-level byte-order conversions between canonical RGBA rows and the
// 24/32-bit packed layouts.
//
// These run on whole rows when no per-pixel policy (chroma key, alpha
// folding) applies; otherwise the codec falls back to `format::direct`.
// ---------------------------------------------------------------------------

#[inline(always)]
fn swap_br_u32(v: u32) -> u32 {
    (v & 0xFF00_FF00) | (v.rotate_left(16) & 0x00FF_00FF)
}

/// Copy 4bpp pixels, swapping B↔R (RGBA→BGRA or BGRA→RGBA).
pub(crate) fn copy_swap_br(src: &[u8], dst: &mut [u8]) {
    for (s, d) in src.chunks_exact(4).zip(dst.chunks_exact_mut(4)) {
        let v = u32::from_ne_bytes([s[0], s[1], s[2], s[3]]);
        d.copy_from_slice(&swap_br_u32(v).to_ne_bytes());
    }
}

/// Set byte 3 of every 4bpp pixel to 255.
pub(crate) fn fill_alpha(row: &mut [u8]) {
    for px in row.chunks_exact_mut(4) {
        px[3] = 0xFF;
    }
}

/// RGBA (4 bytes/px) → RGB (3 bytes/px), dropping alpha.
pub(crate) fn rgba_to_rgb(src: &[u8], dst: &mut [u8]) {
    for (s, d) in src.chunks_exact(4).zip(dst.chunks_exact_mut(3)) {
        d.copy_from_slice(&s[..3]);
    }
}

/// RGB (3 bytes/px) → RGBA (4 bytes/px), alpha=255.
pub(crate) fn rgb_to_rgba(src: &[u8], dst: &mut [u8]) {
    for (s, d) in src.chunks_exact(3).zip(dst.chunks_exact_mut(4)) {
        d[..3].copy_from_slice(s);
        d[3] = 0xFF;
    }
}
