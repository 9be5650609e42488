//! Tile codec: predictive delta coding of one tile with entropy-coded,
//! constant-delta, and raw fall-back encodings.
//!
//! A tile is split into up to four horizontal slices that are walked in
//! lock-step, so the inner loops carry four independent prediction chains
//! and the CPU can overlap them. Each slice's first pixel is stored raw;
//! the remaining pixels become 12-bit modular deltas against a prediction
//! (left neighbor on a slice's top row, top neighbor in its first column,
//! average of both elsewhere). The interleaved delta stream is handed to
//! the 16-bit entropy coder, and the tile's byte length alone tells the
//! decoder which of the three encodings was used:
//!
//! | length        | encoding       |
//! |---------------|----------------|
//! | `2*tw*th`     | raw pixels     |
//! | `2*s + 2`     | constant delta |
//! | other nonzero | entropy coded  |
//!
//! The two fixed lengths can only coincide for tiles with a single delta,
//! and a one-symbol stream always takes the constant form, so dispatching
//! the constant case first keeps the formats unambiguous.

use crate::entropy_coder::{self, CompressOutcome, MAX_SYMBOL};
use crate::predict::{average_predict, delta_decode, delta_encode, slice_count, slice_heights, MAX_SLICES};
use crate::{Result, VidpakError};

/// Store one pixel on the wire: little-endian, high nibble masked to zero.
#[inline]
fn store_pixel(dst: &mut [u8], pix: u16) {
    dst[0] = pix as u8;
    dst[1] = (pix >> 8) as u8 & 0x0F;
}

/// Load one pixel from the wire, masking the high nibble to zero.
#[inline]
fn load_pixel(src: &[u8]) -> u16 {
    u16::from_le_bytes([src[0], src[1] & 0x0F])
}

/// Offsets of the current row start of each slice, given the tile origin.
fn slice_rows(origin: isize, dy: isize, heights: &[usize; MAX_SLICES], slices: usize) -> [isize; MAX_SLICES] {
    let mut rows = [0isize; MAX_SLICES];
    let mut start = 0usize;
    for (row, &h) in rows.iter_mut().zip(heights.iter()).take(slices) {
        *row = origin + start as isize * dy;
        start += h;
    }
    rows
}

/// Encode one tile of `width` x `height` pixels read through the strides
/// `dx`, `dy` from `src` starting at cell index `origin`.
///
/// Deltas are staged in `diff` (interleaved across active slices, starting
/// at index `slices`), then entropy coded into `dst`. Returns the number of
/// bytes written, one of the three wire lengths above.
pub(crate) fn pack_tile(
    width: usize,
    height: usize,
    diff: &mut [u16],
    src: &[u16],
    origin: isize,
    dx: isize,
    dy: isize,
    dst: &mut [u8],
) -> Result<usize> {
    let slices = slice_count(height);
    let heights = slice_heights(height);
    let tallest = heights[0];
    let pixels = width * height;
    let bytes = 2 * pixels;
    if dst.len() < bytes {
        return Err(VidpakError::BufferTooSmall);
    }

    let mut row = slice_rows(origin, dy, &heights, slices);

    // The first pixel of each slice is stored as-is.
    for (i, &r) in row.iter().enumerate().take(slices) {
        store_pixel(&mut dst[2 * i..], src[r as usize]);
    }

    let mut o = slices;
    // Top row of every slice: the pixel's left neighbor is the prediction.
    for x in 1..width {
        let cx = x as isize * dx;
        for (i, &r) in row.iter().enumerate().take(slices) {
            diff[o + i] = delta_encode(src[(r + cx) as usize], src[(r + cx - dx) as usize]);
        }
        o += slices;
    }
    // Main rows. Slices shorter than the tallest drop out of the walk for
    // the final step; the active ones are always a prefix since slice
    // heights never increase.
    for y in 1..tallest {
        let active = heights.iter().take(slices).filter(|&&h| h > y).count();
        for r in row.iter_mut().take(active) {
            *r += dy;
        }
        // First column: the pixel's top neighbor is the prediction.
        for (i, &r) in row.iter().enumerate().take(active) {
            diff[o + i] = delta_encode(src[r as usize], src[(r - dy) as usize]);
        }
        o += active;
        // Rest of the row: average of the left and top neighbors.
        for x in 1..width {
            let cx = x as isize * dx;
            for (i, &r) in row.iter().enumerate().take(active) {
                let left = src[(r + cx - dx) as usize];
                let top = src[(r + cx - dy) as usize];
                diff[o + i] = delta_encode(src[(r + cx) as usize], average_predict(left, top));
            }
            o += active;
        }
    }
    debug_assert_eq!(o, pixels);

    let sb = 2 * slices;
    match entropy_coder::compress_u16(&mut dst[sb..bytes], &diff[slices..pixels], MAX_SYMBOL, 0)? {
        CompressOutcome::Compressed(n) => Ok(sb + n),
        CompressOutcome::AllSame => {
            // Every delta is the same value; store just that value.
            store_pixel(&mut dst[sb..], diff[slices]);
            Ok(sb + 2)
        }
        CompressOutcome::Incompressible => {
            // The deltas did not shrink, so the pixels themselves are the
            // result. Walk the strides; the source need not be contiguous.
            let mut pos = 0;
            for y in 0..height {
                let rb = origin + y as isize * dy;
                for x in 0..width {
                    store_pixel(&mut dst[pos..], src[(rb + x as isize * dx) as usize]);
                    pos += 2;
                }
            }
            Ok(bytes)
        }
    }
}

/// Decode one tile from `src` (whose length selects the encoding) into
/// `dst` through the strides `dx`, `dy` starting at cell index `origin`.
pub(crate) fn unpack_tile(
    width: usize,
    height: usize,
    diff: &mut [u16],
    src: &[u8],
    dst: &mut [u16],
    origin: isize,
    dx: isize,
    dy: isize,
) -> Result<()> {
    let slices = slice_count(height);
    let heights = slice_heights(height);
    let tallest = heights[0];
    let pixels = width * height;
    let bytes = 2 * pixels;
    let sb = 2 * slices;

    if src.is_empty() {
        return Err(VidpakError::InvalidData);
    } else if src.len() == sb + 2 {
        // All the delta values were the same; this arm also covers tiles
        // where bytes == sb + 2, which always carry exactly one delta.
        let v = load_pixel(&src[sb..]);
        diff[slices..pixels].fill(v);
    } else if src.len() == bytes {
        // The pixels were stored uncompressed and are the result.
        let mut pos = 0;
        for y in 0..height {
            let rb = origin + y as isize * dy;
            for x in 0..width {
                dst[(rb + x as isize * dx) as usize] = load_pixel(&src[pos..]);
                pos += 2;
            }
        }
        return Ok(());
    } else if src.len() < sb {
        return Err(VidpakError::InvalidData);
    } else {
        entropy_coder::decompress_u16(&mut diff[slices..pixels], &src[sb..])?;
    }

    let mut row = slice_rows(origin, dy, &heights, slices);

    // Seed each slice with its stored first pixel. The left neighbor is
    // carried in a register instead of being re-read from the output.
    let mut left = [0u16; MAX_SLICES];
    for (i, &r) in row.iter().enumerate().take(slices) {
        left[i] = load_pixel(&src[2 * i..]);
        dst[r as usize] = left[i];
    }

    let mut o = slices;
    for x in 1..width {
        let cx = x as isize * dx;
        for (i, &r) in row.iter().enumerate().take(slices) {
            left[i] = delta_decode(diff[o + i], left[i]);
            dst[(r + cx) as usize] = left[i];
        }
        o += slices;
    }
    for y in 1..tallest {
        let active = heights.iter().take(slices).filter(|&&h| h > y).count();
        for r in row.iter_mut().take(active) {
            *r += dy;
        }
        for (i, &r) in row.iter().enumerate().take(active) {
            left[i] = delta_decode(diff[o + i], dst[(r - dy) as usize]);
            dst[r as usize] = left[i];
        }
        o += active;
        for x in 1..width {
            let cx = x as isize * dx;
            for (i, &r) in row.iter().enumerate().take(active) {
                let top = dst[(r + cx - dy) as usize];
                left[i] = delta_decode(diff[o + i], average_predict(left[i], top));
                dst[(r + cx) as usize] = left[i];
            }
            o += active;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip_tile(width: usize, height: usize, pixels: &[u16]) -> usize {
        let mut diff = vec![0u16; width * height];
        let mut packed = vec![0u8; 2 * width * height];
        let size = pack_tile(
            width,
            height,
            &mut diff,
            pixels,
            0,
            1,
            width as isize,
            &mut packed,
        )
        .unwrap();

        let mut out = vec![0u16; width * height];
        unpack_tile(
            width,
            height,
            &mut diff,
            &packed[..size],
            &mut out,
            0,
            1,
            width as isize,
        )
        .unwrap();
        assert_eq!(pixels, &out[..]);
        size
    }

    #[test]
    fn test_constant_tile_uses_short_form() {
        let pixels = vec![123u16; 8 * 8];
        // s = 4 slices: header is 8 bytes, plus the one delta value.
        let size = roundtrip_tile(8, 8, &pixels);
        assert_eq!(size, 2 * 4 + 2);
    }

    #[test]
    fn test_gradient_tile() {
        let mut pixels = vec![0u16; 16 * 8];
        for y in 0..8 {
            for x in 0..16 {
                pixels[y * 16 + x] = x as u16;
            }
        }
        roundtrip_tile(16, 8, &pixels);
    }

    #[test]
    fn test_single_row_tile() {
        let pixels: Vec<u16> = (0..13u16).map(|x| (x * 37) % 4096).collect();
        roundtrip_tile(13, 1, &pixels);
    }

    #[test]
    fn test_single_column_tile() {
        let pixels: Vec<u16> = (0..9u16).map(|y| (y * 511) % 4096).collect();
        roundtrip_tile(1, 9, &pixels);
    }

    #[test]
    fn test_one_delta_tile_takes_constant_form() {
        // 2x1: one slice, one delta; bytes == sb + 2, the collision case.
        // The entropy coder reports a one-symbol stream as all-same, so the
        // constant form wins and decodes through the constant-first arm.
        let pixels = vec![100u16, 200u16];
        let size = roundtrip_tile(2, 1, &pixels);
        assert_eq!(size, 2 * 1 + 2);
    }

    #[test]
    fn test_height_not_multiple_of_four() {
        // th = 7: slice heights [2, 2, 2, 1]; slice 3 skips the last step.
        let mut pixels = vec![0u16; 5 * 7];
        for (i, p) in pixels.iter_mut().enumerate() {
            *p = ((i * 619) % 4096) as u16;
        }
        roundtrip_tile(5, 7, &pixels);
    }

    #[test]
    fn test_noise_tile_raw_fallback() {
        // Uniform noise across the full 12-bit range should defeat the
        // entropy coder and land on the raw encoding.
        let mut state = 0x2545F4914F6CDD1Du64;
        let pixels: Vec<u16> = (0..32 * 16)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                (state >> 48) as u16 & 0x0FFF
            })
            .collect();
        let size = roundtrip_tile(32, 16, &pixels);
        assert_eq!(size, 2 * 32 * 16);
    }

    #[test]
    fn test_strided_raw_fallback_respects_layout() {
        // Two tiles interleaved in one buffer via dx = 2; noise forces the
        // raw path, which must still walk the strides.
        let mut state = 99u64;
        let mut buf = vec![0u16; 8 * 8 * 2];
        for p in buf.iter_mut() {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            *p = (state >> 40) as u16 & 0x0FFF;
        }
        let mut diff = vec![0u16; 64];
        let mut packed = vec![0u8; 2 * 64];
        let size = pack_tile(8, 8, &mut diff, &buf, 0, 2, 16, &mut packed).unwrap();

        let mut out = vec![0u16; 8 * 8 * 2];
        unpack_tile(8, 8, &mut diff, &packed[..size], &mut out, 0, 2, 16).unwrap();
        for y in 0..8 {
            for x in 0..8 {
                assert_eq!(out[y * 16 + x * 2], buf[y * 16 + x * 2], "({}, {})", x, y);
            }
        }
    }

    #[test]
    fn test_zero_length_tile_fails() {
        let mut diff = vec![0u16; 16];
        let mut out = vec![0u16; 16];
        let err = unpack_tile(4, 4, &mut diff, &[], &mut out, 0, 1, 4).unwrap_err();
        assert!(matches!(err, VidpakError::InvalidData));
    }
}
