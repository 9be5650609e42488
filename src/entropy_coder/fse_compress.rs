//! Compression using the 16-bit FSE coder.
//!
//! The stream layout is:
//!
//! ```text
//! [ table_log    : u8                                  ]
//! [ present      : u16 LE, count of coded symbols      ]
//! [ present x (symbol : u16 LE, norm_freq : u16 LE)    ]
//! [ initial decoder state : u16 LE                     ]
//! [ bitstream, LSB-first, zero-padded to a whole byte  ]
//! ```
//!
//! Symbols are encoded in reverse so the decoder emits them in forward
//! order; each symbol's bit chunk is written at its forward position, so
//! the chunks need no reversal.

use super::bit_writer::BitWriter;
use super::tables::{
    build_decode_table, build_encode_tables, choose_table_log, normalize_frequencies,
    spread_symbols, MAX_SYMBOL,
};
use crate::{Result, VidpakError};

/// What became of a compression attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressOutcome {
    /// The stream was written to the destination and is this many bytes.
    Compressed(usize),
    /// Every input symbol has the same value (single-symbol inputs
    /// included); nothing was written. Callers store the value directly.
    AllSame,
    /// The stream would not have been smaller than the raw input, or the
    /// destination could not hold it, or the input was empty; nothing was
    /// written. Callers store the input uncompressed.
    Incompressible,
}

/// Compress a 16-bit symbol sequence into `dst`.
///
/// `max_symbol` bounds the alphabet (at most [`MAX_SYMBOL`]); a symbol
/// above it is an error, not a fallback. `table_log` sizes the state
/// table, 0 selecting the default; it is raised as needed to fit the
/// distinct symbols actually present.
pub fn compress_u16(
    dst: &mut [u8],
    src: &[u16],
    max_symbol: u16,
    table_log: u8,
) -> Result<CompressOutcome> {
    if max_symbol > MAX_SYMBOL {
        return Err(VidpakError::InvalidArgument);
    }
    if src.is_empty() {
        return Ok(CompressOutcome::Incompressible);
    }
    if src[0] > max_symbol {
        return Err(VidpakError::InvalidArgument);
    }
    if src.iter().all(|&v| v == src[0]) {
        return Ok(CompressOutcome::AllSame);
    }

    let mut hist = vec![0u32; max_symbol as usize + 1];
    for &v in src {
        if v > max_symbol {
            return Err(VidpakError::InvalidArgument);
        }
        hist[v as usize] += 1;
    }
    let present = hist.iter().filter(|&&c| c > 0).count();

    let table_log = choose_table_log(table_log, present);
    let norm = normalize_frequencies(&hist, src.len() as u32, table_log);
    let spread = spread_symbols(&norm);
    let decode = build_decode_table(&norm, &spread);
    let encode = build_encode_tables(&norm, &decode);

    // Walk the input backwards; chunks[j] is the bit chunk the decoder
    // will consume when emitting symbol j.
    let mut state = 0usize;
    let mut chunks = vec![(0u32, 0u32); src.len()];
    for (j, &sym) in src.iter().enumerate().rev() {
        let m = encode[sym as usize].find(state);
        chunks[j] = ((state - m.base as usize) as u32, m.bits as u32);
        state = m.state as usize;
    }

    let mut writer = BitWriter::with_capacity(src.len());
    for &(value, nb_bits) in &chunks {
        writer.write_bits(value, nb_bits);
    }
    let bitstream = writer.finish();

    let header_len = 1 + 2 + 4 * present + 2;
    let total = header_len + bitstream.len();
    let raw = 2 * src.len();
    if total >= raw || total > dst.len() {
        return Ok(CompressOutcome::Incompressible);
    }

    dst[0] = norm.table_log;
    dst[1..3].copy_from_slice(&(present as u16).to_le_bytes());
    let mut pos = 3;
    for (sym, &f) in norm.freq.iter().enumerate() {
        if f > 0 {
            dst[pos..pos + 2].copy_from_slice(&(sym as u16).to_le_bytes());
            dst[pos + 2..pos + 4].copy_from_slice(&f.to_le_bytes());
            pos += 4;
        }
    }
    dst[pos..pos + 2].copy_from_slice(&(state as u16).to_le_bytes());
    pos += 2;
    dst[pos..pos + bitstream.len()].copy_from_slice(&bitstream);

    Ok(CompressOutcome::Compressed(total))
}
