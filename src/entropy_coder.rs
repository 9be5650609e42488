//! 16-bit Finite State Entropy coding for delta streams.
//!
//! A tANS (table-based asymmetric numeral system) coder over a 12-bit
//! symbol alphabet. Each compressed stream is self-contained: it carries
//! its own normalized frequency table, so tiles can be decoded in any
//! order. Streams that would not shrink the input are reported instead of
//! written, letting the tile codec fall back to raw storage; all-equal
//! inputs are reported without writing anything so the tile codec can use
//! its two-byte constant form.

pub mod bit_reader;
pub mod bit_writer;
pub mod tables;

mod fse_compress;
mod fse_decompress;

pub use fse_compress::{compress_u16, CompressOutcome};
pub use fse_decompress::decompress_u16;
pub use tables::MAX_SYMBOL;
