//! Lossless per-frame codec for 12-bit grayscale scientific video.
//!
//! A frame is a W x H grid of pixels carried in 16-bit cells, addressed
//! through caller-supplied strides so planes and interleaved channels can
//! live in one buffer. The codec cuts the frame into tiles, predicts each
//! pixel from its neighbors, and entropy codes the 12-bit modular deltas;
//! tiles that do not compress fall back to a constant-delta or raw
//! encoding, distinguished by tile byte length alone. A packed frame is a
//! table of per-tile lengths followed by the tiles back to back:
//!
//! ```text
//! [ tile length table : 4*nx*ny bytes, u32 LE per tile ]
//! [ tile 0 bytes ][ tile 1 bytes ] ... [ tile nx*ny-1 ]
//! ```
//!
//! The caller keeps the total packed length out of band (a container
//! format's job) and must hand the decoder exactly that many bytes.
//!
//! ```
//! use vidpak::{PackContext, PixelLayout};
//!
//! let pixels = vec![0u16; 64 * 64];
//! let mut ctx = PackContext::new(64, 64, 12, 32, 32).unwrap();
//! let mut packed = vec![0u8; ctx.max_packed_size()];
//! let n = ctx.pack(&pixels, PixelLayout::contiguous(64), &mut packed).unwrap();
//!
//! let mut out = vec![0u16; 64 * 64];
//! ctx.unpack(&packed[..n], &mut out, PixelLayout::contiguous(64)).unwrap();
//! assert_eq!(pixels, out);
//! ```

use thiserror::Error;

pub mod entropy_coder;
mod predict;
mod tile;

/// The only bit depth the codec currently accepts. The constructor still
/// takes a `bpp` argument to keep room for future predictors.
pub const SUPPORTED_BPP: usize = 12;

#[derive(Error, Debug)]
pub enum VidpakError {
    #[error("Invalid frame or tile dimensions")]
    ImageDimensions,
    #[error("Unsupported bits per pixel (only 12 is supported)")]
    UnsupportedFormat,
    #[error("Invalid argument")]
    InvalidArgument,
    #[error("Destination buffer too small")]
    BufferTooSmall,
    #[error("Invalid compressed data")]
    InvalidData,
}

pub type Result<T> = std::result::Result<T, VidpakError>;

/// Addressing of a pixel grid inside a caller-owned slice of 16-bit cells.
///
/// The pixel at column `c`, row `r` lives at index `origin + r*dy + c*dx`.
/// Strides are in cells, not bytes, and may be negative to traverse a
/// buffer bottom-up or right-to-left; `origin` anchors the grid so that
/// every addressed cell stays inside the slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelLayout {
    pub origin: usize,
    pub dx: isize,
    pub dy: isize,
}

impl PixelLayout {
    pub fn new(origin: usize, dx: isize, dy: isize) -> Self {
        Self { origin, dx, dy }
    }

    /// Row-major layout of a `width`-pixel-wide grid starting at index 0.
    pub fn contiguous(width: usize) -> Self {
        Self {
            origin: 0,
            dx: 1,
            dy: width as isize,
        }
    }
}

/// Scratch and parameters for packing and unpacking frames of one shape.
///
/// A context drives one pack or unpack at a time (both take `&mut self`);
/// process frames in parallel by giving each worker its own context.
pub struct PackContext {
    width: usize,
    height: usize,
    bpp: usize,
    tile_width: usize,
    tile_height: usize,
    /// Holds the deltas of one tile while it is processed.
    diff: Vec<u16>,
}

impl PackContext {
    /// Create a context for frames of `width` x `height` pixels at `bpp`
    /// bits per pixel, cut into `tile_width` x `tile_height` tiles.
    ///
    /// Tiles may not exceed the frame; tiles on the right and bottom edges
    /// shrink when the frame is not an exact multiple of the tile size.
    pub fn new(
        width: usize,
        height: usize,
        bpp: usize,
        tile_width: usize,
        tile_height: usize,
    ) -> Result<Self> {
        if width == 0 || height == 0 || tile_width == 0 || tile_height == 0 {
            return Err(VidpakError::ImageDimensions);
        }
        if tile_width > width || tile_height > height {
            return Err(VidpakError::ImageDimensions);
        }
        if bpp != SUPPORTED_BPP {
            return Err(VidpakError::UnsupportedFormat);
        }

        Ok(Self {
            width,
            height,
            bpp,
            tile_width,
            tile_height,
            diff: vec![0u16; tile_width * tile_height],
        })
    }

    fn tile_cols(&self) -> usize {
        self.width.div_ceil(self.tile_width)
    }

    fn tile_rows(&self) -> usize {
        self.height.div_ceil(self.tile_height)
    }

    /// Maximum possible size of a packed frame: the tile length table plus
    /// every tile taking the raw encoding. The bound is tight.
    pub fn max_packed_size(&self) -> usize {
        self.width * self.height * self.bpp.div_ceil(8)
            + 4 * self.tile_cols() * self.tile_rows()
    }

    /// Check that the strides are usable and that all four corners of the
    /// frame grid fall inside a buffer of `len` cells. The grid's address
    /// map is affine in column and row, so corner bounds imply that every
    /// cell is in bounds.
    fn check_layout(&self, len: usize, layout: PixelLayout) -> Result<()> {
        if layout.dx == 0 || layout.dy == 0 {
            return Err(VidpakError::InvalidArgument);
        }
        for &cx in &[0, (self.width - 1) as isize * layout.dx] {
            for &ry in &[0, (self.height - 1) as isize * layout.dy] {
                let off = layout.origin as isize + cx + ry;
                if off < 0 || off as usize >= len {
                    return Err(VidpakError::InvalidArgument);
                }
            }
        }
        Ok(())
    }

    /// Pack a frame read from `src` through `layout` into `dst`.
    ///
    /// `dst` must hold at least [`max_packed_size`](Self::max_packed_size)
    /// bytes. Returns the packed byte length; the caller must convey it to
    /// the decoder.
    pub fn pack(&mut self, src: &[u16], layout: PixelLayout, dst: &mut [u8]) -> Result<usize> {
        self.check_layout(src.len(), layout)?;
        if dst.len() < self.max_packed_size() {
            return Err(VidpakError::BufferTooSmall);
        }

        // The per-tile length table comes first so a reader can locate any
        // tile's bytes without decoding its predecessors.
        let mut pos = 4 * self.tile_cols() * self.tile_rows();
        let mut slot = 0;
        for ty in (0..self.height).step_by(self.tile_height) {
            for tx in (0..self.width).step_by(self.tile_width) {
                let tw = self.tile_width.min(self.width - tx);
                let th = self.tile_height.min(self.height - ty);
                let origin =
                    layout.origin as isize + ty as isize * layout.dy + tx as isize * layout.dx;
                let size = tile::pack_tile(
                    tw,
                    th,
                    &mut self.diff,
                    src,
                    origin,
                    layout.dx,
                    layout.dy,
                    &mut dst[pos..],
                )?;
                dst[4 * slot..4 * slot + 4].copy_from_slice(&(size as u32).to_le_bytes());
                pos += size;
                slot += 1;
            }
        }
        Ok(pos)
    }

    /// Unpack a frame from `src` into `dst` written through `layout`.
    ///
    /// `src` must be exactly the bytes a pack call returned for the same
    /// context parameters; the decoder consumes all of them and rejects
    /// shortfall or surplus.
    pub fn unpack(&mut self, src: &[u8], dst: &mut [u16], layout: PixelLayout) -> Result<()> {
        self.check_layout(dst.len(), layout)?;
        if src.is_empty() {
            return Err(VidpakError::InvalidArgument);
        }

        let table = 4 * self.tile_cols() * self.tile_rows();
        if table > src.len() {
            return Err(VidpakError::InvalidData);
        }
        let mut pos = table;
        let mut slot = 0;
        for ty in (0..self.height).step_by(self.tile_height) {
            for tx in (0..self.width).step_by(self.tile_width) {
                let size = u32::from_le_bytes([
                    src[4 * slot],
                    src[4 * slot + 1],
                    src[4 * slot + 2],
                    src[4 * slot + 3],
                ]) as usize;
                if size > src.len() - pos {
                    return Err(VidpakError::InvalidData);
                }
                let tw = self.tile_width.min(self.width - tx);
                let th = self.tile_height.min(self.height - ty);
                let origin =
                    layout.origin as isize + ty as isize * layout.dy + tx as isize * layout.dx;
                tile::unpack_tile(
                    tw,
                    th,
                    &mut self.diff,
                    &src[pos..pos + size],
                    dst,
                    origin,
                    layout.dx,
                    layout.dy,
                )?;
                pos += size;
                slot += 1;
            }
        }
        if pos != src.len() {
            return Err(VidpakError::InvalidData);
        }
        Ok(())
    }
}
