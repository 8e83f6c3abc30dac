use super::{render_rows, Cancelled};
use crate::buffer::PixelBuffer;

/// ITU-R 601 luma on 16-bit expanded samples, rounded back to 8 bits.
///
/// Gray input maps to itself, which makes [`grayscale`] idempotent.
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    let (r, g, b) = (u32::from(r) * 257, u32::from(g) * 257, u32::from(b) * 257);
    ((19595 * r + 38470 * g + 7471 * b + (1 << 15)) >> 24) as u8
}

/// Replace R, G and B with the pixel's luma; alpha passes through.
pub fn grayscale(src: &PixelBuffer) -> PixelBuffer {
    super::Filter::Grayscale.apply(src)
}

pub(super) fn grayscale_until(
    src: &PixelBuffer,
    should_stop: &dyn Fn() -> bool,
) -> Result<PixelBuffer, Cancelled> {
    render_rows(src.width(), src.height(), should_stop, |y, row| {
        for (dst, px) in row.chunks_exact_mut(4).zip(src.row(y).chunks_exact(4)) {
            let l = luma(px[0], px[1], px[2]);
            dst[0] = l;
            dst[1] = l;
            dst[2] = l;
            dst[3] = px[3];
        }
    })
}
