use super::{render_rows, Cancelled};
use crate::buffer::PixelBuffer;

/// Invert R, G and B; alpha passes through.
pub fn invert(src: &PixelBuffer) -> PixelBuffer {
    super::Filter::Invert.apply(src)
}

pub(super) fn invert_until(
    src: &PixelBuffer,
    should_stop: &dyn Fn() -> bool,
) -> Result<PixelBuffer, Cancelled> {
    render_rows(src.width(), src.height(), should_stop, |y, row| {
        for (dst, px) in row.chunks_exact_mut(4).zip(src.row(y).chunks_exact(4)) {
            dst[0] = 255 - px[0];
            dst[1] = 255 - px[1];
            dst[2] = 255 - px[2];
            dst[3] = px[3];
        }
    })
}
