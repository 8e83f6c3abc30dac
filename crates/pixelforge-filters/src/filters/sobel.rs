use super::grayscale::luma;
use super::{render_rows, Cancelled};
use crate::buffer::PixelBuffer;

const GX: [[i32; 3]; 3] = [[-1, 0, 1], [-2, 0, 2], [-1, 0, 1]];
const GY: [[i32; 3]; 3] = [[-1, -2, -1], [0, 0, 0], [1, 2, 1]];

/// Sobel edge magnitude of the luma plane.
///
/// Neighbours outside the buffer are skipped (they add nothing to either
/// gradient). Output is `clamp(round(sqrt(gx² + gy²)), 0, 255)` replicated to
/// R, G and B with alpha 255.
pub fn sobel(src: &PixelBuffer) -> PixelBuffer {
    super::Filter::Sobel.apply(src)
}

pub(super) fn sobel_until(
    src: &PixelBuffer,
    should_stop: &dyn Fn() -> bool,
) -> Result<PixelBuffer, Cancelled> {
    let width = i64::from(src.width());
    let height = i64::from(src.height());

    let mut plane = Vec::with_capacity((width * height) as usize);
    for y in 0..src.height() {
        if should_stop() {
            return Err(Cancelled);
        }
        plane.extend(
            src.row(y)
                .chunks_exact(4)
                .map(|px| i32::from(luma(px[0], px[1], px[2]))),
        );
    }

    render_rows(src.width(), src.height(), should_stop, |y, row| {
        let y = i64::from(y);
        for (x, dst) in (0..width).zip(row.chunks_exact_mut(4)) {
            let (mut gx, mut gy) = (0i32, 0i32);
            for ky in -1..=1i64 {
                let ny = y + ky;
                if ny < 0 || ny >= height {
                    continue;
                }
                for kx in -1..=1i64 {
                    let nx = x + kx;
                    if nx < 0 || nx >= width {
                        continue;
                    }
                    let intensity = plane[(ny * width + nx) as usize];
                    gx += GX[(ky + 1) as usize][(kx + 1) as usize] * intensity;
                    gy += GY[(ky + 1) as usize][(kx + 1) as usize] * intensity;
                }
            }
            let magnitude = f64::from(gx * gx + gy * gy).sqrt().round();
            let v = magnitude.clamp(0.0, 255.0) as u8;
            dst.copy_from_slice(&[v, v, v, 255]);
        }
    })
}
