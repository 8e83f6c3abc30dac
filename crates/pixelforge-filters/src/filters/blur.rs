use super::{render_rows, Cancelled};
use crate::buffer::PixelBuffer;

/// Box blur with the service's edge policy.
///
/// For pixel (x, y) the window spans `[max(0, x-r), x+r) × [max(0, y-r), y+r)`.
/// Window positions past the right or bottom edge read as transparent black
/// and still count toward the divisor, so pixels near the far edges darken
/// and fade. Channels are averaged independently with truncating division.
/// A radius of 0 returns a copy of the input.
pub fn blur(src: &PixelBuffer, radius: u32) -> PixelBuffer {
    super::Filter::Blur { radius }.apply(src)
}

pub(super) fn blur_until(
    src: &PixelBuffer,
    radius: u32,
    should_stop: &dyn Fn() -> bool,
) -> Result<PixelBuffer, Cancelled> {
    if radius == 0 {
        return Ok(src.clone());
    }

    let width = i64::from(src.width());
    let height = i64::from(src.height());
    let r = i64::from(radius);
    let span = |c: i64| ((c - r).max(0), c + r);

    // Horizontal pass: per-row window sums over the in-bounds columns.
    let mut row_sums = vec![[0u32; 4]; (width * height) as usize];
    let raw = src.as_raw();
    for y in 0..height {
        if should_stop() {
            return Err(Cancelled);
        }
        for x in 0..width {
            let (x0, x1) = span(x);
            let mut acc = [0u32; 4];
            for sx in x0..x1.min(width) {
                let i = ((y * width + sx) * 4) as usize;
                for (c, sum) in acc.iter_mut().enumerate() {
                    *sum += u32::from(raw[i + c]);
                }
            }
            row_sums[(y * width + x) as usize] = acc;
        }
    }

    // Vertical pass over the row sums, divided by the nominal window size.
    render_rows(src.width(), src.height(), should_stop, |y, row| {
        let (y0, y1) = span(i64::from(y));
        for (x, dst) in (0..width).zip(row.chunks_exact_mut(4)) {
            let (x0, x1) = span(x);
            let divisor = ((y1 - y0) * (x1 - x0)) as u64;
            let mut acc = [0u64; 4];
            for sy in y0..y1.min(height) {
                let sums = &row_sums[(sy * width + x) as usize];
                for (total, s) in acc.iter_mut().zip(sums) {
                    *total += u64::from(*s);
                }
            }
            for (d, total) in dst.iter_mut().zip(acc) {
                *d = (total / divisor) as u8;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: [u8; 4] = [255, 255, 255, 255];

    #[test]
    fn test_radius_zero_is_identity() {
        let src = PixelBuffer::filled(3, 3, [1, 2, 3, 4]);
        assert_eq!(blur(&src, 0), src);
    }

    #[test]
    fn test_window_is_left_biased() {
        let src = PixelBuffer::from_raw(3, 1, vec![30, 0, 0, 0, 60, 0, 0, 0, 90, 0, 0, 0])
            .unwrap();
        let out = blur(&src, 1);
        // x=0: [0,1) -> 30; x=1: [0,2) -> (30+60)/2; x=2: [1,3) -> (60+90)/2
        assert_eq!(out.get(0, 0).unwrap()[0], 30);
        assert_eq!(out.get(1, 0).unwrap()[0], 45);
        assert_eq!(out.get(2, 0).unwrap()[0], 75);
    }

    #[test]
    fn test_far_edge_zero_padding_at_corners() {
        let src = PixelBuffer::filled(4, 4, WHITE);
        let out = blur(&src, 4);

        // Near corner: window [0,4)x[0,4), 16 real samples, divisor 16.
        assert_eq!(out.get(0, 0), Some(WHITE));

        // Far corner: window [0,7)x[0,7), 16 real samples, divisor 49.
        // 16 * 255 / 49 = 83, not the 255 a clamp-to-border blur would give.
        assert_eq!(out.get(3, 3), Some([83, 83, 83, 83]));
    }

    #[test]
    fn test_radius_beyond_dimensions_converges_to_padded_average() {
        let src = PixelBuffer::filled(4, 4, WHITE);
        let out = blur(&src, 10);
        // (0,0): window [0,10)x[0,10) -> 4080 / 100
        assert_eq!(out.get(0, 0), Some([40, 40, 40, 40]));
        // (3,3): window [0,13)x[0,13) -> 4080 / 169
        assert_eq!(out.get(3, 3), Some([24, 24, 24, 24]));
        // Every pixel averages the same 16 real samples; only the divisor varies.
        let corner = out.get(3, 3).unwrap()[0];
        assert!(out.pixels().all(|p| p[0] >= corner && p[0] <= 40));
    }

    #[test]
    fn test_interior_of_uniform_buffer_is_unchanged() {
        let src = PixelBuffer::filled(20, 20, [100, 150, 200, 255]);
        let out = blur(&src, 2);
        // Windows fully inside the buffer average identical samples.
        for y in 0..=18 {
            for x in 0..=18 {
                assert_eq!(out.get(x, y), Some([100, 150, 200, 255]), "({x}, {y})");
            }
        }
        // Last column: x-window [17,21) holds one padded column, so 12 of the
        // 16 positions are real samples.
        assert_eq!(out.get(19, 5), Some([75, 112, 150, 191]));
    }
}
