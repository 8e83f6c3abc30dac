//! The four pixel filters and the row driver they share.

mod blur;
mod grayscale;
mod invert;
mod sobel;

pub use blur::blur;
pub use grayscale::{grayscale, luma};
pub use invert::invert;
pub use sobel::sobel;

use crate::buffer::PixelBuffer;

/// Returned by [`Filter::apply_until`] when the stop predicate fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("filter cancelled")]
pub struct Cancelled;

/// One filter of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    /// 255 − c on R, G and B; alpha unchanged.
    Invert,
    /// Luma replicated over R, G and B; alpha unchanged.
    Grayscale,
    /// Box average over a `2r × 2r` window, zero-padded past the far edges.
    Blur { radius: u32 },
    /// Sobel gradient magnitude of the luma plane, opaque gray output.
    Sobel,
}

impl Filter {
    pub const DEFAULT_BLUR_RADIUS: u32 = 7;

    /// Name recorded in catalog filter histories.
    pub fn name(&self) -> &'static str {
        match self {
            Filter::Invert => "invert",
            Filter::Grayscale => "gray",
            Filter::Blur { .. } => "blur",
            Filter::Sobel => "sobel",
        }
    }

    /// Run the filter to completion.
    pub fn apply(&self, src: &PixelBuffer) -> PixelBuffer {
        match self.apply_until(src, &|| false) {
            Ok(out) => out,
            Err(Cancelled) => unreachable!("a never-stopping filter run cannot be cancelled"),
        }
    }

    /// Run the filter, polling `should_stop` before each output row.
    pub fn apply_until(
        &self,
        src: &PixelBuffer,
        should_stop: &dyn Fn() -> bool,
    ) -> Result<PixelBuffer, Cancelled> {
        match self {
            Filter::Invert => invert::invert_until(src, should_stop),
            Filter::Grayscale => grayscale::grayscale_until(src, should_stop),
            Filter::Blur { radius } => blur::blur_until(src, *radius, should_stop),
            Filter::Sobel => sobel::sobel_until(src, should_stop),
        }
    }
}

/// Allocate an output buffer the size of `width × height` and fill it one
/// row at a time. `fill(y, row)` receives the destination bytes of row `y`.
pub(crate) fn render_rows<F>(
    width: u32,
    height: u32,
    should_stop: &dyn Fn() -> bool,
    mut fill: F,
) -> Result<PixelBuffer, Cancelled>
where
    F: FnMut(u32, &mut [u8]),
{
    let mut out = PixelBuffer::new(width, height);
    let stride = out.stride();
    if stride == 0 {
        return Ok(out);
    }
    for (y, row) in out.data_mut().chunks_exact_mut(stride).enumerate() {
        if should_stop() {
            return Err(Cancelled);
        }
        fill(y as u32, row);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn checker(width: u32, height: u32) -> PixelBuffer {
        let mut buf = PixelBuffer::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let v = ((x * 37 + y * 91) % 256) as u8;
                buf.set(x, y, [v, v.wrapping_mul(3), 255 - v, 200]);
            }
        }
        buf
    }

    #[test]
    fn test_all_filters_preserve_dimensions() {
        let src = checker(7, 5);
        for filter in [
            Filter::Invert,
            Filter::Grayscale,
            Filter::Blur { radius: 2 },
            Filter::Sobel,
        ] {
            let out = filter.apply(&src);
            assert_eq!((out.width(), out.height()), (7, 5), "{}", filter.name());
        }
    }

    #[test]
    fn test_zero_area_in_zero_area_out() {
        for (w, h) in [(0, 0), (0, 4), (4, 0)] {
            let src = PixelBuffer::new(w, h);
            for filter in [
                Filter::Invert,
                Filter::Grayscale,
                Filter::Blur { radius: 7 },
                Filter::Sobel,
            ] {
                let out = filter.apply(&src);
                assert!(out.is_empty());
                assert_eq!((out.width(), out.height()), (w, h));
            }
        }
    }

    #[test]
    fn test_apply_until_stops_early() {
        let src = checker(16, 16);
        let polls = Cell::new(0u32);
        let stop = || {
            polls.set(polls.get() + 1);
            polls.get() > 3
        };
        let result = Filter::Blur { radius: 3 }.apply_until(&src, &stop);
        assert_eq!(result, Err(Cancelled));
        assert_eq!(polls.get(), 4);
    }

    #[test]
    fn test_apply_until_without_stop_matches_apply() {
        let src = checker(9, 6);
        for filter in [Filter::Invert, Filter::Sobel] {
            assert_eq!(filter.apply_until(&src, &|| false), Ok(filter.apply(&src)));
        }
    }

    #[test]
    fn test_filters_are_reentrant_across_threads() {
        let src = checker(32, 32);
        let expected = Filter::Sobel.apply(&src);
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let src = src.clone();
                std::thread::spawn(move || Filter::Sobel.apply(&src))
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    }

    #[test]
    fn test_names() {
        assert_eq!(Filter::Invert.name(), "invert");
        assert_eq!(Filter::Grayscale.name(), "gray");
        assert_eq!(Filter::Blur { radius: 1 }.name(), "blur");
        assert_eq!(Filter::Sobel.name(), "sobel");
    }
}
