//! Pixelforge-Filters: the pixel buffer and the filter engine.
//!
//! Every filter is a pure, total function from a [`PixelBuffer`] to a new
//! buffer of identical dimensions. Filters share no state, so any number of
//! them may run in parallel over independent buffers.
//!
//! Long-running callers can use [`Filter::apply_until`], which polls a stop
//! predicate once per output row and gives up with [`Cancelled`].
//!
//! # Examples
//!
//! ```
//! use pixelforge_filters::{Filter, PixelBuffer};
//!
//! let white = PixelBuffer::filled(4, 4, [255, 255, 255, 255]);
//! let black = Filter::Invert.apply(&white);
//! assert!(black.pixels().all(|p| p == [0, 0, 0, 255]));
//! ```

pub mod buffer;
pub mod filters;

pub use buffer::{BufferError, PixelBuffer};
pub use filters::{blur, grayscale, invert, luma, sobel, Cancelled, Filter};
