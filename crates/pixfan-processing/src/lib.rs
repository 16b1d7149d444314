//! Pixfan Processing Library
//!
//! The image primitive used by the resize worker: decode a source once, then
//! derive each target width by fitting the image inside the
//! `width x round(width * oh / ow)` box and re-encoding it in the configured
//! format. Everything here is synchronous and CPU bound; callers run it on the
//! blocking pool.

pub mod encode;
pub mod error;
pub mod resize;
pub mod source;

pub use encode::encode;
pub use error::ProcessingError;
pub use resize::{resize_to_fit, select_filter};
pub use source::{DerivedOutput, SourceImage};
