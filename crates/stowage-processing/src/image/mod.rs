//! Image handling for uploads
//!
//! - Format registry mapping extensions to codecs (format)
//! - Watermark compositing (watermark)

pub mod format;
pub mod watermark;

pub use format::{codec_for, Codec};
pub use watermark::{Rewritable, Watermark, WatermarkError, WatermarkPosition};
