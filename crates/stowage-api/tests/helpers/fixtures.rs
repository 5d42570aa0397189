//! Test fixtures: in-memory images.

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
pub const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

/// PNG of the given size filled with one color.
pub fn solid_png(width: u32, height: u32, color: Rgba<u8>) -> Vec<u8> {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, color));
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .expect("Failed to encode PNG");
    buffer
}
