//! Extension to codec registry for the raster formats the watermark handles.

use image::{DynamicImage, ImageFormat, ImageResult};
use std::io::Cursor;

use crate::validator::normalize_ext;

pub type DecodeFn = fn(&[u8]) -> ImageResult<DynamicImage>;
pub type EncodeFn = fn(&DynamicImage) -> ImageResult<Vec<u8>>;

/// Decode and encode functions for one image format
#[derive(Clone, Copy)]
pub struct Codec {
    pub format: ImageFormat,
    pub decode: DecodeFn,
    pub encode: EncodeFn,
}

impl std::fmt::Debug for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Codec").field("format", &self.format).finish()
    }
}

const JPEG: Codec = Codec {
    format: ImageFormat::Jpeg,
    decode: decode_jpeg,
    encode: encode_jpeg,
};

const PNG: Codec = Codec {
    format: ImageFormat::Png,
    decode: decode_png,
    encode: encode_png,
};

const GIF: Codec = Codec {
    format: ImageFormat::Gif,
    decode: decode_gif,
    encode: encode_gif,
};

const REGISTRY: &[(&str, Codec)] = &[
    (".jpg", JPEG),
    (".jpeg", JPEG),
    (".png", PNG),
    (".gif", GIF),
];

/// Look up the codec for an extension (any case, dot optional)
pub fn codec_for(ext: &str) -> Option<&'static Codec> {
    let ext = normalize_ext(ext);
    REGISTRY
        .iter()
        .find(|(registered, _)| *registered == ext)
        .map(|(_, codec)| codec)
}

/// Registered extensions, dotted and lower-case
pub fn supported_extensions() -> impl Iterator<Item = &'static str> {
    REGISTRY.iter().map(|(ext, _)| *ext)
}

fn decode_jpeg(data: &[u8]) -> ImageResult<DynamicImage> {
    image::load_from_memory_with_format(data, ImageFormat::Jpeg)
}

fn decode_png(data: &[u8]) -> ImageResult<DynamicImage> {
    image::load_from_memory_with_format(data, ImageFormat::Png)
}

// First frame only.
fn decode_gif(data: &[u8]) -> ImageResult<DynamicImage> {
    image::load_from_memory_with_format(data, ImageFormat::Gif)
}

fn write(img: &DynamicImage, format: ImageFormat) -> ImageResult<Vec<u8>> {
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), format)?;
    Ok(buffer)
}

// JPEG has no alpha channel.
fn encode_jpeg(img: &DynamicImage) -> ImageResult<Vec<u8>> {
    write(&DynamicImage::ImageRgb8(img.to_rgb8()), ImageFormat::Jpeg)
}

fn encode_png(img: &DynamicImage) -> ImageResult<Vec<u8>> {
    write(img, ImageFormat::Png)
}

fn encode_gif(img: &DynamicImage) -> ImageResult<Vec<u8>> {
    write(&DynamicImage::ImageRgba8(img.to_rgba8()), ImageFormat::Gif)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba, RgbaImage};

    fn sample() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 6, Rgba([10, 200, 30, 255])))
    }

    #[test]
    fn test_codec_lookup() {
        assert_eq!(codec_for(".JPG").unwrap().format, ImageFormat::Jpeg);
        assert_eq!(codec_for("jpeg").unwrap().format, ImageFormat::Jpeg);
        assert_eq!(codec_for(".png").unwrap().format, ImageFormat::Png);
        assert_eq!(codec_for(".gif").unwrap().format, ImageFormat::Gif);
        assert!(codec_for(".webp").is_none());
        assert!(codec_for("").is_none());
    }

    #[test]
    fn test_every_registered_codec_encodes_rgba() {
        for ext in supported_extensions() {
            let codec = codec_for(ext).unwrap();
            let encoded = (codec.encode)(&sample()).unwrap();
            let decoded = (codec.decode)(&encoded).unwrap();
            assert_eq!(decoded.dimensions(), (8, 6), "{}", ext);
        }
    }

    #[test]
    fn test_decode_rejects_wrong_format() {
        let png = (PNG.encode)(&sample()).unwrap();
        assert!((JPEG.decode)(&png).is_err());
    }
}
