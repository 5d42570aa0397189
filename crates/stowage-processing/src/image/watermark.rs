use image::{imageops, DynamicImage, GenericImageView, RgbaImage};
use std::fmt;
use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::str::FromStr;
use stowage_core::WatermarkSettings;
use tempfile::NamedTempFile;
use thiserror::Error;

use super::format::codec_for;
use crate::validator::{extension_of, normalize_ext};

#[derive(Debug, Error)]
pub enum WatermarkError {
    #[error("Unsupported watermark image type: {0:?}")]
    UnsupportedFormat(String),

    #[error("Invalid watermark position: {0}")]
    InvalidPosition(String),

    #[error(
        "Watermark does not fit the image on the {axis} axis: image {image}px, watermark {watermark}px, padding {padding}px"
    )]
    TooLarge {
        axis: &'static str,
        image: u32,
        watermark: u32,
        padding: u32,
    },

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Watermark position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WatermarkPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
    Center,
}

impl FromStr for WatermarkPosition {
    type Err = WatermarkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "top-left" => Ok(WatermarkPosition::TopLeft),
            "top-right" => Ok(WatermarkPosition::TopRight),
            "bottom-left" => Ok(WatermarkPosition::BottomLeft),
            "bottom-right" => Ok(WatermarkPosition::BottomRight),
            "center" | "centre" => Ok(WatermarkPosition::Center),
            _ => Err(WatermarkError::InvalidPosition(s.to_string())),
        }
    }
}

impl fmt::Display for WatermarkPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WatermarkPosition::TopLeft => "top-left",
            WatermarkPosition::TopRight => "top-right",
            WatermarkPosition::BottomLeft => "bottom-left",
            WatermarkPosition::BottomRight => "bottom-right",
            WatermarkPosition::Center => "center",
        };
        write!(f, "{}", s)
    }
}

/// A stream that can be read, rewound, rewritten and cut to length
pub trait Rewritable: Read + Write + Seek {
    fn truncate(&mut self, len: u64) -> io::Result<()>;
}

impl Rewritable for File {
    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

impl Rewritable for Cursor<Vec<u8>> {
    fn truncate(&mut self, len: u64) -> io::Result<()> {
        let len = usize::try_from(len)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "length overflows usize"))?;
        self.get_mut().truncate(len);
        Ok(())
    }
}

/// A decoded watermark image with its placement
///
/// Immutable once built; reconfiguring means building a new one.
#[derive(Debug, Clone)]
pub struct Watermark {
    image: RgbaImage,
    padding: u32,
    position: WatermarkPosition,
}

impl Watermark {
    pub fn new(image: DynamicImage, padding: u32, position: WatermarkPosition) -> Self {
        Self {
            image: image.to_rgba8(),
            padding,
            position,
        }
    }

    /// Load a watermark from a JPEG, PNG or GIF file
    pub fn open(
        path: impl AsRef<Path>,
        padding: u32,
        position: WatermarkPosition,
    ) -> Result<Self, WatermarkError> {
        let path = path.as_ref();
        let ext = extension_of(&path.to_string_lossy());
        let codec = codec_for(&ext).ok_or(WatermarkError::UnsupportedFormat(ext))?;

        let data = std::fs::read(path)?;
        let image = (codec.decode)(&data)?;

        tracing::debug!(
            path = %path.display(),
            width = image.width(),
            height = image.height(),
            padding,
            position = %position,
            "Watermark loaded"
        );

        Ok(Self::new(image, padding, position))
    }

    pub fn from_settings(settings: &WatermarkSettings) -> Result<Self, WatermarkError> {
        let position = settings.position.parse()?;
        Self::open(&settings.path, settings.padding, position)
    }

    /// Whether images with this extension can be watermarked
    pub fn is_allowed_ext(ext: &str) -> bool {
        codec_for(ext).is_some()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn padding(&self) -> u32 {
        self.padding
    }

    pub fn position(&self) -> WatermarkPosition {
        self.position
    }

    /// Top-left pixel at which the watermark lands on a `width` x `height` image
    pub fn anchor(&self, width: u32, height: u32) -> Result<(i64, i64), WatermarkError> {
        let (ww, wh) = self.image.dimensions();
        let padding = i64::from(self.padding);
        let far_x = i64::from(width) - padding - i64::from(ww);
        let far_y = i64::from(height) - padding - i64::from(wh);

        let (x, y) = match self.position {
            WatermarkPosition::TopLeft => (padding, padding),
            WatermarkPosition::TopRight => (far_x, padding),
            WatermarkPosition::BottomLeft => (padding, far_y),
            WatermarkPosition::BottomRight => (far_x, far_y),
            WatermarkPosition::Center => (far_x / 2, far_y / 2),
        };

        if x < 0 {
            return Err(WatermarkError::TooLarge {
                axis: "x",
                image: width,
                watermark: ww,
                padding: self.padding,
            });
        }
        if y < 0 {
            return Err(WatermarkError::TooLarge {
                axis: "y",
                image: height,
                watermark: wh,
                padding: self.padding,
            });
        }

        Ok((x, y))
    }

    /// Composite the watermark over `img` with alpha-over blending
    pub fn apply(&self, img: &DynamicImage) -> Result<RgbaImage, WatermarkError> {
        let (width, height) = img.dimensions();
        let (x, y) = self.anchor(width, height)?;

        let mut canvas = img.to_rgba8();
        imageops::overlay(&mut canvas, &self.image, x, y);
        Ok(canvas)
    }

    /// Watermark an encoded image and return it re-encoded in the same format
    pub fn mark_bytes(&self, data: &[u8], ext: &str) -> Result<Vec<u8>, WatermarkError> {
        let codec =
            codec_for(ext).ok_or_else(|| WatermarkError::UnsupportedFormat(normalize_ext(ext)))?;
        let source = (codec.decode)(data)?;
        let marked = DynamicImage::ImageRgba8(self.apply(&source)?);
        Ok((codec.encode)(&marked)?)
    }

    /// Watermark a stream in place, rewriting it from offset zero
    pub fn mark<S>(&self, stream: &mut S, ext: &str) -> Result<(), WatermarkError>
    where
        S: Rewritable + ?Sized,
    {
        stream.seek(SeekFrom::Start(0))?;
        let mut data = Vec::new();
        stream.read_to_end(&mut data)?;

        let encoded = self.mark_bytes(&data, ext)?;

        stream.seek(SeekFrom::Start(0))?;
        stream.write_all(&encoded)?;
        stream.truncate(encoded.len() as u64)?;
        stream.flush()?;
        stream.seek(SeekFrom::Start(0))?;
        Ok(())
    }

    /// Watermark a file on disk
    ///
    /// The result is written to a temporary file in the same directory and
    /// renamed over the original, so an interrupted run leaves the original
    /// intact.
    pub fn mark_file(&self, path: impl AsRef<Path>) -> Result<(), WatermarkError> {
        let path = path.as_ref();
        let ext = extension_of(&path.to_string_lossy());
        let data = std::fs::read(path)?;
        let encoded = self.mark_bytes(&data, &ext)?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let permissions = std::fs::metadata(path)?.permissions();

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&encoded)?;
        tmp.as_file().sync_all()?;
        tmp.as_file().set_permissions(permissions)?;
        tmp.persist(path).map_err(|e| WatermarkError::Io(e.error))?;

        tracing::debug!(path = %path.display(), size_bytes = encoded.len(), "Watermarked file in place");
        Ok(())
    }
}
