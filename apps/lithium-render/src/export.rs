//! Writes finished films to disk as 8 bit images.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use image::{
    codecs::pnm::{PnmEncoder, PnmSubtype, SampleEncoding},
    ExtendedColorType, ImageEncoder, ImageFormat, RgbImage,
};
use lithium::lithium_path_tracer::Film;
use thiserror::Error;

pub const DEFAULT_GAMMA: f32 = 2.2;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("unsupported image extension for {0}, expected png, bmp, jpg or ppm")]
    UnsupportedFormat(PathBuf),
    #[error("gamma must be positive and finite, got {0}")]
    InvalidGamma(f32),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Consumes the final per pixel colors of a render.
pub trait ImageExporter {
    fn export(&self, film: &Film) -> Result<(), ExportError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Png,
    Bmp,
    Jpeg,
    /// Plain text `P3` pixmap.
    Ppm,
}

impl ExportFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "png" => Some(Self::Png),
            "bmp" => Some(Self::Bmp),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "ppm" => Some(Self::Ppm),
            _ => None,
        }
    }
}

/// Exports to a file, the format follows the file extension.
#[derive(Debug, Clone)]
pub struct FileExporter {
    path: PathBuf,
    format: ExportFormat,
    gamma: f32,
}

impl FileExporter {
    pub fn new(path: impl Into<PathBuf>, gamma: f32) -> Result<Self, ExportError> {
        let path = path.into();
        let format = ExportFormat::from_path(&path)
            .ok_or_else(|| ExportError::UnsupportedFormat(path.clone()))?;
        if !(gamma.is_finite() && gamma > 0.0) {
            return Err(ExportError::InvalidGamma(gamma));
        }

        Ok(Self {
            path,
            format,
            gamma,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> ExportFormat {
        self.format
    }
}

impl ImageExporter for FileExporter {
    fn export(&self, film: &Film) -> Result<(), ExportError> {
        puffin::profile_function!();

        let image = to_rgb8(film, self.gamma);
        match self.format {
            ExportFormat::Png => image.save_with_format(&self.path, ImageFormat::Png)?,
            ExportFormat::Bmp => image.save_with_format(&self.path, ImageFormat::Bmp)?,
            ExportFormat::Jpeg => image.save_with_format(&self.path, ImageFormat::Jpeg)?,
            ExportFormat::Ppm => {
                let mut writer = BufWriter::new(File::create(&self.path)?);
                PnmEncoder::new(&mut writer)
                    .with_subtype(PnmSubtype::Pixmap(SampleEncoding::Ascii))
                    .write_image(
                        image.as_raw(),
                        image.width(),
                        image.height(),
                        ExtendedColorType::Rgb8,
                    )?;
                writer.flush()?;
            }
        }

        log::info!(
            "Exported {}x{} image to {}",
            film.width(),
            film.height(),
            self.path.display()
        );
        Ok(())
    }
}

/// Clamps to [0, 1] and gamma encodes, alpha is dropped.
pub fn to_rgb8(film: &Film, gamma: f32) -> RgbImage {
    let inv_gamma = 1.0 / gamma;
    let encode = |c: f32| {
        let c = if c.is_finite() { c.clamp(0.0, 1.0) } else { 0.0 };
        (c.powf(inv_gamma) * 255.0).round() as u8
    };

    RgbImage::from_fn(film.width(), film.height(), |x, y| {
        let p = film.pixel(x, y);
        image::Rgb([encode(p.x), encode(p.y), encode(p.z)])
    })
}

#[cfg(test)]
mod tests {
    use glam::Vec4;

    use super::*;

    fn film() -> Film {
        Film::from_pixels(
            2,
            1,
            vec![
                Vec4::new(0.0, 0.25, 1.0, 1.0),
                Vec4::new(2.0, f32::NAN, -1.0, 1.0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn format_follows_the_extension() {
        let format = |p: &str| ExportFormat::from_path(Path::new(p));
        assert_eq!(format("out.png"), Some(ExportFormat::Png));
        assert_eq!(format("OUT.JPEG"), Some(ExportFormat::Jpeg));
        assert_eq!(format("a/b.ppm"), Some(ExportFormat::Ppm));
        assert_eq!(format("out.exr"), None);
        assert_eq!(format("out"), None);
    }

    #[test]
    fn rejects_bad_settings() {
        assert!(matches!(
            FileExporter::new("out.tga", 2.2),
            Err(ExportError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            FileExporter::new("out.png", 0.0),
            Err(ExportError::InvalidGamma(_))
        ));
    }

    #[test]
    fn clamps_and_gamma_encodes() {
        let linear = to_rgb8(&film(), 1.0);
        assert_eq!(linear.get_pixel(0, 0).0, [0, 64, 255]);
        assert_eq!(linear.get_pixel(1, 0).0, [255, 0, 0]);

        let encoded = to_rgb8(&film(), 2.0);
        assert_eq!(encoded.get_pixel(0, 0).0, [0, 128, 255]);
    }

    #[test]
    fn png_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("film.png");
        FileExporter::new(&path, 1.0).unwrap().export(&film()).unwrap();

        let image = image::open(&path).unwrap().to_rgb8();
        assert_eq!(image.dimensions(), (2, 1));
        assert_eq!(image.get_pixel(0, 0).0, [0, 64, 255]);
    }

    #[test]
    fn ppm_is_plain_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("film.ppm");
        FileExporter::new(&path, 1.0).unwrap().export(&film()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let tokens: Vec<&str> = text
            .lines()
            .filter(|line| !line.starts_with('#'))
            .flat_map(str::split_whitespace)
            .collect();
        assert_eq!(
            tokens,
            ["P3", "2", "1", "255", "0", "64", "255", "255", "0", "0"]
        );
    }
}
