//! QR code artifact generation.

use std::fmt;
use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use qrcode::types::QrError;
use qrcode::{EcLevel, QrCode};

/// Rendering options for generated QR images.
#[derive(Debug, Clone)]
pub struct QrConfig {
    /// Pixels per QR module.
    pub module_size: u32,
    /// Quiet-zone width around the symbol, in modules.
    pub border: u32,
    /// Error correction level.
    pub ec_level: EcLevel,
}

impl Default for QrConfig {
    fn default() -> Self {
        Self {
            module_size: 8,
            border: 4,
            ec_level: EcLevel::M,
        }
    }
}

/// Errors that can occur while producing a QR image.
#[derive(Debug)]
pub enum GenerationError {
    /// The input cannot be encoded as a QR symbol (e.g. it exceeds the
    /// maximum symbol capacity).
    Encode(QrError),
    /// The module matrix could not be rendered to PNG.
    Render(image::ImageError),
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encode(e) => write!(f, "QR encoding failed: {e}"),
            Self::Render(e) => write!(f, "QR image rendering failed: {e}"),
        }
    }
}

impl std::error::Error for GenerationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Encode(e) => Some(e),
            Self::Render(e) => Some(e),
        }
    }
}

impl From<QrError> for GenerationError {
    fn from(e: QrError) -> Self {
        Self::Encode(e)
    }
}

impl From<image::ImageError> for GenerationError {
    fn from(e: image::ImageError) -> Self {
        Self::Render(e)
    }
}

/// Encode `text` as a QR code and render it to PNG bytes.
///
/// Deterministic: the same text and config always produce identical bytes.
pub fn generate(text: &str, config: &QrConfig) -> Result<Vec<u8>, GenerationError> {
    let code = QrCode::with_error_correction_level(text, config.ec_level)?;
    let colors = code.to_colors();
    let modules = code.width() as u32;

    let scale = config.module_size.max(1);
    let size = (modules + 2 * config.border) * scale;

    let mut img = GrayImage::from_pixel(size, size, Luma([255u8]));
    for (i, color) in colors.iter().enumerate() {
        if *color != qrcode::Color::Dark {
            continue;
        }
        let x = (i as u32 % modules + config.border) * scale;
        let y = (i as u32 / modules + config.border) * scale;
        for dy in 0..scale {
            for dx in 0..scale {
                img.put_pixel(x + dx, y + dy, Luma([0u8]));
            }
        }
    }

    let mut png = Vec::new();
    DynamicImage::ImageLuma8(img).write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(png)
}
