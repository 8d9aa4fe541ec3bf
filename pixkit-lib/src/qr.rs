//! QR image operations.
//!
//! Rendering text to a raster image and reading it back are collaborator
//! concerns: the pipeline only consumes "render text to a QR PNG" and
//! "decode a QR image to text" through the [`QrRenderer`] and [`QrDecoder`]
//! traits. A `qrcode`-backed renderer ships behind the `qr-codec` feature;
//! decoding implementations are left to the host application.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::errors::PixError;
use crate::fetch::RemoteTokenFetch;
use crate::pipeline::validate_pix_emv_code;
use crate::{Result, ValidationReport, ValidationRequirement};

/// Default minimum pixel size of generated QR images.
pub const DEFAULT_QR_SIZE: u32 = 256;

/// Error correction level requested from the renderer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum QrErrorCorrection {
    /// ~7% recovery.
    Low,
    /// ~15% recovery.
    #[default]
    Medium,
    /// ~25% recovery.
    Quartile,
    /// ~30% recovery.
    High,
}

/// Renders text into a QR PNG image.
pub trait QrRenderer {
    /// Renders `text` as a PNG at least `min_size` pixels on a side.
    fn render_png(&self, text: &str, min_size: u32, level: QrErrorCorrection) -> Result<Vec<u8>>;
}

/// Decodes QR codes out of a raster image.
pub trait QrDecoder {
    /// Returns every QR text found in the image, in detection order.
    fn decode(&self, image: &[u8]) -> Result<Vec<String>>;
}

/// Validates an EMV code, then renders it as a QR PNG.
///
/// The full pipeline runs first - including the trust chain when
/// `requirement` is non-empty - so an invalid code never becomes an image.
pub async fn generate_pix_qr_code_png<F, R>(
    fetcher: &F,
    renderer: &R,
    emv_code: &str,
    requirement: Option<&ValidationRequirement>,
) -> Result<Vec<u8>>
where
    F: RemoteTokenFetch,
    R: QrRenderer,
{
    validate_pix_emv_code(fetcher, emv_code, requirement).await?;
    renderer.render_png(emv_code, DEFAULT_QR_SIZE, QrErrorCorrection::default())
}

/// Like [`generate_pix_qr_code_png`], returning the PNG as plain base64
/// (no data-URL prefix).
pub async fn generate_pix_qr_code_base64<F, R>(
    fetcher: &F,
    renderer: &R,
    emv_code: &str,
    requirement: Option<&ValidationRequirement>,
) -> Result<String>
where
    F: RemoteTokenFetch,
    R: QrRenderer,
{
    let png = generate_pix_qr_code_png(fetcher, renderer, emv_code, requirement).await?;
    Ok(STANDARD.encode(png))
}

/// Decodes a QR image and validates the first EMV code found in it.
pub async fn validate_pix_qr_code_png<F, D>(
    fetcher: &F,
    decoder: &D,
    image: &[u8],
    requirement: Option<&ValidationRequirement>,
) -> Result<ValidationReport>
where
    F: RemoteTokenFetch,
    D: QrDecoder,
{
    if image.is_empty() {
        return Err(PixError::QrDecodeFailed {
            detail: "image is missing or empty".to_string(),
        });
    }

    let texts = decoder.decode(image)?;
    let emv_code = texts.first().ok_or(PixError::QrNotFound)?;

    validate_pix_emv_code(fetcher, emv_code, requirement).await
}

/// [`QrRenderer`] backed by the `qrcode` crate.
#[cfg(feature = "qr-codec")]
#[derive(Clone, Copy, Debug, Default)]
pub struct QrCodeRenderer;

#[cfg(feature = "qr-codec")]
impl QrRenderer for QrCodeRenderer {
    fn render_png(&self, text: &str, min_size: u32, level: QrErrorCorrection) -> Result<Vec<u8>> {
        use qrcode::{Color, EcLevel, QrCode};

        // Standard quiet zone: four modules of margin on every side.
        const QUIET_ZONE: u32 = 4;

        let ec = match level {
            QrErrorCorrection::Low => EcLevel::L,
            QrErrorCorrection::Medium => EcLevel::M,
            QrErrorCorrection::Quartile => EcLevel::Q,
            QrErrorCorrection::High => EcLevel::H,
        };

        let code = QrCode::with_error_correction_level(text.as_bytes(), ec).map_err(|e| {
            PixError::QrRenderFailed {
                detail: e.to_string(),
            }
        })?;

        let modules = code.width() as u32;
        let total = modules + 2 * QUIET_ZONE;
        let scale = min_size.div_ceil(total).max(1);
        let dim = total * scale;

        let mut img = image::GrayImage::from_pixel(dim, dim, image::Luma([255u8]));
        let colors = code.to_colors();
        for (index, color) in colors.iter().enumerate() {
            if *color != Color::Dark {
                continue;
            }
            let mx = (index as u32 % modules + QUIET_ZONE) * scale;
            let my = (index as u32 / modules + QUIET_ZONE) * scale;
            for dy in 0..scale {
                for dx in 0..scale {
                    img.put_pixel(mx + dx, my + dy, image::Luma([0u8]));
                }
            }
        }

        let mut png = Vec::new();
        image::DynamicImage::ImageLuma8(img)
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .map_err(|e| PixError::QrRenderFailed {
                detail: e.to_string(),
            })?;

        Ok(png)
    }
}
