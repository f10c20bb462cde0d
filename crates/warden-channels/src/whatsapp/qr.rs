//! QR code rendering for the pairing flow.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use image::Luma;
use qrcode::{Color, EcLevel, QrCode};
use warden_core::error::WardenError;

fn encode(qr_data: &str) -> Result<QrCode, WardenError> {
    QrCode::with_error_correction_level(qr_data.as_bytes(), EcLevel::L)
        .map_err(|e| WardenError::Channel(format!("QR generation failed: {e}")))
}

/// Render a compact QR code for terminal display.
///
/// Packs two rows of modules into one line using `▀`, `▄`, `█` and space,
/// with a one-module light border so phone cameras find the edges.
pub fn generate_qr_terminal(qr_data: &str) -> Result<String, WardenError> {
    let code = encode(qr_data)?;
    let width = code.width();
    let colors = code.into_colors();
    let padded = width + 2;
    let is_dark = |row: usize, col: usize| -> bool {
        if row == 0 || col == 0 || row > width || col > width {
            return false;
        }
        colors[(row - 1) * width + (col - 1)] == Color::Dark
    };

    let mut out = String::with_capacity(padded * (padded / 2 + 1) * 3);
    for row in (0..padded).step_by(2) {
        for col in 0..padded {
            out.push(match (is_dark(row, col), is_dark(row + 1, col)) {
                (true, true) => '█',
                (true, false) => '▀',
                (false, true) => '▄',
                (false, false) => ' ',
            });
        }
        out.push('\n');
    }
    Ok(out)
}

/// Render the QR code as PNG bytes.
pub fn generate_qr_image(qr_data: &str) -> Result<Vec<u8>, WardenError> {
    let img = encode(qr_data)?
        .render::<Luma<u8>>()
        .quiet_zone(true)
        .min_dimensions(320, 320)
        .build();

    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png)
        .map_err(|e| WardenError::Channel(format!("PNG encoding failed: {e}")))?;
    Ok(buf.into_inner())
}

/// PNG QR code as a `data:` URI, ready for an `<img src>`.
pub fn generate_qr_data_uri(qr_data: &str) -> Result<String, WardenError> {
    let png = generate_qr_image(qr_data)?;
    Ok(format!("data:image/png;base64,{}", BASE64.encode(png)))
}
