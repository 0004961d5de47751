use std::borrow::Cow;

use rqrr::PreparedImage;
use scan_relay_common::config::DecoderConfig;
use scan_relay_common::frame::{Frame, PixelFormat};
use scan_relay_common::payload::DecodedPayload;
use tracing::{debug, warn};

/// Symbol recognition over a single frame.
///
/// An empty result means nothing was found; it is not an error.
pub trait Decoder {
    fn decode(&self, frame: &Frame) -> Vec<DecodedPayload>;
}

#[derive(Debug, thiserror::Error)]
pub enum DecoderError {
    #[error("no symbologies enabled")]
    NoSymbologies,
    #[error("unsupported symbology '{0}', supported: qr")]
    UnsupportedSymbology(String),
}

/// QR code decoder backed by rqrr.
#[derive(Debug)]
pub struct QrDecoder;

impl QrDecoder {
    pub fn from_config(config: &DecoderConfig) -> Result<Self, DecoderError> {
        if config.symbologies.is_empty() {
            return Err(DecoderError::NoSymbologies);
        }
        for name in &config.symbologies {
            match name.to_ascii_lowercase().as_str() {
                "qr" | "qrcode" => {}
                _ => return Err(DecoderError::UnsupportedSymbology(name.clone())),
            }
        }
        Ok(Self)
    }
}

impl Decoder for QrDecoder {
    fn decode(&self, frame: &Frame) -> Vec<DecodedPayload> {
        let Some(luma) = to_luma(frame) else {
            warn!(seq = frame.seq(), "frame buffer inconsistent with its size, skipping decode");
            return Vec::new();
        };
        let w = frame.width() as usize;
        let h = frame.height() as usize;

        let mut prepared = PreparedImage::prepare_from_greyscale(w, h, |x, y| luma[y * w + x]);
        let grids = prepared.detect_grids();
        debug!(seq = frame.seq(), grids = grids.len(), "QR grid detection");

        grids
            .iter()
            .filter_map(|grid| match grid.decode() {
                Ok((_meta, content)) => Some(DecodedPayload::new(content)),
                Err(e) => {
                    debug!(seq = frame.seq(), error = ?e, "QR grid failed to decode");
                    None
                }
            })
            .collect()
    }
}

/// Single-channel luminance view of a frame, converting RGB if needed.
pub fn to_luma(frame: &Frame) -> Option<Cow<'_, [u8]>> {
    match frame.format() {
        PixelFormat::Luma8 => Some(Cow::Borrowed(frame.data())),
        PixelFormat::Rgb8 => {
            let rgb = image::RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())?;
            Some(Cow::Owned(image::imageops::grayscale(&rgb).into_raw()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use qrcode::{Color, QrCode};

    const MODULE_PX: usize = 8;
    const QUIET_MODULES: usize = 4;
    const EXTRA_WIDTH: usize = 40;

    /// Draws `content` as a QR code on a white, wider-than-tall luminance canvas.
    fn qr_luma(content: &str) -> (u32, u32, Vec<u8>) {
        let code = QrCode::new(content.as_bytes()).unwrap();
        let modules = code.width();
        let colors = code.to_colors();
        let side = (modules + 2 * QUIET_MODULES) * MODULE_PX;
        let (w, h) = (side + EXTRA_WIDTH, side);

        let mut luma = vec![255u8; w * h];
        for y in 0..h {
            for x in 0..side {
                let mx = (x / MODULE_PX).checked_sub(QUIET_MODULES);
                let my = (y / MODULE_PX).checked_sub(QUIET_MODULES);
                if let (Some(mx), Some(my)) = (mx, my) {
                    if mx < modules && my < modules && colors[my * modules + mx] == Color::Dark {
                        luma[y * w + x] = 0;
                    }
                }
            }
        }
        (w as u32, h as u32, luma)
    }

    fn config(names: &[&str]) -> DecoderConfig {
        DecoderConfig {
            symbologies: names.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn qr_symbology_is_accepted() {
        assert!(QrDecoder::from_config(&config(&["qr"])).is_ok());
        assert!(QrDecoder::from_config(&config(&["QR"])).is_ok());
    }

    #[test]
    fn unknown_symbology_fails_setup() {
        let err = QrDecoder::from_config(&config(&["qr", "ean13"])).unwrap_err();
        assert!(matches!(err, DecoderError::UnsupportedSymbology(ref s) if s == "ean13"));
    }

    #[test]
    fn empty_symbology_list_fails_setup() {
        assert!(matches!(
            QrDecoder::from_config(&config(&[])),
            Err(DecoderError::NoSymbologies)
        ));
    }

    #[test]
    fn luma_frame_is_borrowed_as_is() {
        let frame = Frame::luma(vec![1, 2, 3, 4], 2, 2, 0).unwrap();
        let luma = to_luma(&frame).unwrap();
        assert!(matches!(luma, Cow::Borrowed(_)));
        assert_eq!(&*luma, &[1, 2, 3, 4]);
    }

    #[test]
    fn rgb_frame_converts_to_one_byte_per_pixel() {
        let mut data = Vec::new();
        for _ in 0..6 {
            data.extend_from_slice(&[255, 255, 255]);
        }
        let frame = Frame::rgb(data, 3, 2, 0).unwrap();
        let luma = to_luma(&frame).unwrap();
        assert_eq!(luma.len(), 6);
        assert!(luma.iter().all(|&p| p == 255));
    }

    #[test]
    fn rgb_black_stays_black() {
        let frame = Frame::rgb(vec![0; 2 * 2 * 3], 2, 2, 0).unwrap();
        assert!(to_luma(&frame).unwrap().iter().all(|&p| p == 0));
    }

    #[test]
    fn luma_frame_with_code_yields_its_payload() {
        let decoder = QrDecoder::from_config(&config(&["qr"])).unwrap();
        let (w, h, luma) = qr_luma("ABC123");
        assert_ne!(w, h);
        let frame = Frame::luma(luma, w, h, 16).unwrap();
        assert_eq!(decoder.decode(&frame), vec![DecodedPayload::from("ABC123")]);
    }

    #[test]
    fn rgb_frame_with_code_yields_its_payload() {
        let decoder = QrDecoder::from_config(&config(&["qr"])).unwrap();
        let (w, h, luma) = qr_luma("XYZ 999~");
        let rgb: Vec<u8> = luma.iter().flat_map(|&y| [y, y, y]).collect();
        let frame = Frame::rgb(rgb, w, h, 32).unwrap();
        assert_eq!(decoder.decode(&frame), vec![DecodedPayload::from("XYZ 999~")]);
    }

    #[test]
    fn blank_frame_decodes_to_nothing() {
        let decoder = QrDecoder::from_config(&config(&["qr"])).unwrap();
        let frame = Frame::luma(vec![255; 64 * 48], 64, 48, 1).unwrap();
        assert!(decoder.decode(&frame).is_empty());
    }

    #[test]
    fn blank_rgb_frame_decodes_to_nothing() {
        let decoder = QrDecoder::from_config(&config(&["qr"])).unwrap();
        let frame = Frame::rgb(vec![128; 32 * 32 * 3], 32, 32, 1).unwrap();
        assert!(decoder.decode(&frame).is_empty());
    }
}
