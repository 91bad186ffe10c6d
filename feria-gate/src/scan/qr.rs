//! QR code decoder backed by `rqrr`

use tracing::trace;

use super::{CodeDecoder, DecodeAttempt, Window};
use crate::camera::Frame;

/// Decodes QR codes in the scan window
#[derive(Debug, Clone, Copy, Default)]
pub struct QrDecoder;

impl CodeDecoder for QrDecoder {
    fn decode(&self, frame: &Frame, window: Window) -> DecodeAttempt {
        if window.width == 0 || window.height == 0 {
            return DecodeAttempt::NotFound;
        }

        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            window.width as usize,
            window.height as usize,
            |x, y| frame.pixel(window.x + x as u32, window.y + y as u32),
        );

        let mut payloads: Vec<String> = prepared
            .detect_grids()
            .iter()
            .filter_map(|grid| match grid.decode() {
                Ok((_meta, content)) => Some(content),
                Err(e) => {
                    trace!("QR grid found but not decodable: {:?}", e);
                    None
                }
            })
            .collect();

        payloads.sort();
        payloads.dedup();

        match payloads.len() {
            0 => DecodeAttempt::NotFound,
            1 => DecodeAttempt::Found(payloads.remove(0)),
            n => DecodeAttempt::Ambiguous(n),
        }
    }
}
