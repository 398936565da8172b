//! `qrcode`-crate encoder.
//!
//! Only the bit-level encoding comes from `qrcode` (with its renderer features
//! disabled). The resulting color grid is copied into a [`ModuleMatrix`] and
//! rasterized by [`render_symbol`](super::render::render_symbol).

use super::backend::{EncodeError, ModuleMatrix, SymbolEncoder};
use super::params::{EcLevel, MAX_VERSION, MIN_VERSION};
use qrcode::types::QrError;
use qrcode::{Color, QrCode, Version};

/// Production encoder using the `qrcode` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct QrcodeEncoder;

impl QrcodeEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl From<EcLevel> for qrcode::EcLevel {
    fn from(level: EcLevel) -> Self {
        match level {
            EcLevel::L => qrcode::EcLevel::L,
            EcLevel::M => qrcode::EcLevel::M,
            EcLevel::Q => qrcode::EcLevel::Q,
            EcLevel::H => qrcode::EcLevel::H,
        }
    }
}

impl SymbolEncoder for QrcodeEncoder {
    fn encode(
        &self,
        payload: &[u8],
        min_version: u8,
        level: EcLevel,
    ) -> Result<ModuleMatrix, EncodeError> {
        let start = min_version.clamp(MIN_VERSION, MAX_VERSION);
        for version in start..=MAX_VERSION {
            match QrCode::with_version(payload, Version::Normal(version as i16), level.into()) {
                Ok(code) => {
                    let width = code.width();
                    let modules = code
                        .to_colors()
                        .into_iter()
                        .map(|c| c == Color::Dark)
                        .collect();
                    return ModuleMatrix::new(version, width, modules).ok_or_else(|| {
                        EncodeError::Encoder(format!("non-square matrix at version {version}"))
                    });
                }
                Err(QrError::DataTooLong) => continue,
                Err(e) => return Err(EncodeError::Encoder(e.to_string())),
            }
        }
        Err(EncodeError::CapacityExceeded {
            len: payload.len(),
            level,
        })
    }
}
