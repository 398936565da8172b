//! Symbol encoder trait and shared types.
//!
//! The [`SymbolEncoder`] trait is the seam to the QR standard itself: given a
//! payload, a minimum version and an error-correction level, produce a module
//! matrix. Everything visual happens on this side of the trait.
//!
//! The production implementation is
//! [`QrcodeEncoder`](super::qr_backend::QrcodeEncoder), backed by the `qrcode`
//! crate. Tests use a mock that records calls.

use super::params::EcLevel;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("payload of {len} bytes exceeds QR version 40 capacity at level {level}")]
    CapacityExceeded { len: usize, level: EcLevel },
    #[error("encoder failed: {0}")]
    Encoder(String),
}

/// Square grid of dark/light modules, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleMatrix {
    /// Version the encoder actually used (may exceed the requested one).
    pub version: u8,
    /// Modules per side.
    pub width: usize,
    modules: Vec<bool>,
}

impl ModuleMatrix {
    /// Build a matrix from row-major `dark` flags.
    ///
    /// Returns `None` if `modules.len() != width * width`.
    pub fn new(version: u8, width: usize, modules: Vec<bool>) -> Option<Self> {
        (modules.len() == width * width).then_some(Self {
            version,
            width,
            modules,
        })
    }

    /// True if the module at column `x`, row `y` is dark.
    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        self.modules[y * self.width + x]
    }

    pub fn dark_count(&self) -> usize {
        self.modules.iter().filter(|&&d| d).count()
    }
}

/// QR encoder primitive.
///
/// Implementations must "fit upward": if the payload does not fit in
/// `min_version`, try each larger version up to 40 before giving up with
/// [`EncodeError::CapacityExceeded`].
pub trait SymbolEncoder: Sync {
    fn encode(
        &self,
        payload: &[u8],
        min_version: u8,
        level: EcLevel,
    ) -> Result<ModuleMatrix, EncodeError>;
}
