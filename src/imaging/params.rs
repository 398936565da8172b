//! Parameter types for symbol rendering and composition.
//!
//! These structs describe *what* to draw, not *how*. They sit between the
//! [`calculations`](super::calculations) (which decide geometry) and the
//! renderer/compositor (which do the pixel work).
//!
//! ## Types
//!
//! - [`EcLevel`]: error-correction level, parsed from its letter code with a fixed default.
//! - [`ResolvedGeometry`]: concrete version, module size and border, derived once per request.
//! - [`Opacity`]: icon alpha multiplier, clamped to `[0, 1]` on construction.

use crate::logging::Logger;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Smallest QR version.
pub const MIN_VERSION: u8 = 1;
/// Largest QR version.
pub const MAX_VERSION: u8 = 40;

/// Largest raster side, in pixels, that rendering or resizing will produce.
pub const MAX_RASTER_SIDE: u32 = 16_384;
/// Largest explicit module size accepted from configuration.
pub const MAX_MODULE_SIZE: u32 = 100;
/// Largest quiet zone, in modules, accepted from configuration.
pub const MAX_BORDER: u32 = 64;

/// QR error-correction level.
///
/// Unrecognized or missing codes map to [`EcLevel::DEFAULT`] (`L`), the lowest
/// level. The same default is used everywhere in the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EcLevel {
    L,
    M,
    Q,
    H,
}

impl EcLevel {
    pub const DEFAULT: EcLevel = EcLevel::L;

    /// Strict parse of a letter code (`"L"`, `"m"`, ...).
    pub fn parse(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "L" => Some(Self::L),
            "M" => Some(Self::M),
            "Q" => Some(Self::Q),
            "H" => Some(Self::H),
            _ => None,
        }
    }

    /// Parse a letter code, falling back to [`EcLevel::DEFAULT`].
    ///
    /// A missing code falls back silently; an unknown one is logged.
    pub fn from_code(code: Option<&str>, log: &dyn Logger) -> Self {
        match code {
            None => Self::DEFAULT,
            Some(c) => Self::parse(c).unwrap_or_else(|| {
                log.warn(&format!(
                    "unknown error correction level '{c}', using {}",
                    Self::DEFAULT
                ));
                Self::DEFAULT
            }),
        }
    }
}

impl fmt::Display for EcLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            EcLevel::L => "L",
            EcLevel::M => "M",
            EcLevel::Q => "Q",
            EcLevel::H => "H",
        };
        f.write_str(c)
    }
}

/// Concrete symbol geometry. Derived once per request and never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedGeometry {
    /// Minimum QR version (1–40). The encoder may bump it if the payload needs more room.
    pub version: u8,
    /// Side length of one module in pixels.
    pub module_size: u32,
    /// Quiet-zone width in modules.
    pub border: u32,
}

/// Icon opacity (0.0 = invisible, 1.0 = as loaded).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "f32", into = "f32")]
pub struct Opacity(f32);

impl Opacity {
    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            return Self(1.0);
        }
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(self) -> f32 {
        self.0
    }
}

impl Default for Opacity {
    fn default() -> Self {
        Self(1.0)
    }
}

impl From<f32> for Opacity {
    fn from(value: f32) -> Self {
        Self::new(value)
    }
}

impl From<Opacity> for f32 {
    fn from(value: Opacity) -> Self {
        value.0
    }
}
