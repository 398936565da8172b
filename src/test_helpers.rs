//! Shared test utilities for the qrsmith test suite.
//!
//! Raster builders for composition tests and a config preset that keeps the
//! label on the built-in font, so pixel assertions don't depend on which
//! system fonts the machine has.

use crate::config::QrConfig;
use image::{Rgba, RgbaImage};

/// Solid-color raster.
pub fn solid(width: u32, height: u32, color: Rgba<u8>) -> RgbaImage {
    RgbaImage::from_pixel(width, height, color)
}

/// Opaque black/white checkerboard of 10px "modules", standing in for a
/// rendered symbol.
pub fn checker_symbol(side: u32) -> RgbaImage {
    RgbaImage::from_fn(side, side, |x, y| {
        if (x / 10 + y / 10) % 2 == 0 {
            Rgba([0, 0, 0, 255])
        } else {
            Rgba([255, 255, 255, 255])
        }
    })
}

/// Stock config with system fonts disabled and URL validation off.
pub fn test_config() -> QrConfig {
    let mut config = QrConfig::default();
    config.label.system_fonts = false;
    config.symbol.require_url = false;
    config
}
