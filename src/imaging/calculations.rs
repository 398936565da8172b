//! Pure calculation functions for symbol geometry and overlay placement.
//!
//! All functions here are pure and testable without any I/O or images, apart
//! from the logger that records clamped overrides.

use super::params::{MAX_RASTER_SIDE, MAX_VERSION, MIN_VERSION, ResolvedGeometry};
use crate::logging::Logger;
use crate::types::{IconPosition, Sizing};

/// Module size for a payload of `len` bytes when none is given.
///
/// Longer payloads need more modules, so each one gets fewer pixels.
pub fn auto_module_size(len: usize) -> u32 {
    match len {
        0..50 => 10,
        50..100 => 8,
        100..200 => 6,
        _ => 4,
    }
}

/// Starting version for a payload of `len` bytes when none is given.
///
/// This is a lower bound: the encoder bumps it if the payload doesn't fit.
pub fn auto_version(len: usize) -> u8 {
    match len {
        0..50 => 1,
        50..100 => 5,
        100..200 => 10,
        _ => 15,
    }
}

/// Derive concrete geometry from payload length and optional overrides.
///
/// Explicit values win over tiering. An explicit version outside 1–40 is
/// clamped to the nearest bound and a module size of 0 becomes 1; both cases
/// are logged as warnings rather than failing the request.
pub fn resolve_geometry(
    payload_len: usize,
    version: Sizing,
    module_size: Sizing,
    border: u32,
    log: &dyn Logger,
) -> ResolvedGeometry {
    let version = match version.fixed() {
        None => auto_version(payload_len),
        Some(v) => {
            let clamped = v.clamp(MIN_VERSION as u32, MAX_VERSION as u32) as u8;
            if clamped as u32 != v {
                log.warn(&format!(
                    "version {v} out of range {MIN_VERSION}-{MAX_VERSION}, using {clamped}"
                ));
            }
            clamped
        }
    };

    let module_size = match module_size.fixed() {
        None => auto_module_size(payload_len),
        Some(0) => {
            log.warn("module size 0 is not positive, using 1");
            1
        }
        Some(n) => n,
    };

    ResolvedGeometry {
        version,
        module_size,
        border,
    }
}

/// Pixel side of a symbol `modules` wide rendered with `geometry`.
///
/// `None` when the arithmetic overflows or the side exceeds
/// [`MAX_RASTER_SIDE`].
pub fn raster_side(modules: usize, geometry: &ResolvedGeometry) -> Option<u32> {
    let modules = u32::try_from(modules).ok()?;
    let side = geometry
        .border
        .checked_mul(2)?
        .checked_add(modules)?
        .checked_mul(geometry.module_size)?;
    (side <= MAX_RASTER_SIDE).then_some(side)
}

/// Fit an icon inside a square box of side `min(width, height) / 5`.
///
/// Aspect ratio is preserved and the icon is never enlarged, so an icon that
/// already fits keeps its size. Returned dimensions are at least 1×1.
pub fn icon_fit_dimensions(canvas: (u32, u32), icon: (u32, u32)) -> (u32, u32) {
    let (cw, ch) = canvas;
    let (iw, ih) = icon;
    let bound = (cw.min(ch) / 5).max(1);

    if iw <= bound && ih <= bound {
        return (iw.max(1), ih.max(1));
    }

    let scale = (bound as f64 / iw as f64).min(bound as f64 / ih as f64);
    let w = ((iw as f64 * scale).round() as u32).clamp(1, bound);
    let h = ((ih as f64 * scale).round() as u32).clamp(1, bound);
    (w, h)
}

/// Top-left pixel at which an icon of size `icon` is pasted.
///
/// - `center`: geometric center
/// - `top-left`: inset by a tenth of each canvas dimension
/// - `bottom-right`: same inset from the bottom-right, with the icon's own
///   extent subtracted so it stays inside the inset
pub fn icon_origin(canvas: (u32, u32), icon: (u32, u32), position: IconPosition) -> (i64, i64) {
    let (cw, ch) = (canvas.0 as i64, canvas.1 as i64);
    let (iw, ih) = (icon.0 as i64, icon.1 as i64);
    match position {
        IconPosition::Center => ((cw - iw) / 2, (ch - ih) / 2),
        IconPosition::TopLeft => (cw / 10, ch / 10),
        IconPosition::BottomRight => (cw - cw / 10 - iw, ch - ch / 10 - ih),
    }
}

/// Top-left pixel for a label of size `text` centered horizontally and
/// anchored `margin` pixels above the bottom edge.
pub fn label_origin(canvas: (u32, u32), text: (u32, u32), margin: u32) -> (i32, i32) {
    let (cw, ch) = (canvas.0 as i64, canvas.1 as i64);
    let (tw, th) = (text.0 as i64, text.1 as i64);
    let x = (cw - tw) / 2;
    let y = ch - th - margin as i64;
    (x as i32, y as i32)
}

/// Interpolation fraction for position `pos` along an axis of `len` pixels.
pub fn gradient_fraction(pos: u32, len: u32) -> f32 {
    if len <= 1 {
        0.0
    } else {
        pos as f32 / (len - 1) as f32
    }
}
