//! Symbol rendering and composition in pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Encode** | `qrcode::QrCode::with_version`, fitted upward |
//! | **Rasterize** | `image::RgbaImage::from_fn` |
//! | **Gradient / mask** | `imageproc` filled shapes + per-pixel blend |
//! | **Icon** | Lanczos3 thumbnail + `imageops::overlay` |
//! | **Label** | `imageproc::drawing::draw_text_mut`, built-in 5×7 fallback |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for geometry and placement math (unit testable)
//! - **Parameters**: EC levels, resolved geometry, opacity
//! - **Backend**: [`SymbolEncoder`] trait + [`QrcodeEncoder`]
//! - **Render / Compose / Text**: raster operations on top of the encoder

pub mod backend;
mod calculations;
pub mod compose;
mod params;
pub mod qr_backend;
pub mod render;
pub mod text;

pub use backend::{EncodeError, ModuleMatrix, SymbolEncoder};
pub use calculations::{auto_module_size, auto_version, raster_side, resolve_geometry};
pub use compose::{
    Composition, GradientFill, IconOverlay, Label, compose, resize_exact,
};
pub use params::{
    EcLevel, MAX_BORDER, MAX_MODULE_SIZE, MAX_RASTER_SIDE, MAX_VERSION, MIN_VERSION, Opacity,
    ResolvedGeometry,
};
pub use qr_backend::QrcodeEncoder;
pub use render::{RenderError, rasterize, render_symbol};
pub use text::{MAX_LABEL_SIZE, MIN_LABEL_SIZE};
