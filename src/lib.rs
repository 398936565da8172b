//! # qrsmith
//!
//! Customized QR-code images from text and URL payloads: one at a time, in
//! batches, or as a color-cycling animation.
//!
//! # Architecture: Render, Compose, Write
//!
//! Every generation runs the same three steps:
//!
//! ```text
//! 1. Render   payload  →  base raster   (geometry + EC level → module matrix → pixels)
//! 2. Compose  raster   →  raster        (gradient, corners, icon, label, resize)
//! 3. Write    raster   →  file          (PNG, JPEG, BMP, TIFF, or GIF for animations)
//! ```
//!
//! The QR standard itself sits behind the [`imaging::SymbolEncoder`] trait.
//! Everything visual is plain raster work on this side of it, so tests swap in
//! a mock encoder and check pixels without depending on real QR layouts.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`pipeline`] | Single generation: validate, resolve, render, compose, write |
//! | [`batch`] | Payload sources, per-item isolation, progress events |
//! | [`animate`] | One frame per fill color, looped |
//! | [`writer`] | Raster, GIF and metadata-sidecar persistence |
//! | [`imaging`] | Encoder seam, rasterization, composition, fonts |
//! | [`validate`] | URL and color-spec checks with logged fallbacks |
//! | [`config`] | Layered `qrsmith.toml` loading and validation |
//! | [`logging`] | Injectable logger: `tracing` in the binary, memory in tests |
//! | [`types`] | Small shared enums (`Sizing`, `Rotation`, `OutputFormat`, ...) |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Fail Soft, Per Item
//!
//! Bad colors become black or white, unknown EC codes become `L`, and icons
//! that won't load are skipped. Each substitution leaves a warning. Only
//! capacity and I/O errors fail a generation, and in a batch they fail just
//! that item.
//!
//! ## One Config, No Prompts
//!
//! The pipeline receives a fully built [`config::QrConfig`] and never reads
//! input on its own. The CLI is one front-end; anything that can construct the
//! struct is another.
//!
//! ## Injected Logging
//!
//! Components log through a [`logging::Logger`] passed in by the caller rather
//! than a global. The binary forwards to `tracing`; tests capture records in a
//! [`logging::MemoryLogger`] and assert on them.

pub mod animate;
pub mod batch;
pub mod config;
pub mod imaging;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod types;
pub mod validate;
pub mod writer;

#[cfg(test)]
pub(crate) mod test_helpers;
