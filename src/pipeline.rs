//! Single-item generation: payload in, composed raster (or file) out.
//!
//! ```text
//! payload ──validate──► resolve geometry + EC level ──► render symbol
//!                                                           │
//!                        OutputFile ◄── writer ◄── compose ◄┘
//! ```
//!
//! [`RenderOptions`] is the per-item view of a [`QrConfig`]: everything except
//! the payload and the output path. A batch builds it once and shares it across
//! items. Colors stay as strings here and are resolved (with logged fallbacks)
//! on every render, so a bad color never aborts a generation.

use crate::config::{GradientConfig, IconConfig, QrConfig};
use crate::imaging::{
    Composition, EcLevel, EncodeError, GradientFill, IconOverlay, Label, MAX_RASTER_SIDE,
    RenderError, ResolvedGeometry, SymbolEncoder, compose, render_symbol, resolve_geometry,
};
use crate::logging::Logger;
use crate::types::{OutputFile, OutputFormat, Sizing};
use crate::validate::{DEFAULT_BACKGROUND, DEFAULT_FILL, resolve_color, validate_url};
use crate::writer;
use image::{Rgb, Rgba, RgbaImage};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
    #[error("encoding failed: {0}")]
    Encoding(#[from] EncodeError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl From<RenderError> for GenerateError {
    fn from(e: RenderError) -> Self {
        match e {
            RenderError::Encode(e) => GenerateError::Encoding(e),
            too_large @ RenderError::TooLarge { .. } => {
                GenerateError::InvalidInput(too_large.to_string())
            }
        }
    }
}

/// Label text plus its style.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelOptions {
    pub text: String,
    pub fonts: Vec<PathBuf>,
    pub system_fonts: bool,
    pub size: f32,
    pub color: String,
    pub margin: u32,
}

/// Everything a render needs except the payload.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub fill: String,
    pub background: String,
    /// Raw EC letter code; resolved with [`EcLevel::from_code`].
    pub error_correction: Option<String>,
    pub version: Sizing,
    pub module_size: Sizing,
    pub border: u32,
    pub require_url: bool,
    pub gradient: Option<GradientConfig>,
    /// Corner radius when rounded corners are on.
    pub corner_radius: Option<u32>,
    pub icon: Option<IconConfig>,
    pub label: Option<LabelOptions>,
    pub target_size: Option<(u32, u32)>,
}

impl RenderOptions {
    pub fn from_config(config: &QrConfig) -> Self {
        let label = config.label.text.as_ref().map(|text| LabelOptions {
            text: text.clone(),
            fonts: config.label.fonts.clone(),
            system_fonts: config.label.system_fonts,
            size: config.label.size,
            color: config.label.color.clone(),
            margin: config.label.margin,
        });
        Self {
            fill: config.colors.fill.clone(),
            background: config.colors.background.clone(),
            error_correction: Some(config.symbol.error_correction.clone()),
            version: config.symbol.version,
            module_size: config.symbol.module_size,
            border: config.symbol.border,
            require_url: config.symbol.require_url,
            gradient: config.style.gradient.clone(),
            corner_radius: config
                .style
                .rounded_corners
                .then_some(config.style.corner_radius),
            icon: config.icon.clone(),
            label,
            target_size: config.style.target_size.map(|[w, h]| (w, h)),
        }
    }

    /// Geometry and EC level for a payload of `payload_len` bytes.
    pub fn resolve(&self, payload_len: usize, log: &dyn Logger) -> (ResolvedGeometry, EcLevel) {
        let geometry = resolve_geometry(payload_len, self.version, self.module_size, self.border, log);
        let level = EcLevel::from_code(self.error_correction.as_deref(), log);
        (geometry, level)
    }

    /// Composition steps with every color resolved.
    pub fn composition(&self, log: &dyn Logger) -> Composition {
        let gradient = self.gradient.as_ref().map(|g| GradientFill {
            start: resolve_color(&g.start, DEFAULT_FILL, "gradient start", log),
            end: resolve_color(&g.end, DEFAULT_BACKGROUND, "gradient end", log),
            rotation: g.rotation,
        });
        let icon = self.icon.as_ref().map(|i| IconOverlay {
            path: i.path.clone(),
            position: i.position,
            opacity: i.opacity,
        });
        let label = self.label.as_ref().map(|l| {
            let Rgb([r, g, b]) = resolve_color(&l.color, DEFAULT_FILL, "label", log);
            Label {
                text: l.text.clone(),
                fonts: l.fonts.clone(),
                system_fonts: l.system_fonts,
                size: l.size,
                ink: Rgba([r, g, b, 255]),
                margin: l.margin,
            }
        });
        Composition {
            gradient,
            corner_radius: self.corner_radius,
            icon,
            label,
            target_size: self.target_size,
        }
    }
}

/// One single-mode generation.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub payload: String,
    pub options: RenderOptions,
    pub output_path: PathBuf,
    /// Used when the output path's extension is not a known format.
    pub format: OutputFormat,
}

impl GenerationRequest {
    pub fn from_config(payload: &str, output_path: PathBuf, config: &QrConfig) -> Self {
        Self {
            payload: payload.to_string(),
            options: RenderOptions::from_config(config),
            output_path,
            format: config.output.format,
        }
    }
}

/// Reject empty payloads and, when `require_url` is set, anything that is not
/// a URL with a scheme and host.
pub fn check_payload(payload: &str, require_url: bool, log: &dyn Logger) -> Result<(), GenerateError> {
    if payload.trim().is_empty() {
        log.warn("empty payload rejected");
        return Err(GenerateError::InvalidPayload("payload is empty".into()));
    }
    if require_url && !validate_url(payload, log) {
        return Err(GenerateError::InvalidPayload(format!(
            "'{payload}' is not a URL with a scheme and host"
        )));
    }
    Ok(())
}

/// Render and compose without payload validation.
///
/// Fill and background fall back to black and white when invalid.
pub fn render(
    encoder: &dyn SymbolEncoder,
    payload: &str,
    options: &RenderOptions,
    log: &dyn Logger,
) -> Result<RgbaImage, GenerateError> {
    let fill = resolve_color(&options.fill, DEFAULT_FILL, "fill", log);
    let background = resolve_color(&options.background, DEFAULT_BACKGROUND, "background", log);
    render_with_colors(encoder, payload, options, fill, background, log)
}

pub(crate) fn render_with_colors(
    encoder: &dyn SymbolEncoder,
    payload: &str,
    options: &RenderOptions,
    fill: Rgb<u8>,
    background: Rgb<u8>,
    log: &dyn Logger,
) -> Result<RgbaImage, GenerateError> {
    if let Some((w, h)) = options.target_size {
        if w == 0 || h == 0 || w > MAX_RASTER_SIDE || h > MAX_RASTER_SIDE {
            return Err(GenerateError::InvalidInput(format!(
                "target size {w}x{h} must be between 1 and {MAX_RASTER_SIDE} pixels per side"
            )));
        }
    }
    let (geometry, level) = options.resolve(payload.len(), log);
    log.debug(&format!(
        "rendering {} bytes at version>={} module={}px border={} ec={level}",
        payload.len(),
        geometry.version,
        geometry.module_size,
        geometry.border
    ));
    let base = render_symbol(encoder, payload, &geometry, level, fill, background)?;
    Ok(compose(base, &options.composition(log), log))
}

/// Validate the payload, then render and compose it.
pub fn generate(
    encoder: &dyn SymbolEncoder,
    payload: &str,
    options: &RenderOptions,
    log: &dyn Logger,
) -> Result<RgbaImage, GenerateError> {
    check_payload(payload, options.require_url, log)?;
    render(encoder, payload, options, log)
}

/// Generate and write one file.
///
/// The format comes from the output path's extension when it names a known
/// format, otherwise from `request.format`.
pub fn generate_to_file(
    encoder: &dyn SymbolEncoder,
    request: &GenerationRequest,
    log: &dyn Logger,
) -> Result<OutputFile, GenerateError> {
    let options = &request.options;
    check_payload(&request.payload, options.require_url, log)?;
    let fill = resolve_color(&options.fill, DEFAULT_FILL, "fill", log);
    let background = resolve_color(&options.background, DEFAULT_BACKGROUND, "background", log);
    let img = render_with_colors(encoder, &request.payload, options, fill, background, log)?;
    let format = OutputFormat::for_path(&request.output_path, request.format);
    let written = writer::save_raster(&img, &request.output_path, format, background)?;
    log.info(&format!(
        "wrote {} ({format})",
        written.path.display()
    ));
    Ok(written)
}
