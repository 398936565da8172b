//! Generation configuration.
//!
//! One [`QrConfig`] carries every setting a generation needs except the payload
//! and the output path. The CLI builds it once and hands the whole structure to
//! the pipeline, and a batch shares it across every item. The pipeline never
//! prompts for anything.
//!
//! ## Config File
//!
//! Settings are read from `qrsmith.toml` in the config directory (the current
//! directory by default). The file is sparse: stock defaults are the base layer
//! and user values override them key by key.
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [symbol]
//! error_correction = "L"    # L, M, Q or H; anything else falls back to L
//! version = "auto"          # "auto" or 1-40 (a minimum; bumped if the payload needs it)
//! module_size = "auto"      # "auto" or pixels per module
//! border = 4                # quiet zone in modules (0 = borderless)
//! require_url = true        # reject payloads that are not URLs with a host
//!
//! [colors]
//! fill = "black"            # named color or #RRGGBB
//! background = "white"
//!
//! [style]
//! rounded_corners = false
//! corner_radius = 20
//! # target_size = [300, 300]
//!
//! # [style.gradient]
//! # start = "#ff0000"
//! # end = "#0000ff"
//! # rotation = 0            # 0 = top to bottom, 90 = left to right
//!
//! # [icon]
//! # path = "logo.png"
//! # position = "center"     # center, top-left, bottom-right
//! # opacity = 1.0
//!
//! [label]
//! # text = "Scan me"
//! fonts = []
//! system_fonts = true
//! size = 24.0
//! color = "black"
//! margin = 10
//!
//! [output]
//! format = "png"            # png, jpeg, bmp, tiff
//!
//! [batch]
//! prefix = "qr"
//! output_dir = "qr_codes"
//! parallel = false
//! # max_threads = 4         # omit for auto = CPU cores
//! csv_has_header = false
//! # metadata = "Spring campaign"
//!
//! [animation]
//! colors = ["black", "red", "blue", "green"]
//! frame_duration_ms = 500
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{
    MAX_BORDER, MAX_LABEL_SIZE, MAX_MODULE_SIZE, MAX_RASTER_SIDE, Opacity,
};
use crate::types::{IconPosition, OutputFormat, Rotation, Sizing};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name looked up in the config directory.
pub const CONFIG_FILENAME: &str = "qrsmith.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Complete generation configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QrConfig {
    /// Encoding and geometry settings.
    pub symbol: SymbolConfig,
    /// Fill and background colors.
    pub colors: ColorsConfig,
    /// Gradient, corners and final size.
    pub style: StyleConfig,
    /// Optional logo overlay.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<IconConfig>,
    /// Optional text label and its style.
    pub label: LabelConfig,
    /// Output container format.
    pub output: OutputConfig,
    /// Batch naming and execution.
    pub batch: BatchConfig,
    /// Animated output.
    pub animation: AnimationConfig,
}

impl QrConfig {
    /// Validate values that cannot be fixed up at generation time.
    ///
    /// Colors, EC codes and out-of-range versions are *not* checked here: the
    /// pipeline substitutes defaults for those and logs the substitution.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some([w, h]) = self.style.target_size {
            if w == 0 || h == 0 {
                return Err(ConfigError::Validation(
                    "style.target_size values must be non-zero".into(),
                ));
            }
            if w > MAX_RASTER_SIDE || h > MAX_RASTER_SIDE {
                return Err(ConfigError::Validation(format!(
                    "style.target_size values must be at most {MAX_RASTER_SIDE}"
                )));
            }
        }
        if let Some(n) = self.symbol.module_size.fixed() {
            if n > MAX_MODULE_SIZE {
                return Err(ConfigError::Validation(format!(
                    "symbol.module_size must be at most {MAX_MODULE_SIZE}"
                )));
            }
        }
        if self.symbol.border > MAX_BORDER {
            return Err(ConfigError::Validation(format!(
                "symbol.border must be at most {MAX_BORDER}"
            )));
        }
        if !(self.label.size > 0.0 && self.label.size <= MAX_LABEL_SIZE) {
            return Err(ConfigError::Validation(format!(
                "label.size must be positive and at most {MAX_LABEL_SIZE}"
            )));
        }
        if self.batch.prefix.is_empty() || self.batch.prefix.contains(['/', '\\']) {
            return Err(ConfigError::Validation(
                "batch.prefix must be a non-empty file name prefix".into(),
            ));
        }
        if self.animation.colors.is_empty() {
            return Err(ConfigError::Validation(
                "animation.colors must not be empty".into(),
            ));
        }
        if self.animation.frame_duration_ms == 0 {
            return Err(ConfigError::Validation(
                "animation.frame_duration_ms must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Encoding and geometry settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SymbolConfig {
    /// Error-correction letter code. Unknown codes fall back to `L`.
    pub error_correction: String,
    /// Minimum QR version, or auto from payload length.
    pub version: Sizing,
    /// Pixels per module, or auto from payload length.
    pub module_size: Sizing,
    /// Quiet-zone width in modules.
    pub border: u32,
    /// Only accept payloads that are URLs with a scheme and host.
    pub require_url: bool,
}

impl Default for SymbolConfig {
    fn default() -> Self {
        Self {
            error_correction: "L".to_string(),
            version: Sizing::Auto,
            module_size: Sizing::Auto,
            border: 4,
            require_url: true,
        }
    }
}

/// Fill and background colors (named color or `#RRGGBB`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColorsConfig {
    pub fill: String,
    pub background: String,
}

impl Default for ColorsConfig {
    fn default() -> Self {
        Self {
            fill: "black".to_string(),
            background: "white".to_string(),
        }
    }
}

/// Visual style applied after rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StyleConfig {
    /// Mask the symbol to a rounded rectangle.
    pub rounded_corners: bool,
    /// Corner radius in pixels (used when `rounded_corners` is on).
    pub corner_radius: u32,
    /// Final `[width, height]`; omitted keeps the native size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_size: Option<[u32; 2]>,
    /// Optional two-color gradient blended over the symbol.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gradient: Option<GradientConfig>,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            rounded_corners: false,
            corner_radius: 20,
            target_size: None,
            gradient: None,
        }
    }
}

/// Two-color gradient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GradientConfig {
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub rotation: Rotation,
}

/// Logo overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IconConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub position: IconPosition,
    #[serde(default)]
    pub opacity: Opacity,
}

/// Text label and its style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LabelConfig {
    /// Label text; omitted means no label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Preferred TrueType fonts, tried in order.
    pub fonts: Vec<PathBuf>,
    /// Try installed system fonts before the built-in bitmap font.
    pub system_fonts: bool,
    /// Pixel size.
    pub size: f32,
    /// Ink color.
    pub color: String,
    /// Gap above the bottom edge in pixels.
    pub margin: u32,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            text: None,
            fonts: Vec::new(),
            system_fonts: true,
            size: 24.0,
            color: "black".to_string(),
            margin: 10,
        }
    }
}

/// Output container format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub format: OutputFormat,
}

/// Batch naming and execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchConfig {
    /// Output names are `{prefix}_{index}`.
    pub prefix: String,
    /// Directory receiving batch outputs.
    pub output_dir: PathBuf,
    /// Render items on the rayon pool instead of one after another.
    pub parallel: bool,
    /// Upper bound on rayon workers when `parallel` is on. `None` uses every
    /// core; larger values are clamped to the core count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_threads: Option<usize>,
    /// Skip the first row of CSV sources.
    pub csv_has_header: bool,
    /// Free-form text written to a `{name}_metadata.txt` sidecar per item.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            prefix: "qr".to_string(),
            output_dir: PathBuf::from("qr_codes"),
            parallel: false,
            max_threads: None,
            csv_has_header: false,
            metadata: None,
        }
    }
}

/// Animated (GIF) output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnimationConfig {
    /// One frame per color, in order.
    pub colors: Vec<String>,
    /// How long each frame is shown.
    pub frame_duration_ms: u32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            colors: ["black", "red", "blue", "green"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            frame_duration_ms: 500,
        }
    }
}

/// Resolve the rayon worker count for parallel batches.
///
/// Caps at the number of available cores: the config can constrain down, not up.
pub fn effective_threads(config: &BatchConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_threads.map(|n| n.clamp(1, cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(QrConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `qrsmith.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the directory has no config file.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<QrConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: QrConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `qrsmith.toml` in `dir`, layered over stock defaults.
pub fn load_config(dir: &Path) -> Result<QrConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(dir)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `qrsmith.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# qrsmith configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.

# ---------------------------------------------------------------------------
# Symbol encoding
# ---------------------------------------------------------------------------
[symbol]
# Error correction: L (7%), M (15%), Q (25%), H (30%).
# Unrecognized codes fall back to L.
error_correction = "L"

# Minimum QR version (1-40) or "auto" (picked from payload length).
# Payloads that don't fit are moved up to the next version that holds them.
version = "auto"

# Pixels per module (at most 100), or "auto" (smaller modules for longer payloads).
module_size = "auto"

# Quiet zone width in modules (at most 64). 0 = borderless.
border = 4

# Reject payloads that are not URLs with a scheme and host.
require_url = true

# ---------------------------------------------------------------------------
# Colors: a CSS color name or #RRGGBB. Invalid values fall back to the
# defaults with a warning.
# ---------------------------------------------------------------------------
[colors]
fill = "black"
background = "white"

# ---------------------------------------------------------------------------
# Style
# ---------------------------------------------------------------------------
[style]
rounded_corners = false
corner_radius = 20

# Final [width, height] in pixels, at most 16384 each. Applied after every other step.
# target_size = [300, 300]

# Two-color gradient blended at 50% over the symbol.
# [style.gradient]
# start = "#ff0000"
# end = "#0000ff"
# rotation = 0             # 0 = top to bottom, 90 = left to right

# ---------------------------------------------------------------------------
# Logo overlay. Scaled to fit a fifth of the symbol, never enlarged.
# A missing or unreadable file is skipped with a warning.
# ---------------------------------------------------------------------------
# [icon]
# path = "logo.png"
# position = "center"      # center, top-left, bottom-right
# opacity = 1.0            # 0.0 - 1.0

# ---------------------------------------------------------------------------
# Text label, centered near the bottom edge
# ---------------------------------------------------------------------------
[label]
# text = "Scan me"
# TrueType fonts to try first, in order.
fonts = []
# Then look for an installed sans-serif font; the built-in bitmap font is the last resort.
system_fonts = true
# Pixel size, at most 1000.
size = 24.0
color = "black"
margin = 10

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
format = "png"             # png, jpeg, bmp, tiff

# ---------------------------------------------------------------------------
# Batch mode: files are named {prefix}_{index}.{ext}
# ---------------------------------------------------------------------------
[batch]
prefix = "qr"
output_dir = "qr_codes"
# Render items in parallel. Indices and per-item results keep input order.
parallel = false
# Maximum parallel workers. Omit to use every CPU core.
# max_threads = 4
# Skip the first row of CSV input.
csv_has_header = false
# Written with the payload to {prefix}_{index}_metadata.txt.
# metadata = "Spring campaign"

# ---------------------------------------------------------------------------
# Animation: one frame per color, looping forever
# ---------------------------------------------------------------------------
[animation]
colors = ["black", "red", "blue", "green"]
frame_duration_ms = 500
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = QrConfig::default();
        assert_eq!(config.symbol.error_correction, "L");
        assert_eq!(config.symbol.version, Sizing::Auto);
        assert_eq!(config.symbol.border, 4);
        assert_eq!(config.colors.fill, "black");
        assert_eq!(config.colors.background, "white");
        assert_eq!(config.style.corner_radius, 20);
        assert!(config.icon.is_none());
        assert_eq!(config.output.format, OutputFormat::Png);
        assert_eq!(config.batch.prefix, "qr");
        assert_eq!(config.animation.frame_duration_ms, 500);
    }

    #[test]
    fn default_config_validates() {
        assert!(QrConfig::default().validate().is_ok());
    }

    #[test]
    fn parse_partial_config() {
        let toml = r##"
[colors]
fill = "#123456"

[symbol]
version = 7
"##;
        let config: QrConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.colors.fill, "#123456");
        assert_eq!(config.colors.background, "white");
        assert_eq!(config.symbol.version, Sizing::Fixed(7));
        assert_eq!(config.symbol.module_size, Sizing::Auto);
    }

    #[test]
    fn parse_icon_and_gradient() {
        let toml = r##"
[style.gradient]
start = "red"
end = "blue"
rotation = 90

[icon]
path = "logo.png"
position = "bottom-right"
opacity = 1.7
"##;
        let config: QrConfig = toml::from_str(toml).unwrap();
        let gradient = config.style.gradient.unwrap();
        assert_eq!(gradient.rotation, Rotation::Horizontal);
        let icon = config.icon.unwrap();
        assert_eq!(icon.position, IconPosition::BottomRight);
        // Opacity is clamped on construction
        assert_eq!(icon.opacity.value(), 1.0);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result: Result<QrConfig, _> = toml::from_str("[symbol]\nverison = 3\n");
        assert!(result.is_err());
    }

    #[test]
    fn bad_rotation_is_rejected() {
        let toml = "[style.gradient]\nstart = \"red\"\nend = \"blue\"\nrotation = 45\n";
        assert!(toml::from_str::<QrConfig>(toml).is_err());
    }

    #[test]
    fn stock_config_toml_parses_to_defaults() {
        let config: QrConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, QrConfig::default());
    }

    #[test]
    fn stock_defaults_value_round_trips() {
        let config = resolve_config(stock_defaults_value(), None).unwrap();
        assert_eq!(config, QrConfig::default());
    }

    #[test]
    fn merge_toml_overrides_nested_keys() {
        let base: toml::Value = toml::from_str("[a]\nx = 1\ny = 2\n").unwrap();
        let overlay: toml::Value = toml::from_str("[a]\ny = 3\n").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["a"]["x"].as_integer(), Some(1));
        assert_eq!(merged["a"]["y"].as_integer(), Some(3));
    }

    #[test]
    fn validation_rejects_zero_target_size() {
        let mut config = QrConfig::default();
        config.style.target_size = Some([300, 0]);
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validation_rejects_oversized_geometry() {
        let mut config = QrConfig::default();
        config.symbol.module_size = Sizing::Fixed(200_000_000);
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        let mut config = QrConfig::default();
        config.symbol.border = 1_000;
        assert!(config.validate().is_err());

        let mut config = QrConfig::default();
        config.style.target_size = Some([100_000, 300]);
        assert!(config.validate().is_err());

        let mut config = QrConfig::default();
        config.symbol.module_size = Sizing::Fixed(MAX_MODULE_SIZE);
        config.symbol.border = MAX_BORDER;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validation_rejects_huge_label_size() {
        let mut config = QrConfig::default();
        config.label.size = 1.0e9;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
        config.label.size = MAX_LABEL_SIZE;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validation_rejects_prefix_with_separator() {
        let mut config = QrConfig::default();
        config.batch.prefix = "out/qr".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validation_rejects_empty_animation() {
        let mut config = QrConfig::default();
        config.animation.colors.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn effective_threads_auto_uses_all_cores() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&BatchConfig::default()), cores);
    }

    #[test]
    fn effective_threads_clamped_to_cores() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let config = BatchConfig {
            max_threads: Some(99999),
            ..BatchConfig::default()
        };
        assert_eq!(effective_threads(&config), cores);

        let config = BatchConfig {
            max_threads: Some(0),
            ..BatchConfig::default()
        };
        assert_eq!(effective_threads(&config), 1);
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config, QrConfig::default());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILENAME),
            r##"
[symbol]
error_correction = "H"
border = 0

[batch]
prefix = "ticket"
"##,
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.symbol.error_correction, "H");
        assert_eq!(config.symbol.border, 0);
        assert_eq!(config.batch.prefix, "ticket");
        // Unspecified values stay at defaults
        assert_eq!(config.batch.output_dir, PathBuf::from("qr_codes"));
        assert_eq!(config.colors.fill, "black");
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILENAME), "[symbol\nborder = ").unwrap();
        assert!(matches!(
            load_config(tmp.path()),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn load_config_validation_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILENAME),
            "[animation]\nframe_duration_ms = 0\n",
        )
        .unwrap();
        assert!(matches!(
            load_config(tmp.path()),
            Err(ConfigError::Validation(_))
        ));
    }
}
