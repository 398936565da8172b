//! Shared types used across the pipeline, the batch runner and the config.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// A setting that is either derived from the payload (`"auto"`) or fixed.
///
/// In TOML: `version = "auto"` or `version = 7`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawSizing", into = "RawSizing")]
pub enum Sizing {
    #[default]
    Auto,
    Fixed(u32),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawSizing {
    Fixed(u32),
    Keyword(String),
}

impl TryFrom<RawSizing> for Sizing {
    type Error = String;

    fn try_from(raw: RawSizing) -> Result<Self, Self::Error> {
        match raw {
            RawSizing::Fixed(n) => Ok(Sizing::Fixed(n)),
            RawSizing::Keyword(k) if k.eq_ignore_ascii_case("auto") => Ok(Sizing::Auto),
            RawSizing::Keyword(k) => Err(format!("expected \"auto\" or a number, got \"{k}\"")),
        }
    }
}

impl From<Sizing> for RawSizing {
    fn from(s: Sizing) -> Self {
        match s {
            Sizing::Auto => RawSizing::Keyword("auto".to_string()),
            Sizing::Fixed(n) => RawSizing::Fixed(n),
        }
    }
}

impl Sizing {
    pub fn fixed(self) -> Option<u32> {
        match self {
            Sizing::Auto => None,
            Sizing::Fixed(n) => Some(n),
        }
    }
}

/// Gradient direction. Only the two axis-aligned directions exist.
///
/// `0` varies top → bottom (a vertical gradient); `90` varies left → right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum Rotation {
    #[default]
    Vertical,
    Horizontal,
}

impl TryFrom<u16> for Rotation {
    type Error = String;

    fn try_from(degrees: u16) -> Result<Self, Self::Error> {
        match degrees {
            0 => Ok(Rotation::Vertical),
            90 => Ok(Rotation::Horizontal),
            other => Err(format!("gradient rotation must be 0 or 90, got {other}")),
        }
    }
}

impl From<Rotation> for u16 {
    fn from(r: Rotation) -> Self {
        match r {
            Rotation::Vertical => 0,
            Rotation::Horizontal => 90,
        }
    }
}

/// Where the icon is pasted on the symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IconPosition {
    #[default]
    Center,
    TopLeft,
    BottomRight,
}

/// Raster container format for written files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
    Jpeg,
    Bmp,
    Tiff,
}

impl OutputFormat {
    /// Match a file extension (case-insensitive, without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "bmp" => Some(Self::Bmp),
            "tif" | "tiff" => Some(Self::Tiff),
            _ => None,
        }
    }

    /// Format implied by `path`'s extension, or `fallback` if it has none we know.
    pub fn for_path(path: &Path, fallback: Self) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
            .unwrap_or(fallback)
    }

    /// Canonical extension written for batch outputs.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
        }
    }

    pub fn image_format(self) -> image::ImageFormat {
        match self {
            Self::Png => image::ImageFormat::Png,
            Self::Jpeg => image::ImageFormat::Jpeg,
            Self::Bmp => image::ImageFormat::Bmp,
            Self::Tiff => image::ImageFormat::Tiff,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Png => "PNG",
            Self::Jpeg => "JPEG",
            Self::Bmp => "BMP",
            Self::Tiff => "TIFF",
        };
        f.write_str(name)
    }
}

/// A file the writer persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputFile {
    pub path: PathBuf,
    pub format: OutputFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, Serialize)]
    struct Holder {
        version: Sizing,
        rotation: Rotation,
        position: IconPosition,
        format: OutputFormat,
    }

    #[test]
    fn sizing_parses_auto_and_numbers() {
        let h: Holder = toml::from_str(
            r#"
version = "auto"
rotation = 90
position = "top-left"
format = "jpeg"
"#,
        )
        .unwrap();
        assert_eq!(h.version, Sizing::Auto);
        assert_eq!(h.rotation, Rotation::Horizontal);
        assert_eq!(h.position, IconPosition::TopLeft);
        assert_eq!(h.format, OutputFormat::Jpeg);

        let h: Holder = toml::from_str(
            r#"
version = 7
rotation = 0
position = "bottom-right"
format = "png"
"#,
        )
        .unwrap();
        assert_eq!(h.version, Sizing::Fixed(7));
        assert_eq!(h.rotation, Rotation::Vertical);
        assert_eq!(h.position, IconPosition::BottomRight);
    }

    #[test]
    fn sizing_rejects_other_words() {
        let result: Result<Holder, _> = toml::from_str(
            r#"
version = "big"
rotation = 0
position = "center"
format = "png"
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn rotation_rejects_diagonals() {
        assert!(Rotation::try_from(45).is_err());
        assert_eq!(u16::from(Rotation::Horizontal), 90);
    }

    #[test]
    fn sizing_round_trips_through_toml() {
        let h = Holder {
            version: Sizing::Auto,
            rotation: Rotation::Vertical,
            position: IconPosition::Center,
            format: OutputFormat::Tiff,
        };
        let text = toml::to_string(&h).unwrap();
        assert!(text.contains("version = \"auto\""));
        assert!(text.contains("rotation = 0"));
        assert!(text.contains("format = \"tiff\""));
    }

    #[test]
    fn output_format_from_extension() {
        assert_eq!(OutputFormat::from_extension("PNG"), Some(OutputFormat::Png));
        assert_eq!(OutputFormat::from_extension("jpg"), Some(OutputFormat::Jpeg));
        assert_eq!(OutputFormat::from_extension("tif"), Some(OutputFormat::Tiff));
        assert_eq!(OutputFormat::from_extension("gif"), None);
    }

    #[test]
    fn output_format_for_path_uses_fallback() {
        assert_eq!(
            OutputFormat::for_path(Path::new("out/code.bmp"), OutputFormat::Png),
            OutputFormat::Bmp
        );
        assert_eq!(
            OutputFormat::for_path(Path::new("out/code"), OutputFormat::Jpeg),
            OutputFormat::Jpeg
        );
        assert_eq!(
            OutputFormat::for_path(Path::new("out/code.webp"), OutputFormat::Tiff),
            OutputFormat::Tiff
        );
    }
}
