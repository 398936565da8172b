//! Render real QR codes and decode them again with `rqrr`.
//!
//! These go through the production encoder, so they check that the
//! rasterization (module size, quiet zone, orientation) keeps the symbol
//! readable, and that the styling steps that are meant to be harmless are.

use image::{Rgb, RgbaImage};
use qrsmith::config::{GradientConfig, QrConfig};
use qrsmith::imaging::{EcLevel, EncodeError, QrcodeEncoder, SymbolEncoder};
use qrsmith::logging::MemoryLogger;
use qrsmith::pipeline::{self, GenerateError, GenerationRequest, RenderOptions};
use qrsmith::types::{Rotation, Sizing};
use qrsmith::writer::flatten;
use tempfile::TempDir;

fn config() -> QrConfig {
    let mut config = QrConfig::default();
    config.symbol.require_url = false;
    config.label.system_fonts = false;
    config
}

/// Decode the first QR code found, after flattening transparency onto white.
fn decode(img: &RgbaImage) -> String {
    let flat = flatten(img, Rgb([255, 255, 255]));
    let luma = image::DynamicImage::ImageRgb8(flat).to_luma8();
    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
        luma.width() as usize,
        luma.height() as usize,
        |x, y| luma.get_pixel(x as u32, y as u32)[0],
    );
    let grids = prepared.detect_grids();
    assert_eq!(grids.len(), 1, "expected exactly one symbol");
    let (_meta, content) = grids[0].decode().expect("symbol should decode");
    content
}

fn render(payload: &str, options: &RenderOptions) -> RgbaImage {
    let log = MemoryLogger::new();
    pipeline::generate(&QrcodeEncoder::new(), payload, options, &log).unwrap()
}

#[test]
fn plain_symbol_decodes() {
    let options = RenderOptions::from_config(&config());
    let payload = "https://example.com/path?q=1";
    assert_eq!(decode(&render(payload, &options)), payload);
}

#[test]
fn every_ec_level_decodes() {
    for code in ["L", "M", "Q", "H"] {
        let mut config = config();
        config.symbol.error_correction = code.to_string();
        let options = RenderOptions::from_config(&config);
        let payload = format!("level {code}");
        assert_eq!(decode(&render(&payload, &options)), payload, "level {code}");
    }
}

#[test]
fn auto_tiers_decode_across_lengths() {
    let options = RenderOptions::from_config(&config());
    for len in [10, 60, 150, 250] {
        let payload: String = "abcdefghij".chars().cycle().take(len).collect();
        assert_eq!(decode(&render(&payload, &options)), payload, "len {len}");
    }
}

#[test]
fn explicit_small_version_is_bumped_to_fit() {
    let mut config = config();
    config.symbol.version = Sizing::Fixed(1);
    config.symbol.module_size = Sizing::Fixed(4);
    let options = RenderOptions::from_config(&config);
    let payload = "this payload is far too long for a version 1 symbol at level L";
    assert_eq!(decode(&render(payload, &options)), payload);
}

#[test]
fn rounded_corners_and_resize_keep_symbol_readable() {
    let mut config = config();
    config.style.rounded_corners = true;
    config.style.target_size = Some([300, 300]);
    let options = RenderOptions::from_config(&config);
    let img = render("https://example.com", &options);
    assert_eq!(img.dimensions(), (300, 300));
    assert_eq!(decode(&img), "https://example.com");
}

#[test]
fn dark_gradient_keeps_symbol_readable() {
    let mut config = config();
    config.style.gradient = Some(GradientConfig {
        start: "navy".into(),
        end: "black".into(),
        rotation: Rotation::Vertical,
    });
    let options = RenderOptions::from_config(&config);
    assert_eq!(decode(&render("gradient", &options)), "gradient");
}

#[test]
fn written_png_decodes() {
    let tmp = TempDir::new().unwrap();
    let log = MemoryLogger::new();
    let request = GenerationRequest::from_config(
        "https://example.com/written",
        tmp.path().join("code.png"),
        &config(),
    );
    let written = pipeline::generate_to_file(&QrcodeEncoder::new(), &request, &log).unwrap();
    let img = image::open(&written.path).unwrap().to_rgba8();
    assert_eq!(decode(&img), "https://example.com/written");
}

#[test]
fn oversized_payload_at_high_level_is_capacity_error() {
    let mut config = config();
    config.symbol.error_correction = "H".into();
    let options = RenderOptions::from_config(&config);
    let payload = "x".repeat(1300);
    let log = MemoryLogger::new();

    let result = pipeline::generate(&QrcodeEncoder::new(), &payload, &options, &log);
    assert!(matches!(
        result,
        Err(GenerateError::Encoding(EncodeError::CapacityExceeded {
            level: EcLevel::H,
            ..
        }))
    ));

    // The same payload fits at level L
    assert!(QrcodeEncoder::new().encode(payload.as_bytes(), 1, EcLevel::L).is_ok());
}
