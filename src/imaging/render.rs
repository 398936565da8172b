//! Module matrix → raster.

use super::backend::{EncodeError, ModuleMatrix, SymbolEncoder};
use super::calculations::raster_side;
use super::params::{EcLevel, MAX_RASTER_SIDE, ResolvedGeometry};
use image::{Rgb, Rgba, RgbaImage};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(
        "{modules} modules at {module_size}px with a {border}-module border exceed the {max}px raster limit",
        max = MAX_RASTER_SIDE
    )]
    TooLarge {
        modules: usize,
        module_size: u32,
        border: u32,
    },
}

/// Encode `payload` and rasterize it.
///
/// The encoder is asked for `geometry.version` as a minimum. Encoding fails
/// only for a payload that exceeds version 40 at `level`; rasterizing fails
/// when the geometry would produce an oversized image.
pub fn render_symbol(
    encoder: &dyn SymbolEncoder,
    payload: &str,
    geometry: &ResolvedGeometry,
    level: EcLevel,
    fill: Rgb<u8>,
    background: Rgb<u8>,
) -> Result<RgbaImage, RenderError> {
    let matrix = encoder.encode(payload.as_bytes(), geometry.version, level)?;
    rasterize(&matrix, geometry, fill, background)
}

/// Paint each module as a `module_size` square, surrounded by `border`
/// quiet-zone modules of background color. The result is fully opaque.
pub fn rasterize(
    matrix: &ModuleMatrix,
    geometry: &ResolvedGeometry,
    fill: Rgb<u8>,
    background: Rgb<u8>,
) -> Result<RgbaImage, RenderError> {
    let side = raster_side(matrix.width, geometry).ok_or(RenderError::TooLarge {
        modules: matrix.width,
        module_size: geometry.module_size,
        border: geometry.border,
    })?;
    let module = geometry.module_size.max(1);
    let dark = Rgba([fill[0], fill[1], fill[2], 255]);
    let light = Rgba([background[0], background[1], background[2], 255]);

    Ok(RgbaImage::from_fn(side, side, |px, py| {
        let mx = (px / module) as i64 - geometry.border as i64;
        let my = (py / module) as i64 - geometry.border as i64;
        let inside = (0..matrix.width as i64).contains(&mx) && (0..matrix.width as i64).contains(&my);
        if inside && matrix.is_dark(mx as usize, my as usize) {
            dark
        } else {
            light
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::MockEncoder;

    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
    const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

    fn geometry(module_size: u32, border: u32) -> ResolvedGeometry {
        ResolvedGeometry {
            version: 1,
            module_size,
            border,
        }
    }

    #[test]
    fn raster_side_includes_quiet_zone() {
        let encoder = MockEncoder::new(21);
        let img = render_symbol(&encoder, "x", &geometry(10, 4), EcLevel::L, BLACK, WHITE).unwrap();
        assert_eq!(img.dimensions(), (290, 290));
    }

    #[test]
    fn borderless_raster_starts_with_first_module() {
        let encoder = MockEncoder::new(3);
        let img = render_symbol(&encoder, "x", &geometry(2, 0), EcLevel::L, BLACK, WHITE).unwrap();
        assert_eq!(img.dimensions(), (6, 6));
        // Mock checkerboard: (0,0) dark, (1,0) light
        assert_eq!(*img.get_pixel(0, 0), Rgba([0, 0, 0, 255]));
        assert_eq!(*img.get_pixel(1, 1), Rgba([0, 0, 0, 255]));
        assert_eq!(*img.get_pixel(2, 0), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn quiet_zone_is_background_colored() {
        let encoder = MockEncoder::new(3);
        let bg = Rgb([10, 20, 30]);
        let img = render_symbol(&encoder, "x", &geometry(1, 2), EcLevel::L, BLACK, bg).unwrap();
        assert_eq!(img.dimensions(), (7, 7));
        for i in 0..7 {
            assert_eq!(*img.get_pixel(i, 0), Rgba([10, 20, 30, 255]));
            assert_eq!(*img.get_pixel(0, i), Rgba([10, 20, 30, 255]));
            assert_eq!(*img.get_pixel(i, 6), Rgba([10, 20, 30, 255]));
        }
        // First module (dark in the checkerboard) starts after the border
        assert_eq!(*img.get_pixel(2, 2), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn fill_color_is_used_for_dark_modules() {
        let encoder = MockEncoder::new(1);
        let img = render_symbol(
            &encoder,
            "x",
            &geometry(4, 0),
            EcLevel::L,
            Rgb([200, 0, 0]),
            WHITE,
        )
        .unwrap();
        assert!(img.pixels().all(|p| *p == Rgba([200, 0, 0, 255])));
    }

    #[test]
    fn passes_version_and_level_to_encoder() {
        let encoder = MockEncoder::new(21);
        let g = ResolvedGeometry {
            version: 7,
            module_size: 1,
            border: 0,
        };
        render_symbol(&encoder, "abc", &g, EcLevel::H, BLACK, WHITE).unwrap();
        let calls = encoder.get_calls();
        assert_eq!(calls[0].min_version, 7);
        assert_eq!(calls[0].level, EcLevel::H);
        assert_eq!(calls[0].payload, "abc");
    }

    #[test]
    fn capacity_error_propagates() {
        let encoder = MockEncoder::with_capacity(21, 2);
        let result = render_symbol(&encoder, "abc", &geometry(1, 0), EcLevel::H, BLACK, WHITE);
        assert!(matches!(
            result,
            Err(RenderError::Encode(EncodeError::CapacityExceeded { .. }))
        ));
    }

    #[test]
    fn oversized_geometry_is_an_error_not_a_panic() {
        let encoder = MockEncoder::new(21);
        let result = render_symbol(
            &encoder,
            "x",
            &geometry(200_000_000, 4),
            EcLevel::L,
            BLACK,
            WHITE,
        );
        assert!(matches!(
            result,
            Err(RenderError::TooLarge {
                modules: 21,
                module_size: 200_000_000,
                border: 4
            })
        ));
    }
}
