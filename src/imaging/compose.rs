//! Composition of visual customizations onto a rendered symbol.
//!
//! The steps always run in this order, each reading the previous step's output:
//!
//! | # | Step | Skipped when |
//! |---|---|---|
//! | 1 | Gradient blend (50%) | no gradient configured |
//! | 2 | Rounded-corner mask | `rounded_corners = false` |
//! | 3 | Icon overlay | no icon, or the icon fails to load |
//! | 4 | Label | no label text |
//! | 5 | Resize to target | no target size |
//!
//! The order is fixed. Masking after the gradient keeps the gradient inside
//! the rounded shape. The label goes on after the icon so the icon never
//! covers text. Resizing comes last so every step works at native module
//! resolution.
//!
//! Nothing here is random: the same base raster and [`Composition`] always
//! produce the same pixels.

use super::calculations::{gradient_fraction, icon_fit_dimensions, icon_origin, label_origin};
use super::params::Opacity;
use super::text::{clamp_label_size, label_font};
use crate::logging::Logger;
use crate::types::{IconPosition, Rotation};
use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, Rgb, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};

/// Two-color linear gradient.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientFill {
    pub start: Rgb<u8>,
    pub end: Rgb<u8>,
    pub rotation: Rotation,
}

/// Icon to paste onto the symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct IconOverlay {
    pub path: PathBuf,
    pub position: IconPosition,
    pub opacity: Opacity,
}

/// Text drawn near the bottom edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub text: String,
    /// Preferred TrueType fonts, tried in order.
    pub fonts: Vec<PathBuf>,
    /// Also try installed system fonts before the bitmap fallback.
    pub system_fonts: bool,
    /// Pixel size, clamped to the drawable range when drawn.
    pub size: f32,
    pub ink: Rgba<u8>,
    /// Gap between the label's bottom and the raster's bottom edge.
    pub margin: u32,
}

/// Which composition steps to run, with colors already resolved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Composition {
    pub gradient: Option<GradientFill>,
    /// Corner radius in pixels; `None` leaves corners square.
    pub corner_radius: Option<u32>,
    pub icon: Option<IconOverlay>,
    pub label: Option<Label>,
    pub target_size: Option<(u32, u32)>,
}

/// Run every enabled step, in order.
pub fn compose(base: RgbaImage, composition: &Composition, log: &dyn Logger) -> RgbaImage {
    let mut img = base;

    if let Some(gradient) = &composition.gradient {
        img = apply_gradient(&img, gradient);
    }
    if let Some(radius) = composition.corner_radius {
        img = round_corners(&img, radius);
    }
    if let Some(icon) = &composition.icon {
        match load_icon(&icon.path) {
            Ok(loaded) => overlay_icon(&mut img, &loaded, icon.position, icon.opacity),
            Err(e) => log.warn(&format!(
                "icon {} could not be loaded, skipping overlay: {e}",
                icon.path.display()
            )),
        }
    }
    if let Some(label) = &composition.label {
        draw_label(&mut img, label, log);
    }
    if let Some((w, h)) = composition.target_size {
        img = resize_exact(&img, w, h);
    }
    img
}

/// Synthetic gradient raster of the given size.
pub fn gradient_image(width: u32, height: u32, gradient: &GradientFill) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        let t = match gradient.rotation {
            Rotation::Vertical => gradient_fraction(y, height),
            Rotation::Horizontal => gradient_fraction(x, width),
        };
        let lerp = |c: usize| {
            let (a, b) = (gradient.start[c] as f32, gradient.end[c] as f32);
            (a + (b - a) * t).round() as u8
        };
        Rgba([lerp(0), lerp(1), lerp(2), 255])
    })
}

/// Blend `img` 50/50 with a gradient of the same size. Alpha is kept from `img`.
pub fn apply_gradient(img: &RgbaImage, gradient: &GradientFill) -> RgbaImage {
    let (w, h) = img.dimensions();
    let overlay = gradient_image(w, h, gradient);
    let mut out = img.clone();
    for (p, g) in out.pixels_mut().zip(overlay.pixels()) {
        for c in 0..3 {
            p[c] = ((p[c] as u16 + g[c] as u16 + 1) / 2) as u8;
        }
    }
    out
}

/// Binary rounded-rectangle mask covering the whole raster.
///
/// The radius is clamped to half the shorter side.
pub fn rounded_mask(width: u32, height: u32, radius: u32) -> GrayImage {
    let r = radius.min(width / 2).min(height / 2);
    let on = Luma([255u8]);
    let mut mask = GrayImage::new(width, height);
    if width == 0 || height == 0 {
        return mask;
    }
    if r == 0 {
        mask.fill(255);
        return mask;
    }

    if height > 2 * r {
        draw_filled_rect_mut(&mut mask, Rect::at(0, r as i32).of_size(width, height - 2 * r), on);
    }
    if width > 2 * r {
        draw_filled_rect_mut(&mut mask, Rect::at(r as i32, 0).of_size(width - 2 * r, height), on);
    }
    let (ri, right, bottom) = (r as i32, (width - 1 - r) as i32, (height - 1 - r) as i32);
    for center in [(ri, ri), (right, ri), (ri, bottom), (right, bottom)] {
        draw_filled_circle_mut(&mut mask, center, ri, on);
    }
    mask
}

/// Composite `img` onto a transparent canvas through a rounded mask.
pub fn round_corners(img: &RgbaImage, radius: u32) -> RgbaImage {
    let (w, h) = img.dimensions();
    let mask = rounded_mask(w, h, radius);
    let mut out = RgbaImage::new(w, h);
    for ((o, p), m) in out.pixels_mut().zip(img.pixels()).zip(mask.pixels()) {
        if m[0] > 0 {
            *o = *p;
        }
    }
    out
}

/// Load an icon as RGBA.
pub fn load_icon(path: &Path) -> Result<RgbaImage, image::ImageError> {
    Ok(image::open(path)?.to_rgba8())
}

/// Thumbnail `icon`, scale its alpha by `opacity`, and alpha-composite it.
///
/// With opacity 0 the canvas is untouched; with opacity 1 an opaque icon
/// replaces the pixels under it.
pub fn overlay_icon(canvas: &mut RgbaImage, icon: &RgbaImage, position: IconPosition, opacity: Opacity) {
    let (w, h) = icon_fit_dimensions(canvas.dimensions(), icon.dimensions());
    let mut fitted = if (w, h) == icon.dimensions() {
        icon.clone()
    } else {
        imageops::resize(icon, w, h, FilterType::Lanczos3)
    };

    let alpha = opacity.value();
    if alpha < 1.0 {
        for p in fitted.pixels_mut() {
            p[3] = (p[3] as f32 * alpha).round() as u8;
        }
    }

    let (x, y) = icon_origin(canvas.dimensions(), (w, h), position);
    imageops::overlay(canvas, &fitted, x, y);
}

/// Measure and draw the label, centered and anchored to the bottom margin.
pub fn draw_label(canvas: &mut RgbaImage, label: &Label, log: &dyn Logger) {
    if label.text.trim().is_empty() {
        return;
    }
    let font = label_font(&label.fonts, label.system_fonts, log);
    let px = clamp_label_size(label.size, log);
    let size = font.measure(&label.text, px);
    let (x, y) = label_origin(canvas.dimensions(), size, label.margin);
    log.debug(&format!(
        "drawing label '{}' with {} at ({x}, {y})",
        label.text,
        font.describe()
    ));
    font.draw(canvas, &label.text, px, x, y, label.ink);
}

/// Resize to exactly `width`×`height` with Lanczos3. A no-op at the same size.
pub fn resize_exact(img: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    if img.dimensions() == (width, height) {
        return img.clone();
    }
    imageops::resize(img, width, height, FilterType::Lanczos3)
}
