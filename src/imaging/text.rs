//! Label fonts: TrueType via `ab_glyph`, with a built-in bitmap fallback.
//!
//! The font chain is tried in order and the first font that loads wins:
//!
//! 1. fonts listed in `[label].fonts`
//! 2. an installed sans-serif face found through `fontdb` (unless
//!    `[label].system_fonts = false`)
//! 3. the built-in 5×7 bitmap font, which always succeeds
//!
//! A configured font that fails to load is a resource error. It is logged
//! and the chain moves on. The label itself is never dropped for lack of a
//! font.
//!
//! The system font database is scanned once per process, and each resolved
//! chain is cached, so batches and animations read font files only once.

use crate::logging::Logger;
use ab_glyph::FontVec;
use fontdb::{Database, Family, ID, Query};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

/// Smallest label size, in pixels, that is drawn as configured.
pub const MIN_LABEL_SIZE: f32 = 1.0;
/// Largest label size, in pixels, that is drawn as configured.
pub const MAX_LABEL_SIZE: f32 = 1000.0;

const GLYPH_W: u32 = 5;
const GLYPH_H: u32 = 7;

/// Families tried, in order, before any installed face is accepted.
const SANS_FAMILIES: &[Family<'static>] = &[
    Family::SansSerif,
    Family::Name("DejaVu Sans"),
    Family::Name("Liberation Sans"),
    Family::Name("Noto Sans"),
    Family::Name("Helvetica"),
];

type ChainKey = (Vec<PathBuf>, bool);

static SYSTEM_FONT_DB: OnceLock<Database> = OnceLock::new();
static FONT_CACHE: OnceLock<Mutex<HashMap<ChainKey, Arc<LabelFont>>>> = OnceLock::new();

/// A font that can measure and draw a label.
pub enum LabelFont {
    TrueType { font: FontVec, source: String },
    Bitmap,
}

impl LabelFont {
    /// Human-readable name for logs.
    pub fn describe(&self) -> String {
        match self {
            LabelFont::TrueType { source, .. } => source.clone(),
            LabelFont::Bitmap => "built-in bitmap font".to_string(),
        }
    }

    /// Rendered `(width, height)` of `text` at `size` pixels.
    pub fn measure(&self, text: &str, size: f32) -> (u32, u32) {
        match self {
            LabelFont::TrueType { font, .. } => text_size(size, font, text),
            LabelFont::Bitmap => {
                let scale = bitmap_scale(size);
                let n = text.chars().count() as u32;
                if n == 0 {
                    return (0, 0);
                }
                let width = n.saturating_mul((GLYPH_W + 1).saturating_mul(scale)) - scale;
                (width, GLYPH_H.saturating_mul(scale))
            }
        }
    }

    /// Draw `text` with its top-left at `(x, y)`; pixels off the canvas are clipped.
    pub fn draw(&self, canvas: &mut RgbaImage, text: &str, size: f32, x: i32, y: i32, ink: Rgba<u8>) {
        match self {
            LabelFont::TrueType { font, .. } => draw_text_mut(canvas, ink, x, y, size, font, text),
            LabelFont::Bitmap => draw_bitmap_text(canvas, text, bitmap_scale(size), x, y, ink),
        }
    }
}

/// Clamp a label size to `[MIN_LABEL_SIZE, MAX_LABEL_SIZE]`, logging any change.
pub fn clamp_label_size(size: f32, log: &dyn Logger) -> f32 {
    let clamped = if size.is_nan() {
        MIN_LABEL_SIZE
    } else {
        size.clamp(MIN_LABEL_SIZE, MAX_LABEL_SIZE)
    };
    if clamped != size {
        log.warn(&format!(
            "label size {size} out of range {MIN_LABEL_SIZE}-{MAX_LABEL_SIZE}, using {clamped}"
        ));
    }
    clamped
}

/// Cached [`load_font_chain`]: each distinct chain is resolved once per process.
pub fn label_font(preferred: &[PathBuf], system_fonts: bool, log: &dyn Logger) -> Arc<LabelFont> {
    let cache = FONT_CACHE.get_or_init(Default::default);
    let key = (preferred.to_vec(), system_fonts);
    if let Some(font) = cache.lock().ok().and_then(|c| c.get(&key).cloned()) {
        return font;
    }
    let font = Arc::new(load_font_chain(preferred, system_fonts, log));
    if let Ok(mut c) = cache.lock() {
        return c.entry(key).or_insert(font).clone();
    }
    font
}

/// Walk the font chain and return the first font that loads.
pub fn load_font_chain(preferred: &[PathBuf], system_fonts: bool, log: &dyn Logger) -> LabelFont {
    for path in preferred {
        match load_truetype(path) {
            Ok(font) => return font,
            Err(reason) => log.warn(&format!(
                "label font {} unavailable ({reason}), trying next",
                path.display()
            )),
        }
    }
    if system_fonts {
        if let Some(font) = load_system_font(system_font_db(), log) {
            return font;
        }
    }
    log.debug("using built-in bitmap font for label");
    LabelFont::Bitmap
}

fn system_font_db() -> &'static Database {
    SYSTEM_FONT_DB.get_or_init(|| {
        let mut db = Database::new();
        db.load_system_fonts();
        tracing::debug!("found {} system font faces", db.len());
        db
    })
}

/// First installed face that parses, preferring the sans-serif families.
fn load_system_font(db: &Database, log: &dyn Logger) -> Option<LabelFont> {
    let preferred = db.query(&Query {
        families: SANS_FAMILIES,
        ..Query::default()
    });
    let candidates = preferred.into_iter().chain(db.faces().map(|face| face.id));
    for id in candidates {
        match face_font(db, id) {
            Some(font) => return Some(font),
            None => log.debug(&format!("system font face {id:?} unusable")),
        }
    }
    None
}

fn face_font(db: &Database, id: ID) -> Option<LabelFont> {
    let font = db
        .with_face_data(id, |data, index| {
            FontVec::try_from_vec_and_index(data.to_vec(), index)
        })?
        .ok()?;
    let source = db
        .face(id)
        .and_then(|face| face.families.first())
        .map(|(name, _)| name.clone())
        .unwrap_or_else(|| format!("system font {id:?}"));
    Some(LabelFont::TrueType { font, source })
}

fn load_truetype(path: &Path) -> Result<LabelFont, String> {
    let bytes = std::fs::read(path).map_err(|e| e.to_string())?;
    let font = FontVec::try_from_vec(bytes).map_err(|e| e.to_string())?;
    Ok(LabelFont::TrueType {
        font,
        source: path.display().to_string(),
    })
}

/// Integer upscale of the 7-pixel-tall bitmap glyphs for a requested pixel size.
fn bitmap_scale(size: f32) -> u32 {
    ((size / 8.0).round() as u32).max(1)
}

/// Glyph pixels are `scale`-sized blocks, clipped to the canvas before drawing.
fn draw_bitmap_text(canvas: &mut RgbaImage, text: &str, scale: u32, x: i32, y: i32, ink: Rgba<u8>) {
    let (cw, ch) = (canvas.width() as i64, canvas.height() as i64);
    let scale = scale as i64;
    let advance = (GLYPH_W as i64 + 1) * scale;
    for (i, c) in text.chars().enumerate() {
        let gx = (x as i64).saturating_add((i as i64).saturating_mul(advance));
        if gx >= cw {
            break;
        }
        for (col, bits) in glyph(c).iter().enumerate() {
            for row in 0..GLYPH_H as i64 {
                if bits & (1 << row) == 0 {
                    continue;
                }
                let px = gx + col as i64 * scale;
                let py = y as i64 + row * scale;
                let (x0, x1) = (px.max(0), (px + scale).min(cw));
                let (y0, y1) = (py.max(0), (py + scale).min(ch));
                if x0 >= x1 || y0 >= y1 {
                    continue;
                }
                let block = Rect::at(x0 as i32, y0 as i32).of_size((x1 - x0) as u32, (y1 - y0) as u32);
                draw_filled_rect_mut(canvas, block, ink);
            }
        }
    }
}

/// Column-major 5×7 glyph for printable ASCII; bit 0 is the top row.
/// Anything else renders as `?`.
fn glyph(ch: char) -> [u8; 5] {
    let code = ch as u32;
    let index = if (0x20..=0x7e).contains(&code) {
        (code - 0x20) as usize
    } else {
        ('?' as usize) - 0x20
    };
    FONT_5X7[index]
}

#[rustfmt::skip]
const FONT_5X7: [[u8; 5]; 95] = [
    [0x00, 0x00, 0x00, 0x00, 0x00], // ' '
    [0x00, 0x00, 0x5f, 0x00, 0x00], // !
    [0x00, 0x07, 0x00, 0x07, 0x00], // "
    [0x14, 0x7f, 0x14, 0x7f, 0x14], // #
    [0x24, 0x2a, 0x7f, 0x2a, 0x12], // $
    [0x23, 0x13, 0x08, 0x64, 0x62], // %
    [0x36, 0x49, 0x55, 0x22, 0x50], // &
    [0x00, 0x05, 0x03, 0x00, 0x00], // '
    [0x00, 0x1c, 0x22, 0x41, 0x00], // (
    [0x00, 0x41, 0x22, 0x1c, 0x00], // )
    [0x14, 0x08, 0x3e, 0x08, 0x14], // *
    [0x08, 0x08, 0x3e, 0x08, 0x08], // +
    [0x00, 0x50, 0x30, 0x00, 0x00], // ,
    [0x08, 0x08, 0x08, 0x08, 0x08], // -
    [0x00, 0x60, 0x60, 0x00, 0x00], // .
    [0x20, 0x10, 0x08, 0x04, 0x02], // /
    [0x3e, 0x51, 0x49, 0x45, 0x3e], // 0
    [0x00, 0x42, 0x7f, 0x40, 0x00], // 1
    [0x42, 0x61, 0x51, 0x49, 0x46], // 2
    [0x21, 0x41, 0x45, 0x4b, 0x31], // 3
    [0x18, 0x14, 0x12, 0x7f, 0x10], // 4
    [0x27, 0x45, 0x45, 0x45, 0x39], // 5
    [0x3c, 0x4a, 0x49, 0x49, 0x30], // 6
    [0x01, 0x71, 0x09, 0x05, 0x03], // 7
    [0x36, 0x49, 0x49, 0x49, 0x36], // 8
    [0x06, 0x49, 0x49, 0x29, 0x1e], // 9
    [0x00, 0x36, 0x36, 0x00, 0x00], // :
    [0x00, 0x56, 0x36, 0x00, 0x00], // ;
    [0x08, 0x14, 0x22, 0x41, 0x00], // <
    [0x14, 0x14, 0x14, 0x14, 0x14], // =
    [0x00, 0x41, 0x22, 0x14, 0x08], // >
    [0x02, 0x01, 0x51, 0x09, 0x06], // ?
    [0x32, 0x49, 0x79, 0x41, 0x3e], // @
    [0x7e, 0x11, 0x11, 0x11, 0x7e], // A
    [0x7f, 0x49, 0x49, 0x49, 0x36], // B
    [0x3e, 0x41, 0x41, 0x41, 0x22], // C
    [0x7f, 0x41, 0x41, 0x22, 0x1c], // D
    [0x7f, 0x49, 0x49, 0x49, 0x41], // E
    [0x7f, 0x09, 0x09, 0x09, 0x01], // F
    [0x3e, 0x41, 0x49, 0x49, 0x7a], // G
    [0x7f, 0x08, 0x08, 0x08, 0x7f], // H
    [0x00, 0x41, 0x7f, 0x41, 0x00], // I
    [0x20, 0x40, 0x41, 0x3f, 0x01], // J
    [0x7f, 0x08, 0x14, 0x22, 0x41], // K
    [0x7f, 0x40, 0x40, 0x40, 0x40], // L
    [0x7f, 0x02, 0x0c, 0x02, 0x7f], // M
    [0x7f, 0x04, 0x08, 0x10, 0x7f], // N
    [0x3e, 0x41, 0x41, 0x41, 0x3e], // O
    [0x7f, 0x09, 0x09, 0x09, 0x06], // P
    [0x3e, 0x41, 0x51, 0x21, 0x5e], // Q
    [0x7f, 0x09, 0x19, 0x29, 0x46], // R
    [0x46, 0x49, 0x49, 0x49, 0x31], // S
    [0x01, 0x01, 0x7f, 0x01, 0x01], // T
    [0x3f, 0x40, 0x40, 0x40, 0x3f], // U
    [0x1f, 0x20, 0x40, 0x20, 0x1f], // V
    [0x3f, 0x40, 0x38, 0x40, 0x3f], // W
    [0x63, 0x14, 0x08, 0x14, 0x63], // X
    [0x07, 0x08, 0x70, 0x08, 0x07], // Y
    [0x61, 0x51, 0x49, 0x45, 0x43], // Z
    [0x00, 0x7f, 0x41, 0x41, 0x00], // [
    [0x02, 0x04, 0x08, 0x10, 0x20], // backslash
    [0x00, 0x41, 0x41, 0x7f, 0x00], // ]
    [0x04, 0x02, 0x01, 0x02, 0x04], // ^
    [0x40, 0x40, 0x40, 0x40, 0x40], // _
    [0x00, 0x01, 0x02, 0x04, 0x00], // `
    [0x20, 0x54, 0x54, 0x54, 0x78], // a
    [0x7f, 0x48, 0x44, 0x44, 0x38], // b
    [0x38, 0x44, 0x44, 0x44, 0x20], // c
    [0x38, 0x44, 0x44, 0x48, 0x7f], // d
    [0x38, 0x54, 0x54, 0x54, 0x18], // e
    [0x08, 0x7e, 0x09, 0x01, 0x02], // f
    [0x0c, 0x52, 0x52, 0x52, 0x3e], // g
    [0x7f, 0x08, 0x04, 0x04, 0x78], // h
    [0x00, 0x44, 0x7d, 0x40, 0x00], // i
    [0x20, 0x40, 0x44, 0x3d, 0x00], // j
    [0x7f, 0x10, 0x28, 0x44, 0x00], // k
    [0x00, 0x41, 0x7f, 0x40, 0x00], // l
    [0x7c, 0x04, 0x18, 0x04, 0x78], // m
    [0x7c, 0x08, 0x04, 0x04, 0x78], // n
    [0x38, 0x44, 0x44, 0x44, 0x38], // o
    [0x7c, 0x14, 0x14, 0x14, 0x08], // p
    [0x08, 0x14, 0x14, 0x18, 0x7c], // q
    [0x7c, 0x08, 0x04, 0x04, 0x08], // r
    [0x48, 0x54, 0x54, 0x54, 0x20], // s
    [0x04, 0x3f, 0x44, 0x40, 0x20], // t
    [0x3c, 0x40, 0x40, 0x20, 0x7c], // u
    [0x1c, 0x20, 0x40, 0x20, 0x1c], // v
    [0x3c, 0x40, 0x30, 0x40, 0x3c], // w
    [0x44, 0x28, 0x10, 0x28, 0x44], // x
    [0x0c, 0x50, 0x50, 0x50, 0x3c], // y
    [0x44, 0x64, 0x54, 0x4c, 0x44], // z
    [0x00, 0x08, 0x36, 0x41, 0x00], // {
    [0x00, 0x00, 0x7f, 0x00, 0x00], // |
    [0x00, 0x41, 0x36, 0x08, 0x00], // }
    [0x08, 0x04, 0x08, 0x10, 0x08], // ~
];
