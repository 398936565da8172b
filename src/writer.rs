//! Persisting rasters, animations and metadata sidecars.
//!
//! Every write is a one-shot create at a computed path. Parent directories are
//! not created here: single mode writes where the caller points, and batch mode
//! creates its output directory once before the first item.

use crate::animate::AnimatedImage;
use crate::pipeline::GenerateError;
use crate::types::{OutputFile, OutputFormat};
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, ImageFormat, Rgb, RgbImage, RgbaImage};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Write `img` to `path` in `format`.
///
/// JPEG has no alpha channel, so transparent pixels (rounded corners, faded
/// icons) are flattened onto `background` first.
pub fn save_raster(
    img: &RgbaImage,
    path: &Path,
    format: OutputFormat,
    background: Rgb<u8>,
) -> Result<OutputFile, GenerateError> {
    match format {
        OutputFormat::Jpeg => flatten(img, background).save_with_format(path, ImageFormat::Jpeg)?,
        _ => img.save_with_format(path, format.image_format())?,
    }
    Ok(OutputFile {
        path: path.to_path_buf(),
        format,
    })
}

/// Composite `img` over an opaque `background`.
pub fn flatten(img: &RgbaImage, background: Rgb<u8>) -> RgbImage {
    RgbImage::from_fn(img.width(), img.height(), |x, y| {
        let p = img.get_pixel(x, y);
        let a = p[3] as u32;
        let mix = |c: u8, bg: u8| ((c as u32 * a + bg as u32 * (255 - a) + 127) / 255) as u8;
        Rgb([
            mix(p[0], background[0]),
            mix(p[1], background[1]),
            mix(p[2], background[2]),
        ])
    })
}

/// Write `{name}_metadata.txt` in `dir`: the payload on the first line, the
/// metadata string on the second.
pub fn write_metadata(
    dir: &Path,
    name: &str,
    payload: &str,
    metadata: &str,
) -> Result<PathBuf, GenerateError> {
    let path = dir.join(format!("{name}_metadata.txt"));
    fs::write(&path, format!("{payload}\n{metadata}\n"))?;
    Ok(path)
}

/// Write an animation as a GIF.
pub fn save_animation(animation: &AnimatedImage, path: &Path) -> Result<PathBuf, GenerateError> {
    let file = File::create(path)?;
    let mut encoder = GifEncoder::new(BufWriter::new(file));
    let repeat = match animation.loop_count {
        0 => Repeat::Infinite,
        n => Repeat::Finite(n),
    };
    encoder.set_repeat(repeat)?;

    let delay = Delay::from_numer_denom_ms(animation.frame_duration_ms, 1);
    encoder.encode_frames(
        animation
            .frames
            .iter()
            .map(|frame| Frame::from_parts(frame.clone(), 0, 0, delay)),
    )?;
    Ok(path.to_path_buf())
}
