//! Color-cycling animation.
//!
//! One frame per color, all rendered from the same payload and options on a
//! white background, then looped forever. Frames are all produced before the
//! [`AnimatedImage`] is assembled; there is no streaming.

use crate::imaging::{SymbolEncoder, resize_exact};
use crate::logging::Logger;
use crate::pipeline::{GenerateError, RenderOptions, check_payload, render_with_colors};
use crate::validate::{DEFAULT_BACKGROUND, DEFAULT_FILL, resolve_color};
use image::RgbaImage;

/// Frames plus timing, ready for the GIF writer.
#[derive(Debug, Clone)]
pub struct AnimatedImage {
    /// All frames share the first frame's dimensions.
    pub frames: Vec<RgbaImage>,
    pub frame_duration_ms: u32,
    /// 0 loops forever.
    pub loop_count: u16,
}

/// Render `payload` once per color in `colors`.
///
/// Invalid colors fall back to black with a warning. `options.background` is
/// ignored: animation frames are always on white.
pub fn render_animation(
    encoder: &dyn SymbolEncoder,
    payload: &str,
    options: &RenderOptions,
    colors: &[String],
    frame_duration_ms: u32,
    log: &dyn Logger,
) -> Result<AnimatedImage, GenerateError> {
    if colors.is_empty() {
        return Err(GenerateError::InvalidInput(
            "animation needs at least one color".into(),
        ));
    }
    check_payload(payload, options.require_url, log)?;

    let mut frames: Vec<RgbaImage> = Vec::with_capacity(colors.len());
    for (i, color) in colors.iter().enumerate() {
        let fill = resolve_color(color, DEFAULT_FILL, &format!("frame {}", i + 1), log);
        let frame = render_with_colors(encoder, payload, options, fill, DEFAULT_BACKGROUND, log)?;
        let frame = match frames.first() {
            Some(first) if first.dimensions() != frame.dimensions() => {
                resize_exact(&frame, first.width(), first.height())
            }
            _ => frame,
        };
        frames.push(frame);
    }
    log.debug(&format!("assembled {} animation frames", frames.len()));

    Ok(AnimatedImage {
        frames,
        frame_duration_ms,
        loop_count: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::MockEncoder;
    use crate::logging::{Level, MemoryLogger};
    use crate::test_helpers::test_config;
    use image::Rgba;

    fn colors(names: &[&str]) -> Vec<String> {
        names.iter().map(|c| c.to_string()).collect()
    }

    fn options() -> RenderOptions {
        let mut opts = RenderOptions::from_config(&test_config());
        opts.border = 0;
        opts
    }

    #[test]
    fn one_frame_per_color_in_order() {
        let encoder = MockEncoder::new(1);
        let log = MemoryLogger::new();
        let anim = render_animation(
            &encoder,
            "x",
            &options(),
            &colors(&["red", "#00ff00", "blue"]),
            250,
            &log,
        )
        .unwrap();

        assert_eq!(anim.frames.len(), 3);
        assert_eq!(anim.loop_count, 0);
        assert_eq!(anim.frame_duration_ms, 250);
        assert_eq!(*anim.frames[0].get_pixel(0, 0), Rgba([255, 0, 0, 255]));
        assert_eq!(*anim.frames[1].get_pixel(0, 0), Rgba([0, 255, 0, 255]));
        assert_eq!(*anim.frames[2].get_pixel(0, 0), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn background_is_always_white() {
        let encoder = MockEncoder::new(2);
        let log = MemoryLogger::new();
        let mut opts = options();
        opts.background = "black".into();
        let anim = render_animation(&encoder, "x", &opts, &colors(&["red"]), 100, &log).unwrap();
        // Checkerboard: module (1,0) is light
        assert_eq!(*anim.frames[0].get_pixel(10, 0), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn invalid_color_falls_back_to_black() {
        let encoder = MockEncoder::new(1);
        let log = MemoryLogger::new();
        let anim =
            render_animation(&encoder, "x", &options(), &colors(&["nope"]), 100, &log).unwrap();
        assert_eq!(*anim.frames[0].get_pixel(0, 0), Rgba([0, 0, 0, 255]));
        assert!(log.contains(Level::Warn, "nope"));
    }

    #[test]
    fn empty_color_list_is_rejected() {
        let encoder = MockEncoder::new(1);
        let log = MemoryLogger::new();
        let result = render_animation(&encoder, "x", &options(), &[], 100, &log);
        assert!(matches!(result, Err(GenerateError::InvalidInput(_))));
        assert!(encoder.get_calls().is_empty());
    }

    #[test]
    fn frames_share_dimensions() {
        let encoder = MockEncoder::new(21);
        let log = MemoryLogger::new();
        let anim = render_animation(
            &encoder,
            "x",
            &options(),
            &colors(&["black", "red"]),
            100,
            &log,
        )
        .unwrap();
        assert_eq!(anim.frames[0].dimensions(), anim.frames[1].dimensions());
    }
}
