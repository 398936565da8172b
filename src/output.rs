//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Each generated code leads with its positional index and output name. The
//! payload and the file path follow as indented context, so a batch report
//! reads as an inventory of codes rather than a list of files.
//!
//! # Output Format
//!
//! ## Generate
//!
//! ```text
//! https://example.com → code.png (PNG)
//! ```
//!
//! ## Batch progress
//!
//! ```text
//! Generating 3 codes
//! [1/3] qr_1 ok
//! [2/3] qr_2 FAILED
//! ```
//!
//! ## Batch summary
//!
//! ```text
//! 001 qr_1 → qr_codes/qr_1.png
//!     Payload: https://example.com/a
//! 002 qr_2 FAILED
//!     Payload: https://example.com/very/long/pa...
//!     Reason: encoding failed: payload of 3000 bytes exceeds QR version 40 capacity at level H
//!
//! Generated 1 code, 1 failed
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::animate::AnimatedImage;
use crate::batch::{BatchEvent, GenerationResult};
use crate::types::OutputFile;
use std::path::Path;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Truncate to `max` characters, appending "..." if truncated.
fn truncate_payload(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{} {}", n, word)
    } else {
        format!("{} {}s", n, word)
    }
}

const PAYLOAD_WIDTH: usize = 60;

// ============================================================================
// Single generation
// ============================================================================

/// Format the result of a single-mode generation.
pub fn format_generate_output(payload: &str, file: &OutputFile) -> Vec<String> {
    vec![format!(
        "{} \u{2192} {} ({})",
        truncate_payload(payload, PAYLOAD_WIDTH),
        file.path.display(),
        file.format
    )]
}

pub fn print_generate_output(payload: &str, file: &OutputFile) {
    for line in format_generate_output(payload, file) {
        println!("{}", line);
    }
}

/// Format the result of an animation.
pub fn format_animate_output(payload: &str, animation: &AnimatedImage, path: &Path) -> Vec<String> {
    vec![
        format!(
            "{} \u{2192} {} (GIF)",
            truncate_payload(payload, PAYLOAD_WIDTH),
            path.display()
        ),
        format!(
            "{}{} x {}ms, looping",
            indent(1),
            plural(animation.frames.len(), "frame"),
            animation.frame_duration_ms
        ),
    ]
}

pub fn print_animate_output(payload: &str, animation: &AnimatedImage, path: &Path) {
    for line in format_animate_output(payload, animation, path) {
        println!("{}", line);
    }
}

// ============================================================================
// Batch
// ============================================================================

/// Format a single batch progress event as display lines.
pub fn format_batch_event(event: &BatchEvent) -> Vec<String> {
    match event {
        BatchEvent::Started { total } => vec![format!("Generating {}", plural(*total, "code"))],
        BatchEvent::ItemFinished {
            completed,
            total,
            name,
            ok,
        } => {
            let status = if *ok { "ok" } else { "FAILED" };
            vec![format!("[{}/{}] {} {}", completed, total, name, status)]
        }
        // The summary carries the totals
        BatchEvent::Finished { .. } => Vec::new(),
    }
}

/// Format the per-item report printed after a batch completes.
pub fn format_batch_summary(results: &[GenerationResult]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut failed = 0;

    for result in results {
        match &result.outcome {
            Ok(file) => lines.push(format!(
                "{} {} \u{2192} {}",
                format_index(result.index),
                result.name,
                file.path.display()
            )),
            Err(_) => {
                failed += 1;
                lines.push(format!("{} {} FAILED", format_index(result.index), result.name));
            }
        }
        lines.push(format!(
            "{}Payload: {}",
            indent(1),
            truncate_payload(&result.payload, PAYLOAD_WIDTH)
        ));
        if let Err(e) = &result.outcome {
            lines.push(format!("{}Reason: {}", indent(1), e));
        }
    }

    if !results.is_empty() {
        lines.push(String::new());
    }
    let succeeded = results.len() - failed;
    lines.push(format!(
        "Generated {}, {} failed",
        plural(succeeded, "code"),
        failed
    ));
    lines
}

pub fn print_batch_summary(results: &[GenerationResult]) {
    for line in format_batch_summary(results) {
        println!("{}", line);
    }
}
