//! Rendering measurements back onto the image for visual verification.
//!
//! Draws a rectangle per measurement plus a filled label plate sitting on the
//! box's top edge. Rendering is a pure function of its inputs and always
//! operates on a copy.

use ab_glyph::{FontArc, PxScale};
use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use std::io::Cursor;
use std::path::PathBuf;

use crate::measurement::Measurement;

// Fixed presentation constants.
const BOX_COLOR: Rgb<u8> = Rgb([255, 105, 180]);
const PLATE_COLOR: Rgb<u8> = Rgb([139, 0, 70]);
const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const LABEL_SCALE: f32 = 16.0;
const LABEL_PADDING: i32 = 10;
const BOX_THICKNESS: i32 = 2;

/// Label text shown above each box: `"{name} - {dims} ({confidence}%)"`
/// with the confidence as a whole percentage.
pub fn format_label(object_name: &str, dimensions: &str, confidence: f32) -> String {
    format!(
        "{object_name} - {dimensions} ({:.0}%)",
        confidence * 100.0
    )
}

/// Locate a TTF for label text. `CALIPER_FONT_PATH` wins; otherwise common
/// system font locations are probed. Returns `None` when no font is
/// available, in which case glyphs are skipped and the plate is sized from a
/// nominal per-glyph advance.
fn load_label_font() -> Option<FontArc> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Ok(path) = std::env::var("CALIPER_FONT_PATH") {
        candidates.push(PathBuf::from(path));
    }
    candidates.extend(
        [
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
            "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
            "/usr/share/fonts/TTF/DejaVuSans.ttf",
            "/System/Library/Fonts/Supplemental/Arial.ttf",
        ]
        .iter()
        .map(PathBuf::from),
    );

    candidates.into_iter().find_map(|path| {
        std::fs::read(&path)
            .ok()
            .and_then(|bytes| FontArc::try_from_vec(bytes).ok())
    })
}

fn label_extent(font: Option<&FontArc>, label: &str) -> (i32, i32) {
    match font {
        Some(font) => {
            let (w, h) = text_size(PxScale::from(LABEL_SCALE), font, label);
            (w as i32, h as i32)
        }
        None => (
            (label.chars().count() as f32 * LABEL_SCALE * 0.5) as i32,
            LABEL_SCALE as i32,
        ),
    }
}

/// Draw every measurement onto a copy of `image` and return the copy.
///
/// Boxes are expected in the image's own pixel space. A plate whose top
/// would fall above the canvas is clipped by the raster layer, not
/// repositioned.
pub fn render_measurements(image: &RgbImage, measurements: &[Measurement]) -> RgbImage {
    let mut canvas = image.clone();
    let font = load_label_font();

    for m in measurements {
        let [x1, y1, x2, y2] = m.bbox;
        if x2 <= x1 || y2 <= y1 {
            continue;
        }

        for offset in 0..BOX_THICKNESS {
            let rect = Rect::at(x1 - offset, y1 - offset).of_size(
                (x2 - x1 + 2 * offset) as u32,
                (y2 - y1 + 2 * offset) as u32,
            );
            draw_hollow_rect_mut(&mut canvas, rect, BOX_COLOR);
        }

        let label = format_label(&m.object_name, &m.dimensions, m.confidence);
        let (text_w, text_h) = label_extent(font.as_ref(), &label);

        // Plate bottom edge sits on the box top edge.
        let plate = Rect::at(x1, y1 - text_h - LABEL_PADDING)
            .of_size((text_w + LABEL_PADDING) as u32, (text_h + LABEL_PADDING) as u32);
        draw_filled_rect_mut(&mut canvas, plate, PLATE_COLOR);

        if let Some(font) = &font {
            draw_text_mut(
                &mut canvas,
                TEXT_COLOR,
                x1 + 5,
                y1 - text_h - 5,
                PxScale::from(LABEL_SCALE),
                font,
                &label,
            );
        }
    }

    canvas
}

/// JPEG-encode an image and wrap it as a `data:image/jpeg;base64,` URI for
/// transport inside the result document.
pub fn encode_jpeg_data_uri(image: &RgbImage) -> Result<String> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Jpeg)
        .context("JPEG encoding failed")?;
    Ok(format!("data:image/jpeg;base64,{}", BASE64.encode(&bytes)))
}
