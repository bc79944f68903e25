//! Drawing detections and the summary caption onto a copy of an image.
//!
//! Text uses a built-in 3x5 bitmap font (digits, A-Z, `: . - %`, space)
//! drawn at 2x scale, so no font file is needed at runtime.

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::detect::Detection;

pub const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const LABEL_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const CAPTION_PERSONS_COLOR: Rgb<u8> = Rgb([0, 200, 0]);
pub const CAPTION_EMPTY_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Top-left corner of the summary caption.
pub const CAPTION_ORIGIN: (i32, i32) = (10, 10);

const GLYPH_W: i32 = 3;
const GLYPH_H: i32 = 5;
const TEXT_SCALE: i32 = 2;
const ADVANCE: i32 = (GLYPH_W + 1) * TEXT_SCALE;
const LABEL_GAP: i32 = 2;

/// Copy `source` and draw one box + confidence label per detection, then
/// the summary caption. `source` is left untouched.
pub fn annotate(source: &RgbImage, persons: &[Detection]) -> RgbImage {
    let mut annotated = source.clone();
    for person in persons {
        draw_detection(&mut annotated, person);
    }
    let (text, color) = caption(persons.len());
    draw_text(
        &mut annotated,
        CAPTION_ORIGIN.0,
        CAPTION_ORIGIN.1,
        &text,
        color,
    );
    annotated
}

/// Caption text and color for a person count.
pub fn caption(count: usize) -> (String, Rgb<u8>) {
    if count > 0 {
        (format!("PERSONAS: {}", count), CAPTION_PERSONS_COLOR)
    } else {
        ("SIN PERSONAS".to_string(), CAPTION_EMPTY_COLOR)
    }
}

/// Pixel area the caption for `count` may touch.
pub fn caption_region(count: usize) -> Rect {
    let (text, _) = caption(count);
    Rect::at(CAPTION_ORIGIN.0, CAPTION_ORIGIN.1).of_size(text_width(&text).max(1), text_height())
}

pub fn text_width(text: &str) -> u32 {
    (text.chars().count() as i32 * ADVANCE) as u32
}

pub fn text_height() -> u32 {
    (GLYPH_H * TEXT_SCALE) as u32
}

fn draw_detection(img: &mut RgbImage, detection: &Detection) {
    let (img_w, img_h) = img.dimensions();
    if let Some((x, y, width, height)) = clip_box(detection, img_w, img_h) {
        draw_hollow_rect_mut(img, Rect::at(x, y).of_size(width, height), BOX_COLOR);
        if width > 2 && height > 2 {
            draw_hollow_rect_mut(
                img,
                Rect::at(x + 1, y + 1).of_size(width - 2, height - 2),
                BOX_COLOR,
            );
        }
    }

    if detection.x >= img_w || detection.y >= img_h {
        return;
    }
    let label = format!("{:.2}", detection.confidence);
    let top = detection.y as i64;
    let above = top - text_height() as i64 - LABEL_GAP as i64;
    let label_y = if above >= 0 {
        above
    } else {
        top + LABEL_GAP as i64 + 1
    };
    draw_text(img, detection.x as i32, label_y as i32, &label, LABEL_COLOR);
}

/// Box geometry limited to one pixel past each image edge, so edges that
/// fall outside stay outside. `None` for empty or fully off-image boxes.
fn clip_box(detection: &Detection, img_w: u32, img_h: u32) -> Option<(i32, i32, u32, u32)> {
    if detection.width == 0 || detection.height == 0 {
        return None;
    }
    if detection.x >= img_w || detection.y >= img_h {
        return None;
    }
    let clip = |start: u32, len: u32, limit: u32| -> u32 {
        let end = (start as u64 + len as u64).min(limit as u64 + 2);
        (end - start as u64) as u32
    };
    Some((
        detection.x as i32,
        detection.y as i32,
        clip(detection.x, detection.width, img_w),
        clip(detection.y, detection.height, img_h),
    ))
}

/// Draw `text` with its top-left corner at (x, y). Pixels outside the image
/// are skipped; unknown characters render as blanks.
pub fn draw_text(img: &mut RgbImage, x: i32, y: i32, text: &str, color: Rgb<u8>) {
    let (width, height) = (img.width() as i64, img.height() as i64);
    if y as i64 >= height || (y as i64) + text_height() as i64 <= 0 {
        return;
    }
    let mut cursor_x = x as i64;
    for ch in text.chars() {
        if cursor_x >= width {
            break;
        }
        if cursor_x + ADVANCE as i64 > 0 {
            draw_glyph(img, cursor_x as i32, y, ch, color);
        }
        cursor_x += ADVANCE as i64;
    }
}

fn draw_glyph(img: &mut RgbImage, x: i32, y: i32, ch: char, color: Rgb<u8>) {
    let bitmap = glyph(ch);
    let (width, height) = (img.width() as i32, img.height() as i32);
    for (row, bits) in bitmap.iter().enumerate() {
        for col in 0..GLYPH_W {
            if (bits >> (GLYPH_W - 1 - col)) & 1 == 0 {
                continue;
            }
            for dy in 0..TEXT_SCALE {
                for dx in 0..TEXT_SCALE {
                    let px = x + col * TEXT_SCALE + dx;
                    let py = y + row as i32 * TEXT_SCALE + dy;
                    if px >= 0 && py >= 0 && px < width && py < height {
                        img.put_pixel(px as u32, py as u32, color);
                    }
                }
            }
        }
    }
}

fn glyph(ch: char) -> [u8; 5] {
    let ch = match ch {
        'ñ' | 'Ñ' => 'N',
        other => other.to_ascii_uppercase(),
    };
    match ch {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b010, 0b010, 0b010],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'A' => [0b010, 0b101, 0b111, 0b101, 0b101],
        'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'C' => [0b011, 0b100, 0b100, 0b100, 0b011],
        'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'E' => [0b111, 0b100, 0b110, 0b100, 0b111],
        'F' => [0b111, 0b100, 0b110, 0b100, 0b100],
        'G' => [0b011, 0b100, 0b101, 0b101, 0b011],
        'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'J' => [0b001, 0b001, 0b001, 0b101, 0b010],
        'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'M' => [0b101, 0b111, 0b111, 0b101, 0b101],
        'N' => [0b110, 0b101, 0b101, 0b101, 0b101],
        'O' => [0b010, 0b101, 0b101, 0b101, 0b010],
        'P' => [0b110, 0b101, 0b110, 0b100, 0b100],
        'Q' => [0b010, 0b101, 0b101, 0b110, 0b011],
        'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        'S' => [0b011, 0b100, 0b010, 0b001, 0b110],
        'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'V' => [0b101, 0b101, 0b101, 0b101, 0b010],
        'W' => [0b101, 0b101, 0b111, 0b111, 0b101],
        'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'Y' => [0b101, 0b101, 0b010, 0b010, 0b010],
        'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '%' => [0b101, 0b001, 0b010, 0b100, 0b101],
        _ => [0b000; 5],
    }
}
