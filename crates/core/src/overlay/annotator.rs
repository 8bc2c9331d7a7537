use crate::access::access_decision::DecisionOutcome;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

use super::bitmap_font::{glyph_bits, GLYPH_HEIGHT, GLYPH_WIDTH};

pub const BOX_COLOR: [u8; 3] = [255, 0, 0];
pub const TEXT_COLOR: [u8; 3] = [0, 255, 0];
pub const BOX_THICKNESS: i32 = 5;
pub const TEXT_ORIGIN: (i32, i32) = (50, 200);
pub const TEXT_SCALE: i32 = 2;

/// Burns a decision's bounding box and overlay text into a frame.
#[derive(Clone, Debug)]
pub struct FrameAnnotator {
    box_color: [u8; 3],
    box_thickness: i32,
    text_color: [u8; 3],
    text_origin: (i32, i32),
    text_scale: i32,
}

impl Default for FrameAnnotator {
    fn default() -> Self {
        Self {
            box_color: BOX_COLOR,
            box_thickness: BOX_THICKNESS,
            text_color: TEXT_COLOR,
            text_origin: TEXT_ORIGIN,
            text_scale: TEXT_SCALE,
        }
    }
}

impl FrameAnnotator {
    pub fn annotate(&self, frame: &mut Frame, outcome: &DecisionOutcome) {
        if let Some(bbox) = outcome.draw_box {
            self.draw_box(frame, bbox);
        }
        self.draw_text(frame, &outcome.overlay_text);
    }

    /// Box outline centred on the box edges, `box_thickness` pixels wide.
    fn draw_box(&self, frame: &mut Frame, bbox: BoundingBox) {
        let half = self.box_thickness / 2;
        let (left, top) = (bbox.x, bbox.y);
        let (right, bottom) = (bbox.right(), bbox.bottom());

        for offset in -half..=(self.box_thickness - 1 - half) {
            for x in (left - half)..=(right + half) {
                frame.put_pixel(x, top + offset, self.box_color);
                frame.put_pixel(x, bottom + offset, self.box_color);
            }
            for y in (top - half)..=(bottom + half) {
                frame.put_pixel(left + offset, y, self.box_color);
                frame.put_pixel(right + offset, y, self.box_color);
            }
        }
    }

    /// Draws text starting at `text_origin`, one line per `\n`.
    fn draw_text(&self, frame: &mut Frame, text: &str) {
        let scale = self.text_scale;
        let advance = (GLYPH_WIDTH + 1) * scale;
        let line_height = (GLYPH_HEIGHT + 3) * scale;
        let (origin_x, origin_y) = self.text_origin;

        for (line_no, line) in text.lines().enumerate() {
            let top = origin_y + line_no as i32 * line_height;
            let mut x = origin_x;
            for ch in line.chars().flat_map(char::to_uppercase) {
                if let Some(glyph) = glyph_bits(ch) {
                    self.draw_glyph(frame, &glyph, x, top);
                }
                x += advance;
            }
        }
    }

    fn draw_glyph(&self, frame: &mut Frame, glyph: &[u8; 7], left: i32, top: i32) {
        let scale = self.text_scale;
        for (row, pattern) in glyph.iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if (pattern >> (GLYPH_WIDTH - 1 - col)) & 1 == 0 {
                    continue;
                }
                let px = left + col * scale;
                let py = top + row as i32 * scale;
                for dy in 0..scale {
                    for dx in 0..scale {
                        frame.put_pixel(px + dx, py + dy, self.text_color);
                    }
                }
            }
        }
    }
}
