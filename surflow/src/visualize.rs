//! # Flow field overlay rendering
//!
//! Draws a semi-transparent speed heatmap tile for every grid cell, and an arrow showing the
//! speed of the cell's motion.
//!
//! Arrows are not rotated by the raw `direction` itself. Raw motion solves to the opposite of the
//! apparent displacement, so arrows point along `direction + π`, the way the water surface
//! actually moves in the frame.

use crate::flow_field::FlowField;
use crate::frame::Frame;
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_line_segment_mut, Blend};
use imageproc::rect::Rect;
use std::f32::consts::PI;

/// Appearance of the overlay.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlayStyle {
    /// Opacity of the heatmap tiles, 0-1.
    pub tile_alpha: f32,
    /// Arrow length in pixels per unit of speed.
    pub arrow_scale: f32,
    /// Speed mapped to the hottest colour.
    pub speed_norm: f32,
    pub arrow_color: Rgba<u8>,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            tile_alpha: 0.35,
            arrow_scale: 10.0,
            speed_norm: 5.0,
            arrow_color: Rgba([255, 255, 255, 255]),
        }
    }
}

/// Heatmap colour of a speed.
///
/// Hue runs from blue (240°) at rest to red (0°) at `norm` and above.
pub fn speed_color(speed: f32, norm: f32) -> Rgba<u8> {
    let t = if norm > 0.0 {
        (speed / norm).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let [r, g, b] = hsv_to_rgb(240.0 * (1.0 - t), 1.0, 1.0);
    Rgba([r, g, b, 255])
}

fn hsv_to_rgb(hue: f32, sat: f32, val: f32) -> [u8; 3] {
    let c = val * sat;
    let h = (hue / 60.0).rem_euclid(6.0);
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());

    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    let m = val - c;
    [r, g, b].map(|v| ((v + m) * 255.0).round() as u8)
}

/// Render the flow field over its source frame.
///
/// # Arguments
///
/// * `frame` - frame to draw over, normally the current frame of the analysed pair.
/// * `field` - flow field estimated on the frame.
/// * `style` - overlay appearance.
pub fn render_overlay(frame: &Frame, field: &FlowField, style: &OverlayStyle) -> RgbaImage {
    let (width, height) = frame.dim();

    let img = RgbaImage::from_fn(width as u32, height as u32, |x, y| {
        let [r, g, b] = frame.pixel(x as usize, y as usize);
        Rgba([r, g, b, 255])
    });

    let (gw, gh) = field.dim();

    if gw == 0 || gh == 0 {
        return img;
    }

    let cell_w = width as f32 / gw as f32;
    let cell_h = height as f32 / gh as f32;
    let alpha = (style.tile_alpha.clamp(0.0, 1.0) * 255.0).round() as u8;

    let mut canvas = Blend(img);

    for (x, y, v) in field.iter() {
        let x0 = (x as f32 * cell_w) as u32;
        let x1 = (((x + 1) as f32 * cell_w) as u32).min(width as u32);
        let y0 = (y as f32 * cell_h) as u32;
        let y1 = (((y + 1) as f32 * cell_h) as u32).min(height as u32);

        if x1 > x0 && y1 > y0 {
            let Rgba([r, g, b, _]) = speed_color(v.speed, style.speed_norm);
            let rect = Rect::at(x0 as i32, y0 as i32).of_size(x1 - x0, y1 - y0);
            draw_filled_rect_mut(&mut canvas, rect, Rgba([r, g, b, alpha]));
        }
    }

    let mut img = canvas.0;

    for ((pos, motion), &speed) in field.motion_iter().zip(field.speeds()) {
        if speed <= 0.0 {
            continue;
        }

        let center = (pos.x * width as f32, pos.y * height as f32);
        let len = (speed * style.arrow_scale).min(0.5 * cell_w.min(cell_h));
        let heading = motion.y.atan2(motion.x) + PI;

        draw_arrow(&mut img, center, heading, len, style.arrow_color);
    }

    img
}

/// Draw an arrow from `from`, `len` pixels long along `heading`.
///
/// End points are snapped to whole pixels.
fn draw_arrow(img: &mut RgbaImage, from: (f32, f32), heading: f32, len: f32, color: Rgba<u8>) {
    let snap = |(x, y): (f32, f32)| (x.round(), y.round());

    let from = snap(from);
    let tip = snap((from.0 + heading.cos() * len, from.1 + heading.sin() * len));
    draw_line_segment_mut(img, from, tip, color);

    let head = (len * 0.35).max(2.0);

    for side in [-1.0, 1.0] {
        let angle = heading + PI + side * PI / 6.0;
        let end = snap((tip.0 + angle.cos() * head, tip.1 + angle.sin() * head));
        draw_line_segment_mut(img, tip, end, color);
    }
}
