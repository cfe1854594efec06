//! Rendering: replays an ordered stroke log into an RGBA pixel buffer.
//!
//! This is the ReplayEngine. [`render`] always starts from a cleared buffer
//! and draws strokes in log order, so later strokes occlude earlier ones and
//! identical input produces byte-identical output. There is no anti-aliasing
//! and no blending: a pixel is either untouched or painted opaque with the
//! stroke colour, which keeps the output a pure function of the input.
//!
//! Each consecutive point pair is drawn as a round-capped segment: a pixel is
//! covered when its centre lies within the brush radius of the segment.

use frames::{Point, Stroke};

use crate::color;
use crate::consts::{BYTES_PER_PIXEL, MIN_BRUSH_RADIUS};

/// Owned RGBA8 frame, row-major, origin at the top-left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// A fully transparent buffer.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize * BYTES_PER_PIXEL;
        Self { width, height, data: vec![0; len] }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Reset every pixel to transparent `[0, 0, 0, 0]`.
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    /// RGBA value at `(x, y)`, or `None` outside the buffer.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.offset(x, y);
        Some([self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]])
    }

    /// Number of pixels with non-zero alpha.
    #[must_use]
    pub fn painted_pixels(&self) -> usize {
        self.data.chunks_exact(BYTES_PER_PIXEL).filter(|px| px[3] != 0).count()
    }

    /// Encode as binary PPM (P6). Transparent pixels take `background`.
    #[must_use]
    pub fn to_ppm(&self, background: [u8; 3]) -> Vec<u8> {
        let header = format!("P6\n{} {}\n255\n", self.width, self.height);
        let mut out = Vec::with_capacity(header.len() + self.data.len() / BYTES_PER_PIXEL * 3);
        out.extend_from_slice(header.as_bytes());
        for px in self.data.chunks_exact(BYTES_PER_PIXEL) {
            if px[3] == 0 {
                out.extend_from_slice(&background);
            } else {
                out.extend_from_slice(&px[..3]);
            }
        }
        out
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL
    }

    fn put(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
        let i = self.offset(x, y);
        self.data[i..i + 3].copy_from_slice(&rgb);
        self.data[i + 3] = u8::MAX;
    }
}

/// Replay `strokes` onto a fresh `width` x `height` buffer.
#[must_use]
pub fn render(strokes: &[Stroke], width: u32, height: u32) -> PixelBuffer {
    let mut buf = PixelBuffer::new(width, height);
    draw_strokes(&mut buf, strokes);
    buf
}

/// Draw `strokes` in order on top of whatever `buf` already holds.
pub fn draw_strokes(buf: &mut PixelBuffer, strokes: &[Stroke]) {
    for stroke in strokes {
        draw_stroke(buf, stroke);
    }
}

pub fn draw_stroke(buf: &mut PixelBuffer, stroke: &Stroke) {
    draw_points(buf, stroke.points());
}

/// Draw a raw polyline using the first point's colour and width. Used for the
/// uncommitted gesture, which may not yet be a valid [`Stroke`]. Fewer than
/// two points draw nothing.
pub fn draw_points(buf: &mut PixelBuffer, points: &[Point]) {
    let Some(first) = points.first() else {
        return;
    };
    let rgb = color::resolve(&first.color);
    let radius = (first.width / 2.0).max(MIN_BRUSH_RADIUS);
    if !radius.is_finite() {
        return;
    }
    for pair in points.windows(2) {
        draw_segment(buf, &pair[0], &pair[1], radius, rgb);
    }
}

// =============================================================
// Rasterization
// =============================================================

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn draw_segment(buf: &mut PixelBuffer, a: &Point, b: &Point, radius: f64, rgb: [u8; 3]) {
    if buf.width == 0 || buf.height == 0 {
        return;
    }
    if ![a.x, a.y, b.x, b.y].iter().all(|v| v.is_finite()) {
        return;
    }

    // Pixel-index bounding box, clamped to the buffer before casting.
    let x0 = (a.x.min(b.x) - radius).floor().max(0.0);
    let y0 = (a.y.min(b.y) - radius).floor().max(0.0);
    let x1 = (a.x.max(b.x) + radius).ceil().min(f64::from(buf.width - 1));
    let y1 = (a.y.max(b.y) + radius).ceil().min(f64::from(buf.height - 1));
    if x0 > x1 || y0 > y1 {
        return;
    }

    let radius_sq = radius * radius;
    for y in (y0 as u32)..=(y1 as u32) {
        let cy = f64::from(y) + 0.5;
        for x in (x0 as u32)..=(x1 as u32) {
            let cx = f64::from(x) + 0.5;
            if distance_sq_to_segment(cx, cy, a, b) <= radius_sq {
                buf.put(x, y, rgb);
            }
        }
    }
}

/// Squared distance from `(px, py)` to the closed segment `a`-`b`.
fn distance_sq_to_segment(px: f64, py: f64, a: &Point, b: &Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq > 0.0 { (((px - a.x) * dx + (py - a.y) * dy) / len_sq).clamp(0.0, 1.0) } else { 0.0 };
    let ex = a.x + t * dx - px;
    let ey = a.y + t * dy - py;
    ex * ex + ey * ey
}

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;
