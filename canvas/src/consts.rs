//! Shared numeric constants for the canvas crate.

// ── Surface ─────────────────────────────────────────────────────

/// Default render width in pixels.
pub const DEFAULT_WIDTH: u32 = 800;

/// Default render height in pixels.
pub const DEFAULT_HEIGHT: u32 = 600;

/// RGBA8.
pub const BYTES_PER_PIXEL: usize = 4;

// ── Brush ───────────────────────────────────────────────────────

/// Smallest brush radius in pixels. Keeps hairline strokes visible.
pub const MIN_BRUSH_RADIUS: f64 = 0.5;

/// Background used when flattening a transparent buffer to PPM.
pub const WHITE: [u8; 3] = [255, 255, 255];
