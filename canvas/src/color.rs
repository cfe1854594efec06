//! Stroke colour parsing.
//!
//! Colours arrive as CSS-style hex strings. Only `#rgb` and `#rrggbb` are
//! understood; anything else falls back to black so a bad colour never stops
//! a history from replaying.

/// Fallback for unparseable colours.
pub const BLACK: [u8; 3] = [0, 0, 0];

/// Parse `#rgb` or `#rrggbb` into RGB bytes.
#[must_use]
pub fn parse_hex(color: &str) -> Option<[u8; 3]> {
    let hex = color.trim().strip_prefix('#')?.as_bytes();
    match hex {
        [r, g, b] => Some([nibble(*r)? * 17, nibble(*g)? * 17, nibble(*b)? * 17]),
        [r1, r0, g1, g0, b1, b0] => Some([byte(*r1, *r0)?, byte(*g1, *g0)?, byte(*b1, *b0)?]),
        _ => None,
    }
}

/// Resolve a stroke colour, falling back to [`BLACK`].
#[must_use]
pub fn resolve(color: &str) -> [u8; 3] {
    parse_hex(color).unwrap_or(BLACK)
}

fn byte(hi: u8, lo: u8) -> Option<u8> {
    Some(nibble(hi)? * 16 + nibble(lo)?)
}

fn nibble(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'a'..=b'f' => Some(digit - b'a' + 10),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
#[path = "color_test.rs"]
mod color_test;
