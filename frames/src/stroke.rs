//! Stroke data model shared by the server, the replay engine, and clients.
//!
//! A [`Stroke`] can only be built through [`Stroke::new`] (or deserialized,
//! which goes through the same check), so every stroke that reaches a history
//! log has at least [`MIN_STROKE_POINTS`] finite points with a positive width.

use serde::{Deserialize, Serialize};

use crate::ErrorCode;

/// Fewest points a committed stroke may have. A single-point gesture draws nothing.
pub const MIN_STROKE_POINTS: usize = 2;

/// One sampled input position with the brush settings active when it was captured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    /// CSS-style hex colour, e.g. `#1e90ff`.
    pub color: String,
    /// Brush diameter in canvas pixels. Older clients send this as `size`.
    #[serde(alias = "size")]
    pub width: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64, color: impl Into<String>, width: f64) -> Self {
        Self { x, y, color: color.into(), width }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StrokeError {
    #[error("stroke has {0} point(s), at least {MIN_STROKE_POINTS} required")]
    TooShort(usize),
    #[error("point {index} has a non-finite coordinate")]
    NonFiniteCoordinate { index: usize },
    #[error("point {index} has invalid width {width}")]
    InvalidWidth { index: usize, width: f64 },
}

impl ErrorCode for StrokeError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::TooShort(_) => "E_EMPTY_STROKE",
            Self::NonFiniteCoordinate { .. } | Self::InvalidWidth { .. } => "E_INVALID_POINT",
        }
    }
}

/// An immutable, validated drawing gesture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Point>", into = "Vec<Point>")]
pub struct Stroke {
    points: Vec<Point>,
}

impl Stroke {
    /// Validate `points` and wrap them as a stroke.
    ///
    /// # Errors
    ///
    /// Returns [`StrokeError::TooShort`] for fewer than [`MIN_STROKE_POINTS`]
    /// points, and a point-level error for non-finite coordinates or a width
    /// that is not a finite positive number.
    pub fn new(points: Vec<Point>) -> Result<Self, StrokeError> {
        if points.len() < MIN_STROKE_POINTS {
            return Err(StrokeError::TooShort(points.len()));
        }
        for (index, point) in points.iter().enumerate() {
            if !point.x.is_finite() || !point.y.is_finite() {
                return Err(StrokeError::NonFiniteCoordinate { index });
            }
            if !point.width.is_finite() || point.width <= 0.0 {
                return Err(StrokeError::InvalidWidth { index, width: point.width });
            }
        }
        Ok(Self { points })
    }

    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Stroke colour. Taken from the first point, as drawing tools do.
    #[must_use]
    pub fn color(&self) -> &str {
        &self.points[0].color
    }

    /// Brush width of the first point.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.points[0].width
    }

    /// Consecutive point pairs, one per line segment.
    pub fn segments(&self) -> impl Iterator<Item = (&Point, &Point)> {
        self.points.windows(2).map(|pair| (&pair[0], &pair[1]))
    }
}

impl TryFrom<Vec<Point>> for Stroke {
    type Error = StrokeError;

    fn try_from(points: Vec<Point>) -> Result<Self, Self::Error> {
        Self::new(points)
    }
}

impl From<Stroke> for Vec<Point> {
    fn from(stroke: Stroke) -> Self {
        stroke.points
    }
}

#[cfg(test)]
#[path = "stroke_test.rs"]
mod tests;
