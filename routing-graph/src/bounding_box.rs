use serde::{Deserialize, Serialize};
use std::fmt;

use crate::geometry::WgsPos;

/// A geographic bounding box in degrees.
///
/// Follows the cartesian convention: `x` is longitude and `y` is latitude.
/// Package extents and R-tree entries are stored with this type.
///
/// # Examples
///
/// ```rust
/// use routing_graph::{BoundingBox, WgsPos};
///
/// let bbox = BoundingBox::new(24.0, 59.0, 25.0, 60.0);
/// assert!(bbox.contains_pos(&WgsPos::new(59.4, 24.7)));
/// ```
#[derive(Clone, Copy, PartialEq, Default, Debug, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Minimum longitude
    pub min_x: f64,
    /// Minimum latitude
    pub min_y: f64,
    /// Maximum longitude
    pub max_x: f64,
    /// Maximum latitude
    pub max_y: f64,
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BoundingBox({}, {}, {}, {})",
            self.min_x, self.min_y, self.max_x, self.max_y
        )
    }
}

impl BoundingBox {
    /// Creates a new bounding box with the specified coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> BoundingBox {
        BoundingBox {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// An inverted box that any `expand` call replaces.
    pub fn empty() -> Self {
        Self {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }

    /// Smallest box containing all given positions. Empty input gives [`BoundingBox::empty`].
    pub fn from_positions<'a>(positions: impl IntoIterator<Item = &'a WgsPos>) -> Self {
        let mut bbox = Self::empty();
        for pos in positions {
            bbox.expand_to_pos(pos);
        }
        bbox
    }

    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    pub fn expand(&mut self, other: &BoundingBox) {
        self.min_x = self.min_x.min(other.min_x);
        self.min_y = self.min_y.min(other.min_y);
        self.max_x = self.max_x.max(other.max_x);
        self.max_y = self.max_y.max(other.max_y);
    }

    pub fn expand_to_pos(&mut self, pos: &WgsPos) {
        self.min_x = self.min_x.min(pos.lon);
        self.min_y = self.min_y.min(pos.lat);
        self.max_x = self.max_x.max(pos.lon);
        self.max_y = self.max_y.max(pos.lat);
    }

    /// Returns the union of this bounding box with another.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let mut merged = *self;
        merged.expand(other);
        merged
    }

    /// Checks if this bounding box contains a position (edges inclusive).
    pub fn contains_pos(&self, pos: &WgsPos) -> bool {
        pos.lon >= self.min_x && pos.lon <= self.max_x && pos.lat >= self.min_y && pos.lat <= self.max_y
    }

    /// Checks if this bounding box intersects another bounding box.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    /// The point of the box closest to `pos` in degree space.
    pub fn clamp(&self, pos: &WgsPos) -> WgsPos {
        WgsPos::new(
            pos.lat.clamp(self.min_y, self.max_y),
            pos.lon.clamp(self.min_x, self.max_x),
        )
    }

    /// Checks if this bounding box is valid (min <= max).
    pub fn is_valid(&self) -> bool {
        self.min_x <= self.max_x && self.min_y <= self.max_y
    }
}
