//! Coordinates and the distance metric used by the nearest-road search.
//!
//! All distances are computed in one local equirectangular projection centred
//! on the latitude of the query position and scaled to meters. Point distance,
//! bounding box distance and segment projection share that projection, which
//! is what keeps branch-and-bound pruning sound: a bounding box distance is
//! never larger than the distance to any point inside the box.

use std::fmt::{self, Display};

use crate::bounding_box::BoundingBox;
use crate::constants::{COORDINATE_SCALE, EARTH_RADIUS_METERS};

/// A stored fixed-point coordinate, `degrees * COORDINATE_SCALE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub lat: i32,
    pub lon: i32,
}

impl Point {
    pub const fn new(lat: i32, lon: i32) -> Self {
        Self { lat, lon }
    }

    /// Converts to floating WGS84 degrees.
    pub fn to_wgs(&self) -> WgsPos {
        WgsPos::new(
            self.lat as f64 / COORDINATE_SCALE,
            self.lon as f64 / COORDINATE_SCALE,
        )
    }

    /// Converts from WGS84 degrees, rounding to the nearest representable value.
    pub fn from_wgs(pos: &WgsPos) -> Self {
        Self::new(
            (pos.lat * COORDINATE_SCALE).round() as i32,
            (pos.lon * COORDINATE_SCALE).round() as i32,
        )
    }
}

/// A WGS84 position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WgsPos {
    pub lat: f64,
    pub lon: f64,
}

impl WgsPos {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Latitude within [-90, 90] and longitude within [-180, 180].
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }
}

impl Display for WgsPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WgsPos(lat={:.6}, lon={:.6})", self.lat, self.lon)
    }
}

/// Local projection around a reference latitude.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Metric {
    meters_per_lat_degree: f64,
    meters_per_lon_degree: f64,
}

impl Metric {
    pub(crate) fn around(origin: &WgsPos) -> Self {
        let meters_per_degree = EARTH_RADIUS_METERS * std::f64::consts::PI / 180.0;
        Self {
            meters_per_lat_degree: meters_per_degree,
            meters_per_lon_degree: meters_per_degree * origin.lat.to_radians().cos(),
        }
    }

    fn project(&self, origin: &WgsPos, pos: &WgsPos) -> (f64, f64) {
        (
            (pos.lon - origin.lon) * self.meters_per_lon_degree,
            (pos.lat - origin.lat) * self.meters_per_lat_degree,
        )
    }

    pub(crate) fn point_distance(&self, pos0: &WgsPos, pos1: &WgsPos) -> f64 {
        let (dx, dy) = self.project(pos0, pos1);
        dx.hypot(dy)
    }

    pub(crate) fn bbox_distance(&self, pos: &WgsPos, bbox: &BoundingBox) -> f64 {
        self.point_distance(pos, &bbox.clamp(pos))
    }

    /// Projects `pos` onto the segment `p0..p1`, returning the closest point and
    /// its relative position along the segment in `[0, 1]`.
    pub(crate) fn closest_segment_point(
        &self,
        pos: &WgsPos,
        p0: &WgsPos,
        p1: &WgsPos,
    ) -> (WgsPos, f64) {
        let (ax, ay) = self.project(pos, p0);
        let (bx, by) = self.project(pos, p1);
        let (sx, sy) = (bx - ax, by - ay);
        let len2 = sx * sx + sy * sy;
        if len2 <= 0.0 {
            return (*p0, 0.0);
        }
        let t = (-(ax * sx + ay * sy) / len2).clamp(0.0, 1.0);
        let closest = WgsPos::new(
            p0.lat + (p1.lat - p0.lat) * t,
            p0.lon + (p1.lon - p0.lon) * t,
        );
        (closest, t)
    }
}

/// Distance in meters between two positions, measured in the projection around `pos0`.
pub fn point_distance(pos0: &WgsPos, pos1: &WgsPos) -> f64 {
    Metric::around(pos0).point_distance(pos0, pos1)
}

/// Lower bound in meters of the distance from `pos` to any point inside `bbox`.
pub fn bbox_distance(pos: &WgsPos, bbox: &BoundingBox) -> f64 {
    Metric::around(pos).bbox_distance(pos, bbox)
}

/// Closest point to `pos` on the segment `p0..p1` and its relative position along it.
pub fn closest_segment_point(pos: &WgsPos, p0: &WgsPos, p1: &WgsPos) -> (WgsPos, f64) {
    Metric::around(pos).closest_segment_point(pos, p0, p1)
}
