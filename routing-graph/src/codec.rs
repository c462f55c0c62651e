//! Zig-zag and delta coding of geometry coordinates.
//!
//! A geometry is stored as a sequence of `[lat, lon]` pairs where each value
//! is the zig-zag encoded difference to the previous point (the first point is
//! relative to zero). Small movements therefore become small unsigned values
//! that the varint block encoding stores in one or two bytes.

use crate::geometry::Point;

/// Maps a signed value to an unsigned one: 0, -1, 1, -2, 2 ... become 0, 1, 2, 3, 4 ...
#[inline]
pub fn encode_zig_zag(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

/// Inverse of [`encode_zig_zag`]: `(v >> 1) ^ -(v & 1)`.
#[inline]
pub fn decode_zig_zag(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}

/// Encodes a point sequence as zig-zag deltas.
pub fn encode_geometry(points: &[Point]) -> Vec<[u32; 2]> {
    let mut previous = Point::default();
    points
        .iter()
        .map(|point| {
            let delta = [
                encode_zig_zag(point.lat.wrapping_sub(previous.lat)),
                encode_zig_zag(point.lon.wrapping_sub(previous.lon)),
            ];
            previous = *point;
            delta
        })
        .collect()
}

/// Rebuilds absolute points from zig-zag deltas, in stored order.
pub fn decode_geometry(deltas: &[[u32; 2]]) -> Vec<Point> {
    let mut current = Point::default();
    deltas
        .iter()
        .map(|[lat, lon]| {
            current = Point::new(
                current.lat.wrapping_add(decode_zig_zag(*lat)),
                current.lon.wrapping_add(decode_zig_zag(*lon)),
            );
            current
        })
        .collect()
}
