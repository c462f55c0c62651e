//! Constants for the package container format and the graph defaults.

/// File extension of package files (without the dot)
pub const PACKAGE_EXTENSION: &str = "nutigraph";

/// Magic bytes at the start of every package file
pub const MAGIC: [u8; 4] = *b"NUTG";

/// Supported major format version. Files with another major version are rejected.
pub const VERSION_MAJOR: u16 = 1;

/// Minor format version written by `PackageWriter`
pub const VERSION_MINOR: u16 = 0;

/// Fixed-point scale of stored coordinates (1e-6 degree resolution)
pub const COORDINATE_SCALE: f64 = 1_000_000.0;

/// Earth's mean radius in meters (WGS84)
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// Upper bound on the encoded size of a single header or block record
pub const MAX_RECORD_BYTES: usize = 64 * 1024 * 1024;

/// Candidates within this many meters of the nearest one are reported as ties
pub const TIE_DISTANCE_METERS: f64 = 1e-6;

/// Chunk tags
pub const META_CHUNK: [u8; 4] = *b"meta";
pub const NODE_CHUNK: [u8; 4] = *b"node";
pub const GEOMETRY_CHUNK: [u8; 4] = *b"geom";
pub const NAME_CHUNK: [u8; 4] = *b"name";
pub const GLOBAL_NODE_CHUNK: [u8; 4] = *b"glnd";
pub const RTREE_CHUNK: [u8; 4] = *b"rtre";

/// Default cache capacities, in blocks
pub const DEFAULT_NODE_BLOCK_CACHE_SIZE: usize = 512 * 16;
pub const DEFAULT_GEOMETRY_BLOCK_CACHE_SIZE: usize = 512 * 16;
pub const DEFAULT_NAME_BLOCK_CACHE_SIZE: usize = 64 * 16;
pub const DEFAULT_GLOBAL_NODE_BLOCK_CACHE_SIZE: usize = 64 * 16;
pub const DEFAULT_RTREE_NODE_BLOCK_CACHE_SIZE: usize = 16 * 16;
