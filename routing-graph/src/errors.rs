//! Error types for graph import, block decoding and lookups.

use std::io;
use thiserror::Error;

use crate::blocks::BlockKind;
use crate::ids::BlockId;

/// Errors that can occur while importing packages or answering graph queries.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid package file (bad magic {0:?})")]
    BadMagic([u8; 4]),

    #[error("Unsupported package version {major}.{minor} (supported major version: {supported})")]
    UnsupportedVersion { major: u16, minor: u16, supported: u16 },

    #[error("Package is missing the '{0}' chunk")]
    MissingChunk(String),

    #[error("Malformed package header: {0}")]
    Header(String),

    #[error("Failed to decode {kind} block {block_id}: {reason}")]
    Decode {
        kind: BlockKind,
        block_id: BlockId,
        reason: String,
    },

    #[error("Element {element_index} is out of range for {kind} block {block_id} ({len} elements)")]
    InvalidElement {
        kind: BlockKind,
        block_id: BlockId,
        element_index: u32,
        len: usize,
    },

    #[error("Block {block_index} is out of range for the {chunk} chunk: {reason}")]
    BlockOutOfRange {
        chunk: String,
        block_index: u32,
        reason: String,
    },

    #[error("Package {0} is not loaded")]
    UnknownPackage(u32),

    #[error("Package id {package_id} ('{name}') is already loaded")]
    DuplicatePackage { package_id: u32, name: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl GraphError {
    /// Returns `true` for failures that indicate corrupt package data rather than
    /// an environment problem such as a missing file.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            GraphError::Decode { .. }
                | GraphError::InvalidElement { .. }
                | GraphError::BlockOutOfRange { .. }
                | GraphError::Header(_)
        )
    }

    pub(crate) fn decode(kind: BlockKind, block_id: BlockId, reason: impl Into<String>) -> Self {
        GraphError::Decode {
            kind,
            block_id,
            reason: reason.into(),
        }
    }
}

/// Result type for graph operations
pub type GraphResult<T> = Result<T, GraphError>;
