//! Chunked container reader.
//!
//! Handles direct I/O against a package file. Nothing is preloaded apart from
//! the header and the block offset tables: each `read_block` call results in
//! exactly one seek and one read of the requested byte range.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Deserialize;

use crate::constants::MAX_RECORD_BYTES;
use crate::format::{decode_record, tag_name, table_config, FileHeader};
use crate::errors::{GraphError, GraphResult};

/// A seekable byte source a container can be read from.
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// Magic and version, decoded and checked before the chunk directory.
#[derive(Debug, Deserialize)]
struct HeaderPrefix {
    magic: [u8; 4],
    version_major: u16,
    version_minor: u16,
}

/// An opened package file: the validated header plus the shared byte source.
///
/// Reads from several threads are serialized on an internal lock, one range at
/// a time.
pub struct ContainerReader {
    source: Mutex<Box<dyn ReadSeek>>,
    len: u64,
    header: FileHeader,
}

impl ContainerReader {
    /// Opens a package file and validates its header.
    pub fn open(path: impl AsRef<Path>) -> GraphResult<Arc<Self>> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(file)
    }

    /// Reads the header from an already open source.
    pub fn from_reader<R: Read + Seek + Send + 'static>(mut reader: R) -> GraphResult<Arc<Self>> {
        let len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;

        let prefix: HeaderPrefix = bincode::serde::decode_from_std_read(&mut reader, table_config())
            .map_err(|e| GraphError::Header(e.to_string()))?;
        let mut header = FileHeader {
            magic: prefix.magic,
            version_major: prefix.version_major,
            version_minor: prefix.version_minor,
            chunks: Vec::new(),
        };
        // the version is checked before the directory is interpreted
        header.validate()?;
        header.chunks = bincode::serde::decode_from_std_read(&mut reader, table_config())
            .map_err(|e| GraphError::Header(e.to_string()))?;

        for entry in &header.chunks {
            let end = entry.offset.checked_add(entry.length);
            if end.map_or(true, |end| end > len) {
                return Err(GraphError::Header(format!(
                    "chunk '{}' [{}, +{}) exceeds file length {}",
                    tag_name(entry.tag),
                    entry.offset,
                    entry.length,
                    len
                )));
            }
        }

        Ok(Arc::new(Self {
            source: Mutex::new(Box::new(reader)),
            len,
            header,
        }))
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Reads `length` bytes at `offset`, failing if the range leaves the file.
    pub fn read_range(&self, offset: u64, length: u64) -> GraphResult<Vec<u8>> {
        let in_bounds = offset
            .checked_add(length)
            .is_some_and(|end| end <= self.len);
        if !in_bounds {
            return Err(GraphError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("read of {} bytes at {} exceeds file length {}", length, offset, self.len),
            )));
        }
        if length > MAX_RECORD_BYTES as u64 {
            return Err(GraphError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("read of {} bytes exceeds the record size limit", length),
            )));
        }

        let mut buffer = vec![0u8; length as usize];
        let mut source = self.source.lock();
        source.seek(SeekFrom::Start(offset))?;
        source.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    /// Reads a whole chunk and decodes it as one record.
    pub fn read_record<T: serde::de::DeserializeOwned>(&self, tag: [u8; 4]) -> GraphResult<T> {
        let entry = *self.header.chunk(tag)?;
        let bytes = self.read_range(entry.offset, entry.length)?;
        decode_record(&bytes)
            .map_err(|reason| GraphError::Header(format!("chunk '{}': {}", tag_name(tag), reason)))
    }

    /// Opens a block chunk, reading its offset table.
    pub fn chunk(self: &Arc<Self>, tag: [u8; 4]) -> GraphResult<DataChunk> {
        let entry = *self.header.chunk(tag)?;
        let name = tag_name(tag);
        if entry.length == 0 {
            return Ok(DataChunk {
                container: Arc::clone(self),
                name,
                data_offset: entry.offset,
                data_length: 0,
                block_offsets: Vec::new(),
            });
        }

        let count_bytes = self.read_range(entry.offset, 8.min(entry.length))?;
        let (count, _) = bincode::serde::decode_from_slice::<u64, _>(&count_bytes, table_config())
            .map_err(|e| GraphError::Header(format!("chunk '{}': {}", name, e)))?;
        let table_length = count
            .checked_mul(8)
            .and_then(|n| n.checked_add(8))
            .filter(|n| *n <= entry.length)
            .ok_or_else(|| {
                GraphError::Header(format!(
                    "chunk '{}': offset table of {} entries exceeds chunk length {}",
                    name, count, entry.length
                ))
            })?;

        let table_bytes = self.read_range(entry.offset, table_length)?;
        let (block_offsets, _) =
            bincode::serde::decode_from_slice::<Vec<u64>, _>(&table_bytes, table_config())
                .map_err(|e| GraphError::Header(format!("chunk '{}': {}", name, e)))?;

        let data_length = entry.length - table_length;
        let monotonic = block_offsets.windows(2).all(|w| w[0] <= w[1]);
        if !monotonic || block_offsets.last().is_some_and(|last| *last > data_length) {
            return Err(GraphError::Header(format!(
                "chunk '{}': block offsets are not ordered within the chunk",
                name
            )));
        }

        Ok(DataChunk {
            container: Arc::clone(self),
            name,
            data_offset: entry.offset + table_length,
            data_length,
            block_offsets,
        })
    }
}

/// A named, block-addressable range of a container.
pub struct DataChunk {
    container: Arc<ContainerReader>,
    name: String,
    data_offset: u64,
    data_length: u64,
    block_offsets: Vec<u64>,
}

impl DataChunk {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn block_count(&self) -> usize {
        self.block_offsets.len().saturating_sub(1)
    }

    pub fn data_length(&self) -> u64 {
        self.data_length
    }

    /// Reads the raw bytes of one block.
    pub fn read_block(&self, block_index: u32) -> GraphResult<Vec<u8>> {
        let index = block_index as usize;
        if index >= self.block_count() {
            return Err(GraphError::BlockOutOfRange {
                chunk: self.name.clone(),
                block_index,
                reason: format!("chunk has {} blocks", self.block_count()),
            });
        }
        let start = self.block_offsets[index];
        let end = self.block_offsets[index + 1];
        self.container
            .read_range(self.data_offset + start, end - start)
    }
}

impl std::fmt::Debug for DataChunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataChunk")
            .field("name", &self.name)
            .field("blocks", &self.block_count())
            .field("data_length", &self.data_length)
            .finish()
    }
}
