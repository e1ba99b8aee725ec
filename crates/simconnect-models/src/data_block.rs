//! Growable byte buffer shared by the builder and the reader.

use serde::{Deserialize, Serialize};

use crate::ids::DataType;

/// Layout record of one appended field.
///
/// The builder emits one per append so callers can inspect what went where.
/// `data_type` is `None` for raw byte runs that have no host type tag
/// (character arrays inside message records, opaque payloads).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DataField {
    /// Optional diagnostic name.
    pub name: Option<String>,
    /// Host type tag, if the run has one.
    pub data_type: Option<DataType>,
    /// Byte offset from the start of the block.
    pub offset: usize,
    /// Byte length.
    pub size: usize,
}

/// A growable sequence of bytes.
///
/// `size()` is always the number of bytes logically present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataBlock {
    data: Vec<u8>,
}

impl DataBlock {
    /// An empty block.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty block with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    /// Reserve room for `additional` more bytes.
    pub fn reserve(&mut self, additional: usize) {
        self.data.reserve(additional);
    }

    /// Grow or shrink to `size` bytes; new bytes are zero.
    pub fn resize(&mut self, size: usize) {
        self.data.resize(size, 0);
    }

    /// Drop all bytes.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Replace the contents with a copy of `bytes`.
    pub fn set_data(&mut self, bytes: &[u8]) {
        self.data.clear();
        self.data.extend_from_slice(bytes);
    }

    /// Read-only view of the bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Number of bytes present.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// True when no bytes are present.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append raw bytes.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Give up the underlying vector.
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

impl From<Vec<u8>> for DataBlock {
    fn from(data: Vec<u8>) -> Self {
        Self { data }
    }
}

impl From<&[u8]> for DataBlock {
    fn from(bytes: &[u8]) -> Self {
        Self {
            data: bytes.to_vec(),
        }
    }
}

impl AsRef<[u8]> for DataBlock {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}
