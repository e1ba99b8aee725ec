//! Append-only encoder for host records.
//!
//! Every append writes the little-endian representation of its value and
//! records a [`DataField`] describing where it landed. Names are attached
//! after the fact with [`named`](DataBlockBuilder::named):
//!
//! ```
//! use simconnect_models::DataBlockBuilder;
//!
//! let mut builder = DataBlockBuilder::new();
//! builder.add_int32(42).named("altitude");
//! builder.add_string("N12345", 8).unwrap().named("tail");
//! assert_eq!(builder.size(), 12);
//! assert_eq!(builder.fields()[1].name.as_deref(), Some("tail"));
//! ```

use crate::data_block::{DataBlock, DataField};
use crate::error::ModelError;
use crate::ids::DataType;
use crate::position::{InitPosition, LatLonAlt, MarkerState, Waypoint, Xyz};

/// Builds a [`DataBlock`] one field at a time.
#[derive(Debug, Clone, Default)]
pub struct DataBlockBuilder {
    block: DataBlock,
    fields: Vec<DataField>,
}

impl DataBlockBuilder {
    /// An empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty builder with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            block: DataBlock::with_capacity(capacity),
            fields: Vec::new(),
        }
    }

    fn push(&mut self, data_type: Option<DataType>, bytes: &[u8]) -> &mut Self {
        self.fields.push(DataField {
            name: None,
            data_type,
            offset: self.block.size(),
            size: bytes.len(),
        });
        self.block.extend(bytes);
        self
    }

    /// Attach a diagnostic name to the most recently appended field.
    pub fn named(&mut self, name: impl Into<String>) -> &mut Self {
        if let Some(field) = self.fields.last_mut() {
            field.name = Some(name.into());
        }
        self
    }

    // ── Primitives ───────────────────────────────────────────────────────

    /// Append a 32-bit signed integer.
    pub fn add_int32(&mut self, value: i32) -> &mut Self {
        self.push(Some(DataType::Int32), &value.to_le_bytes())
    }

    /// Append a 32-bit unsigned integer (a host `DWORD`).
    pub fn add_uint32(&mut self, value: u32) -> &mut Self {
        self.push(Some(DataType::Int32), &value.to_le_bytes())
    }

    /// Append a 64-bit signed integer.
    pub fn add_int64(&mut self, value: i64) -> &mut Self {
        self.push(Some(DataType::Int64), &value.to_le_bytes())
    }

    /// Append a 32-bit float.
    pub fn add_float32(&mut self, value: f32) -> &mut Self {
        self.push(Some(DataType::Float32), &value.to_le_bytes())
    }

    /// Append a 64-bit float.
    pub fn add_float64(&mut self, value: f64) -> &mut Self {
        self.push(Some(DataType::Float64), &value.to_le_bytes())
    }

    // ── Strings ──────────────────────────────────────────────────────────

    /// Append `value` as a fixed-length string of `fixed_len` bytes.
    ///
    /// At most `fixed_len - 1` bytes are copied; the rest is zero, so the last
    /// byte is always a terminator.
    ///
    /// # Errors
    ///
    /// [`ModelError::InvalidStringLength`] unless `fixed_len` is one of the
    /// host's fixed-string sizes.
    pub fn add_string(&mut self, value: &str, fixed_len: usize) -> Result<&mut Self, ModelError> {
        let data_type = DataType::fixed_string(fixed_len)
            .ok_or(ModelError::InvalidStringLength { length: fixed_len })?;
        let bytes = fixed_bytes(value, fixed_len);
        Ok(self.push(Some(data_type), &bytes))
    }

    /// Append `value` followed by a single terminator.
    pub fn add_string_v(&mut self, value: &str) -> &mut Self {
        let mut bytes = Vec::with_capacity(value.len() + 1);
        bytes.extend_from_slice(value.as_bytes());
        bytes.push(0);
        self.push(Some(DataType::StringV), &bytes)
    }

    /// Append a character array of any length, as found inside host message
    /// records (`char Ident[9]`, `char Region[3]`, …). Same truncation rule
    /// as [`add_string`](Self::add_string), without the length check.
    pub fn add_chars(&mut self, value: &str, len: usize) -> &mut Self {
        let bytes = fixed_bytes(value, len);
        self.push(None, &bytes)
    }

    /// Append raw bytes.
    pub fn add_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.push(None, bytes)
    }

    // ── Compound records ─────────────────────────────────────────────────

    /// Append an [`InitPosition`] record.
    pub fn add_init_position(&mut self, pos: &InitPosition) -> &mut Self {
        let mut bytes = Vec::with_capacity(InitPosition::WIRE_SIZE);
        for v in [pos.latitude, pos.longitude, pos.altitude, pos.pitch, pos.bank, pos.heading] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes.extend_from_slice(&u32::from(pos.on_ground).to_le_bytes());
        bytes.extend_from_slice(&pos.airspeed.to_le_bytes());
        self.push(Some(DataType::InitPosition), &bytes)
    }

    /// Append a [`MarkerState`] record.
    pub fn add_marker_state(&mut self, marker: &MarkerState) -> &mut Self {
        let mut bytes = fixed_bytes(&marker.name, 64);
        bytes.extend_from_slice(&u32::from(marker.on).to_le_bytes());
        self.push(Some(DataType::MarkerState), &bytes)
    }

    /// Append a [`Waypoint`] record.
    pub fn add_waypoint(&mut self, wp: &Waypoint) -> &mut Self {
        let mut bytes = Vec::with_capacity(Waypoint::WIRE_SIZE);
        for v in [wp.latitude, wp.longitude, wp.altitude] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes.extend_from_slice(&wp.flags.to_le_bytes());
        bytes.extend_from_slice(&wp.kts_speed.to_le_bytes());
        bytes.extend_from_slice(&wp.percent_throttle.to_le_bytes());
        self.push(Some(DataType::Waypoint), &bytes)
    }

    /// Append a [`LatLonAlt`] record.
    pub fn add_lat_lon_alt(&mut self, lla: &LatLonAlt) -> &mut Self {
        let mut bytes = Vec::with_capacity(LatLonAlt::WIRE_SIZE);
        for v in [lla.latitude, lla.longitude, lla.altitude] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        self.push(Some(DataType::LatLonAlt), &bytes)
    }

    /// Append an [`Xyz`] record.
    pub fn add_xyz(&mut self, xyz: &Xyz) -> &mut Self {
        let mut bytes = Vec::with_capacity(Xyz::WIRE_SIZE);
        for v in [xyz.x, xyz.y, xyz.z] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        self.push(Some(DataType::Xyz), &bytes)
    }

    // ── Output ───────────────────────────────────────────────────────────

    /// Number of bytes written so far.
    pub fn size(&self) -> usize {
        self.block.size()
    }

    /// Layout records, one per append, in order.
    pub fn fields(&self) -> &[DataField] {
        &self.fields
    }

    /// The block built so far.
    pub fn data_block(&self) -> &DataBlock {
        &self.block
    }

    /// The bytes built so far.
    pub fn data(&self) -> &[u8] {
        self.block.data()
    }

    /// Finish and take the block.
    pub fn into_data_block(self) -> DataBlock {
        self.block
    }

    /// Start over, keeping the allocation.
    pub fn clear(&mut self) {
        self.block.clear();
        self.fields.clear();
    }
}

/// `value` copied into `len` bytes, truncated to `len - 1` and zero padded.
fn fixed_bytes(value: &str, len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    let copy = value.len().min(len.saturating_sub(1));
    bytes[..copy].copy_from_slice(&value.as_bytes()[..copy]);
    bytes
}
