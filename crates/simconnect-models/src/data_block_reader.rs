//! Positional decoder over a byte slice.
//!
//! The cursor starts at 0 and advances with every successful read. A read
//! that would run past the end fails with [`ModelError::OutOfRange`] and
//! leaves the cursor where it was.

use crate::error::ModelError;
use crate::position::{InitPosition, LatLonAlt, MarkerState, Waypoint, Xyz};

/// Reads host records field by field.
#[derive(Debug, Clone)]
pub struct DataBlockReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> DataBlockReader<'a> {
    /// A reader positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current cursor offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left after the cursor.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// True when the cursor is at the end.
    pub fn is_at_end(&self) -> bool {
        self.remaining() == 0
    }

    /// Return a view of the next `len` bytes and advance past them.
    ///
    /// # Errors
    ///
    /// [`ModelError::OutOfRange`] when fewer than `len` bytes remain.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], ModelError> {
        if len > self.remaining() {
            return Err(ModelError::OutOfRange {
                requested: len,
                remaining: self.remaining(),
            });
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    /// Advance the cursor by `len` bytes without looking at them.
    pub fn skip(&mut self, len: usize) -> Result<(), ModelError> {
        self.read_bytes(len).map(|_| ())
    }

    /// Everything after the cursor; the cursor moves to the end.
    pub fn read_rest(&mut self) -> &'a [u8] {
        let bytes = &self.data[self.pos..];
        self.pos = self.data.len();
        bytes
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], ModelError> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    // ── Primitives ───────────────────────────────────────────────────────

    /// Read a 32-bit signed integer.
    pub fn read_int32(&mut self) -> Result<i32, ModelError> {
        self.read_array().map(i32::from_le_bytes)
    }

    /// Read a 32-bit unsigned integer (a host `DWORD`).
    pub fn read_uint32(&mut self) -> Result<u32, ModelError> {
        self.read_array().map(u32::from_le_bytes)
    }

    /// Read a 64-bit signed integer.
    pub fn read_int64(&mut self) -> Result<i64, ModelError> {
        self.read_array().map(i64::from_le_bytes)
    }

    /// Read a 32-bit float.
    pub fn read_float32(&mut self) -> Result<f32, ModelError> {
        self.read_array().map(f32::from_le_bytes)
    }

    /// Read a 64-bit float.
    pub fn read_float64(&mut self) -> Result<f64, ModelError> {
        self.read_array().map(f64::from_le_bytes)
    }

    // ── Strings ──────────────────────────────────────────────────────────

    /// Read `len` bytes and return the text before the first terminator
    /// (all of it if there is none). Invalid UTF-8 is replaced.
    pub fn read_string(&mut self, len: usize) -> Result<String, ModelError> {
        let bytes = self.read_bytes(len)?;
        let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
        Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }

    /// Read up to and including the next terminator.
    ///
    /// # Errors
    ///
    /// [`ModelError::OutOfRange`] when no terminator follows the cursor.
    pub fn read_string_v(&mut self) -> Result<String, ModelError> {
        let rest = &self.data[self.pos..];
        let end = rest.iter().position(|b| *b == 0).ok_or(ModelError::OutOfRange {
            requested: rest.len() + 1,
            remaining: rest.len(),
        })?;
        let text = String::from_utf8_lossy(&rest[..end]).into_owned();
        self.pos += end + 1;
        Ok(text)
    }

    // ── Compound records ─────────────────────────────────────────────────

    /// Read an [`InitPosition`] record.
    pub fn read_init_position(&mut self) -> Result<InitPosition, ModelError> {
        let mut sub = DataBlockReader::new(self.read_bytes(InitPosition::WIRE_SIZE)?);
        Ok(InitPosition {
            latitude: sub.read_float64()?,
            longitude: sub.read_float64()?,
            altitude: sub.read_float64()?,
            pitch: sub.read_float64()?,
            bank: sub.read_float64()?,
            heading: sub.read_float64()?,
            on_ground: sub.read_uint32()? != 0,
            airspeed: sub.read_uint32()?,
        })
    }

    /// Read a [`MarkerState`] record.
    pub fn read_marker_state(&mut self) -> Result<MarkerState, ModelError> {
        let mut sub = DataBlockReader::new(self.read_bytes(MarkerState::WIRE_SIZE)?);
        Ok(MarkerState {
            name: sub.read_string(64)?,
            on: sub.read_uint32()? != 0,
        })
    }

    /// Read a [`Waypoint`] record.
    pub fn read_waypoint(&mut self) -> Result<Waypoint, ModelError> {
        let mut sub = DataBlockReader::new(self.read_bytes(Waypoint::WIRE_SIZE)?);
        Ok(Waypoint {
            latitude: sub.read_float64()?,
            longitude: sub.read_float64()?,
            altitude: sub.read_float64()?,
            flags: sub.read_uint32()?,
            kts_speed: sub.read_float64()?,
            percent_throttle: sub.read_float64()?,
        })
    }

    /// Read a [`LatLonAlt`] record.
    pub fn read_lat_lon_alt(&mut self) -> Result<LatLonAlt, ModelError> {
        let mut sub = DataBlockReader::new(self.read_bytes(LatLonAlt::WIRE_SIZE)?);
        Ok(LatLonAlt {
            latitude: sub.read_float64()?,
            longitude: sub.read_float64()?,
            altitude: sub.read_float64()?,
        })
    }

    /// Read an [`Xyz`] record.
    pub fn read_xyz(&mut self) -> Result<Xyz, ModelError> {
        let mut sub = DataBlockReader::new(self.read_bytes(Xyz::WIRE_SIZE)?);
        Ok(Xyz {
            x: sub.read_float64()?,
            y: sub.read_float64()?,
            z: sub.read_float64()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_block_builder::DataBlockBuilder;

    #[test]
    #[allow(clippy::approx_constant)]
    fn round_trip_primitives() {
        let mut builder = DataBlockBuilder::new();
        builder
            .add_int32(42)
            .add_int64(0x1234_5678_9abc_def0)
            .add_float32(3.14)
            .add_float64(2.718_281_828_459);

        let mut reader = DataBlockReader::new(builder.data());
        assert_eq!(reader.read_int32().unwrap(), 42);
        assert_eq!(reader.read_int64().unwrap(), 0x1234_5678_9abc_def0);
        assert_eq!(reader.read_float32().unwrap(), 3.14f32);
        assert_eq!(reader.read_float64().unwrap(), 2.718_281_828_459);
        assert!(reader.is_at_end());

        let err = reader.read_int32().unwrap_err();
        assert_eq!(
            err,
            ModelError::OutOfRange {
                requested: 4,
                remaining: 0
            }
        );
    }

    #[test]
    fn failed_read_keeps_cursor() {
        let data = [1u8, 0, 0];
        let mut reader = DataBlockReader::new(&data);
        assert!(reader.read_int32().is_err());
        assert_eq!(reader.position(), 0);
        assert_eq!(reader.read_bytes(3).unwrap(), &[1, 0, 0]);
    }

    #[test]
    fn fixed_string_truncated_on_write() {
        let mut builder = DataBlockBuilder::new();
        builder.add_string("Hello, world!", 8).unwrap();
        let mut reader = DataBlockReader::new(builder.data());
        assert_eq!(reader.read_string(8).unwrap(), "Hello, ");
        assert_eq!(reader.position(), 8);
    }

    #[test]
    fn fixed_string_without_terminator() {
        let data = *b"abcd";
        let mut reader = DataBlockReader::new(&data);
        assert_eq!(reader.read_string(4).unwrap(), "abcd");
    }

    #[test]
    fn variable_strings() {
        let mut builder = DataBlockBuilder::new();
        builder.add_string_v("first").add_string_v("").add_int32(5);
        let mut reader = DataBlockReader::new(builder.data());
        assert_eq!(reader.read_string_v().unwrap(), "first");
        assert_eq!(reader.read_string_v().unwrap(), "");
        assert_eq!(reader.read_int32().unwrap(), 5);
    }

    #[test]
    fn variable_string_needs_terminator() {
        let data = *b"abc";
        let mut reader = DataBlockReader::new(&data);
        assert!(matches!(
            reader.read_string_v(),
            Err(ModelError::OutOfRange { .. })
        ));
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn compound_records_round_trip() {
        let pos = InitPosition::new()
            .with_latitude(52.3)
            .with_longitude(4.76)
            .with_altitude(11.0)
            .with_heading(270.0)
            .with_on_ground(true);
        let marker = MarkerState::new("Wingtip", true);
        let wp = Waypoint {
            latitude: 1.0,
            longitude: 2.0,
            altitude: 3.0,
            flags: 4,
            kts_speed: 250.0,
            percent_throttle: 80.0,
        };
        let lla = LatLonAlt::new(10.0, -20.0, 300.0);
        let xyz = Xyz::new(1.0, 2.0, 3.0);

        let mut builder = DataBlockBuilder::new();
        builder
            .add_init_position(&pos)
            .add_marker_state(&marker)
            .add_waypoint(&wp)
            .add_lat_lon_alt(&lla)
            .add_xyz(&xyz);

        let mut reader = DataBlockReader::new(builder.data());
        assert_eq!(reader.read_init_position().unwrap(), pos);
        assert_eq!(reader.read_marker_state().unwrap(), marker);
        assert_eq!(reader.read_waypoint().unwrap(), wp);
        assert_eq!(reader.read_lat_lon_alt().unwrap(), lla);
        assert_eq!(reader.read_xyz().unwrap(), xyz);
        assert!(reader.is_at_end());
    }

    #[test]
    fn read_rest_moves_to_end() {
        let data = [1u8, 2, 3, 4];
        let mut reader = DataBlockReader::new(&data);
        reader.skip(1).unwrap();
        assert_eq!(reader.read_rest(), &[2, 3, 4]);
        assert!(reader.is_at_end());
    }
}
