//! Typed data definitions.
//!
//! A [`DataDefinition<T>`] lists the simulation variables that make up one
//! record, in wire order, together with accessors into an application
//! struct `T`. The application type of a field does not have to match its
//! declared wire type: values are coerced both ways through [`WireValue`].
//!
//! | declared \ app | integers | floats | `bool` | `String` |
//! |---|---|---|---|---|
//! | `INT32`  | identity / narrow | truncate, cast back | 0/1, non-zero | parse, format |
//! | `INT64`  | identity / widen | round, cast back | 0/1, non-zero | parse, format |
//! | `FLOAT*` | cast, round back | identity / narrow | 0/1, non-zero | parse, format |
//! | strings  | format, parse | format, parse | `"true"`/`"false"` | copy |
//!
//! ```
//! use simconnect_sdk::DataDefinition;
//! use simconnect_models::{DataBlockBuilder, DataBlockReader};
//!
//! #[derive(Default)]
//! struct Position {
//!     altitude: f64,
//!     title: String,
//! }
//!
//! let def = DataDefinition::<Position>::new()
//!     .add_float64("PLANE ALTITUDE", "feet", |p| p.altitude, |p, v| p.altitude = v)
//!     .add_string("TITLE", 32, |p| p.title.clone(), |p, v| p.title = v)?;
//! assert_eq!(def.size(), 40);
//!
//! let mut builder = DataBlockBuilder::new();
//! def.marshal(&Position { altitude: 1500.0, title: "C152".into() }, &mut builder)?;
//!
//! let mut back = Position::default();
//! def.unmarshal(&mut DataBlockReader::new(builder.data()), &mut back)?;
//! assert_eq!(back.title, "C152");
//! # Ok::<(), simconnect_models::ModelError>(())
//! ```

use std::fmt;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use simconnect_models::{
    DataBlockBuilder, DataBlockReader, DataDefinitionId, DataType, ModelError, UNUSED,
};
use tracing::debug;

use crate::connection::Connection;
use crate::error::HostResult;
use crate::transport::Verb;

const TARGET: &str = "simconnect::data";

// ── Values ───────────────────────────────────────────────────────────────

/// A field value on its way between the application and the wire.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum WireValue {
    /// 32-bit integer.
    Int32(i32),
    /// 64-bit integer.
    Int64(i64),
    /// Single precision float.
    Float32(f32),
    /// Double precision float.
    Float64(f64),
    /// Boolean.
    Bool(bool),
    /// Text.
    Text(String),
}

fn invalid(value: &str, reason: &str) -> ModelError {
    ModelError::InvalidValue {
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_number(text: &str) -> Result<f64, ModelError> {
    text.trim()
        .parse::<f64>()
        .map_err(|_| invalid(text, "not a number"))
}

fn parse_bool(text: &str) -> Result<bool, ModelError> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("true") {
        return Ok(true);
    }
    if text.eq_ignore_ascii_case("false") || text.is_empty() {
        return Ok(false);
    }
    parse_number(text)
        .map(|n| n != 0.0)
        .map_err(|_| invalid(text, "not a boolean"))
}

impl WireValue {
    /// The value as a float.
    fn as_f64(&self) -> Result<f64, ModelError> {
        Ok(match self {
            Self::Int32(v) => f64::from(*v),
            #[allow(clippy::cast_precision_loss)]
            Self::Int64(v) => *v as f64,
            Self::Float32(v) => f64::from(*v),
            Self::Float64(v) => *v,
            Self::Bool(v) => f64::from(u8::from(*v)),
            Self::Text(text) => parse_number(text)?,
        })
    }

    /// The value as an integer; floats are rounded, text is parsed and
    /// its fraction dropped.
    #[allow(clippy::cast_possible_truncation)]
    fn as_i64_rounded(&self) -> Result<i64, ModelError> {
        Ok(match self {
            Self::Int32(v) => i64::from(*v),
            Self::Int64(v) => *v,
            Self::Float32(v) => f64::from(*v).round() as i64,
            Self::Float64(v) => v.round() as i64,
            Self::Bool(v) => i64::from(*v),
            Self::Text(text) => parse_number(text)?.trunc() as i64,
        })
    }

    /// The value as a boolean: numbers are true when non-zero.
    fn as_bool(&self) -> Result<bool, ModelError> {
        match self {
            Self::Bool(v) => Ok(*v),
            Self::Text(text) => parse_bool(text),
            other => Ok(other.as_f64()? != 0.0),
        }
    }

    /// The value as text. Numbers use their shortest round-trip form.
    fn into_text(self) -> String {
        match self {
            Self::Int32(v) => v.to_string(),
            Self::Int64(v) => v.to_string(),
            Self::Float32(v) => v.to_string(),
            Self::Float64(v) => v.to_string(),
            Self::Bool(v) => v.to_string(),
            Self::Text(text) => text,
        }
    }
}

/// A type that can sit on the application side of a field.
pub trait AppValue: Sized {
    /// Convert to the intermediate form.
    fn to_wire(&self) -> WireValue;

    /// Convert from the intermediate form.
    ///
    /// # Errors
    ///
    /// [`ModelError::InvalidValue`] when text does not parse.
    fn from_wire(value: WireValue) -> Result<Self, ModelError>;
}

impl AppValue for i32 {
    fn to_wire(&self) -> WireValue {
        WireValue::Int32(*self)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn from_wire(value: WireValue) -> Result<Self, ModelError> {
        Ok(value.as_i64_rounded()? as i32)
    }
}

impl AppValue for i64 {
    fn to_wire(&self) -> WireValue {
        WireValue::Int64(*self)
    }

    fn from_wire(value: WireValue) -> Result<Self, ModelError> {
        value.as_i64_rounded()
    }
}

impl AppValue for f32 {
    fn to_wire(&self) -> WireValue {
        WireValue::Float32(*self)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn from_wire(value: WireValue) -> Result<Self, ModelError> {
        match value {
            WireValue::Float32(v) => Ok(v),
            WireValue::Text(text) => text
                .trim()
                .parse::<f32>()
                .map_err(|_| invalid(&text, "not a number")),
            other => Ok(other.as_f64()? as f32),
        }
    }
}

impl AppValue for f64 {
    fn to_wire(&self) -> WireValue {
        WireValue::Float64(*self)
    }

    fn from_wire(value: WireValue) -> Result<Self, ModelError> {
        value.as_f64()
    }
}

impl AppValue for bool {
    fn to_wire(&self) -> WireValue {
        WireValue::Bool(*self)
    }

    fn from_wire(value: WireValue) -> Result<Self, ModelError> {
        value.as_bool()
    }
}

impl AppValue for String {
    fn to_wire(&self) -> WireValue {
        WireValue::Text(self.clone())
    }

    fn from_wire(value: WireValue) -> Result<Self, ModelError> {
        Ok(value.into_text())
    }
}

// ── Encoding by declared type ────────────────────────────────────────────

#[allow(clippy::cast_possible_truncation)]
fn encode(data_type: DataType, value: WireValue, builder: &mut DataBlockBuilder) -> Result<(), ModelError> {
    match data_type {
        DataType::Int32 => {
            let v = match value {
                WireValue::Float32(f) => f.trunc() as i32,
                WireValue::Float64(f) => f.trunc() as i32,
                other => other.as_i64_rounded()? as i32,
            };
            builder.add_int32(v);
        }
        DataType::Int64 => {
            builder.add_int64(value.as_i64_rounded()?);
        }
        DataType::Float32 => {
            let v = match value {
                WireValue::Float32(f) => f,
                WireValue::Text(text) => f32::from_wire(WireValue::Text(text))?,
                other => other.as_f64()? as f32,
            };
            builder.add_float32(v);
        }
        DataType::Float64 => {
            builder.add_float64(value.as_f64()?);
        }
        DataType::StringV => {
            builder.add_string_v(&value.into_text());
        }
        other => match other.string_length() {
            Some(length) => {
                builder.add_string(&value.into_text(), length)?;
            }
            None => return Err(invalid(&other.to_string(), "unsupported field type")),
        },
    }
    Ok(())
}

fn decode(data_type: DataType, reader: &mut DataBlockReader<'_>) -> Result<WireValue, ModelError> {
    Ok(match data_type {
        DataType::Int32 => WireValue::Int32(reader.read_int32()?),
        DataType::Int64 => WireValue::Int64(reader.read_int64()?),
        DataType::Float32 => WireValue::Float32(reader.read_float32()?),
        DataType::Float64 => WireValue::Float64(reader.read_float64()?),
        DataType::StringV => WireValue::Text(reader.read_string_v()?),
        other => match other.string_length() {
            Some(length) => WireValue::Text(reader.read_string(length)?),
            None => return Err(invalid(&other.to_string(), "unsupported field type")),
        },
    })
}

// ── DataDefinition ───────────────────────────────────────────────────────

/// Declared shape of one field.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Simulation variable name.
    pub name: String,
    /// Unit, empty for strings.
    pub unit: String,
    /// Declared wire type.
    pub data_type: DataType,
}

type Getter<T> = Box<dyn Fn(&T) -> WireValue + Send + Sync>;
type Setter<T> = Box<dyn Fn(&mut T, WireValue) -> Result<(), ModelError> + Send + Sync>;

struct FieldEntry<T> {
    spec: FieldSpec,
    get: Getter<T>,
    set: Setter<T>,
}

/// Ordered list of simulation variables mapped onto `T`.
pub struct DataDefinition<T> {
    fields: Vec<FieldEntry<T>>,
    registered: Mutex<Option<(u64, DataDefinitionId)>>,
}

impl<T> Default for DataDefinition<T> {
    fn default() -> Self {
        Self {
            fields: Vec::new(),
            registered: Mutex::new(None),
        }
    }
}

impl<T: 'static> fmt::Debug for DataDefinition<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataDefinition")
            .field("fields", &self.fields().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl<T: 'static> DataDefinition<T> {
    /// An empty definition.
    pub fn new() -> Self {
        Self::default()
    }

    fn push<A: AppValue + 'static>(
        mut self,
        name: &str,
        unit: &str,
        data_type: DataType,
        get: impl Fn(&T) -> A + Send + Sync + 'static,
        set: impl Fn(&mut T, A) + Send + Sync + 'static,
    ) -> Self {
        self.fields.push(FieldEntry {
            spec: FieldSpec {
                name: name.to_string(),
                unit: unit.to_string(),
                data_type,
            },
            get: Box::new(move |record| get(record).to_wire()),
            set: Box::new(move |record, value| {
                set(record, A::from_wire(value)?);
                Ok(())
            }),
        });
        self
    }

    /// Add a field declared as `INT32`.
    #[must_use]
    pub fn add_int32<A: AppValue + 'static>(
        self,
        name: &str,
        unit: &str,
        get: impl Fn(&T) -> A + Send + Sync + 'static,
        set: impl Fn(&mut T, A) + Send + Sync + 'static,
    ) -> Self {
        self.push(name, unit, DataType::Int32, get, set)
    }

    /// Add a field declared as `INT64`.
    #[must_use]
    pub fn add_int64<A: AppValue + 'static>(
        self,
        name: &str,
        unit: &str,
        get: impl Fn(&T) -> A + Send + Sync + 'static,
        set: impl Fn(&mut T, A) + Send + Sync + 'static,
    ) -> Self {
        self.push(name, unit, DataType::Int64, get, set)
    }

    /// Add a field declared as `FLOAT32`.
    #[must_use]
    pub fn add_float32<A: AppValue + 'static>(
        self,
        name: &str,
        unit: &str,
        get: impl Fn(&T) -> A + Send + Sync + 'static,
        set: impl Fn(&mut T, A) + Send + Sync + 'static,
    ) -> Self {
        self.push(name, unit, DataType::Float32, get, set)
    }

    /// Add a field declared as `FLOAT64`.
    #[must_use]
    pub fn add_float64<A: AppValue + 'static>(
        self,
        name: &str,
        unit: &str,
        get: impl Fn(&T) -> A + Send + Sync + 'static,
        set: impl Fn(&mut T, A) + Send + Sync + 'static,
    ) -> Self {
        self.push(name, unit, DataType::Float64, get, set)
    }

    /// Add a fixed-length string field of `length` bytes.
    ///
    /// # Errors
    ///
    /// [`ModelError::InvalidStringLength`] unless `length` is one of 8, 32,
    /// 64, 128, 256 or 260.
    pub fn add_string<A: AppValue + 'static>(
        self,
        name: &str,
        length: usize,
        get: impl Fn(&T) -> A + Send + Sync + 'static,
        set: impl Fn(&mut T, A) + Send + Sync + 'static,
    ) -> Result<Self, ModelError> {
        let data_type =
            DataType::fixed_string(length).ok_or(ModelError::InvalidStringLength { length })?;
        Ok(self.push(name, "", data_type, get, set))
    }

    /// Add a variable-length string field.
    #[must_use]
    pub fn add_string_v<A: AppValue + 'static>(
        self,
        name: &str,
        get: impl Fn(&T) -> A + Send + Sync + 'static,
        set: impl Fn(&mut T, A) + Send + Sync + 'static,
    ) -> Self {
        self.push(name, "", DataType::StringV, get, set)
    }

    /// The declared fields, in wire order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().map(|entry| &entry.spec)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when no field was added.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Record size in bytes. Variable-length strings count as 0.
    pub fn size(&self) -> usize {
        self.fields
            .iter()
            .map(|entry| entry.spec.data_type.size().unwrap_or(0))
            .sum()
    }

    /// Always true: records are converted field by field, never
    /// reinterpreted in place.
    pub fn use_mapping(&self) -> bool {
        true
    }

    /// Append `record` to `builder`, one field per entry.
    ///
    /// # Errors
    ///
    /// [`ModelError::InvalidValue`] when a text value does not convert to
    /// the declared number type.
    pub fn marshal(&self, record: &T, builder: &mut DataBlockBuilder) -> Result<(), ModelError> {
        for entry in &self.fields {
            encode(entry.spec.data_type, (entry.get)(record), builder)?;
            builder.named(entry.spec.name.clone());
        }
        Ok(())
    }

    /// Marshal `record` into a fresh byte vector.
    ///
    /// # Errors
    ///
    /// As [`marshal`](Self::marshal).
    pub fn to_bytes(&self, record: &T) -> Result<Vec<u8>, ModelError> {
        let mut builder = DataBlockBuilder::with_capacity(self.size());
        self.marshal(record, &mut builder)?;
        Ok(builder.into_data_block().into_vec())
    }

    /// Read one record from `reader` into `record`.
    ///
    /// # Errors
    ///
    /// [`ModelError::OutOfRange`] when the data is short, or
    /// [`ModelError::InvalidValue`] when text does not convert.
    pub fn unmarshal(&self, reader: &mut DataBlockReader<'_>, record: &mut T) -> Result<(), ModelError> {
        for entry in &self.fields {
            let value = decode(entry.spec.data_type, reader)?;
            (entry.set)(record, value)?;
        }
        Ok(())
    }

    /// Read a fresh record from `data`.
    ///
    /// # Errors
    ///
    /// As [`unmarshal`](Self::unmarshal).
    pub fn from_bytes(&self, data: &[u8]) -> Result<T, ModelError>
    where
        T: Default,
    {
        let mut record = T::default();
        self.unmarshal(&mut DataBlockReader::new(data), &mut record)?;
        Ok(record)
    }

    /// Declare this definition on `connection` and return its id. The
    /// definition is sent once per session; later calls return the same id.
    /// Only the latest session is remembered, so switching to another
    /// session declares the definition again.
    ///
    /// # Errors
    ///
    /// The first failing `AddToDataDefinition` call.
    pub fn register(&self, connection: &Connection) -> HostResult<DataDefinitionId> {
        let session = connection.generation();
        let mut registered = self.registered.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((cached, id)) = *registered {
            if cached == session {
                return Ok(id);
            }
        }
        let define_id = connection.next_data_definition_id();
        for entry in &self.fields {
            connection.send(Verb::AddToDataDefinition {
                define_id,
                name: entry.spec.name.clone(),
                unit: entry.spec.unit.clone(),
                data_type: entry.spec.data_type,
                epsilon: 0.0,
                datum_id: UNUSED,
            })?;
        }
        debug!(target: TARGET, define_id, fields = self.fields.len(), "registered data definition");
        *registered = Some((session, define_id));
        Ok(define_id)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::SdkError;
    use crate::testing::ScriptedTransport;

    fn close_to(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    fn round_trip<T: Default + 'static>(def: &DataDefinition<T>, record: &T) -> (Vec<u8>, T) {
        let bytes = def.to_bytes(record).unwrap();
        let back = def.from_bytes(&bytes).unwrap();
        (bytes, back)
    }

    #[derive(Default, Debug, PartialEq)]
    struct Sample {
        i: i32,
        l: i64,
        f: f32,
        d: f64,
        b: bool,
        s: String,
    }

    // ── INT32 ─────────────────────────────────────────────────────────

    #[test]
    fn int32_field_coercions() {
        let def = DataDefinition::<Sample>::new()
            .add_int32("A", "number", |r| r.i, |r, v| r.i = v)
            .add_int32("B", "number", |r| r.l, |r, v| r.l = v)
            .add_int32("C", "number", |r| r.f, |r, v| r.f = v)
            .add_int32("D", "number", |r| r.d, |r, v| r.d = v)
            .add_int32("E", "bool", |r| r.b, |r, v| r.b = v)
            .add_int32("F", "number", |r| r.s.clone(), |r, v| r.s = v);
        assert_eq!(def.size(), 24);

        let record = Sample {
            i: -7,
            l: 1_000,
            f: 2.9,
            d: -3.7,
            b: true,
            s: "99".into(),
        };
        let (bytes, back) = round_trip(&def, &record);
        let mut reader = DataBlockReader::new(&bytes);
        assert_eq!(reader.read_int32().unwrap(), -7);
        assert_eq!(reader.read_int32().unwrap(), 1_000);
        assert_eq!(reader.read_int32().unwrap(), 2);
        assert_eq!(reader.read_int32().unwrap(), -3);
        assert_eq!(reader.read_int32().unwrap(), 1);
        assert_eq!(reader.read_int32().unwrap(), 99);

        assert_eq!(back.i, -7);
        assert_eq!(back.l, 1_000);
        assert!(close_to(f64::from(back.f), 2.0));
        assert!(close_to(back.d, -3.0));
        assert!(back.b);
        assert_eq!(back.s, "99");
    }

    // ── INT64 ─────────────────────────────────────────────────────────

    #[test]
    fn int64_field_coercions() {
        let def = DataDefinition::<Sample>::new()
            .add_int64("A", "number", |r| r.i, |r, v| r.i = v)
            .add_int64("B", "number", |r| r.l, |r, v| r.l = v)
            .add_int64("C", "number", |r| r.f, |r, v| r.f = v)
            .add_int64("D", "number", |r| r.d, |r, v| r.d = v)
            .add_int64("E", "bool", |r| r.b, |r, v| r.b = v)
            .add_int64("F", "number", |r| r.s.clone(), |r, v| r.s = v);
        assert_eq!(def.size(), 48);

        let record = Sample {
            i: 42,
            l: 123,
            f: 2.5,
            d: 7.6,
            b: false,
            s: "123.0".into(),
        };
        let (bytes, back) = round_trip(&def, &record);
        let mut reader = DataBlockReader::new(&bytes);
        assert_eq!(reader.read_int64().unwrap(), 42);
        assert_eq!(reader.read_int64().unwrap(), 123);
        assert_eq!(reader.read_int64().unwrap(), 3);
        assert_eq!(reader.read_int64().unwrap(), 8);
        assert_eq!(reader.read_int64().unwrap(), 0);
        assert_eq!(reader.read_int64().unwrap(), 123);

        assert_eq!(back.i, 42);
        assert_eq!(back.l, 123);
        assert!(close_to(f64::from(back.f), 3.0));
        assert!(close_to(back.d, 8.0));
        assert!(!back.b);
        assert_eq!(back.s, "123");
    }

    // ── FLOAT32 ───────────────────────────────────────────────────────

    #[test]
    fn float32_field_coercions() {
        let def = DataDefinition::<Sample>::new()
            .add_float32("A", "number", |r| r.i, |r, v| r.i = v)
            .add_float32("B", "number", |r| r.l, |r, v| r.l = v)
            .add_float32("C", "number", |r| r.f, |r, v| r.f = v)
            .add_float32("D", "number", |r| r.d, |r, v| r.d = v)
            .add_float32("E", "bool", |r| r.b, |r, v| r.b = v)
            .add_float32("F", "number", |r| r.s.clone(), |r, v| r.s = v);
        assert_eq!(def.size(), 24);

        let record = Sample {
            i: 42,
            l: 123,
            f: 1.25,
            d: 2.5,
            b: true,
            s: "77.5".into(),
        };
        let (bytes, back) = round_trip(&def, &record);
        let mut reader = DataBlockReader::new(&bytes);
        assert!(close_to(f64::from(reader.read_float32().unwrap()), 42.0));
        assert!(close_to(f64::from(reader.read_float32().unwrap()), 123.0));
        assert!(close_to(f64::from(reader.read_float32().unwrap()), 1.25));
        assert!(close_to(f64::from(reader.read_float32().unwrap()), 2.5));
        assert!(close_to(f64::from(reader.read_float32().unwrap()), 1.0));
        assert!(close_to(f64::from(reader.read_float32().unwrap()), 77.5));

        assert_eq!(back, record);
    }

    #[test]
    fn float_to_int_rounds_on_unmarshal() {
        let def = DataDefinition::<Sample>::new().add_float32("A", "number", |r| r.i, |r, v| r.i = v);
        let mut builder = DataBlockBuilder::new();
        builder.add_float32(41.6);
        let back = def.from_bytes(builder.data()).unwrap();
        assert_eq!(back.i, 42);
    }

    // ── FLOAT64 ───────────────────────────────────────────────────────

    #[test]
    fn float64_field_coercions() {
        let def = DataDefinition::<Sample>::new()
            .add_float64("A", "number", |r| r.i, |r, v| r.i = v)
            .add_float64("B", "number", |r| r.l, |r, v| r.l = v)
            .add_float64("C", "number", |r| r.f, |r, v| r.f = v)
            .add_float64("D", "number", |r| r.d, |r, v| r.d = v)
            .add_float64("E", "bool", |r| r.b, |r, v| r.b = v)
            .add_float64("F", "number", |r| r.s.clone(), |r, v| r.s = v);
        assert_eq!(def.size(), 48);

        let record = Sample {
            i: -5,
            l: 1 << 40,
            f: 0.5,
            d: 2.5,
            b: true,
            s: "3.25".into(),
        };
        let (bytes, back) = round_trip(&def, &record);
        let mut reader = DataBlockReader::new(&bytes);
        assert!(close_to(reader.read_float64().unwrap(), -5.0));
        #[allow(clippy::cast_precision_loss)]
        let big = (1i64 << 40) as f64;
        assert!(close_to(reader.read_float64().unwrap(), big));
        assert!(close_to(reader.read_float64().unwrap(), 0.5));
        assert!(close_to(reader.read_float64().unwrap(), 2.5));
        assert!(close_to(reader.read_float64().unwrap(), 1.0));
        assert!(close_to(reader.read_float64().unwrap(), 3.25));

        assert_eq!(back, record);
    }

    // ── Strings ───────────────────────────────────────────────────────

    #[test]
    fn string8_field_coercions() {
        let def = DataDefinition::<Sample>::new()
            .add_string("A", 8, |r| r.i, |r, v| r.i = v)
            .unwrap()
            .add_string("B", 8, |r| r.d, |r, v| r.d = v)
            .unwrap()
            .add_string("C", 8, |r| r.b, |r, v| r.b = v)
            .unwrap()
            .add_string("D", 8, |r| r.s.clone(), |r, v| r.s = v)
            .unwrap();
        assert_eq!(def.size(), 32);

        let record = Sample {
            i: 123,
            d: 123.0,
            b: true,
            s: "ABCDEFGHIJ".into(),
            ..Sample::default()
        };
        let (bytes, back) = round_trip(&def, &record);
        let mut reader = DataBlockReader::new(&bytes);
        assert_eq!(reader.read_string(8).unwrap(), "123");
        assert_eq!(reader.read_string(8).unwrap(), "123");
        assert_eq!(reader.read_string(8).unwrap(), "true");
        assert_eq!(reader.read_string(8).unwrap(), "ABCDEFG");
        assert_eq!(bytes[31], 0);

        assert_eq!(back.i, 123);
        assert!(close_to(back.d, 123.0));
        assert!(back.b);
        assert_eq!(back.s, "ABCDEFG");
    }

    #[test]
    fn string_v_field_coercions() {
        let def = DataDefinition::<Sample>::new()
            .add_string_v("A", |r| r.l, |r, v| r.l = v)
            .add_string_v("B", |r| r.f, |r, v| r.f = v)
            .add_string_v("C", |r| r.s.clone(), |r, v| r.s = v);
        assert_eq!(def.size(), 0);

        let record = Sample {
            l: -12,
            f: 0.75,
            s: "Cessna 152".into(),
            ..Sample::default()
        };
        let (bytes, back) = round_trip(&def, &record);
        assert_eq!(bytes, b"-12\00.75\0Cessna 152\0");
        assert_eq!(back.l, -12);
        assert!(close_to(f64::from(back.f), 0.75));
        assert_eq!(back.s, "Cessna 152");
    }

    #[test]
    fn bad_string_length_is_rejected() {
        let err = DataDefinition::<Sample>::new()
            .add_string("A", 10, |r| r.s.clone(), |r, v| r.s = v)
            .unwrap_err();
        assert_eq!(err, ModelError::InvalidStringLength { length: 10 });
    }

    #[test]
    fn unparseable_text_is_invalid_value() {
        let def = DataDefinition::<Sample>::new().add_int32("A", "number", |r| r.s.clone(), |r, v| r.s = v);
        let record = Sample {
            s: "twelve".into(),
            ..Sample::default()
        };
        assert!(matches!(def.to_bytes(&record), Err(ModelError::InvalidValue { .. })));

        let bools = DataDefinition::<Sample>::new()
            .add_string_v("B", |r| r.b, |r, v| r.b = v);
        assert!(matches!(bools.from_bytes(b"maybe\0"), Err(ModelError::InvalidValue { .. })));
        assert!(bools.from_bytes(b"TRUE\0").unwrap().b);
        assert!(bools.from_bytes(b"1\0").unwrap().b);
        assert!(!bools.from_bytes(b"0\0").unwrap().b);
    }

    #[test]
    fn short_data_is_out_of_range() {
        let def = DataDefinition::<Sample>::new().add_float64("A", "feet", |r| r.d, |r, v| r.d = v);
        assert!(matches!(def.from_bytes(&[0u8; 4]), Err(ModelError::OutOfRange { .. })));
    }

    #[test]
    fn marshal_names_fields() {
        let def = DataDefinition::<Sample>::new()
            .add_int32("GEAR HANDLE POSITION", "bool", |r| r.b, |r, v| r.b = v);
        let mut builder = DataBlockBuilder::new();
        def.marshal(&Sample::default(), &mut builder).unwrap();
        assert_eq!(builder.fields()[0].name.as_deref(), Some("GEAR HANDLE POSITION"));
        assert!(def.use_mapping());
    }

    #[test]
    fn debug_lists_fields() {
        let def = DataDefinition::<Sample>::new().add_float64("PLANE ALTITUDE", "feet", |r| r.d, |r, v| r.d = v);
        let text = format!("{def:?}");
        assert!(text.starts_with("DataDefinition"));
        assert!(text.contains("PLANE ALTITUDE"));
        assert!(text.contains("Float64"));
    }

    // ── Registration ──────────────────────────────────────────────────

    #[test]
    fn register_sends_fields_once_per_session() {
        let transport = ScriptedTransport::new();
        let connection = Connection::new("test", transport.clone());
        connection.open(0).unwrap();
        let def = Arc::new(
            DataDefinition::<Sample>::new()
                .add_float64("PLANE ALTITUDE", "feet", |r| r.d, |r, v| r.d = v)
                .add_string_v("TITLE", |r| r.s.clone(), |r, v| r.s = v),
        );

        let id = def.register(&connection).unwrap();
        assert_eq!(def.register(&connection).unwrap(), id);
        let sent = transport.sent_named("AddToDataDefinition");
        assert_eq!(sent.len(), 2);
        assert_eq!(
            sent[0],
            Verb::AddToDataDefinition {
                define_id: id,
                name: "PLANE ALTITUDE".into(),
                unit: "feet".into(),
                data_type: DataType::Float64,
                epsilon: 0.0,
                datum_id: UNUSED,
            }
        );

        connection.close();
        connection.open(0).unwrap();
        let again = def.register(&connection).unwrap();
        assert_ne!(again, id);
        assert_eq!(transport.sent_named("AddToDataDefinition").len(), 4);
        assert_eq!(*def.registered.lock().unwrap(), Some((connection.generation(), again)));
    }

    #[test]
    fn register_on_closed_connection_fails() {
        let connection = Connection::new("test", ScriptedTransport::new());
        let def = DataDefinition::<Sample>::new().add_int32("A", "number", |r| r.i, |r, v| r.i = v);
        assert!(matches!(def.register(&connection), Err(SdkError::NotOpen)));
    }
}
