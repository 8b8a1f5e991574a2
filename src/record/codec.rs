//! Fixed-size binary packing for buffered replay.
//!
//! When a file has to be replayed more than once its records are held in
//! memory as flat 15-byte entries instead of live objects:
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ series_id: u16          (interned, per file) │
//! │ timestamp: i64          (raw, unshifted)     │
//! │ value_kind: u8          (0 = int, 1 = float) │
//! │ value_bits: [u8; 4]     (i32 or f32 bits)    │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! All fields little-endian. The integer/float distinction is an explicit
//! kind byte; it is never folded into the sign of the id field.

use std::fmt;

/// Size of one packed point in bytes.
pub const PACKED_SIZE: usize = 15;

const KIND_INTEGER: u8 = 0;
const KIND_FLOAT: u8 = 1;

/// A point's numeric value as an explicit tagged variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointValue {
    Integer(i32),
    Float(f32),
}

impl PointValue {
    /// Parses value text: all-digit text (with optional sign) is an integer,
    /// anything else that parses as a float is a float.
    pub fn parse(text: &str) -> Result<Self, CodecError> {
        if looks_like_integer(text) {
            text.parse::<i32>().map(PointValue::Integer).map_err(|_| {
                CodecError::new(format!("integer value out of 32-bit range: '{}'", text))
            })
        } else {
            text.parse::<f32>()
                .map(PointValue::Float)
                .map_err(|_| CodecError::new(format!("not a numeric value: '{}'", text)))
        }
    }

    /// Renders the value back to the text form used at the sink boundary.
    pub fn render(&self) -> String {
        match self {
            PointValue::Integer(v) => v.to_string(),
            PointValue::Float(v) => v.to_string(),
        }
    }
}

fn looks_like_integer(text: &str) -> bool {
    let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Error for packing or unpacking a point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecError {
    pub reason: String,
}

impl CodecError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reason)
    }
}

impl std::error::Error for CodecError {}

/// One record in the packed form: interned series id, raw timestamp, value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PackedPoint {
    pub series_id: u16,
    pub timestamp: i64,
    pub value: PointValue,
}

impl PackedPoint {
    /// Encodes into the fixed 15-byte layout.
    pub fn encode(&self) -> [u8; PACKED_SIZE] {
        let mut buf = [0u8; PACKED_SIZE];
        buf[0..2].copy_from_slice(&self.series_id.to_le_bytes());
        buf[2..10].copy_from_slice(&self.timestamp.to_le_bytes());
        match self.value {
            PointValue::Integer(v) => {
                buf[10] = KIND_INTEGER;
                buf[11..15].copy_from_slice(&v.to_le_bytes());
            }
            PointValue::Float(v) => {
                buf[10] = KIND_FLOAT;
                buf[11..15].copy_from_slice(&v.to_bits().to_le_bytes());
            }
        }
        buf
    }

    /// Decodes from the fixed layout.
    pub fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        if buf.len() < PACKED_SIZE {
            return Err(CodecError::new(format!(
                "truncated packed point: {} bytes",
                buf.len()
            )));
        }
        let series_id = u16::from_le_bytes(buf[0..2].try_into().unwrap());
        let timestamp = i64::from_le_bytes(buf[2..10].try_into().unwrap());
        let bits = u32::from_le_bytes(buf[11..15].try_into().unwrap());
        let value = match buf[10] {
            KIND_INTEGER => PointValue::Integer(bits as i32),
            KIND_FLOAT => PointValue::Float(f32::from_bits(bits)),
            other => {
                return Err(CodecError::new(format!(
                    "unknown value kind byte: {}",
                    other
                )));
            }
        };
        Ok(Self {
            series_id,
            timestamp,
            value,
        })
    }
}

/// Flat byte arena of packed points.
///
/// Holds one file's records during buffered replay without a live object per
/// point; owned by the replay driver for the file's BUFFER/EMIT phases and
/// dropped at DONE.
#[derive(Debug, Default)]
pub struct PointBuffer {
    bytes: Vec<u8>,
}

impl PointBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(points: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(points * PACKED_SIZE),
        }
    }

    pub fn push(&mut self, point: &PackedPoint) {
        self.bytes.extend_from_slice(&point.encode());
    }

    /// Number of packed points in the buffer.
    pub fn len(&self) -> usize {
        self.bytes.len() / PACKED_SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<PackedPoint, CodecError> {
        let start = index * PACKED_SIZE;
        let end = start + PACKED_SIZE;
        if end > self.bytes.len() {
            return Err(CodecError::new(format!(
                "point index {} out of range (len={})",
                index,
                self.len()
            )));
        }
        PackedPoint::decode(&self.bytes[start..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_round_trip() {
        let point = PackedPoint {
            series_id: 7,
            timestamp: 1357002000,
            value: PointValue::Integer(-42),
        };
        let decoded = PackedPoint::decode(&point.encode()).unwrap();
        assert_eq!(decoded, point);
        assert_eq!(decoded.value.render(), "-42");
    }

    #[test]
    fn test_float_round_trip() {
        let point = PackedPoint {
            series_id: 65535,
            timestamp: 1357002000500,
            value: PointValue::Float(0.85),
        };
        let decoded = PackedPoint::decode(&point.encode()).unwrap();
        assert_eq!(decoded, point);
        assert_eq!(decoded.value.render(), "0.85");
    }

    #[test]
    fn test_kind_distinction_survives() {
        // 1 as integer and 1.0 as float must not collapse into one kind.
        let int = PackedPoint {
            series_id: 0,
            timestamp: 100,
            value: PointValue::Integer(1),
        };
        let float = PackedPoint {
            series_id: 0,
            timestamp: 100,
            value: PointValue::Float(1.0),
        };
        assert!(matches!(
            PackedPoint::decode(&int.encode()).unwrap().value,
            PointValue::Integer(1)
        ));
        assert!(matches!(
            PackedPoint::decode(&float.encode()).unwrap().value,
            PointValue::Float(v) if v == 1.0
        ));
    }

    #[test]
    fn test_decode_rejects_truncated_and_bad_kind() {
        assert!(PackedPoint::decode(&[0u8; 3]).is_err());

        let mut buf = PackedPoint {
            series_id: 1,
            timestamp: 1,
            value: PointValue::Integer(1),
        }
        .encode();
        buf[10] = 9;
        assert!(PackedPoint::decode(&buf).is_err());
    }

    #[test]
    fn test_value_parse_classification() {
        assert_eq!(PointValue::parse("42").unwrap(), PointValue::Integer(42));
        assert_eq!(PointValue::parse("+7").unwrap(), PointValue::Integer(7));
        assert_eq!(PointValue::parse("-3").unwrap(), PointValue::Integer(-3));
        assert_eq!(PointValue::parse("1.5").unwrap(), PointValue::Float(1.5));
        assert_eq!(PointValue::parse("2e3").unwrap(), PointValue::Float(2000.0));
        assert!(PointValue::parse("abc").is_err());
        // All digits but does not fit 32 bits.
        assert!(PointValue::parse("99999999999").is_err());
    }

    #[test]
    fn test_point_buffer_push_get() {
        let mut buffer = PointBuffer::with_capacity(3);
        for i in 0..3i32 {
            buffer.push(&PackedPoint {
                series_id: i as u16,
                timestamp: 1000 + i as i64,
                value: PointValue::Integer(i),
            });
        }
        assert_eq!(buffer.len(), 3);

        let p = buffer.get(2).unwrap();
        assert_eq!(p.series_id, 2);
        assert_eq!(p.timestamp, 1002);
        assert!(buffer.get(3).is_err());
    }
}
