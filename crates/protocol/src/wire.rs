//! Variable-length integer codec over a byte buffer.
//!
//! Unsigned values use base-128 little-endian groups with the high bit of each
//! byte as the continuation flag. Signed values are zig-zag mapped first so
//! small magnitudes of either sign stay short. Byte strings are a VarUInt
//! length followed by the raw bytes.

/// Errors produced while decoding wire payloads.
///
/// Malformed bytes and validated-but-invalid values surface through the same
/// type; callers reject the message either way.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("truncated varint starting at byte {offset}")]
    Truncated { offset: usize },
    #[error("declared length {declared} exceeds the {remaining} remaining bytes")]
    LengthOutOfBounds { declared: u64, remaining: usize },
    #[error("value does not fit in {target}")]
    Overflow { target: &'static str },
    #[error("{remaining} trailing bytes after payload")]
    TrailingBytes { remaining: usize },
    #[error("invalid {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
    #[error("unknown command type `{0}`")]
    UnknownCommand(String),
}

/// Bits carried per VarUInt group.
const GROUP_BITS: u32 = 7;
const GROUP_MASK: u8 = 0x7f;
const CONTINUATION: u8 = 0x80;

pub fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

pub fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

/// Append-only encoder. One logical value per call.
#[derive(Debug, Clone, Default)]
pub struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn write_var_uint(&mut self, mut value: u64) {
        while value >= u64::from(CONTINUATION) {
            self.buf.push((value as u8 & GROUP_MASK) | CONTINUATION);
            value >>= GROUP_BITS;
        }
        self.buf.push(value as u8);
    }

    pub fn write_var_int(&mut self, value: i64) {
        self.write_var_uint(zigzag_encode(value));
    }

    /// Length-prefixed raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.write_var_uint(bytes.len() as u64);
        self.buf.extend_from_slice(bytes);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Strict left-to-right decoder over a borrowed byte slice.
#[derive(Debug, Clone)]
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Decode one VarUInt. Non-shortest encodings are accepted as long as the
    /// value fits in 64 bits.
    pub fn read_var_uint(&mut self) -> Result<u64, WireError> {
        let start = self.pos;
        let mut value: u64 = 0;
        let mut shift: u32 = 0;
        loop {
            let byte = *self
                .buf
                .get(self.pos)
                .ok_or(WireError::Truncated { offset: start })?;
            self.pos += 1;

            let group = u64::from(byte & GROUP_MASK);
            // The tenth group holds only bit 63; an eleventh group never fits.
            if shift >= u64::BITS || (shift == 63 && group > 1) {
                return Err(WireError::Overflow { target: "u64" });
            }
            value |= group << shift;

            if byte & CONTINUATION == 0 {
                return Ok(value);
            }
            shift += GROUP_BITS;
        }
    }

    pub fn read_var_int(&mut self) -> Result<i64, WireError> {
        self.read_var_uint().map(zigzag_decode)
    }

    /// Length-prefixed sub-slice borrowed from the underlying buffer.
    pub fn read_bytes(&mut self) -> Result<&'a [u8], WireError> {
        let declared = self.read_var_uint()?;
        let remaining = self.remaining();
        let len = usize::try_from(declared)
            .ok()
            .filter(|&len| len <= remaining)
            .ok_or(WireError::LengthOutOfBounds {
                declared,
                remaining,
            })?;
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8, WireError> {
        u8::try_from(self.read_var_uint()?).map_err(|_| WireError::Overflow { target: "u8" })
    }

    pub fn read_u16(&mut self) -> Result<u16, WireError> {
        u16::try_from(self.read_var_uint()?).map_err(|_| WireError::Overflow { target: "u16" })
    }

    pub fn read_u32(&mut self) -> Result<u32, WireError> {
        u32::try_from(self.read_var_uint()?).map_err(|_| WireError::Overflow { target: "u32" })
    }

    pub fn read_i32(&mut self) -> Result<i32, WireError> {
        i32::try_from(self.read_var_int()?).map_err(|_| WireError::Overflow { target: "i32" })
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// True only when the cursor sits exactly at the end of the buffer.
    pub fn is_fully_consumed(&self) -> bool {
        self.pos == self.buf.len()
    }

    /// Reject any bytes left after the last expected field.
    pub fn finish(&self) -> Result<(), WireError> {
        if self.is_fully_consumed() {
            Ok(())
        } else {
            Err(WireError::TrailingBytes {
                remaining: self.remaining(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_uint(v: u64) -> Vec<u8> {
        let mut w = WireWriter::new();
        w.write_var_uint(v);
        w.into_bytes()
    }

    #[test]
    fn var_uint_known_encodings() {
        assert_eq!(encode_uint(0), vec![0x00]);
        assert_eq!(encode_uint(1), vec![0x01]);
        assert_eq!(encode_uint(127), vec![0x7f]);
        assert_eq!(encode_uint(128), vec![0x80, 0x01]);
        assert_eq!(encode_uint(300), vec![0xac, 0x02]);
        assert_eq!(encode_uint(u64::MAX).len(), 10);
    }

    #[test]
    fn var_uint_extremes_decode() {
        for v in [0, 1, 127, 128, 16_383, 16_384, u32::MAX as u64, u64::MAX] {
            let bytes = encode_uint(v);
            let mut r = WireReader::new(&bytes);
            assert_eq!(r.read_var_uint().unwrap(), v);
            assert!(r.is_fully_consumed());
        }
    }

    #[test]
    fn zigzag_keeps_small_magnitudes_short() {
        assert_eq!(zigzag_encode(0), 0);
        assert_eq!(zigzag_encode(-1), 1);
        assert_eq!(zigzag_encode(1), 2);
        assert_eq!(zigzag_encode(-2), 3);
        assert_eq!(zigzag_decode(zigzag_encode(i64::MIN)), i64::MIN);
        assert_eq!(zigzag_decode(zigzag_encode(i64::MAX)), i64::MAX);

        let mut w = WireWriter::new();
        w.write_var_int(-64);
        assert_eq!(w.len(), 1);
    }

    #[test]
    fn non_shortest_encoding_is_accepted() {
        // 1 encoded with a redundant zero group.
        let bytes = [0x81, 0x00];
        let mut r = WireReader::new(&bytes);
        assert_eq!(r.read_var_uint().unwrap(), 1);
        assert!(r.is_fully_consumed());
    }

    #[test]
    fn truncated_continuation_fails() {
        let bytes = [0x80, 0x80];
        let mut r = WireReader::new(&bytes);
        assert_eq!(
            r.read_var_uint(),
            Err(WireError::Truncated { offset: 0 })
        );
        assert_eq!(
            WireReader::new(&[]).read_var_uint(),
            Err(WireError::Truncated { offset: 0 })
        );
    }

    #[test]
    fn sixty_five_bit_value_overflows() {
        let mut bytes = vec![0xff; 9];
        bytes.push(0x02);
        let mut r = WireReader::new(&bytes);
        assert_eq!(r.read_var_uint(), Err(WireError::Overflow { target: "u64" }));

        let mut eleven = vec![0x80; 10];
        eleven.push(0x00);
        let mut r = WireReader::new(&eleven);
        assert!(r.read_var_uint().is_err());
    }

    #[test]
    fn narrowing_reads_reject_wide_values() {
        let bytes = encode_uint(256);
        assert_eq!(
            WireReader::new(&bytes).read_u8(),
            Err(WireError::Overflow { target: "u8" })
        );
        let bytes = encode_uint(u64::from(u32::MAX) + 1);
        assert!(WireReader::new(&bytes).read_u32().is_err());

        let mut w = WireWriter::new();
        w.write_var_int(i64::from(i32::MIN) - 1);
        assert!(WireReader::new(w.as_bytes()).read_i32().is_err());
    }

    #[test]
    fn bytes_roundtrip_and_bounds() {
        let mut w = WireWriter::new();
        w.write_bytes(b"tile");
        w.write_var_int(-7);
        let bytes = w.into_bytes();

        let mut r = WireReader::new(&bytes);
        assert_eq!(r.read_bytes().unwrap(), b"tile");
        assert_eq!(r.read_var_int().unwrap(), -7);
        assert!(r.finish().is_ok());

        // Declares 5 bytes, carries 2.
        let short = [0x05, 0x01, 0x02];
        let mut r = WireReader::new(&short);
        assert_eq!(
            r.read_bytes(),
            Err(WireError::LengthOutOfBounds {
                declared: 5,
                remaining: 2
            })
        );
    }

    #[test]
    fn finish_reports_trailing_bytes() {
        let bytes = [0x01, 0x02];
        let mut r = WireReader::new(&bytes);
        r.read_var_uint().unwrap();
        assert!(!r.is_fully_consumed());
        assert_eq!(r.finish(), Err(WireError::TrailingBytes { remaining: 1 }));
    }
}
