//! Command frame construction and reply field decoding
//!
//! A command frame is an owned byte buffer assembled from length-checked
//! field encoders. Every encoder refuses values that do not fit the field
//! instead of silently truncating them.
//!
//! ```rust
//! use rig_protocol::frame::FrameBuilder;
//!
//! let frame = FrameBuilder::new()
//!     .bytes(b"*A")
//!     .u32_be(14_074_000)
//!     .byte(b'\r')
//!     .finish();
//! assert_eq!(frame, vec![b'*', b'A', 0x00, 0xD6, 0xC0, 0x90, b'\r']);
//! ```

use crate::error::{EncodeError, ParseError};

/// Builder for an outgoing command frame
///
/// Fallible encoders latch the first error; [`FrameBuilder::build`] reports
/// it. [`FrameBuilder::finish`] is for frames made only of infallible fields.
#[derive(Debug, Default)]
pub struct FrameBuilder {
    buf: Vec<u8>,
    error: Option<EncodeError>,
}

impl FrameBuilder {
    /// Create an empty frame
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(16),
            error: None,
        }
    }

    fn fail(mut self, e: EncodeError) -> Self {
        if self.error.is_none() {
            self.error = Some(e);
        }
        self
    }

    /// Append a single byte
    pub fn byte(mut self, b: u8) -> Self {
        self.buf.push(b);
        self
    }

    /// Append raw bytes
    pub fn bytes(mut self, data: &[u8]) -> Self {
        self.buf.extend_from_slice(data);
        self
    }

    /// Append a single-character enum code
    pub fn enum_char(self, c: char) -> Self {
        if c.is_ascii() {
            self.byte(c as u8)
        } else {
            self.fail(EncodeError::Unsupported(format!("non-ASCII code '{}'", c)))
        }
    }

    /// Append `value` as a `width`-byte big-endian unsigned integer
    pub fn uint_be(mut self, value: u64, width: usize) -> Self {
        if width == 0 || width > 8 || (width < 8 && value >> (width * 8) != 0) {
            return self.fail(EncodeError::Overflow {
                value,
                width,
                unit: "bytes",
            });
        }
        let be = value.to_be_bytes();
        self.buf.extend_from_slice(&be[8 - width..]);
        self
    }

    /// Append `value` as four big-endian bytes
    pub fn u32_be(mut self, value: u32) -> Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    /// Append `value` as a zero-padded ASCII decimal of exactly `width` digits
    pub fn ascii_decimal(mut self, value: u64, width: usize) -> Self {
        let digits = format!("{:0width$}", value, width = width);
        if digits.len() != width {
            return self.fail(EncodeError::Overflow {
                value,
                width,
                unit: "digits",
            });
        }
        self.buf.extend_from_slice(digits.as_bytes());
        self
    }

    /// Append `value` as big-endian packed BCD of `digits` digits
    ///
    /// `digits` must be even; each byte carries two digits, most significant
    /// nibble first.
    pub fn bcd_be(mut self, value: u64, digits: usize) -> Self {
        if digits == 0 || digits % 2 != 0 || digits > 18 || value >= 10u64.pow(digits as u32) {
            return self.fail(EncodeError::Overflow {
                value,
                width: digits,
                unit: "BCD digits",
            });
        }
        let mut remaining = value;
        let mut packed = vec![0u8; digits / 2];
        for slot in packed.iter_mut().rev() {
            let low = (remaining % 10) as u8;
            remaining /= 10;
            let high = (remaining % 10) as u8;
            remaining /= 10;
            *slot = (high << 4) | low;
        }
        self.buf.extend_from_slice(&packed);
        self
    }

    /// Finish the frame, reporting the first encoder failure
    pub fn build(self) -> Result<Vec<u8>, EncodeError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.buf),
        }
    }

    /// Finish a frame built only from infallible fields
    ///
    /// If a fallible encoder did fail, the partial frame is returned and the
    /// failure is logged; callers that can fail should use [`Self::build`].
    pub fn finish(self) -> Vec<u8> {
        if let Some(e) = &self.error {
            tracing::warn!("frame finished with encoder error: {}", e);
        }
        self.buf
    }
}

/// Decode a big-endian unsigned integer of up to eight bytes
pub fn be_uint(bytes: &[u8]) -> Result<u64, ParseError> {
    if bytes.is_empty() || bytes.len() > 8 {
        return Err(ParseError::InvalidFrame(format!(
            "big-endian field of {} bytes",
            bytes.len()
        )));
    }
    Ok(bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64))
}

/// Decode an ASCII decimal field (leading zeros allowed)
pub fn parse_ascii_decimal(bytes: &[u8]) -> Result<u64, ParseError> {
    if bytes.is_empty() || !bytes.iter().all(u8::is_ascii_digit) {
        return Err(ParseError::InvalidDecimal(
            String::from_utf8_lossy(bytes).into_owned(),
        ));
    }
    bytes.iter().try_fold(0u64, |acc, &b| {
        acc.checked_mul(10)
            .and_then(|v| v.checked_add((b - b'0') as u64))
            .ok_or_else(|| ParseError::InvalidDecimal(String::from_utf8_lossy(bytes).into_owned()))
    })
}

/// Decode big-endian packed BCD
pub fn bcd_to_u64(bytes: &[u8]) -> Result<u64, ParseError> {
    let mut value: u64 = 0;
    for &byte in bytes {
        let high = (byte >> 4) & 0x0F;
        let low = byte & 0x0F;
        if high > 9 || low > 9 {
            return Err(ParseError::InvalidBcd(byte));
        }
        value = value * 100 + (high as u64) * 10 + low as u64;
    }
    Ok(value)
}
