//! FIX tag-value framing: split raw bytes into fields and build framed messages.
//!
//! Framing is schema-independent. BeginString (8) and CheckSum (10) are verified on the way
//! in; the message ends at the CheckSum field, so a stale BodyLength (9) is only logged. All
//! three are recomputed on the way out.

use log::warn;
use std::io::{self, Write};

use crate::error::WireError;

pub const FIX_SOH: u8 = 0x01;

pub const BEGIN_STRING: u32 = 8;
pub const BODY_LENGTH: u32 = 9;
pub const CHECK_SUM: u32 = 10;
pub const MSG_TYPE: u32 = 35;

/// Sum of all bytes modulo 256.
pub fn checksum(bytes: &[u8]) -> u32 {
    bytes.iter().map(|&b| b as u32).sum::<u32>() % 256
}

/// Splits one framed message at the start of `buf` into `(tag, value)` pairs in wire order,
/// including 8, 9 and 10. Returns the fields and the number of bytes consumed.
pub fn split_fields(buf: &[u8]) -> Result<(Vec<(u32, String)>, usize), WireError> {
    if !buf.starts_with(b"8=") {
        return Err(WireError::MissingBeginString);
    }
    let begin_end = find_soh(buf, 2).ok_or(WireError::MissingBeginString)?;
    let length_start = begin_end + 1;
    if !buf[length_start..].starts_with(b"9=") {
        return Err(WireError::InvalidBodyLength("missing".into()));
    }
    let length_end = find_soh(buf, length_start + 2)
        .ok_or_else(|| WireError::InvalidBodyLength("unterminated".into()))?;
    let length_str = std::str::from_utf8(&buf[length_start + 2..length_end])
        .map_err(|_| WireError::InvalidUtf8)?;
    let declared: usize = length_str
        .parse()
        .map_err(|_| WireError::InvalidBodyLength(length_str.to_string()))?;

    let body_start = length_end + 1;
    let checksum_start = buf[body_start.saturating_sub(1)..]
        .windows(4)
        .position(|w| w == b"\x0110=")
        .map(|p| p + body_start)
        .ok_or_else(|| WireError::CheckSumMismatch {
            expected: checksum(buf),
            actual: "missing".into(),
        })?;
    let actual = checksum_start - body_start;
    if actual != declared {
        warn!("BodyLength (9) is {} but body is {} bytes", declared, actual);
    }

    let checksum_end = find_soh(buf, checksum_start + 3).ok_or_else(|| WireError::CheckSumMismatch {
        expected: checksum(&buf[..checksum_start]),
        actual: "unterminated".into(),
    })?;
    let checksum_str = std::str::from_utf8(&buf[checksum_start + 3..checksum_end])
        .map_err(|_| WireError::InvalidUtf8)?;
    let expected = checksum(&buf[..checksum_start]);
    if checksum_str.len() != 3 || checksum_str.parse::<u32>().ok() != Some(expected) {
        return Err(WireError::CheckSumMismatch {
            expected,
            actual: checksum_str.to_string(),
        });
    }

    let msg_end = checksum_end + 1;
    let mut fields = Vec::new();
    let mut pos = 0;
    while pos < msg_end {
        let eq = buf[pos..msg_end]
            .iter()
            .position(|&b| b == b'=')
            .map(|p| p + pos)
            .ok_or(WireError::MalformedField(pos))?;
        let tag: u32 = std::str::from_utf8(&buf[pos..eq])
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|&t| t > 0)
            .ok_or(WireError::MalformedField(pos))?;
        let soh = find_soh(buf, eq + 1).ok_or(WireError::MalformedField(pos))?;
        let value = std::str::from_utf8(&buf[eq + 1..soh])
            .map_err(|_| WireError::InvalidUtf8)?
            .to_string();
        fields.push((tag, value));
        pos = soh + 1;
    }
    Ok((fields, msg_end))
}

fn find_soh(buf: &[u8], from: usize) -> Option<usize> {
    buf.get(from..)?
        .iter()
        .position(|&b| b == FIX_SOH)
        .map(|p| p + from)
}

/// Builds a framed FIX message. Sets 8, 9 and 10 automatically; fields are written in
/// the order they were set.
pub struct FixWriter {
    begin_string: String,
    fields: Vec<(u32, String)>,
}

impl FixWriter {
    pub fn new(begin_string: impl Into<String>) -> Self {
        Self {
            begin_string: begin_string.into(),
            fields: Vec::new(),
        }
    }

    pub fn set(&mut self, tag: u32, value: impl Into<String>) {
        self.fields.push((tag, value.into()));
    }

    pub fn extend(&mut self, fields: impl IntoIterator<Item = (u32, String)>) {
        self.fields.extend(fields);
    }

    /// Writes `8=<begin>|9=<len>|<fields>|10=<checksum>|`. Any 8, 9 or 10 among the fields
    /// is ignored.
    pub fn write(&self, w: &mut impl io::Write) -> io::Result<()> {
        let mut body = Vec::new();
        for (tag, value) in &self.fields {
            if matches!(*tag, BEGIN_STRING | BODY_LENGTH | CHECK_SUM) {
                continue;
            }
            write!(body, "{}={}\x01", tag, value)?;
        }
        let header = format!("8={}\x019={}\x01", self.begin_string, body.len());
        let sum = (checksum(header.as_bytes()) + checksum(&body)) % 256;
        write!(w, "{}", header)?;
        w.write_all(&body)?;
        write!(w, "10={:03}\x01", sum)?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        // writing into a Vec cannot fail
        let _ = self.write(&mut out);
        out
    }
}
