//! Primitive reads and writes for the analyzer wire format.
//!
//! All integers are 32-bit big-endian. Strings and byte buffers carry an
//! explicit 32-bit length prefix. Booleans are a single byte.

use std::io::{self, Read, Write};

use crate::error::ProtocolFault;

/// Reads protocol primitives from a byte stream.
///
/// Every read names the field it is decoding so a fault can say where the
/// stream went wrong.
pub struct WireReader<R> {
    inner: R,
}

impl<R: Read> WireReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Read a length-prefixed UTF-8 string.
    pub fn read_utf(&mut self, field: &'static str) -> Result<String, ProtocolFault> {
        let bytes = self.read_bytes(field)?;
        String::from_utf8(bytes).map_err(|_| ProtocolFault::InvalidUtf8 { field })
    }

    /// Read a big-endian signed 32-bit integer.
    pub fn read_int(&mut self, field: &'static str) -> Result<i32, ProtocolFault> {
        let mut buf = [0u8; 4];
        self.inner
            .read_exact(&mut buf)
            .map_err(|e| ProtocolFault::from_io(field, e))?;
        Ok(i32::from_be_bytes(buf))
    }

    /// Read a single-byte boolean. Any non-zero byte is true.
    pub fn read_bool(&mut self, field: &'static str) -> Result<bool, ProtocolFault> {
        let mut buf = [0u8; 1];
        self.inner
            .read_exact(&mut buf)
            .map_err(|e| ProtocolFault::from_io(field, e))?;
        Ok(buf[0] != 0)
    }

    /// Read a count field, rejecting negative values.
    pub fn read_count(&mut self, field: &'static str) -> Result<usize, ProtocolFault> {
        let value = self.read_int(field)?;
        usize::try_from(value).map_err(|_| ProtocolFault::InvalidLength {
            field,
            length: value,
        })
    }

    /// Read a raw buffer preceded by its 32-bit length.
    pub fn read_bytes(&mut self, field: &'static str) -> Result<Vec<u8>, ProtocolFault> {
        let len = self.read_count(field)?;
        // Bounded read: a corrupt length can't allocate more than the stream holds.
        let mut buf = Vec::new();
        (&mut self.inner)
            .take(len as u64)
            .read_to_end(&mut buf)
            .map_err(|e| ProtocolFault::from_io(field, e))?;
        if buf.len() != len {
            return Err(ProtocolFault::Truncated { field });
        }
        Ok(buf)
    }

    /// Read a token and check it against the expected literal.
    pub fn expect_token(&mut self, expected: &'static str) -> Result<(), ProtocolFault> {
        let found = self.read_utf(expected)?;
        if found == expected {
            Ok(())
        } else {
            Err(ProtocolFault::UnexpectedToken { expected, found })
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Writes protocol primitives to a byte sink.
pub struct WireWriter<W> {
    inner: W,
}

impl<W: Write> WireWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn write_utf(&mut self, value: &str) -> io::Result<()> {
        self.write_bytes(value.as_bytes())
    }

    pub fn write_int(&mut self, value: i32) -> io::Result<()> {
        self.inner.write_all(&value.to_be_bytes())
    }

    pub fn write_bool(&mut self, value: bool) -> io::Result<()> {
        self.inner.write_all(&[u8::from(value)])
    }

    /// Write a count as a 32-bit integer.
    pub fn write_count(&mut self, count: usize) -> io::Result<()> {
        let value = i32::try_from(count)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "count exceeds i32::MAX"))?;
        self.write_int(value)
    }

    pub fn write_bytes(&mut self, buf: &[u8]) -> io::Result<()> {
        self.write_count(buf.len())?;
        self.inner.write_all(buf)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}
