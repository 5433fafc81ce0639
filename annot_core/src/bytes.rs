/// Growable big-endian byte sink.
///
/// Every `put_*` appends at the end; nothing already written is ever
/// rewritten, so offsets handed out by [`len`](Self::len) stay valid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteVector {
    data: Vec<u8>,
}

impl ByteVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    pub fn put_u8(&mut self, v: u8) -> &mut Self {
        self.data.push(v);
        self
    }

    pub fn put_u16(&mut self, v: u16) -> &mut Self {
        self.data.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn put_u32(&mut self, v: u32) -> &mut Self {
        self.data.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn put_u64(&mut self, v: u64) -> &mut Self {
        self.data.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.data.extend_from_slice(bytes);
        self
    }

    /// Append `s` as a `u16` length followed by its modified UTF-8 bytes.
    pub fn put_utf8(&mut self, s: &str) -> anyhow::Result<&mut Self> {
        let encoded = encode_modified_utf8(s);
        let len = u16::try_from(encoded.len()).map_err(|_| {
            anyhow::anyhow!(
                "UTF-8 constant too long: {} encoded bytes (max {})",
                encoded.len(),
                u16::MAX
            )
        })?;
        self.put_u16(len);
        self.data.extend_from_slice(&encoded);
        Ok(self)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

/// Encode `s` as Java modified UTF-8: NUL becomes `C0 80` and supplementary
/// characters are written as two 3-byte surrogate sequences.
pub fn encode_modified_utf8(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    for unit in s.encode_utf16() {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | ((unit >> 6) & 0x1F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | ((unit >> 12) & 0x0F) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    out
}
