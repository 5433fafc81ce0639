use tracing::debug;

use crate::format::{
    constant_kind_name, constant_payload_size, CONSTANT_CLASS, CONSTANT_DOUBLE, CONSTANT_FLOAT,
    CONSTANT_INTEGER, CONSTANT_LONG, CONSTANT_UTF8, HEADER_SIZE, MAGIC,
};

/// Random-access reader over an in-memory class file.
///
/// # Open sequence
/// 1. Check the magic number and read the version pair.
/// 2. Walk the constant pool once, recording the offset of every entry's
///    tag byte in `items` (index 0 and the second slot of long/double
///    entries stay `None`).
/// 3. Remember `header`, the offset of the first byte after the pool.
///
/// # Access pattern
/// Every accessor takes an absolute byte offset and returns the decoded
/// value; nothing is cached and no cursor is kept, so callers thread
/// offsets themselves. All reads are bounds-checked and report the offset
/// that failed.
#[derive(Debug, Clone)]
pub struct ClassReader {
    b: Vec<u8>,
    items: Vec<Option<usize>>,
    header: usize,
    pub minor_version: u16,
    pub major_version: u16,
}

impl ClassReader {
    /// Parse the header and constant pool of `bytes`.
    pub fn new(bytes: Vec<u8>) -> anyhow::Result<Self> {
        if bytes.len() < HEADER_SIZE {
            anyhow::bail!(
                "class file truncated: {} bytes, header needs {}",
                bytes.len(),
                HEADER_SIZE
            );
        }
        let mut cr = Self {
            b: bytes,
            items: Vec::new(),
            header: HEADER_SIZE,
            minor_version: 0,
            major_version: 0,
        };

        let magic = cr.read_u32(0)?;
        if magic != MAGIC {
            anyhow::bail!("invalid magic {:#010x}: not a class file", magic);
        }
        cr.minor_version = cr.read_u16(4)?;
        cr.major_version = cr.read_u16(6)?;

        let count = cr.read_u16(8)? as usize;
        let mut items = vec![None; count.max(1)];
        let mut off = HEADER_SIZE;
        let mut i = 1;
        while i < count {
            let tag = cr.read_u8(off)?;
            items[i] = Some(off);
            let size = if tag == CONSTANT_UTF8 {
                2 + cr.read_u16(off + 1)? as usize
            } else {
                constant_payload_size(tag).ok_or_else(|| {
                    anyhow::anyhow!("unknown constant pool tag {} at offset {}", tag, off)
                })?
            };
            off += 1 + size;
            i += if tag == CONSTANT_LONG || tag == CONSTANT_DOUBLE { 2 } else { 1 };
        }
        if off > cr.b.len() {
            anyhow::bail!(
                "constant pool truncated: ends at offset {} but class file has {} bytes",
                off,
                cr.b.len()
            );
        }
        cr.items = items;
        cr.header = off;

        debug!(
            pool_count = count,
            header = off,
            major = cr.major_version,
            "parsed constant pool"
        );
        Ok(cr)
    }

    /// Offset of the first byte after the constant pool (the access flags).
    #[inline]
    pub fn header(&self) -> usize {
        self.header
    }

    /// Raw bytes of the whole class file.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.b
    }

    /// The `constant_pool_count` field.
    #[inline]
    pub fn pool_count(&self) -> usize {
        self.items.len()
    }

    fn slice(&self, off: usize, len: usize) -> anyhow::Result<&[u8]> {
        off.checked_add(len)
            .and_then(|end| self.b.get(off..end))
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "read of {} bytes at offset {} is beyond class file size {}",
                    len,
                    off,
                    self.b.len()
                )
            })
    }

    pub fn read_u8(&self, off: usize) -> anyhow::Result<u8> {
        Ok(self.slice(off, 1)?[0])
    }

    pub fn read_u16(&self, off: usize) -> anyhow::Result<u16> {
        Ok(u16::from_be_bytes(self.slice(off, 2)?.try_into()?))
    }

    pub fn read_u32(&self, off: usize) -> anyhow::Result<u32> {
        Ok(u32::from_be_bytes(self.slice(off, 4)?.try_into()?))
    }

    pub fn read_u64(&self, off: usize) -> anyhow::Result<u64> {
        Ok(u64::from_be_bytes(self.slice(off, 8)?.try_into()?))
    }

    /// Tag byte of pool entry `index`.
    pub fn item_tag(&self, index: u16) -> anyhow::Result<u8> {
        let off = self.item_offset(index)?;
        self.read_u8(off)
    }

    fn item_offset(&self, index: u16) -> anyhow::Result<usize> {
        if index == 0 {
            anyhow::bail!("constant pool index 0 is not a valid reference");
        }
        self.items
            .get(index as usize)
            .copied()
            .flatten()
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "constant pool index {} out of range (pool count {})",
                    index,
                    self.items.len()
                )
            })
    }

    /// Offset of the payload of entry `index`, checking that it has the expected tag.
    fn typed_item(&self, index: u16, expected: u8) -> anyhow::Result<usize> {
        let off = self.item_offset(index)?;
        let tag = self.read_u8(off)?;
        if tag != expected {
            anyhow::bail!(
                "constant pool index {} is {} but {} was expected",
                index,
                constant_kind_name(tag),
                constant_kind_name(expected)
            );
        }
        Ok(off + 1)
    }

    /// Read the `u16` pool index at `off` and decode the UTF-8 entry it names.
    ///
    /// `buf` is scratch space for the UTF-16 decode; it is cleared on entry and
    /// can be reused across calls.
    pub fn read_utf8(&self, off: usize, buf: &mut Vec<u16>) -> anyhow::Result<String> {
        let index = self.read_u16(off)?;
        self.read_utf8_item(index, buf)
    }

    /// Decode UTF-8 pool entry `index`.
    pub fn read_utf8_item(&self, index: u16, buf: &mut Vec<u16>) -> anyhow::Result<String> {
        let off = self.typed_item(index, CONSTANT_UTF8)?;
        let len = self.read_u16(off)? as usize;
        let bytes = self.slice(off + 2, len)?;
        decode_modified_utf8(bytes, buf)
            .map_err(|e| anyhow::anyhow!("constant pool index {}: {}", index, e))?;
        Ok(String::from_utf16_lossy(buf))
    }

    pub fn read_int_item(&self, index: u16) -> anyhow::Result<i32> {
        let off = self.typed_item(index, CONSTANT_INTEGER)?;
        Ok(self.read_u32(off)? as i32)
    }

    pub fn read_float_item(&self, index: u16) -> anyhow::Result<f32> {
        let off = self.typed_item(index, CONSTANT_FLOAT)?;
        Ok(f32::from_bits(self.read_u32(off)?))
    }

    pub fn read_long_item(&self, index: u16) -> anyhow::Result<i64> {
        let off = self.typed_item(index, CONSTANT_LONG)?;
        Ok(self.read_u64(off)? as i64)
    }

    pub fn read_double_item(&self, index: u16) -> anyhow::Result<f64> {
        let off = self.typed_item(index, CONSTANT_DOUBLE)?;
        Ok(f64::from_bits(self.read_u64(off)?))
    }

    /// Read the `u16` index at `off` and resolve the internal name of the
    /// `CONSTANT_Class` entry it names.
    pub fn read_class(&self, off: usize, buf: &mut Vec<u16>) -> anyhow::Result<String> {
        let index = self.read_u16(off)?;
        let item = self.typed_item(index, CONSTANT_CLASS)?;
        self.read_utf8(item, buf)
    }
}

/// Decode Java modified UTF-8 into UTF-16 code units in `buf`.
///
/// Lone surrogates survive the decode; the caller decides how to map them.
pub fn decode_modified_utf8(bytes: &[u8], buf: &mut Vec<u16>) -> anyhow::Result<()> {
    buf.clear();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as u16;
        match c >> 4 {
            0..=7 => {
                buf.push(c);
                i += 1;
            }
            12 | 13 => {
                let c2 = continuation(bytes, i + 1)?;
                buf.push(((c & 0x1F) << 6) | c2);
                i += 2;
            }
            14 => {
                let c2 = continuation(bytes, i + 1)?;
                let c3 = continuation(bytes, i + 2)?;
                buf.push(((c & 0x0F) << 12) | (c2 << 6) | c3);
                i += 3;
            }
            _ => anyhow::bail!("invalid modified UTF-8 lead byte {:#04x} at {}", c, i),
        }
    }
    Ok(())
}

fn continuation(bytes: &[u8], i: usize) -> anyhow::Result<u16> {
    match bytes.get(i) {
        Some(&b) if b & 0xC0 == 0x80 => Ok((b & 0x3F) as u16),
        Some(&b) => anyhow::bail!("invalid modified UTF-8 continuation byte {:#04x} at {}", b, i),
        None => anyhow::bail!("modified UTF-8 sequence truncated at {}", i),
    }
}
