use crate::bytes::ByteVector;
use crate::symbols::SymbolTable;

/// Location of an attribute body inside a class file, with its resolved name.
///
/// Bodies are never interpreted by the core; attribute crates decode them on
/// demand from `offset .. offset + length`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAttribute {
    pub name: String,
    /// Offset of the first body byte (just past the `u32` length).
    pub offset: usize,
    pub length: u32,
}

impl RawAttribute {
    /// Offset of the first byte after the body.
    #[inline]
    pub fn end(&self) -> usize {
        self.offset + self.length as usize
    }
}

/// Core attribute abstraction.
///
/// Each `Attribute` implementation:
/// - Is identified by the class-file attribute name it is stored under.
/// - Writes only its body; the `u16 name_index, u32 length` prefix is written
///   by [`write_attribute`].
/// - Interns every constant it references through the shared table, in the
///   order it writes them.
pub trait Attribute {
    /// Attribute name stored in the constant pool, e.g. `RuntimeVisibleAnnotations`.
    fn name(&self) -> &str;

    /// Append the attribute body to `out`.
    fn write_body(&self, out: &mut ByteVector, symbols: &mut SymbolTable) -> anyhow::Result<()>;
}

/// Write `attr` with its name index and length prefix.
pub fn write_attribute(
    attr: &dyn Attribute,
    out: &mut ByteVector,
    symbols: &mut SymbolTable,
) -> anyhow::Result<()> {
    let name_index = symbols.new_utf8(attr.name())?;
    let mut body = ByteVector::new();
    attr.write_body(&mut body, symbols)?;
    let length = u32::try_from(body.len()).map_err(|_| {
        anyhow::anyhow!("attribute {} body too large: {} bytes", attr.name(), body.len())
    })?;
    out.put_u16(name_index).put_u32(length).put_bytes(body.as_slice());
    Ok(())
}

/// Write an attribute table: `u16 count` then every attribute.
pub fn write_attributes(
    attrs: &[&dyn Attribute],
    out: &mut ByteVector,
    symbols: &mut SymbolTable,
) -> anyhow::Result<()> {
    let count = u16::try_from(attrs.len())
        .map_err(|_| anyhow::anyhow!("too many attributes: {}", attrs.len()))?;
    out.put_u16(count);
    for attr in attrs {
        write_attribute(*attr, out, symbols)?;
    }
    Ok(())
}
