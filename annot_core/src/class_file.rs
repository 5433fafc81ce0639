use tracing::debug;

use crate::attribute::RawAttribute;
use crate::reader::ClassReader;

/// A field or method with its attribute table left undecoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub access: u16,
    pub name: String,
    pub descriptor: String,
    pub attributes: Vec<RawAttribute>,
}

impl Member {
    /// First attribute stored under `name`, if any.
    pub fn attribute(&self, name: &str) -> Option<&RawAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// Structural view of a class file: names, members, and attribute locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassFile {
    pub access: u16,
    pub this_class: String,
    /// `None` only for `java/lang/Object` and module-info.
    pub super_class: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<Member>,
    pub methods: Vec<Member>,
    pub attributes: Vec<RawAttribute>,
}

impl ClassFile {
    /// Walk everything after the constant pool.
    pub fn parse(cr: &ClassReader) -> anyhow::Result<Self> {
        let mut buf = Vec::new();
        let mut off = cr.header();

        let access = cr.read_u16(off)?;
        let this_class = cr.read_class(off + 2, &mut buf)?;
        let super_class = match cr.read_u16(off + 4)? {
            0 => None,
            _ => Some(cr.read_class(off + 4, &mut buf)?),
        };
        let interface_count = cr.read_u16(off + 6)? as usize;
        off += 8;
        let mut interfaces = Vec::with_capacity(interface_count);
        for _ in 0..interface_count {
            interfaces.push(cr.read_class(off, &mut buf)?);
            off += 2;
        }

        let (fields, next) = read_members(cr, off, &mut buf)?;
        let (methods, next) = read_members(cr, next, &mut buf)?;
        let (attributes, end) = read_attributes(cr, next, &mut buf)?;

        if end != cr.bytes().len() {
            anyhow::bail!(
                "class file has {} trailing bytes after offset {}",
                cr.bytes().len().saturating_sub(end),
                end
            );
        }

        debug!(
            class = %this_class,
            fields = fields.len(),
            methods = methods.len(),
            attributes = attributes.len(),
            "parsed class structure"
        );

        Ok(Self {
            access,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        })
    }

    pub fn field(&self, name: &str) -> Option<&Member> {
        self.fields.iter().find(|m| m.name == name)
    }

    pub fn method(&self, name: &str) -> Option<&Member> {
        self.methods.iter().find(|m| m.name == name)
    }
}

fn read_members(
    cr: &ClassReader,
    mut off: usize,
    buf: &mut Vec<u16>,
) -> anyhow::Result<(Vec<Member>, usize)> {
    let count = cr.read_u16(off)? as usize;
    off += 2;
    let mut members = Vec::with_capacity(count);
    for _ in 0..count {
        let access = cr.read_u16(off)?;
        let name = cr.read_utf8(off + 2, buf)?;
        let descriptor = cr.read_utf8(off + 4, buf)?;
        let (attributes, next) = read_attributes(cr, off + 6, buf)?;
        off = next;
        members.push(Member {
            access,
            name,
            descriptor,
            attributes,
        });
    }
    Ok((members, off))
}

/// Read an attribute table starting at its `u16` count.
pub fn read_attributes(
    cr: &ClassReader,
    mut off: usize,
    buf: &mut Vec<u16>,
) -> anyhow::Result<(Vec<RawAttribute>, usize)> {
    let count = cr.read_u16(off)? as usize;
    off += 2;
    let mut attributes = Vec::with_capacity(count);
    for _ in 0..count {
        let name = cr.read_utf8(off, buf)?;
        let length = cr.read_u32(off + 2)?;
        let attr = RawAttribute {
            name,
            offset: off + 6,
            length,
        };
        if attr.end() > cr.bytes().len() {
            anyhow::bail!(
                "attribute {} at offset {} claims {} bytes but class file ends at {}",
                attr.name,
                off,
                length,
                cr.bytes().len()
            );
        }
        off = attr.end();
        attributes.push(attr);
    }
    Ok((attributes, off))
}
