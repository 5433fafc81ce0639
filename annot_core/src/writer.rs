use crate::attribute::{write_attribute, write_attributes, Attribute};
use crate::bytes::ByteVector;
use crate::format::{DEFAULT_MAJOR_VERSION, MAGIC};
use crate::symbols::SymbolTable;

/// Builder for minimal class files: header, constant pool, members, attributes.
///
/// # Write contract
/// Members and attributes are encoded into a body buffer as soon as they are
/// added, interning constants into the shared [`SymbolTable`] in call order.
/// [`finish`](Self::finish) then emits the header and the pool ahead of the
/// body.
///
/// # Format layout written
/// ```text
/// [magic, minor, major]
/// [constant pool]                       ← everything interned so far
/// [access, this_class, super_class, interfaces_count = 0]
/// [fields_count] [field]*
/// [methods_count] [method]*
/// [attributes_count] [attribute]*
/// ```
pub struct ClassWriter {
    symbols: SymbolTable,
    major_version: u16,
    access: u16,
    this_class: u16,
    super_class: u16,
    fields: ByteVector,
    field_count: u16,
    methods: ByteVector,
    method_count: u16,
    attributes: ByteVector,
    attribute_count: u16,
}

impl ClassWriter {
    /// Start a class `name` (internal form, e.g. `com/example/Foo`).
    pub fn new(access: u16, name: &str, super_name: Option<&str>) -> anyhow::Result<Self> {
        let mut symbols = SymbolTable::new();
        let this_class = symbols.new_class(name)?;
        let super_class = match super_name {
            Some(s) => symbols.new_class(s)?,
            None => 0,
        };
        Ok(Self {
            symbols,
            major_version: DEFAULT_MAJOR_VERSION,
            access,
            this_class,
            super_class,
            fields: ByteVector::new(),
            field_count: 0,
            methods: ByteVector::new(),
            method_count: 0,
            attributes: ByteVector::new(),
            attribute_count: 0,
        })
    }

    pub fn with_major_version(mut self, major: u16) -> Self {
        self.major_version = major;
        self
    }

    /// Shared symbol table, for callers that encode extra structures.
    pub fn symbols(&mut self) -> &mut SymbolTable {
        &mut self.symbols
    }

    pub fn add_field(
        &mut self,
        access: u16,
        name: &str,
        descriptor: &str,
        attrs: &[&dyn Attribute],
    ) -> anyhow::Result<()> {
        self.field_count = bump(self.field_count, "fields")?;
        write_member(&mut self.fields, &mut self.symbols, access, name, descriptor, attrs)
    }

    pub fn add_method(
        &mut self,
        access: u16,
        name: &str,
        descriptor: &str,
        attrs: &[&dyn Attribute],
    ) -> anyhow::Result<()> {
        self.method_count = bump(self.method_count, "methods")?;
        write_member(&mut self.methods, &mut self.symbols, access, name, descriptor, attrs)
    }

    pub fn add_attribute(&mut self, attr: &dyn Attribute) -> anyhow::Result<()> {
        self.attribute_count = bump(self.attribute_count, "class attributes")?;
        write_attribute(attr, &mut self.attributes, &mut self.symbols)
    }

    /// Assemble the class file bytes.
    pub fn finish(self) -> anyhow::Result<Vec<u8>> {
        let mut out = ByteVector::with_capacity(
            64 + self.fields.len() + self.methods.len() + self.attributes.len(),
        );
        out.put_u32(MAGIC).put_u16(0).put_u16(self.major_version);
        self.symbols.write_to(&mut out)?;
        out.put_u16(self.access)
            .put_u16(self.this_class)
            .put_u16(self.super_class)
            .put_u16(0);
        out.put_u16(self.field_count).put_bytes(self.fields.as_slice());
        out.put_u16(self.method_count).put_bytes(self.methods.as_slice());
        out.put_u16(self.attribute_count)
            .put_bytes(self.attributes.as_slice());
        Ok(out.into_vec())
    }
}

fn bump(count: u16, what: &str) -> anyhow::Result<u16> {
    count
        .checked_add(1)
        .ok_or_else(|| anyhow::anyhow!("too many {}: limit is {}", what, u16::MAX))
}

fn write_member(
    out: &mut ByteVector,
    symbols: &mut SymbolTable,
    access: u16,
    name: &str,
    descriptor: &str,
    attrs: &[&dyn Attribute],
) -> anyhow::Result<()> {
    let name_index = symbols.new_utf8(name)?;
    let descriptor_index = symbols.new_utf8(descriptor)?;
    out.put_u16(access).put_u16(name_index).put_u16(descriptor_index);
    write_attributes(attrs, out, symbols)
}
