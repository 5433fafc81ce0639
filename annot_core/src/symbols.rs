use std::collections::HashMap;

use crate::bytes::ByteVector;
use crate::format::{
    CONSTANT_CLASS, CONSTANT_DOUBLE, CONSTANT_FLOAT, CONSTANT_INTEGER, CONSTANT_LONG,
    CONSTANT_STRING, CONSTANT_UTF8, MAX_U16_COUNT,
};

/// A constant the symbol table knows how to intern.
///
/// Floating point values are keyed by their bit pattern so that `NaN` and
/// `-0.0` intern to stable, distinct entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
    Utf8(String),
    Integer(i32),
    Float(u32),
    Long(i64),
    Double(u64),
    Class(u16),
    String(u16),
}

impl Constant {
    fn tag(&self) -> u8 {
        match self {
            Constant::Utf8(_) => CONSTANT_UTF8,
            Constant::Integer(_) => CONSTANT_INTEGER,
            Constant::Float(_) => CONSTANT_FLOAT,
            Constant::Long(_) => CONSTANT_LONG,
            Constant::Double(_) => CONSTANT_DOUBLE,
            Constant::Class(_) => CONSTANT_CLASS,
            Constant::String(_) => CONSTANT_STRING,
        }
    }

    /// Number of constant pool slots the entry occupies.
    fn slots(&self) -> usize {
        match self {
            Constant::Long(_) | Constant::Double(_) => 2,
            _ => 1,
        }
    }
}

/// Append-only constant pool builder.
///
/// Each `new_*` call returns the pool index of the constant, adding it on
/// first use. Indices are assigned strictly in call order starting at 1, so
/// two encoders that intern the same constants in the same order produce
/// byte-identical pools.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    entries: Vec<(u16, Constant)>,
    index: HashMap<Constant, u16>,
    /// Next free slot; equals the `constant_pool_count` field once serialized.
    next: usize,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            next: 1,
        }
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `constant`, returning its pool index.
    pub fn intern(&mut self, constant: Constant) -> anyhow::Result<u16> {
        if let Some(&idx) = self.index.get(&constant) {
            return Ok(idx);
        }
        let slots = constant.slots();
        if self.next + slots > MAX_U16_COUNT {
            anyhow::bail!(
                "constant pool overflow: {} slots in use, cannot add {} more (max {})",
                self.next - 1,
                slots,
                MAX_U16_COUNT - 1
            );
        }
        let idx = self.next as u16;
        self.next += slots;
        self.index.insert(constant.clone(), idx);
        self.entries.push((idx, constant));
        Ok(idx)
    }

    pub fn new_utf8(&mut self, value: &str) -> anyhow::Result<u16> {
        self.intern(Constant::Utf8(value.to_owned()))
    }

    pub fn new_integer(&mut self, value: i32) -> anyhow::Result<u16> {
        self.intern(Constant::Integer(value))
    }

    pub fn new_float(&mut self, value: f32) -> anyhow::Result<u16> {
        self.intern(Constant::Float(value.to_bits()))
    }

    pub fn new_long(&mut self, value: i64) -> anyhow::Result<u16> {
        self.intern(Constant::Long(value))
    }

    pub fn new_double(&mut self, value: f64) -> anyhow::Result<u16> {
        self.intern(Constant::Double(value.to_bits()))
    }

    /// Intern a `CONSTANT_Class` for an internal name such as `java/lang/Object`.
    pub fn new_class(&mut self, internal_name: &str) -> anyhow::Result<u16> {
        let name = self.new_utf8(internal_name)?;
        self.intern(Constant::Class(name))
    }

    /// Intern a `CONSTANT_String` literal.
    pub fn new_string(&mut self, value: &str) -> anyhow::Result<u16> {
        let utf8 = self.new_utf8(value)?;
        self.intern(Constant::String(utf8))
    }

    /// Look up an already interned constant without adding it.
    pub fn get(&self, constant: &Constant) -> Option<u16> {
        self.index.get(constant).copied()
    }

    /// Value of the `constant_pool_count` field: one more than the highest slot.
    pub fn pool_count(&self) -> u16 {
        // `intern` keeps `next` <= MAX_U16_COUNT
        self.next as u16
    }

    /// Number of distinct constants (long/double count once).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize as a class-file constant pool: `u16 count` then every entry.
    pub fn write_to(&self, out: &mut ByteVector) -> anyhow::Result<()> {
        out.put_u16(self.pool_count());
        for (_, constant) in &self.entries {
            out.put_u8(constant.tag());
            match constant {
                Constant::Utf8(s) => {
                    out.put_utf8(s)?;
                }
                Constant::Integer(v) => {
                    out.put_u32(*v as u32);
                }
                Constant::Float(bits) => {
                    out.put_u32(*bits);
                }
                Constant::Long(v) => {
                    out.put_u64(*v as u64);
                }
                Constant::Double(bits) => {
                    out.put_u64(*bits);
                }
                Constant::Class(idx) | Constant::String(idx) => {
                    out.put_u16(*idx);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent_and_ordered() {
        let mut st = SymbolTable::new();
        assert_eq!(st.new_utf8("a").unwrap(), 1);
        assert_eq!(st.new_utf8("b").unwrap(), 2);
        assert_eq!(st.new_utf8("a").unwrap(), 1);
        assert_eq!(st.len(), 2);
        assert_eq!(st.pool_count(), 3);
    }

    #[test]
    fn wide_constants_take_two_slots() {
        let mut st = SymbolTable::new();
        assert_eq!(st.new_long(7).unwrap(), 1);
        assert_eq!(st.new_double(1.5).unwrap(), 3);
        assert_eq!(st.new_integer(7).unwrap(), 5);
        assert_eq!(st.pool_count(), 6);
    }

    #[test]
    fn float_keys_use_bit_patterns() {
        let mut st = SymbolTable::new();
        let pos = st.new_float(0.0).unwrap();
        let neg = st.new_float(-0.0).unwrap();
        assert_ne!(pos, neg);
        assert_eq!(st.new_float(f32::NAN).unwrap(), st.new_float(f32::NAN).unwrap());
    }

    #[test]
    fn class_entry_references_its_name() {
        let mut st = SymbolTable::new();
        let class = st.new_class("java/lang/Object").unwrap();
        assert_eq!(class, 2);
        assert_eq!(st.get(&Constant::Utf8("java/lang/Object".into())), Some(1));
    }

    #[test]
    fn serialized_pool_layout() {
        let mut st = SymbolTable::new();
        st.new_utf8("Hi").unwrap();
        st.new_integer(-1).unwrap();
        let mut out = ByteVector::new();
        st.write_to(&mut out).unwrap();
        assert_eq!(
            out.as_slice(),
            &[0x00, 0x03, 0x01, 0x00, 0x02, b'H', b'i', 0x03, 0xFF, 0xFF, 0xFF, 0xFF]
        );
    }

    #[test]
    fn overflow_is_reported() {
        let mut st = SymbolTable::new();
        for i in 0..(MAX_U16_COUNT - 1) {
            st.new_integer(i as i32).unwrap();
        }
        let err = st.new_integer(-1).unwrap_err().to_string();
        assert!(err.contains("constant pool overflow"), "got: {err}");
    }
}
