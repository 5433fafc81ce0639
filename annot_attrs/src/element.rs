use std::fmt;

use annot_core::format::MAX_U16_COUNT;
use annot_core::{ByteVector, ClassReader, SymbolTable};
use serde::Serialize;

use crate::annotation::Annotation;

// ── Element value tags ─────────────────────────────────────────────────────

pub const TAG_BYTE: u8 = b'B';
pub const TAG_CHAR: u8 = b'C';
pub const TAG_DOUBLE: u8 = b'D';
pub const TAG_FLOAT: u8 = b'F';
pub const TAG_INT: u8 = b'I';
pub const TAG_LONG: u8 = b'J';
pub const TAG_SHORT: u8 = b'S';
pub const TAG_BOOLEAN: u8 = b'Z';
pub const TAG_STRING: u8 = b's';
pub const TAG_ENUM: u8 = b'e';
pub const TAG_CLASS: u8 = b'c';
pub const TAG_ANNOTATION: u8 = b'@';
pub const TAG_ARRAY: u8 = b'[';

/// Deepest array or nested-annotation level accepted by decode and encode.
///
/// Both walks recurse once per level, so the bound keeps a hostile class
/// file from exhausting the stack.
pub const MAX_NESTING_DEPTH: usize = 256;

/// Value half of an element-value pair.
///
/// Primitive variants are stored in the constant pool as `Integer`, `Long`,
/// `Float`, or `Double` entries; `Char` keeps the raw UTF-16 unit because a
/// lone surrogate is a legal Java `char`.
///
/// Equality on `Float` and `Double` is IEEE equality, so `NaN` never equals
/// itself; the encoded bits of `NaN` and `-0.0` survive a round trip unchanged.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ElementValue {
    Byte(i8),
    Char(u16),
    Double(f64),
    Float(f32),
    Int(i32),
    Long(i64),
    Short(i16),
    Boolean(bool),
    String(String),
    Enum {
        /// Field descriptor of the enum type, e.g. `Ljava/lang/annotation/RetentionPolicy;`.
        type_name: String,
        const_name: String,
    },
    /// Return descriptor of the class literal, e.g. `Ljava/lang/String;` or `V`.
    Class(String),
    Annotation(Annotation),
    Array(Vec<ElementValue>),
}

impl ElementValue {
    /// Tag byte written ahead of the value.
    pub fn tag(&self) -> u8 {
        match self {
            ElementValue::Byte(_) => TAG_BYTE,
            ElementValue::Char(_) => TAG_CHAR,
            ElementValue::Double(_) => TAG_DOUBLE,
            ElementValue::Float(_) => TAG_FLOAT,
            ElementValue::Int(_) => TAG_INT,
            ElementValue::Long(_) => TAG_LONG,
            ElementValue::Short(_) => TAG_SHORT,
            ElementValue::Boolean(_) => TAG_BOOLEAN,
            ElementValue::String(_) => TAG_STRING,
            ElementValue::Enum { .. } => TAG_ENUM,
            ElementValue::Class(_) => TAG_CLASS,
            ElementValue::Annotation(_) => TAG_ANNOTATION,
            ElementValue::Array(_) => TAG_ARRAY,
        }
    }

    /// Decode the element value starting at its tag byte `off`.
    ///
    /// Returns the value and the offset of the first byte after it.
    pub fn read(cr: &ClassReader, off: usize, buf: &mut Vec<u16>) -> anyhow::Result<(Self, usize)> {
        Self::read_nested(cr, off, buf, 0)
    }

    pub(crate) fn read_nested(
        cr: &ClassReader,
        off: usize,
        buf: &mut Vec<u16>,
        depth: usize,
    ) -> anyhow::Result<(Self, usize)> {
        if depth > MAX_NESTING_DEPTH {
            anyhow::bail!(
                "element value at offset {} is nested more than {} levels deep",
                off,
                MAX_NESTING_DEPTH
            );
        }
        let tag = cr.read_u8(off)?;
        let off = off + 1;
        let value = match tag {
            TAG_BYTE => ElementValue::Byte(cr.read_int_item(cr.read_u16(off)?)? as i8),
            TAG_CHAR => ElementValue::Char(cr.read_int_item(cr.read_u16(off)?)? as u16),
            TAG_SHORT => ElementValue::Short(cr.read_int_item(cr.read_u16(off)?)? as i16),
            TAG_INT => ElementValue::Int(cr.read_int_item(cr.read_u16(off)?)?),
            TAG_BOOLEAN => ElementValue::Boolean(cr.read_int_item(cr.read_u16(off)?)? != 0),
            TAG_LONG => ElementValue::Long(cr.read_long_item(cr.read_u16(off)?)?),
            TAG_FLOAT => ElementValue::Float(cr.read_float_item(cr.read_u16(off)?)?),
            TAG_DOUBLE => ElementValue::Double(cr.read_double_item(cr.read_u16(off)?)?),
            TAG_STRING => ElementValue::String(cr.read_utf8(off, buf)?),
            TAG_CLASS => ElementValue::Class(cr.read_utf8(off, buf)?),
            TAG_ENUM => {
                let type_name = cr.read_utf8(off, buf)?;
                let const_name = cr.read_utf8(off + 2, buf)?;
                return Ok((
                    ElementValue::Enum {
                        type_name,
                        const_name,
                    },
                    off + 4,
                ));
            }
            TAG_ANNOTATION => {
                let (annotation, next) = Annotation::read_nested(cr, off, buf, depth + 1)?;
                return Ok((ElementValue::Annotation(annotation), next));
            }
            TAG_ARRAY => {
                let count = cr.read_u16(off)? as usize;
                let mut next = off + 2;
                let mut values = Vec::with_capacity(count);
                for _ in 0..count {
                    let (value, after) = ElementValue::read_nested(cr, next, buf, depth + 1)?;
                    values.push(value);
                    next = after;
                }
                return Ok((ElementValue::Array(values), next));
            }
            other => anyhow::bail!(
                "unknown element value tag {:#04x} ({:?}) at offset {}",
                other,
                other as char,
                off - 1
            ),
        };
        Ok((value, off + 2))
    }

    /// Encode the tag and value, interning constants in write order.
    ///
    /// Array sizes and nesting depth are checked before anything is written,
    /// so a rejected value leaves `out` and `symbols` untouched.
    pub fn write(&self, out: &mut ByteVector, symbols: &mut SymbolTable) -> anyhow::Result<()> {
        self.check(0)?;
        self.encode(out, symbols)
    }

    /// Verify that every count fits its field and nesting stays within
    /// [`MAX_NESTING_DEPTH`].
    pub(crate) fn check(&self, depth: usize) -> anyhow::Result<()> {
        if depth > MAX_NESTING_DEPTH {
            anyhow::bail!(
                "element value is nested more than {} levels deep",
                MAX_NESTING_DEPTH
            );
        }
        match self {
            ElementValue::Annotation(annotation) => annotation.check(depth + 1),
            ElementValue::Array(values) => {
                if values.len() > MAX_U16_COUNT {
                    anyhow::bail!(
                        "array element value has {} entries (max {})",
                        values.len(),
                        MAX_U16_COUNT
                    );
                }
                values.iter().try_for_each(|value| value.check(depth + 1))
            }
            _ => Ok(()),
        }
    }

    /// Encode a value that already passed [`check`](Self::check).
    pub(crate) fn encode(&self, out: &mut ByteVector, symbols: &mut SymbolTable) -> anyhow::Result<()> {
        out.put_u8(self.tag());
        match self {
            ElementValue::Byte(v) => {
                out.put_u16(symbols.new_integer(*v as i32)?);
            }
            ElementValue::Char(v) => {
                out.put_u16(symbols.new_integer(*v as i32)?);
            }
            ElementValue::Short(v) => {
                out.put_u16(symbols.new_integer(*v as i32)?);
            }
            ElementValue::Int(v) => {
                out.put_u16(symbols.new_integer(*v)?);
            }
            ElementValue::Boolean(v) => {
                out.put_u16(symbols.new_integer(*v as i32)?);
            }
            ElementValue::Long(v) => {
                out.put_u16(symbols.new_long(*v)?);
            }
            ElementValue::Float(v) => {
                out.put_u16(symbols.new_float(*v)?);
            }
            ElementValue::Double(v) => {
                out.put_u16(symbols.new_double(*v)?);
            }
            ElementValue::String(s) | ElementValue::Class(s) => {
                out.put_u16(symbols.new_utf8(s)?);
            }
            ElementValue::Enum {
                type_name,
                const_name,
            } => {
                out.put_u16(symbols.new_utf8(type_name)?);
                out.put_u16(symbols.new_utf8(const_name)?);
            }
            ElementValue::Annotation(annotation) => annotation.encode(out, symbols)?,
            ElementValue::Array(values) => {
                out.put_u16(values.len() as u16);
                for value in values {
                    value.encode(out, symbols)?;
                }
            }
        }
        Ok(())
    }
}

/// Renders the value the way it would appear in Java source.
///
/// Rendering recurses per nesting level without a limit of its own; decoded
/// values are already bounded by [`MAX_NESTING_DEPTH`].
impl fmt::Display for ElementValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementValue::Byte(v) => write!(f, "{}", v),
            ElementValue::Short(v) => write!(f, "{}", v),
            ElementValue::Int(v) => write!(f, "{}", v),
            ElementValue::Long(v) => write!(f, "{}L", v),
            ElementValue::Boolean(v) => write!(f, "{}", v),
            ElementValue::Float(v) => {
                if v.is_nan() {
                    f.write_str("Float.NaN")
                } else if v.is_infinite() {
                    f.write_str(if *v > 0.0 {
                        "Float.POSITIVE_INFINITY"
                    } else {
                        "Float.NEGATIVE_INFINITY"
                    })
                } else {
                    write!(f, "{:?}f", v)
                }
            }
            ElementValue::Double(v) => {
                if v.is_nan() {
                    f.write_str("Double.NaN")
                } else if v.is_infinite() {
                    f.write_str(if *v > 0.0 {
                        "Double.POSITIVE_INFINITY"
                    } else {
                        "Double.NEGATIVE_INFINITY"
                    })
                } else {
                    write!(f, "{:?}", v)
                }
            }
            ElementValue::Char(unit) => {
                f.write_str("'")?;
                match char::from_u32(*unit as u32) {
                    Some(c) => write_escaped(f, c, '\'')?,
                    None => write!(f, "\\u{:04x}", unit)?,
                }
                f.write_str("'")
            }
            ElementValue::String(s) => {
                f.write_str("\"")?;
                for c in s.chars() {
                    write_escaped(f, c, '"')?;
                }
                f.write_str("\"")
            }
            ElementValue::Enum {
                type_name,
                const_name,
            } => write!(f, "{}.{}", type_name, const_name),
            ElementValue::Class(descriptor) => write!(f, "{}.class", descriptor),
            ElementValue::Annotation(annotation) => write!(f, "{}", annotation),
            ElementValue::Array(values) => {
                f.write_str("{")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                f.write_str("}")
            }
        }
    }
}

fn write_escaped(f: &mut fmt::Formatter<'_>, c: char, quote: char) -> fmt::Result {
    match c {
        '\\' => f.write_str("\\\\"),
        '\n' => f.write_str("\\n"),
        '\r' => f.write_str("\\r"),
        '\t' => f.write_str("\\t"),
        c if c == quote => write!(f, "\\{}", c),
        c if c.is_control() => write!(f, "\\u{:04x}", c as u32),
        c => write!(f, "{}", c),
    }
}
