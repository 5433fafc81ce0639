use std::fmt;

use annot_core::format::{MAX_U16_COUNT, MAX_U8_COUNT};
use annot_core::{ByteVector, ClassReader, SymbolTable};
use serde::Serialize;
use tracing::trace;

use crate::element::ElementValue;

/// Ordered annotations on a class, field, or method.
pub type AnnotationList = Vec<Annotation>;

/// One [`AnnotationList`] per formal parameter, in declaration order.
pub type ParameterAnnotations = Vec<AnnotationList>;

/// A named value inside an annotation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementValuePair {
    pub name: String,
    pub value: ElementValue,
}

/// An annotated type and its element-value pairs.
///
/// Binary layout:
/// ```text
/// u16 type_index                      ← Utf8 field descriptor
/// u16 num_element_value_pairs
/// { u16 element_name_index; element_value value } × num_element_value_pairs
/// ```
/// Pair order is significant and is kept through decode, encode and text.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Annotation {
    /// Field descriptor of the annotation interface, e.g. `Ljava/lang/Deprecated;`.
    pub type_name: String,
    pub elements: Vec<ElementValuePair>,
}

impl Annotation {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            elements: Vec::new(),
        }
    }

    /// Append an element-value pair.
    pub fn add(&mut self, name: impl Into<String>, value: ElementValue) -> &mut Self {
        self.elements.push(ElementValuePair {
            name: name.into(),
            value,
        });
        self
    }

    /// Builder form of [`add`](Self::add).
    pub fn with(mut self, name: impl Into<String>, value: ElementValue) -> Self {
        self.add(name, value);
        self
    }

    /// Value of the first pair named `name`.
    pub fn get(&self, name: &str) -> Option<&ElementValue> {
        self.elements
            .iter()
            .find(|pair| pair.name == name)
            .map(|pair| &pair.value)
    }

    /// Decode one annotation starting at `off`.
    ///
    /// Returns the annotation and the offset of the first byte after it.
    /// Arrays and nested annotations deeper than
    /// [`MAX_NESTING_DEPTH`](crate::MAX_NESTING_DEPTH) are rejected.
    pub fn read(cr: &ClassReader, off: usize, buf: &mut Vec<u16>) -> anyhow::Result<(Self, usize)> {
        Self::read_nested(cr, off, buf, 0)
    }

    pub(crate) fn read_nested(
        cr: &ClassReader,
        off: usize,
        buf: &mut Vec<u16>,
        depth: usize,
    ) -> anyhow::Result<(Self, usize)> {
        let type_name = cr.read_utf8(off, buf)?;
        let pair_count = cr.read_u16(off + 2)? as usize;
        let mut off = off + 4;
        let mut elements = Vec::with_capacity(pair_count);
        for _ in 0..pair_count {
            let name = cr.read_utf8(off, buf)?;
            let (value, next) = ElementValue::read_nested(cr, off + 2, buf, depth)?;
            elements.push(ElementValuePair { name, value });
            off = next;
        }
        Ok((
            Self {
                type_name,
                elements,
            },
            off,
        ))
    }

    /// Encode this annotation, interning its strings in write order.
    ///
    /// Counts and nesting are checked first; a rejected annotation leaves
    /// `out` and `symbols` untouched.
    pub fn write(&self, out: &mut ByteVector, symbols: &mut SymbolTable) -> anyhow::Result<()> {
        self.check(0)?;
        self.encode(out, symbols)
    }

    pub(crate) fn check(&self, depth: usize) -> anyhow::Result<()> {
        check_u16_count(self.elements.len(), "element-value pairs")?;
        self.elements
            .iter()
            .try_for_each(|pair| pair.value.check(depth))
    }

    pub(crate) fn encode(&self, out: &mut ByteVector, symbols: &mut SymbolTable) -> anyhow::Result<()> {
        out.put_u16(symbols.new_utf8(&self.type_name)?);
        out.put_u16(self.elements.len() as u16);
        for pair in &self.elements {
            out.put_u16(symbols.new_utf8(&pair.name)?);
            pair.value.encode(out, symbols)?;
        }
        Ok(())
    }
}

/// JSR-175 source form: `@Type` for marker annotations, otherwise
/// `@Type ( name = value, ... )`.
///
/// Names are dropped from every pair when the annotation has exactly one
/// pair or when its first pair is named `value`; the test is made once for
/// the whole annotation, not per pair.
impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.type_name)?;
        if self.elements.is_empty() {
            return Ok(());
        }
        let shorthand = self.elements.len() == 1 || self.elements[0].name == "value";
        f.write_str(" ( ")?;
        for (i, pair) in self.elements.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            if !shorthand {
                write!(f, "{} = ", pair.name)?;
            }
            write!(f, "{}", pair.value)?;
        }
        f.write_str(" )")
    }
}

/// Decode an annotation list: `u16 count` then `count` annotations.
pub fn read_annotations(
    cr: &ClassReader,
    off: usize,
    buf: &mut Vec<u16>,
) -> anyhow::Result<(AnnotationList, usize)> {
    let count = cr.read_u16(off)? as usize;
    trace!(offset = off, count, "reading annotation list");
    let mut off = off + 2;
    let mut annotations = Vec::with_capacity(count);
    for _ in 0..count {
        let (annotation, next) = Annotation::read(cr, off, buf)?;
        annotations.push(annotation);
        off = next;
    }
    Ok((annotations, off))
}

/// Decode parameter annotations: `u8 count` then one annotation list per parameter.
pub fn read_parameter_annotations(
    cr: &ClassReader,
    off: usize,
    buf: &mut Vec<u16>,
) -> anyhow::Result<(ParameterAnnotations, usize)> {
    let count = cr.read_u8(off)? as usize;
    trace!(offset = off, count, "reading parameter annotations");
    let mut off = off + 1;
    let mut parameters = Vec::with_capacity(count);
    for _ in 0..count {
        let (annotations, next) = read_annotations(cr, off, buf)?;
        parameters.push(annotations);
        off = next;
    }
    Ok((parameters, off))
}

/// Encode an annotation list with its `u16` count.
///
/// Every record is checked before the first byte is written, so an oversized
/// count anywhere in the list leaves `out` and `symbols` untouched. A constant
/// pool overflow can still fail part way; discard both on any error.
pub fn write_annotations(
    annotations: &[Annotation],
    out: &mut ByteVector,
    symbols: &mut SymbolTable,
) -> anyhow::Result<()> {
    check_list(annotations)?;
    encode_list(annotations, out, symbols)
}

/// Encode parameter annotations with their `u8` count.
///
/// More than 255 parameters cannot be represented and is rejected. Checking
/// covers every list before writing, as in [`write_annotations`].
pub fn write_parameter_annotations(
    parameters: &[AnnotationList],
    out: &mut ByteVector,
    symbols: &mut SymbolTable,
) -> anyhow::Result<()> {
    if parameters.len() > MAX_U8_COUNT {
        anyhow::bail!(
            "too many annotated parameters: {} (max {})",
            parameters.len(),
            MAX_U8_COUNT
        );
    }
    for annotations in parameters {
        check_list(annotations)?;
    }
    out.put_u8(parameters.len() as u8);
    for annotations in parameters {
        encode_list(annotations, out, symbols)?;
    }
    Ok(())
}

fn check_list(annotations: &[Annotation]) -> anyhow::Result<()> {
    check_u16_count(annotations.len(), "annotations")?;
    annotations.iter().try_for_each(|annotation| annotation.check(0))
}

fn encode_list(
    annotations: &[Annotation],
    out: &mut ByteVector,
    symbols: &mut SymbolTable,
) -> anyhow::Result<()> {
    out.put_u16(annotations.len() as u16);
    for annotation in annotations {
        annotation.encode(out, symbols)?;
    }
    Ok(())
}

/// Every annotation on its own line, each preceded by `'\n'`.
pub fn annotations_to_string(annotations: &[Annotation]) -> String {
    let mut s = String::new();
    for annotation in annotations {
        s.push('\n');
        s.push_str(&annotation.to_string());
    }
    s
}

/// Each parameter's [`annotations_to_string`], separated by `", "`.
pub fn parameter_annotations_to_string(parameters: &[AnnotationList]) -> String {
    parameters
        .iter()
        .map(|annotations| annotations_to_string(annotations))
        .collect::<Vec<_>>()
        .join(", ")
}

fn check_u16_count(len: usize, what: &str) -> anyhow::Result<()> {
    if len > MAX_U16_COUNT {
        anyhow::bail!("too many {}: {} (max {})", what, len, MAX_U16_COUNT);
    }
    Ok(())
}
