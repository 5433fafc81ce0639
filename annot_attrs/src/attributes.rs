use std::fmt;

use annot_core::format::{
    ANNOTATION_DEFAULT, RUNTIME_INVISIBLE_ANNOTATIONS, RUNTIME_INVISIBLE_PARAMETER_ANNOTATIONS,
    RUNTIME_VISIBLE_ANNOTATIONS, RUNTIME_VISIBLE_PARAMETER_ANNOTATIONS,
};
use annot_core::{Attribute, ByteVector, ClassReader, RawAttribute, SymbolTable};
use serde::Serialize;
use tracing::trace;

use crate::annotation::{
    annotations_to_string, parameter_annotations_to_string, read_annotations,
    read_parameter_annotations, write_annotations, write_parameter_annotations, AnnotationList,
    ParameterAnnotations,
};
use crate::element::ElementValue;

/// The class-file attributes that carry annotation data.
///
/// - `Runtime{Visible,Invisible}Annotations`: class, field, or method annotations.
/// - `Runtime{Visible,Invisible}ParameterAnnotations`: per-parameter lists on a method.
/// - `AnnotationDefault`: default value of an annotation interface element.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "attribute", content = "body")]
pub enum AnnotationAttribute {
    RuntimeVisibleAnnotations(AnnotationList),
    RuntimeInvisibleAnnotations(AnnotationList),
    RuntimeVisibleParameterAnnotations(ParameterAnnotations),
    RuntimeInvisibleParameterAnnotations(ParameterAnnotations),
    AnnotationDefault(ElementValue),
}

impl AnnotationAttribute {
    /// Whether `name` is one of the attributes handled here.
    pub fn handles(name: &str) -> bool {
        matches!(
            name,
            RUNTIME_VISIBLE_ANNOTATIONS
                | RUNTIME_INVISIBLE_ANNOTATIONS
                | RUNTIME_VISIBLE_PARAMETER_ANNOTATIONS
                | RUNTIME_INVISIBLE_PARAMETER_ANNOTATIONS
                | ANNOTATION_DEFAULT
        )
    }

    /// Decode `raw` if it is an annotation attribute; other attributes yield `None`.
    ///
    /// The decoded body must end exactly at the attribute's declared length.
    pub fn read(
        cr: &ClassReader,
        raw: &RawAttribute,
        buf: &mut Vec<u16>,
    ) -> anyhow::Result<Option<Self>> {
        let off = raw.offset;
        let (attr, end) = match raw.name.as_str() {
            RUNTIME_VISIBLE_ANNOTATIONS => {
                let (list, end) = read_annotations(cr, off, buf)?;
                (AnnotationAttribute::RuntimeVisibleAnnotations(list), end)
            }
            RUNTIME_INVISIBLE_ANNOTATIONS => {
                let (list, end) = read_annotations(cr, off, buf)?;
                (AnnotationAttribute::RuntimeInvisibleAnnotations(list), end)
            }
            RUNTIME_VISIBLE_PARAMETER_ANNOTATIONS => {
                let (params, end) = read_parameter_annotations(cr, off, buf)?;
                (AnnotationAttribute::RuntimeVisibleParameterAnnotations(params), end)
            }
            RUNTIME_INVISIBLE_PARAMETER_ANNOTATIONS => {
                let (params, end) = read_parameter_annotations(cr, off, buf)?;
                (AnnotationAttribute::RuntimeInvisibleParameterAnnotations(params), end)
            }
            ANNOTATION_DEFAULT => {
                let (value, end) = ElementValue::read(cr, off, buf)?;
                (AnnotationAttribute::AnnotationDefault(value), end)
            }
            _ => return Ok(None),
        };
        if end != raw.end() {
            anyhow::bail!(
                "{} attribute at offset {} declares {} bytes but its body decodes to {}",
                raw.name,
                off,
                raw.length,
                end - off
            );
        }
        trace!(attribute = %raw.name, offset = off, length = raw.length, "decoded annotation attribute");
        Ok(Some(attr))
    }

    /// Whether the attribute is retained for reflection at run time.
    pub fn is_visible(&self) -> bool {
        matches!(
            self,
            AnnotationAttribute::RuntimeVisibleAnnotations(_)
                | AnnotationAttribute::RuntimeVisibleParameterAnnotations(_)
                | AnnotationAttribute::AnnotationDefault(_)
        )
    }
}

impl Attribute for AnnotationAttribute {
    fn name(&self) -> &str {
        match self {
            AnnotationAttribute::RuntimeVisibleAnnotations(_) => RUNTIME_VISIBLE_ANNOTATIONS,
            AnnotationAttribute::RuntimeInvisibleAnnotations(_) => RUNTIME_INVISIBLE_ANNOTATIONS,
            AnnotationAttribute::RuntimeVisibleParameterAnnotations(_) => {
                RUNTIME_VISIBLE_PARAMETER_ANNOTATIONS
            }
            AnnotationAttribute::RuntimeInvisibleParameterAnnotations(_) => {
                RUNTIME_INVISIBLE_PARAMETER_ANNOTATIONS
            }
            AnnotationAttribute::AnnotationDefault(_) => ANNOTATION_DEFAULT,
        }
    }

    fn write_body(&self, out: &mut ByteVector, symbols: &mut SymbolTable) -> anyhow::Result<()> {
        match self {
            AnnotationAttribute::RuntimeVisibleAnnotations(list)
            | AnnotationAttribute::RuntimeInvisibleAnnotations(list) => {
                write_annotations(list, out, symbols)
            }
            AnnotationAttribute::RuntimeVisibleParameterAnnotations(params)
            | AnnotationAttribute::RuntimeInvisibleParameterAnnotations(params) => {
                write_parameter_annotations(params, out, symbols)
            }
            AnnotationAttribute::AnnotationDefault(value) => value.write(out, symbols),
        }
    }
}

impl fmt::Display for AnnotationAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnotationAttribute::RuntimeVisibleAnnotations(list)
            | AnnotationAttribute::RuntimeInvisibleAnnotations(list) => {
                f.write_str(&annotations_to_string(list))
            }
            AnnotationAttribute::RuntimeVisibleParameterAnnotations(params)
            | AnnotationAttribute::RuntimeInvisibleParameterAnnotations(params) => {
                f.write_str(&parameter_annotations_to_string(params))
            }
            AnnotationAttribute::AnnotationDefault(value) => write!(f, "default {}", value),
        }
    }
}
