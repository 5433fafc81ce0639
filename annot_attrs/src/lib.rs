mod annotation;
mod attributes;
mod element;

pub use annotation::{
    annotations_to_string, parameter_annotations_to_string, read_annotations,
    read_parameter_annotations, write_annotations, write_parameter_annotations, Annotation,
    AnnotationList, ElementValuePair, ParameterAnnotations,
};
pub use attributes::AnnotationAttribute;
pub use element::{
    ElementValue, TAG_ANNOTATION, TAG_ARRAY, TAG_BOOLEAN, TAG_BYTE, TAG_CHAR, TAG_CLASS,
    TAG_DOUBLE, TAG_ENUM, TAG_FLOAT, TAG_INT, TAG_LONG, TAG_SHORT, TAG_STRING, MAX_NESTING_DEPTH,
};

use annot_core::{ClassReader, RawAttribute};

/// Decode every annotation attribute in `attrs`, skipping unrelated ones.
///
/// Called by the CLI for each class, field, and method attribute table, so
/// callers get the annotation view without matching on attribute names.
pub fn annotation_attributes(
    cr: &ClassReader,
    attrs: &[RawAttribute],
) -> anyhow::Result<Vec<AnnotationAttribute>> {
    let mut buf = Vec::new();
    let mut out = Vec::new();
    for raw in attrs {
        if let Some(attr) = AnnotationAttribute::read(cr, raw, &mut buf)? {
            out.push(attr);
        }
    }
    Ok(out)
}
