/// Magic number opening every class file.
pub const MAGIC: u32 = 0xCAFE_BABE;

/// Fixed size of the class-file header preceding the constant pool.
///   magic:u32 + minor_version:u16 + major_version:u16 + constant_pool_count:u16
///   = 4 + 2 + 2 + 2 = 10
pub const HEADER_SIZE: usize = 10;

/// Major version written by [`ClassWriter`](crate::ClassWriter) unless overridden (Java 8).
pub const DEFAULT_MAJOR_VERSION: u16 = 52;

/// Largest index or count representable by a `u16` field.
pub const MAX_U16_COUNT: usize = u16::MAX as usize;

/// Largest count representable by a `u8` field (parameter annotation lists).
pub const MAX_U8_COUNT: usize = u8::MAX as usize;

// ── Constant pool tags ─────────────────────────────────────────────────────

pub const CONSTANT_UTF8: u8 = 1;
pub const CONSTANT_INTEGER: u8 = 3;
pub const CONSTANT_FLOAT: u8 = 4;
pub const CONSTANT_LONG: u8 = 5;
pub const CONSTANT_DOUBLE: u8 = 6;
pub const CONSTANT_CLASS: u8 = 7;
pub const CONSTANT_STRING: u8 = 8;
pub const CONSTANT_FIELDREF: u8 = 9;
pub const CONSTANT_METHODREF: u8 = 10;
pub const CONSTANT_INTERFACE_METHODREF: u8 = 11;
pub const CONSTANT_NAME_AND_TYPE: u8 = 12;
pub const CONSTANT_METHOD_HANDLE: u8 = 15;
pub const CONSTANT_METHOD_TYPE: u8 = 16;
pub const CONSTANT_DYNAMIC: u8 = 17;
pub const CONSTANT_INVOKE_DYNAMIC: u8 = 18;
pub const CONSTANT_MODULE: u8 = 19;
pub const CONSTANT_PACKAGE: u8 = 20;

/// Size in bytes of a constant pool entry's payload (excluding the tag byte),
/// or `None` for variable-length (UTF-8) and unknown tags.
pub fn constant_payload_size(tag: u8) -> Option<usize> {
    match tag {
        CONSTANT_INTEGER | CONSTANT_FLOAT => Some(4),
        CONSTANT_LONG | CONSTANT_DOUBLE => Some(8),
        CONSTANT_CLASS | CONSTANT_STRING | CONSTANT_METHOD_TYPE | CONSTANT_MODULE
        | CONSTANT_PACKAGE => Some(2),
        CONSTANT_FIELDREF
        | CONSTANT_METHODREF
        | CONSTANT_INTERFACE_METHODREF
        | CONSTANT_NAME_AND_TYPE
        | CONSTANT_DYNAMIC
        | CONSTANT_INVOKE_DYNAMIC => Some(4),
        CONSTANT_METHOD_HANDLE => Some(3),
        _ => None,
    }
}

/// Human-readable constant kind, used in error messages.
pub fn constant_kind_name(tag: u8) -> &'static str {
    match tag {
        CONSTANT_UTF8 => "Utf8",
        CONSTANT_INTEGER => "Integer",
        CONSTANT_FLOAT => "Float",
        CONSTANT_LONG => "Long",
        CONSTANT_DOUBLE => "Double",
        CONSTANT_CLASS => "Class",
        CONSTANT_STRING => "String",
        CONSTANT_FIELDREF => "Fieldref",
        CONSTANT_METHODREF => "Methodref",
        CONSTANT_INTERFACE_METHODREF => "InterfaceMethodref",
        CONSTANT_NAME_AND_TYPE => "NameAndType",
        CONSTANT_METHOD_HANDLE => "MethodHandle",
        CONSTANT_METHOD_TYPE => "MethodType",
        CONSTANT_DYNAMIC => "Dynamic",
        CONSTANT_INVOKE_DYNAMIC => "InvokeDynamic",
        CONSTANT_MODULE => "Module",
        CONSTANT_PACKAGE => "Package",
        _ => "Unknown",
    }
}

// ── Access flags ───────────────────────────────────────────────────────────

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_FINAL: u16 = 0x0010;
pub const ACC_SUPER: u16 = 0x0020;
pub const ACC_INTERFACE: u16 = 0x0200;
pub const ACC_ABSTRACT: u16 = 0x0400;
pub const ACC_ANNOTATION: u16 = 0x2000;

// ── Annotation attribute names ─────────────────────────────────────────────

pub const RUNTIME_VISIBLE_ANNOTATIONS: &str = "RuntimeVisibleAnnotations";
pub const RUNTIME_INVISIBLE_ANNOTATIONS: &str = "RuntimeInvisibleAnnotations";
pub const RUNTIME_VISIBLE_PARAMETER_ANNOTATIONS: &str = "RuntimeVisibleParameterAnnotations";
pub const RUNTIME_INVISIBLE_PARAMETER_ANNOTATIONS: &str = "RuntimeInvisibleParameterAnnotations";
pub const ANNOTATION_DEFAULT: &str = "AnnotationDefault";
