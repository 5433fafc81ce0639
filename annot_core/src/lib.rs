pub mod attribute;
pub mod bytes;
pub mod class_file;
pub mod format;
pub mod reader;
pub mod symbols;
pub mod writer;

pub use attribute::{write_attribute, write_attributes, Attribute, RawAttribute};
pub use bytes::ByteVector;
pub use class_file::{ClassFile, Member};
pub use format::{HEADER_SIZE, MAGIC};
pub use reader::ClassReader;
pub use symbols::{Constant, SymbolTable};
pub use writer::ClassWriter;
