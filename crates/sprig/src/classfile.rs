//
// classfile.rs
//
// Minimal JVM class file reader for the type index
//
// Only the header (constant pool, access flags, this/super/interfaces) is
// decoded. Fields, methods and attributes are walked without being retained
// so that truncated or corrupt artifacts are rejected instead of being
// indexed with a half-read header.
//

use thiserror::Error;

const MAGIC: u32 = 0xCAFE_BABE;

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_INTERFACE: u16 = 0x0200;
pub const ACC_ABSTRACT: u16 = 0x0400;
pub const ACC_ANNOTATION: u16 = 0x2000;
pub const ACC_ENUM: u16 = 0x4000;
pub const ACC_MODULE: u16 = 0x8000;

#[derive(Debug, Error)]
pub enum ClassParseError {
    #[error("unexpected end of class file")]
    UnexpectedEof,
    #[error("invalid class file magic header")]
    InvalidMagic,
    #[error("unsupported constant pool tag {tag}")]
    UnsupportedConstant { tag: u8 },
    #[error("invalid constant pool index {index}")]
    InvalidConstantIndex { index: u16 },
    #[error("invalid UTF-8 string in constant pool: {0}")]
    Utf8Decode(#[from] std::string::FromUtf8Error),
}

/// Kind of a compiled type, derived from its access flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Class,
    Interface,
    Enum,
    Annotation,
    Record,
    Module,
}

impl TypeKind {
    fn from_header(access_flags: u16, super_name: Option<&str>) -> Self {
        if access_flags & ACC_MODULE != 0 {
            TypeKind::Module
        } else if access_flags & ACC_ANNOTATION != 0 {
            TypeKind::Annotation
        } else if access_flags & ACC_INTERFACE != 0 {
            TypeKind::Interface
        } else if access_flags & ACC_ENUM != 0 {
            TypeKind::Enum
        } else if super_name == Some("java.lang.Record") {
            TypeKind::Record
        } else {
            TypeKind::Class
        }
    }
}

/// Header data of one class file. Names use dots for packages and keep `$`
/// for nesting (`demo.Outer$Inner`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedClass {
    pub name: String,
    pub access_flags: u16,
    pub kind: TypeKind,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub major_version: u16,
}

pub fn parse_class(bytes: &[u8]) -> Result<ParsedClass, ClassParseError> {
    let mut reader = ClassReader::new(bytes);
    reader.expect_magic()?;
    let _minor_version = reader.read_u2()?;
    let major_version = reader.read_u2()?;
    let constant_pool = ConstantPool::parse(&mut reader)?;

    let access_flags = reader.read_u2()?;
    let this_class = reader.read_u2()?;
    let super_class = reader.read_u2()?;

    let interfaces_count = reader.read_u2()?;
    let mut interfaces = Vec::with_capacity(interfaces_count as usize);
    for _ in 0..interfaces_count {
        let index = reader.read_u2()?;
        interfaces.push(binary_to_dotted(&constant_pool.class_name(index)?));
    }

    let fields_count = reader.read_u2()?;
    for _ in 0..fields_count {
        skip_member(&mut reader)?;
    }

    let methods_count = reader.read_u2()?;
    for _ in 0..methods_count {
        skip_member(&mut reader)?;
    }

    let attributes_count = reader.read_u2()?;
    skip_attributes(&mut reader, attributes_count)?;

    let name = binary_to_dotted(&constant_pool.class_name(this_class)?);
    // java.lang.Object and module-info have no superclass (index 0)
    let super_name = if super_class == 0 {
        None
    } else {
        Some(binary_to_dotted(&constant_pool.class_name(super_class)?))
    };
    let kind = TypeKind::from_header(access_flags, super_name.as_deref());

    Ok(ParsedClass {
        name,
        access_flags,
        kind,
        super_name,
        interfaces,
        major_version,
    })
}

fn binary_to_dotted(internal: &str) -> String {
    internal.replace('/', ".")
}

fn skip_member(reader: &mut ClassReader<'_>) -> Result<(), ClassParseError> {
    let _access_flags = reader.read_u2()?;
    let _name_index = reader.read_u2()?;
    let _descriptor_index = reader.read_u2()?;
    let attributes_count = reader.read_u2()?;
    skip_attributes(reader, attributes_count)
}

fn skip_attributes(reader: &mut ClassReader<'_>, count: u16) -> Result<(), ClassParseError> {
    for _ in 0..count {
        let _name_index = reader.read_u2()?;
        let length = reader.read_u4()? as usize;
        reader.skip(length)?;
    }
    Ok(())
}

#[derive(Debug, Clone)]
enum Constant {
    Utf8(String),
    Class { name_index: u16 },
    Other,
    Unusable,
}

struct ConstantPool {
    entries: Vec<Constant>,
}

impl ConstantPool {
    fn parse(reader: &mut ClassReader<'_>) -> Result<Self, ClassParseError> {
        let count = reader.read_u2()? as usize;
        let mut entries = Vec::with_capacity(count);
        entries.push(Constant::Unusable); // index 0 unused

        let mut index = 1;
        while index < count {
            let tag = reader.read_u1()?;
            let entry = match tag {
                1 => {
                    let length = reader.read_u2()? as usize;
                    let bytes = reader.read_slice(length)?;
                    // Modified UTF-8 only differs for NUL and supplementary
                    // characters, neither of which appear in type names.
                    let string = String::from_utf8(bytes.to_vec())?;
                    Constant::Utf8(string)
                }
                3 | 4 => {
                    reader.skip(4)?;
                    Constant::Other
                }
                5 | 6 => {
                    // Long and Double take two slots
                    reader.skip(8)?;
                    entries.push(Constant::Other);
                    index += 1;
                    Constant::Unusable
                }
                7 => {
                    let name_index = reader.read_u2()?;
                    Constant::Class { name_index }
                }
                8 | 16 | 19 | 20 => {
                    reader.skip(2)?;
                    Constant::Other
                }
                9 | 10 | 11 | 12 | 17 | 18 => {
                    reader.skip(4)?;
                    Constant::Other
                }
                15 => {
                    reader.skip(3)?;
                    Constant::Other
                }
                other => return Err(ClassParseError::UnsupportedConstant { tag: other }),
            };

            entries.push(entry);
            index += 1;
        }

        Ok(Self { entries })
    }

    fn get(&self, index: u16) -> Result<&Constant, ClassParseError> {
        self.entries
            .get(index as usize)
            .ok_or(ClassParseError::InvalidConstantIndex { index })
    }

    fn utf8(&self, index: u16) -> Result<&str, ClassParseError> {
        match self.get(index)? {
            Constant::Utf8(value) => Ok(value.as_str()),
            _ => Err(ClassParseError::InvalidConstantIndex { index }),
        }
    }

    fn class_name(&self, index: u16) -> Result<String, ClassParseError> {
        match self.get(index)? {
            Constant::Class { name_index } => Ok(self.utf8(*name_index)?.to_string()),
            _ => Err(ClassParseError::InvalidConstantIndex { index }),
        }
    }
}

struct ClassReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ClassReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn expect_magic(&mut self) -> Result<(), ClassParseError> {
        if self.read_u4()? != MAGIC {
            return Err(ClassParseError::InvalidMagic);
        }
        Ok(())
    }

    fn read_u1(&mut self) -> Result<u8, ClassParseError> {
        let value = *self
            .data
            .get(self.pos)
            .ok_or(ClassParseError::UnexpectedEof)?;
        self.pos += 1;
        Ok(value)
    }

    fn read_u2(&mut self) -> Result<u16, ClassParseError> {
        let bytes = self.read_slice(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn read_u4(&mut self) -> Result<u32, ClassParseError> {
        let bytes = self.read_slice(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_slice(&mut self, len: usize) -> Result<&'a [u8], ClassParseError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or(ClassParseError::UnexpectedEof)?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn skip(&mut self, len: usize) -> Result<(), ClassParseError> {
        self.read_slice(len).map(|_| ())
    }
}
