//! Class-file constant pool.
//!
//! Only the entries needed to resolve class names and method references are materialized.
//! Everything else is skipped by its encoded size and stored as [`Constant::Other`], so pool
//! indices stay aligned with the class file.

use crate::{file::parser::Parser, Result};

const TAG_UTF8: u8 = 1;
const TAG_INTEGER: u8 = 3;
const TAG_FLOAT: u8 = 4;
const TAG_LONG: u8 = 5;
const TAG_DOUBLE: u8 = 6;
const TAG_CLASS: u8 = 7;
const TAG_STRING: u8 = 8;
const TAG_FIELDREF: u8 = 9;
const TAG_METHODREF: u8 = 10;
const TAG_INTERFACE_METHODREF: u8 = 11;
const TAG_NAME_AND_TYPE: u8 = 12;
const TAG_METHOD_HANDLE: u8 = 15;
const TAG_METHOD_TYPE: u8 = 16;
const TAG_DYNAMIC: u8 = 17;
const TAG_INVOKE_DYNAMIC: u8 = 18;
const TAG_MODULE: u8 = 19;
const TAG_PACKAGE: u8 = 20;

/// A decoded constant pool entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constant {
    /// `CONSTANT_Utf8`, decoded from modified UTF-8
    Utf8(String),
    /// `CONSTANT_Class`
    Class {
        /// Index of the internal name
        name_index: u16,
    },
    /// `CONSTANT_Methodref` or `CONSTANT_InterfaceMethodref`
    MethodRef {
        /// Index of the owning `CONSTANT_Class`
        class_index: u16,
        /// Index of the `CONSTANT_NameAndType`
        name_and_type_index: u16,
        /// Set for `CONSTANT_InterfaceMethodref`
        interface: bool,
    },
    /// `CONSTANT_NameAndType`
    NameAndType {
        /// Index of the member name
        name_index: u16,
        /// Index of the member descriptor
        descriptor_index: u16,
    },
    /// Any other entry kind
    Other,
    /// Slot 0 and the second slot of `long`/`double` entries
    Unusable,
}

/// A method reference resolved through the pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodRef {
    /// Dotted owner class name
    pub owner: String,
    /// Method name
    pub name: String,
    /// Method descriptor, e.g. `(Ljava/io/File;)Z`
    pub descriptor: String,
    /// Whether the reference is a `CONSTANT_InterfaceMethodref`
    pub interface: bool,
}

/// The constant pool of one class file, indexed from 1.
#[derive(Debug, Default)]
pub struct ConstantPool {
    entries: Vec<Constant>,
}

impl ConstantPool {
    /// Parse `constant_pool_count` and the following entries.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] on unknown tags and [`crate::Error::OutOfBounds`] on
    /// truncated input.
    pub fn parse(parser: &mut Parser<'_>) -> Result<Self> {
        let count = usize::from(parser.read_be::<u16>()?);
        let mut entries = Vec::with_capacity(count);
        entries.push(Constant::Unusable);

        while entries.len() < count {
            let tag = parser.read_be::<u8>()?;
            let entry = match tag {
                TAG_UTF8 => {
                    let length = usize::from(parser.read_be::<u16>()?);
                    Constant::Utf8(decode_modified_utf8(parser.read_bytes(length)?))
                }
                TAG_INTEGER | TAG_FLOAT => {
                    parser.advance_by(4)?;
                    Constant::Other
                }
                TAG_LONG | TAG_DOUBLE => {
                    parser.advance_by(8)?;
                    entries.push(Constant::Other);
                    Constant::Unusable
                }
                TAG_CLASS => Constant::Class {
                    name_index: parser.read_be()?,
                },
                TAG_STRING | TAG_METHOD_TYPE | TAG_MODULE | TAG_PACKAGE => {
                    parser.advance_by(2)?;
                    Constant::Other
                }
                TAG_METHODREF | TAG_INTERFACE_METHODREF => Constant::MethodRef {
                    class_index: parser.read_be()?,
                    name_and_type_index: parser.read_be()?,
                    interface: tag == TAG_INTERFACE_METHODREF,
                },
                TAG_NAME_AND_TYPE => Constant::NameAndType {
                    name_index: parser.read_be()?,
                    descriptor_index: parser.read_be()?,
                },
                TAG_FIELDREF | TAG_DYNAMIC | TAG_INVOKE_DYNAMIC => {
                    parser.advance_by(4)?;
                    Constant::Other
                }
                TAG_METHOD_HANDLE => {
                    parser.advance_by(3)?;
                    Constant::Other
                }
                other => {
                    return Err(malformed_error!(
                        "Unknown constant pool tag {} at index {}",
                        other,
                        entries.len()
                    ))
                }
            };
            entries.push(entry);
        }

        // A trailing long/double may push the pool one slot past its declared count.
        entries.truncate(count.max(1));
        Ok(ConstantPool { entries })
    }

    /// Number of slots, including the unusable slot 0.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the pool holds no usable entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }

    /// Entry at `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the index is outside the pool.
    pub fn get(&self, index: u16) -> Result<&Constant> {
        self.entries
            .get(usize::from(index))
            .ok_or_else(|| malformed_error!("Constant pool index {} out of range", index))
    }

    /// The string of a `CONSTANT_Utf8` entry.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the entry is missing or of another kind.
    pub fn utf8(&self, index: u16) -> Result<&str> {
        match self.get(index)? {
            Constant::Utf8(value) => Ok(value.as_str()),
            other => Err(malformed_error!(
                "Expected Utf8 at index {}, found {:?}",
                index,
                other
            )),
        }
    }

    /// The dotted class name referenced by a `CONSTANT_Class` entry.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the entry is missing or of another kind.
    pub fn class_name(&self, index: u16) -> Result<String> {
        match self.get(index)? {
            Constant::Class { name_index } => Ok(self.utf8(*name_index)?.replace('/', ".")),
            other => Err(malformed_error!(
                "Expected Class at index {}, found {:?}",
                index,
                other
            )),
        }
    }

    /// Resolve a `CONSTANT_Methodref`/`CONSTANT_InterfaceMethodref` entry.
    ///
    /// Array receivers (`[Ljava/lang/Object;.clone()`) are reported with their descriptor as
    /// owner.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if any referenced entry is missing or of another kind.
    pub fn method_ref(&self, index: u16) -> Result<MethodRef> {
        let Constant::MethodRef {
            class_index,
            name_and_type_index,
            interface,
        } = self.get(index)?
        else {
            return Err(malformed_error!("Expected Methodref at index {}", index));
        };

        let Constant::NameAndType {
            name_index,
            descriptor_index,
        } = self.get(*name_and_type_index)?
        else {
            return Err(malformed_error!(
                "Expected NameAndType at index {}",
                name_and_type_index
            ));
        };

        Ok(MethodRef {
            owner: self.class_name(*class_index)?,
            name: self.utf8(*name_index)?.to_string(),
            descriptor: self.utf8(*descriptor_index)?.to_string(),
            interface: *interface,
        })
    }
}

/// Decode the modified UTF-8 used by class files.
///
/// Plain UTF-8 takes the fast path. Otherwise the encoded NUL (`C0 80`) and CESU-8 surrogate
/// pairs are decoded by hand, and anything undecodable becomes U+FFFD.
#[must_use]
pub fn decode_modified_utf8(bytes: &[u8]) -> String {
    if let Ok(plain) = std::str::from_utf8(bytes) {
        return plain.to_string();
    }

    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b0 = bytes[i];
        if b0 & 0x80 == 0 {
            units.push(u16::from(b0));
            i += 1;
        } else if b0 & 0xE0 == 0xC0 && i + 1 < bytes.len() {
            let b1 = bytes[i + 1];
            units.push((u16::from(b0 & 0x1F) << 6) | u16::from(b1 & 0x3F));
            i += 2;
        } else if b0 & 0xF0 == 0xE0 && i + 2 < bytes.len() {
            let b1 = bytes[i + 1];
            let b2 = bytes[i + 2];
            units.push(
                (u16::from(b0 & 0x0F) << 12) | (u16::from(b1 & 0x3F) << 6) | u16::from(b2 & 0x3F),
            );
            i += 3;
        } else {
            units.push(0xFFFD);
            i += 1;
        }
    }

    String::from_utf16_lossy(&units)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_bytes() -> Vec<u8> {
        let mut data = vec![0x00, 0x0A];
        // #1 Utf8 "java/io/File"
        data.push(TAG_UTF8);
        data.extend_from_slice(&12u16.to_be_bytes());
        data.extend_from_slice(b"java/io/File");
        // #2 Class #1
        data.extend_from_slice(&[TAG_CLASS, 0x00, 0x01]);
        // #3 Long (takes #3 and #4)
        data.push(TAG_LONG);
        data.extend_from_slice(&[0; 8]);
        // #5 Utf8 "renameTo"
        data.push(TAG_UTF8);
        data.extend_from_slice(&8u16.to_be_bytes());
        data.extend_from_slice(b"renameTo");
        // #6 Utf8 "(Ljava/io/File;)Z"
        data.push(TAG_UTF8);
        data.extend_from_slice(&17u16.to_be_bytes());
        data.extend_from_slice(b"(Ljava/io/File;)Z");
        // #7 NameAndType #5 #6
        data.extend_from_slice(&[TAG_NAME_AND_TYPE, 0x00, 0x05, 0x00, 0x06]);
        // #8 Methodref #2 #7
        data.extend_from_slice(&[TAG_METHODREF, 0x00, 0x02, 0x00, 0x07]);
        // #9 MethodHandle
        data.extend_from_slice(&[TAG_METHOD_HANDLE, 0x06, 0x00, 0x08]);
        data
    }

    #[test]
    fn parse_pool() {
        let data = pool_bytes();
        let mut parser = Parser::new(&data);
        let pool = ConstantPool::parse(&mut parser).unwrap();

        assert_eq!(pool.len(), 10);
        assert!(!parser.has_more_data());
        assert_eq!(pool.class_name(2).unwrap(), "java.io.File");
        assert_eq!(pool.get(4).unwrap(), &Constant::Unusable);
        assert_eq!(pool.get(9).unwrap(), &Constant::Other);

        let method = pool.method_ref(8).unwrap();
        assert_eq!(method.owner, "java.io.File");
        assert_eq!(method.name, "renameTo");
        assert_eq!(method.descriptor, "(Ljava/io/File;)Z");
        assert!(!method.interface);
    }

    #[test]
    fn pool_errors() {
        let data = pool_bytes();
        let mut parser = Parser::new(&data);
        let pool = ConstantPool::parse(&mut parser).unwrap();

        assert!(pool.utf8(2).is_err());
        assert!(pool.class_name(1).is_err());
        assert!(pool.method_ref(7).is_err());
        assert!(pool.get(42).is_err());

        let bad = [0x00, 0x02, 0x63];
        assert!(ConstantPool::parse(&mut Parser::new(&bad)).is_err());

        let truncated = [0x00, 0x02, TAG_UTF8, 0x00, 0x05, b'a'];
        assert!(ConstantPool::parse(&mut Parser::new(&truncated)).is_err());
    }

    #[test]
    fn modified_utf8() {
        assert_eq!(decode_modified_utf8(b"lambda$run$0"), "lambda$run$0");
        assert_eq!(decode_modified_utf8(&[b'a', 0xC0, 0x80, b'b']), "a\0b");
        // U+1F600 as a CESU-8 surrogate pair
        let smiley = [0xED, 0xA0, 0xBD, 0xED, 0xB8, 0x80];
        assert_eq!(decode_modified_utf8(&smiley), "\u{1F600}");
    }
}
