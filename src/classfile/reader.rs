use crate::{
    bytecode::decode_calls,
    classfile::{
        ClassAccessFlags, ClassDescriptor, ConstantPool, MethodAccessFlags, MethodDescriptor,
        Supertype,
    },
    file::parser::Parser,
    Result,
};

/// `0xCAFEBABE`
pub const CLASS_MAGIC: u32 = 0xCAFE_BABE;

const CODE_ATTRIBUTE: &str = "Code";

/// Parse a complete class file into a [`ClassDescriptor`].
///
/// Fields, class attributes and every method attribute except `Code` are skipped by length.
/// Inside `Code` only the instruction array is decoded; the exception table and nested
/// attributes (`LineNumberTable`, `LocalVariableTable`, `StackMapTable`) are never looked at.
pub(crate) fn read_class(data: &[u8]) -> Result<ClassDescriptor> {
    let mut parser = Parser::new(data);

    let magic = parser.read_be::<u32>()?;
    if magic != CLASS_MAGIC {
        return Err(malformed_error!("Invalid class magic 0x{:08x}", magic));
    }
    let minor_version = parser.read_be::<u16>()?;
    let major_version = parser.read_be::<u16>()?;

    let pool = ConstantPool::parse(&mut parser)?;

    let access = ClassAccessFlags::from_bits_truncate(parser.read_be::<u16>()?);
    let name = pool.class_name(parser.read_be::<u16>()?)?;
    let super_index = parser.read_be::<u16>()?;
    let supertype = if super_index == 0 {
        Supertype::Root
    } else {
        Supertype::from_name(pool.class_name(super_index)?)
    };

    let interface_count = parser.read_be::<u16>()?;
    let mut interfaces = Vec::with_capacity(usize::from(interface_count));
    for _ in 0..interface_count {
        interfaces.push(pool.class_name(parser.read_be::<u16>()?)?);
    }

    let field_count = parser.read_be::<u16>()?;
    for _ in 0..field_count {
        // access_flags, name_index, descriptor_index
        parser.advance_by(6)?;
        skip_attributes(&mut parser)?;
    }

    let method_count = parser.read_be::<u16>()?;
    let mut methods = Vec::with_capacity(usize::from(method_count));
    for _ in 0..method_count {
        methods.push(read_method(&mut parser, &pool)?);
    }

    Ok(ClassDescriptor {
        name,
        supertype,
        interfaces,
        access,
        methods,
        version: (major_version, minor_version),
    })
}

fn read_method(parser: &mut Parser<'_>, pool: &ConstantPool) -> Result<MethodDescriptor> {
    let access = MethodAccessFlags::from_bits_truncate(parser.read_be::<u16>()?);
    let name = pool.utf8(parser.read_be::<u16>()?)?.to_string();
    let descriptor = pool.utf8(parser.read_be::<u16>()?)?.to_string();

    let mut calls = Vec::new();
    let attribute_count = parser.read_be::<u16>()?;
    for _ in 0..attribute_count {
        let attribute_name = pool.utf8(parser.read_be::<u16>()?)?;
        let length = attribute_length(parser)?;
        let body = parser.read_bytes(length)?;

        if attribute_name == CODE_ATTRIBUTE {
            calls = read_code(body, pool)?;
        }
    }

    Ok(MethodDescriptor {
        name,
        descriptor,
        access,
        calls,
    })
}

fn read_code(
    body: &[u8],
    pool: &ConstantPool,
) -> Result<Vec<crate::bytecode::CallInstruction>> {
    let mut parser = Parser::new(body);
    // max_stack, max_locals
    parser.advance_by(4)?;
    let code_length = attribute_length(&mut parser)?;
    let code = parser.read_bytes(code_length)?;

    decode_calls(code, pool)
}

fn skip_attributes(parser: &mut Parser<'_>) -> Result<()> {
    let count = parser.read_be::<u16>()?;
    for _ in 0..count {
        parser.advance_by(2)?;
        let length = attribute_length(parser)?;
        parser.advance_by(length)?;
    }
    Ok(())
}

fn attribute_length(parser: &mut Parser<'_>) -> Result<usize> {
    let length = parser.read_be::<u32>()?;
    usize::try_from(length).map_err(|_| crate::Error::OutOfBounds)
}
