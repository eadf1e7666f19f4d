use crate::{
    bytecode::{CallInstruction, InvokeKind},
    classfile::ConstantPool,
    file::io::read_be_at,
    Result,
};

const BIPUSH: u8 = 0x10;
const SIPUSH: u8 = 0x11;
const LDC: u8 = 0x12;
const LDC_W: u8 = 0x13;
const LDC2_W: u8 = 0x14;
const IINC: u8 = 0x84;
const GOTO: u8 = 0xa7;
const JSR: u8 = 0xa8;
const RET: u8 = 0xa9;
const TABLESWITCH: u8 = 0xaa;
const LOOKUPSWITCH: u8 = 0xab;
const INVOKEDYNAMIC: u8 = 0xba;
const NEWARRAY: u8 = 0xbc;
const WIDE: u8 = 0xc4;
const MULTIANEWARRAY: u8 = 0xc5;
const GOTO_W: u8 = 0xc8;
const JSR_W: u8 = 0xc9;

/// Length in bytes of the instruction starting at `offset`, operands included.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for undefined opcodes and broken switch tables, and
/// [`crate::Error::OutOfBounds`] when operands run past the end of `code`.
pub fn instruction_length(code: &[u8], offset: usize) -> Result<usize> {
    let Some(&opcode) = code.get(offset) else {
        return Err(crate::Error::OutOfBounds);
    };

    let length = match opcode {
        0x00..=0x0f => 1,
        BIPUSH => 2,
        SIPUSH => 3,
        LDC => 2,
        LDC_W | LDC2_W => 3,
        0x15..=0x19 => 2,
        0x1a..=0x35 => 1,
        0x36..=0x3a => 2,
        0x3b..=0x83 => 1,
        IINC => 3,
        0x85..=0x98 => 1,
        0x99..=0xa6 | GOTO | JSR => 3,
        RET => 2,
        TABLESWITCH => tableswitch_length(code, offset)?,
        LOOKUPSWITCH => lookupswitch_length(code, offset)?,
        0xac..=0xb1 => 1,
        0xb2..=0xb5 => 3,
        0xb6..=0xb8 => 3,
        0xb9 | INVOKEDYNAMIC => 5,
        0xbb => 3,
        NEWARRAY => 2,
        0xbd => 3,
        0xbe | 0xbf => 1,
        0xc0 | 0xc1 => 3,
        0xc2 | 0xc3 => 1,
        WIDE => wide_length(code, offset)?,
        MULTIANEWARRAY => 4,
        0xc6 | 0xc7 => 3,
        GOTO_W | JSR_W => 5,
        0xca | 0xfe | 0xff => 1,
        other => {
            return Err(malformed_error!(
                "Undefined opcode 0x{:02x} at offset {}",
                other,
                offset
            ))
        }
    };

    if offset + length > code.len() {
        return Err(crate::Error::OutOfBounds);
    }
    Ok(length)
}

/// Decode every static call site of a method body.
///
/// # Arguments
/// * `code` - The `code` array of a `Code` attribute
/// * `pool` - Constant pool of the declaring class, used to resolve method references
///
/// # Errors
/// Fails if the instruction stream can not be walked or a call references a pool entry that is
/// not a method reference.
pub fn decode_calls(code: &[u8], pool: &ConstantPool) -> Result<Vec<CallInstruction>> {
    let mut calls = Vec::new();
    let mut offset = 0_usize;

    while offset < code.len() {
        let length = instruction_length(code, offset)?;

        if let Some(kind) = InvokeKind::from_repr(code[offset]) {
            let mut operand = offset + 1;
            let index = read_be_at::<u16>(code, &mut operand)?;
            let method = pool.method_ref(index)?;

            calls.push(CallInstruction {
                kind,
                owner: method.owner,
                name: method.name,
                descriptor: method.descriptor,
                offset: u32::try_from(offset).map_err(|_| crate::Error::OutOfBounds)?,
            });
        }

        offset += length;
    }

    Ok(calls)
}

fn padding(offset: usize) -> usize {
    (4 - ((offset + 1) % 4)) % 4
}

fn tableswitch_length(code: &[u8], offset: usize) -> Result<usize> {
    let padding = padding(offset);
    let mut cursor = offset + 1 + padding + 4;
    let low = read_be_at::<i32>(code, &mut cursor)?;
    let high = read_be_at::<i32>(code, &mut cursor)?;

    let count = i64::from(high) - i64::from(low) + 1;
    if count < 0 {
        return Err(malformed_error!(
            "Invalid tableswitch range {}..{} at offset {}",
            low,
            high,
            offset
        ));
    }
    let count = usize::try_from(count).map_err(|_| crate::Error::OutOfBounds)?;
    Ok(1 + padding + 12 + count * 4)
}

fn lookupswitch_length(code: &[u8], offset: usize) -> Result<usize> {
    let padding = padding(offset);
    let mut cursor = offset + 1 + padding + 4;
    let npairs = read_be_at::<i32>(code, &mut cursor)?;

    let Ok(npairs) = usize::try_from(npairs) else {
        return Err(malformed_error!(
            "Invalid lookupswitch pair count {} at offset {}",
            npairs,
            offset
        ));
    };
    Ok(1 + padding + 8 + npairs * 8)
}

fn wide_length(code: &[u8], offset: usize) -> Result<usize> {
    match code.get(offset + 1) {
        Some(&IINC) => Ok(6),
        Some(_) => Ok(4),
        None => Err(crate::Error::OutOfBounds),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::ClassFileBuilder;

    #[test]
    fn simple_lengths() {
        assert_eq!(instruction_length(&[0x00], 0).unwrap(), 1);
        assert_eq!(instruction_length(&[BIPUSH, 0x05], 0).unwrap(), 2);
        assert_eq!(instruction_length(&[0xb6, 0x00, 0x01], 0).unwrap(), 3);
        assert_eq!(instruction_length(&[0xb9, 0x00, 0x01, 0x01, 0x00], 0).unwrap(), 5);
        assert_eq!(instruction_length(&[WIDE, 0x15, 0x00, 0x01], 0).unwrap(), 4);
        assert_eq!(
            instruction_length(&[WIDE, IINC, 0x00, 0x01, 0x00, 0x01], 0).unwrap(),
            6
        );
    }

    #[test]
    fn undefined_and_truncated() {
        assert!(instruction_length(&[0xcb], 0).is_err());
        assert!(instruction_length(&[0xb6, 0x00], 0).is_err());
        assert!(instruction_length(&[], 0).is_err());
    }

    #[test]
    fn switch_lengths() {
        // tableswitch at offset 1: 2 bytes padding, default, low=0, high=1, two offsets
        let mut code = vec![0x00, TABLESWITCH, 0x00, 0x00];
        code.extend_from_slice(&0i32.to_be_bytes());
        code.extend_from_slice(&0i32.to_be_bytes());
        code.extend_from_slice(&1i32.to_be_bytes());
        code.extend_from_slice(&[0; 8]);
        assert_eq!(instruction_length(&code, 1).unwrap(), 1 + 2 + 12 + 8);

        // lookupswitch at offset 0: 3 bytes padding, default, npairs=1, one pair
        let mut code = vec![LOOKUPSWITCH, 0x00, 0x00, 0x00];
        code.extend_from_slice(&0i32.to_be_bytes());
        code.extend_from_slice(&1i32.to_be_bytes());
        code.extend_from_slice(&[0; 8]);
        assert_eq!(instruction_length(&code, 0).unwrap(), 1 + 3 + 8 + 8);

        let mut code = vec![LOOKUPSWITCH, 0x00, 0x00, 0x00];
        code.extend_from_slice(&0i32.to_be_bytes());
        code.extend_from_slice(&(-1i32).to_be_bytes());
        assert!(instruction_length(&code, 0).is_err());
    }

    #[test]
    fn decode_calls_from_class() {
        let mut builder = ClassFileBuilder::class("org.example.ModuleA");
        let virt = builder.method_ref("java.io.File", "renameTo", "(Ljava/io/File;)Z", false);
        let special = builder.method_ref("org.example.ModuleBase", "test1", "()V", false);
        let iface = builder.method_ref("java.util.List", "size", "()I", true);

        let mut code = vec![0x2a];
        code.extend_from_slice(&[0xb7, (special >> 8) as u8, special as u8]);
        code.extend_from_slice(&[0x01, 0x01]);
        code.extend_from_slice(&[0xb6, (virt >> 8) as u8, virt as u8]);
        code.extend_from_slice(&[0x57, 0x01]);
        code.extend_from_slice(&[0xb9, (iface >> 8) as u8, iface as u8, 0x01, 0x00]);
        code.push(0xb1);

        let pool = builder.build_pool();
        let calls = decode_calls(&code, &pool).unwrap();

        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].kind, InvokeKind::InvokeSpecial);
        assert_eq!(calls[0].owner, "org.example.ModuleBase");
        assert_eq!(calls[0].offset, 1);
        assert_eq!(calls[1].kind, InvokeKind::InvokeVirtual);
        assert_eq!(calls[1].name, "renameTo");
        assert_eq!(calls[1].descriptor, "(Ljava/io/File;)Z");
        assert_eq!(calls[1].offset, 6);
        assert_eq!(calls[2].kind, InvokeKind::InvokeInterface);
        assert_eq!(calls[2].owner, "java.util.List");
    }
}
