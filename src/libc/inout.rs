//! The formatted and unformatted I/O functions.

use std::io::Write;

use super::{get_string, next_arg, return_to_user, store_byte, store_word, write_area};
use crate::device::{Device, InputStream};
use crate::error::FailToInterpret;
use crate::icache::MetaData;
use crate::interpreter::RegisterFile;
use crate::memory::Memory;
use crate::riscv::{register_index, Register};

fn unknown_conversion(which: &'static str, spec: Option<u8>) -> FailToInterpret {
    match spec {
        Some(byte) => FailToInterpret::NotImplemented {
            message: format!("{}: unsupported conversion %{}", which, byte as char),
        },
        None => FailToInterpret::NotImplemented {
            message: format!("{}: stray % at end of format string", which),
        },
    }
}

/// Render `fmt` with arguments from `first_arg` onwards into `out`.
/// Supports `%d %u %x %p %c %s %%`.
fn format_into(
    which: &'static str,
    out: &mut Vec<u8>,
    rf: &RegisterFile,
    mem: &mut Memory,
    fmt: &[u8],
    first_arg: Register,
) -> Result<(), FailToInterpret> {
    let mut cursor = register_index(first_arg);
    let mut bytes = fmt.iter().copied();

    while let Some(byte) = bytes.next() {
        if byte != b'%' {
            out.push(byte);
            continue;
        }
        match bytes.next() {
            Some(b'd') => {
                let value = next_arg(which, rf, &mut cursor)? as i32;
                out.extend_from_slice(value.to_string().as_bytes());
            }
            Some(b'u') => {
                let value = next_arg(which, rf, &mut cursor)?;
                out.extend_from_slice(value.to_string().as_bytes());
            }
            Some(b'x') => {
                let value = next_arg(which, rf, &mut cursor)?;
                out.extend_from_slice(format!("{:x}", value).as_bytes());
            }
            Some(b'p') => {
                let value = next_arg(which, rf, &mut cursor)?;
                out.extend_from_slice(format!("0x{:x}", value).as_bytes());
            }
            Some(b'c') => {
                let value = next_arg(which, rf, &mut cursor)?;
                out.push(value as u8);
            }
            Some(b's') => {
                let addr = next_arg(which, rf, &mut cursor)?;
                let string = get_string(which, mem, addr)?;
                out.extend_from_slice(&string);
            }
            Some(b'%') => out.push(b'%'),
            other => return Err(unknown_conversion(which, other)),
        }
    }
    Ok(())
}

/// Run `fmt` against `input`, storing conversions through pointers taken
/// from `first_arg` onwards. Supports `%d %u %c %s`; returns the number of
/// conversions assigned.
fn scan_from(
    which: &'static str,
    input: &mut InputStream,
    rf: &RegisterFile,
    mem: &mut Memory,
    fmt: &[u8],
    first_arg: Register,
) -> Result<u32, FailToInterpret> {
    let mut cursor = register_index(first_arg);
    let mut assigned = 0u32;
    let mut bytes = fmt.iter().copied();

    while let Some(byte) = bytes.next() {
        if byte != b'%' {
            if byte.is_ascii_whitespace() {
                input.skip_whitespace();
            } else {
                match input.next_byte() {
                    Some(got) if got == byte => {}
                    _ => return Ok(assigned),
                }
            }
            continue;
        }
        match bytes.next() {
            Some(b'd') => {
                let addr = next_arg(which, rf, &mut cursor)?;
                let value = match input.read_int() {
                    Some(value) => value,
                    None => return Ok(assigned),
                };
                store_word(which, mem, addr, value as i32 as u32)?;
                assigned += 1;
            }
            Some(b'u') => {
                let addr = next_arg(which, rf, &mut cursor)?;
                let value = match input.read_int() {
                    Some(value) => value,
                    None => return Ok(assigned),
                };
                store_word(which, mem, addr, value as u32)?;
                assigned += 1;
            }
            Some(b'c') => {
                let addr = next_arg(which, rf, &mut cursor)?;
                input.skip_whitespace();
                let value = match input.next_byte() {
                    Some(value) => value,
                    None => return Ok(assigned),
                };
                store_byte(which, mem, addr, value)?;
                assigned += 1;
            }
            Some(b's') => {
                let addr = next_arg(which, rf, &mut cursor)?;
                let mut token = input.read_token();
                if token.is_empty() {
                    return Ok(assigned);
                }
                token.push(0);
                write_area(which, mem, addr, &token)?;
                assigned += 1;
            }
            other => return Err(unknown_conversion(which, other)),
        }
    }
    Ok(assigned)
}

pub fn puts(
    _meta: &MetaData,
    rf: &mut RegisterFile,
    mem: &mut Memory,
    dev: &mut Device,
) -> Result<(), FailToInterpret> {
    let mut string = get_string("puts", mem, rf[Register::A0])?;
    string.push(b'\n');
    let _ = dev.output.write_all(&string);
    return_to_user(rf, 0);
    Ok(())
}

pub fn putchar(
    _meta: &MetaData,
    rf: &mut RegisterFile,
    _mem: &mut Memory,
    dev: &mut Device,
) -> Result<(), FailToInterpret> {
    let byte = rf[Register::A0] as u8;
    let _ = dev.output.write_all(&[byte]);
    return_to_user(rf, 0);
    Ok(())
}

pub fn printf(
    _meta: &MetaData,
    rf: &mut RegisterFile,
    mem: &mut Memory,
    dev: &mut Device,
) -> Result<(), FailToInterpret> {
    let fmt = get_string("printf", mem, rf[Register::A0])?;
    let mut out = Vec::new();
    format_into("printf", &mut out, rf, mem, &fmt, Register::A1)?;
    let _ = dev.output.write_all(&out);
    return_to_user(rf, 0);
    Ok(())
}

pub fn sprintf(
    _meta: &MetaData,
    rf: &mut RegisterFile,
    mem: &mut Memory,
    _dev: &mut Device,
) -> Result<(), FailToInterpret> {
    let dst = rf[Register::A0];
    let fmt = get_string("sprintf", mem, rf[Register::A1])?;
    let mut out = Vec::new();
    format_into("sprintf", &mut out, rf, mem, &fmt, Register::A2)?;
    out.push(0);
    write_area("sprintf", mem, dst, &out)?;
    return_to_user(rf, dst);
    Ok(())
}

pub fn getchar(
    _meta: &MetaData,
    rf: &mut RegisterFile,
    _mem: &mut Memory,
    dev: &mut Device,
) -> Result<(), FailToInterpret> {
    let value = match dev.input.next_byte() {
        Some(byte) => u32::from(byte),
        None => (-1i32) as u32,
    };
    return_to_user(rf, value);
    Ok(())
}

pub fn scanf(
    _meta: &MetaData,
    rf: &mut RegisterFile,
    mem: &mut Memory,
    dev: &mut Device,
) -> Result<(), FailToInterpret> {
    let fmt = get_string("scanf", mem, rf[Register::A0])?;
    let assigned = scan_from("scanf", &mut dev.input, rf, mem, &fmt, Register::A1)?;
    return_to_user(rf, assigned);
    Ok(())
}

pub fn sscanf(
    _meta: &MetaData,
    rf: &mut RegisterFile,
    mem: &mut Memory,
    _dev: &mut Device,
) -> Result<(), FailToInterpret> {
    let source = get_string("sscanf", mem, rf[Register::A0])?;
    let fmt = get_string("sscanf", mem, rf[Register::A1])?;
    let mut input = InputStream::new(Box::new(std::io::Cursor::new(source)));
    let assigned = scan_from("sscanf", &mut input, rf, mem, &fmt, Register::A2)?;
    return_to_user(rf, assigned);
    Ok(())
}
