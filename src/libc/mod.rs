//! The emulated libc.
//!
//! Each supported function owns one word of text starting at
//! [`LIBC_START`](constant.LIBC_START.html); the linker publishes these
//! addresses as global symbols and the instruction cache pre-seeds the
//! corresponding slots, so a call into the range runs the host-side
//! implementation instead of guest code.
//!
//! All functions follow the same return protocol: the result goes to
//! `a0`, execution resumes at `ra`, and the remaining caller-saved
//! registers are poisoned so guests cannot accidentally rely on them
//! surviving the call.

mod inout;
mod memory;
mod string;

use crate::constants::{POISON, TEXT_BASE, WORD_BYTES};
use crate::error::FailToInterpret;
use crate::icache::Handler;
use crate::interpreter::RegisterFile;
use crate::memory::Memory;
use crate::riscv::{int_to_reg, register_index, Register};

/// The supported functions, in trampoline-address order. The position of
/// a name determines its address: `LIBC_START + 4 * index`.
pub const NAMES: [&str; 20] = [
    // IO functions
    "puts",
    "putchar",
    "printf",
    "sprintf",
    "getchar",
    "scanf",
    "sscanf",
    // Memory management
    "malloc",
    "calloc",
    "realloc",
    "free",
    // Memory manipulation
    "memcpy",
    "memset",
    "memmove",
    "memcmp",
    // String manipulation
    "strcpy",
    "strlen",
    "strnlen_s",
    "strcat",
    "strcmp",
];

pub const LIBC_START: u32 = TEXT_BASE;
pub const LIBC_END: u32 = LIBC_START + NAMES.len() as u32 * WORD_BYTES;

/// Handlers in the same order as [`NAMES`](constant.NAMES.html).
pub const HANDLERS: [Handler; 20] = [
    inout::puts,
    inout::putchar,
    inout::printf,
    inout::sprintf,
    inout::getchar,
    inout::scanf,
    inout::sscanf,
    memory::malloc,
    memory::calloc,
    memory::realloc,
    memory::free,
    memory::memcpy,
    memory::memset,
    memory::memmove,
    memory::memcmp,
    string::strcpy,
    string::strlen,
    string::strnlen_s,
    string::strcat,
    string::strcmp,
];

/// Execute the common return convention.
pub(crate) fn return_to_user(rf: &mut RegisterFile, retval: u32) {
    use Register::*;

    rf[A0] = retval;
    rf.set_pc(rf[RA]);

    // a0 carries the return value and ra the return address; everything
    // else caller-saved gets the magic value.
    const CALLER_SAVED: [Register; 13] = [T0, T1, T2, T3, T4, T5, T6, A1, A2, A3, A4, A5, A6];
    for reg in CALLER_SAVED.iter() {
        rf[*reg] = POISON;
    }
    rf[A7] = POISON;
}

/// The next variadic argument register, or `NotImplemented` past `a7`.
pub(crate) fn next_arg(
    which: &'static str,
    rf: &RegisterFile,
    cursor: &mut usize,
) -> Result<u32, FailToInterpret> {
    if *cursor > register_index(Register::A7) {
        return Err(FailToInterpret::NotImplemented {
            message: format!("{}: too many arguments", which),
        });
    }
    let value = rf[int_to_reg(*cursor as u32)];
    *cursor += 1;
    Ok(value)
}

/// The NUL-terminated string at `addr`, copied out of guest memory.
pub(crate) fn get_string(
    which: &'static str,
    mem: &mut Memory,
    addr: u32,
) -> Result<Vec<u8>, FailToInterpret> {
    let area = mem
        .libc_access(addr)
        .ok_or(FailToInterpret::LibcOutOfBound {
            which,
            addr,
            size: 1,
        })?;
    match area.iter().position(|&byte| byte == 0) {
        Some(end) => Ok(area[..end].to_vec()),
        None => Err(FailToInterpret::LibcOutOfBound {
            which,
            addr,
            size: area.len() as u32 + 1,
        }),
    }
}

/// `size` readable bytes at `addr`, copied out of guest memory.
pub(crate) fn read_area(
    which: &'static str,
    mem: &mut Memory,
    addr: u32,
    size: u32,
) -> Result<Vec<u8>, FailToInterpret> {
    Ok(area_mut(which, mem, addr, size)?.to_vec())
}

/// `bytes.len()` writable bytes at `addr`, filled from `bytes`.
pub(crate) fn write_area(
    which: &'static str,
    mem: &mut Memory,
    addr: u32,
    bytes: &[u8],
) -> Result<(), FailToInterpret> {
    area_mut(which, mem, addr, bytes.len() as u32)?.copy_from_slice(bytes);
    Ok(())
}

pub(crate) fn area_mut<'m>(
    which: &'static str,
    mem: &'m mut Memory,
    addr: u32,
    size: u32,
) -> Result<&'m mut [u8], FailToInterpret> {
    let area = mem
        .libc_access(addr)
        .ok_or(FailToInterpret::LibcOutOfBound { which, addr, size })?;
    if (area.len() as u32) < size {
        return Err(FailToInterpret::LibcOutOfBound { which, addr, size });
    }
    Ok(&mut area[..size as usize])
}

/// Store a word through a libc-validated pointer (alignment checked with
/// the libc error flavor).
pub(crate) fn store_word(
    which: &'static str,
    mem: &mut Memory,
    addr: u32,
    value: u32,
) -> Result<(), FailToInterpret> {
    if addr % 4 != 0 {
        return Err(FailToInterpret::LibcMisAligned {
            which,
            addr,
            align: 4,
        });
    }
    use byteorder::ByteOrder;
    util::Endian::write_u32(area_mut(which, mem, addr, 4)?, value);
    Ok(())
}

pub(crate) fn store_byte(
    which: &'static str,
    mem: &mut Memory,
    addr: u32,
    value: u8,
) -> Result<(), FailToInterpret> {
    area_mut(which, mem, addr, 1)?[0] = value;
    Ok(())
}
