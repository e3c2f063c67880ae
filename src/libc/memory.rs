//! Heap management and the mem* block functions.
//!
//! `malloc` is a bump allocator over [`Memory::sbrk`]: each allocation is
//! preceded by a `{prev, self}` header and padded so payloads stay 16-byte
//! aligned. `free` never reclaims; `realloc` always hands out fresh
//! memory.
//!
//! [`Memory::sbrk`]: ../../memory/struct.Memory.html#method.sbrk

use super::{area_mut, read_area, return_to_user, store_word, write_area};
use crate::device::Device;
use crate::error::FailToInterpret;
use crate::icache::MetaData;
use crate::interpreter::RegisterFile;
use crate::memory::Memory;
use crate::riscv::Register;

const HEADER_SIZE: u32 = 8;
const MIN_ALIGNMENT: u32 = 16;
const MIN_ALLOC_SIZE: u32 = 16;

fn out_of_memory(which: &'static str) -> FailToInterpret {
    FailToInterpret::NotImplemented {
        message: format!("{}: heap exhausted", which),
    }
}

/// First call only: pad the break so every payload handed out afterwards
/// is 16-byte aligned with room for its header below.
fn ensure_init(which: &'static str, mem: &mut Memory) -> Result<(), FailToInterpret> {
    if mem.alloc.initialized {
        return Ok(());
    }
    let start = mem.brk();
    let target = (start + HEADER_SIZE + (MIN_ALIGNMENT - 1)) & !(MIN_ALIGNMENT - 1);
    mem.sbrk((target - start) as i32)
        .ok_or_else(|| out_of_memory(which))?;
    mem.alloc.initialized = true;
    mem.alloc.prev = 0;
    Ok(())
}

/// Bump-allocate `size` payload bytes; returns the guest pointer.
fn allocate(which: &'static str, mem: &mut Memory, size: u32) -> Result<u32, FailToInterpret> {
    ensure_init(which, mem)?;

    let need = size.max(MIN_ALLOC_SIZE);
    let total = need
        .checked_add(HEADER_SIZE + (MIN_ALIGNMENT - 1))
        .ok_or_else(|| out_of_memory(which))?
        & !(MIN_ALIGNMENT - 1);

    let payload = mem.sbrk(total as i32).ok_or_else(|| out_of_memory(which))?;
    let prev = mem.alloc.prev;

    // Header sits in the padding right below the payload.
    store_word(which, mem, payload - HEADER_SIZE, prev)?;
    store_word(which, mem, payload - HEADER_SIZE + 4, total)?;
    mem.alloc.prev = payload;

    Ok(payload)
}

/// Payload capacity recorded in the allocation header.
fn usable_size(which: &'static str, mem: &mut Memory, ptr: u32) -> Result<u32, FailToInterpret> {
    let header = read_area(which, mem, ptr - HEADER_SIZE + 4, 4)?;
    let total = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    Ok(total.saturating_sub(HEADER_SIZE))
}

pub fn malloc(
    _meta: &MetaData,
    rf: &mut RegisterFile,
    mem: &mut Memory,
    _dev: &mut Device,
) -> Result<(), FailToInterpret> {
    let size = rf[Register::A0];
    let payload = allocate("malloc", mem, size)?;
    return_to_user(rf, payload);
    Ok(())
}

pub fn calloc(
    _meta: &MetaData,
    rf: &mut RegisterFile,
    mem: &mut Memory,
    _dev: &mut Device,
) -> Result<(), FailToInterpret> {
    let size = rf[Register::A0]
        .checked_mul(rf[Register::A1])
        .ok_or_else(|| out_of_memory("calloc"))?;
    let payload = allocate("calloc", mem, size)?;
    for byte in area_mut("calloc", mem, payload, size)?.iter_mut() {
        *byte = 0;
    }
    return_to_user(rf, payload);
    Ok(())
}

pub fn realloc(
    _meta: &MetaData,
    rf: &mut RegisterFile,
    mem: &mut Memory,
    _dev: &mut Device,
) -> Result<(), FailToInterpret> {
    let old = rf[Register::A0];
    let new_size = rf[Register::A1];
    let payload = allocate("realloc", mem, new_size)?;
    if old != 0 {
        let keep = usable_size("realloc", mem, old)?.min(new_size);
        let bytes = read_area("realloc", mem, old, keep)?;
        write_area("realloc", mem, payload, &bytes)?;
    }
    return_to_user(rf, payload);
    Ok(())
}

pub fn free(
    _meta: &MetaData,
    rf: &mut RegisterFile,
    _mem: &mut Memory,
    _dev: &mut Device,
) -> Result<(), FailToInterpret> {
    // The bump allocator never reclaims.
    return_to_user(rf, 0);
    Ok(())
}

pub fn memcpy(
    _meta: &MetaData,
    rf: &mut RegisterFile,
    mem: &mut Memory,
    _dev: &mut Device,
) -> Result<(), FailToInterpret> {
    let dst = rf[Register::A0];
    let src = rf[Register::A1];
    let size = rf[Register::A2];
    let bytes = read_area("memcpy", mem, src, size)?;
    write_area("memcpy", mem, dst, &bytes)?;
    return_to_user(rf, dst);
    Ok(())
}

pub fn memset(
    _meta: &MetaData,
    rf: &mut RegisterFile,
    mem: &mut Memory,
    _dev: &mut Device,
) -> Result<(), FailToInterpret> {
    let dst = rf[Register::A0];
    let fill = rf[Register::A1] as u8;
    let size = rf[Register::A2];
    for byte in area_mut("memset", mem, dst, size)?.iter_mut() {
        *byte = fill;
    }
    return_to_user(rf, dst);
    Ok(())
}

pub fn memmove(
    _meta: &MetaData,
    rf: &mut RegisterFile,
    mem: &mut Memory,
    _dev: &mut Device,
) -> Result<(), FailToInterpret> {
    let dst = rf[Register::A0];
    let src = rf[Register::A1];
    let size = rf[Register::A2];
    // The copied-out source makes overlap safe by construction.
    let bytes = read_area("memmove", mem, src, size)?;
    write_area("memmove", mem, dst, &bytes)?;
    return_to_user(rf, dst);
    Ok(())
}

pub fn memcmp(
    _meta: &MetaData,
    rf: &mut RegisterFile,
    mem: &mut Memory,
    _dev: &mut Device,
) -> Result<(), FailToInterpret> {
    let lhs_addr = rf[Register::A0];
    let rhs_addr = rf[Register::A1];
    let size = rf[Register::A2];
    let lhs = read_area("memcmp", mem, lhs_addr, size)?;
    let rhs = read_area("memcmp", mem, rhs_addr, size)?;

    let mut result = 0i32;
    for (a, b) in lhs.iter().zip(rhs.iter()) {
        if a != b {
            result = i32::from(*a) - i32::from(*b);
            break;
        }
    }
    return_to_user(rf, result as u32);
    Ok(())
}
