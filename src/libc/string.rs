//! The str* functions.

use super::{get_string, return_to_user, write_area};
use crate::device::Device;
use crate::error::FailToInterpret;
use crate::icache::MetaData;
use crate::interpreter::RegisterFile;
use crate::memory::Memory;
use crate::riscv::Register;

pub fn strcpy(
    _meta: &MetaData,
    rf: &mut RegisterFile,
    mem: &mut Memory,
    _dev: &mut Device,
) -> Result<(), FailToInterpret> {
    let dst = rf[Register::A0];
    let src = rf[Register::A1];
    let mut string = get_string("strcpy", mem, src)?;
    string.push(0);
    write_area("strcpy", mem, dst, &string)?;
    return_to_user(rf, dst);
    Ok(())
}

pub fn strlen(
    _meta: &MetaData,
    rf: &mut RegisterFile,
    mem: &mut Memory,
    _dev: &mut Device,
) -> Result<(), FailToInterpret> {
    let string = get_string("strlen", mem, rf[Register::A0])?;
    return_to_user(rf, string.len() as u32);
    Ok(())
}

pub fn strnlen_s(
    _meta: &MetaData,
    rf: &mut RegisterFile,
    mem: &mut Memory,
    _dev: &mut Device,
) -> Result<(), FailToInterpret> {
    let addr = rf[Register::A0];
    let max = rf[Register::A1];

    if addr == 0 {
        return_to_user(rf, 0);
        return Ok(());
    }

    let area = mem
        .libc_access(addr)
        .ok_or(FailToInterpret::LibcOutOfBound {
            which: "strnlen_s",
            addr,
            size: 1,
        })?;
    let bound = (max as usize).min(area.len());
    let length = area[..bound]
        .iter()
        .position(|&byte| byte == 0)
        .unwrap_or(bound);

    return_to_user(rf, length as u32);
    Ok(())
}

pub fn strcat(
    _meta: &MetaData,
    rf: &mut RegisterFile,
    mem: &mut Memory,
    _dev: &mut Device,
) -> Result<(), FailToInterpret> {
    let dst = rf[Register::A0];
    let src = rf[Register::A1];

    let head = get_string("strcat", mem, dst)?;
    let mut tail = get_string("strcat", mem, src)?;
    tail.push(0);
    write_area("strcat", mem, dst + head.len() as u32, &tail)?;
    return_to_user(rf, dst);
    Ok(())
}

pub fn strcmp(
    _meta: &MetaData,
    rf: &mut RegisterFile,
    mem: &mut Memory,
    _dev: &mut Device,
) -> Result<(), FailToInterpret> {
    let lhs = get_string("strcmp", mem, rf[Register::A0])?;
    let rhs = get_string("strcmp", mem, rf[Register::A1])?;

    let result = match lhs.cmp(&rhs) {
        std::cmp::Ordering::Less => -1i32,
        std::cmp::Ordering::Equal => 0,
        std::cmp::Ordering::Greater => 1,
    };
    return_to_user(rf, result as u32);
    Ok(())
}
