//! Per-opcode execution handlers, one `fn` per decoded operation so that
//! an instruction cache slot is a plain function pointer plus metadata.
//!
//! Every handler charges its meter, then either advances the pc by one
//! word or installs the jump target. The `zero` register is rewritten to
//! zero by the dispatch loop before each instruction, so handlers may
//! write it like any other destination.

use crate::constants::WORD_BYTES;
use crate::device::{Device, Meter};
use crate::error::FailToInterpret;
use crate::icache::MetaData;
use crate::memory::Memory;

use super::RegisterFile;

macro_rules! arith_reg_handler {
    ($name:ident, $meter:ident, |$a:ident, $b:ident| $value:expr) => {
        pub fn $name(
            meta: &MetaData,
            rf: &mut RegisterFile,
            _mem: &mut Memory,
            dev: &mut Device,
        ) -> Result<(), FailToInterpret> {
            let $a = rf[meta.rs1];
            let $b = rf[meta.rs2];
            rf[meta.rd] = $value;
            dev.bump(Meter::$meter);
            rf.advance();
            Ok(())
        }
    };
}

macro_rules! arith_imm_handler {
    ($name:ident, $meter:ident, |$a:ident, $b:ident| $value:expr) => {
        pub fn $name(
            meta: &MetaData,
            rf: &mut RegisterFile,
            _mem: &mut Memory,
            dev: &mut Device,
        ) -> Result<(), FailToInterpret> {
            let $a = rf[meta.rs1];
            let $b = meta.imm;
            rf[meta.rd] = $value;
            dev.bump(Meter::$meter);
            rf.advance();
            Ok(())
        }
    };
}

macro_rules! divide_handler {
    ($name:ident, $meter:ident, |$a:ident, $b:ident| $value:expr) => {
        pub fn $name(
            meta: &MetaData,
            rf: &mut RegisterFile,
            _mem: &mut Memory,
            dev: &mut Device,
        ) -> Result<(), FailToInterpret> {
            let $a = rf[meta.rs1];
            let $b = rf[meta.rs2];
            if $b == 0 {
                return Err(FailToInterpret::DivideByZero { pc: rf.pc() });
            }
            rf[meta.rd] = $value;
            dev.bump(Meter::$meter);
            rf.advance();
            Ok(())
        }
    };
}

macro_rules! load_handler {
    ($name:ident, $meter:ident, |$mem:ident, $addr:ident| $value:expr) => {
        pub fn $name(
            meta: &MetaData,
            rf: &mut RegisterFile,
            $mem: &mut Memory,
            dev: &mut Device,
        ) -> Result<(), FailToInterpret> {
            let $addr = rf[meta.rs1].wrapping_add(meta.imm);
            rf[meta.rd] = $value;
            dev.bump(Meter::$meter);
            rf.advance();
            Ok(())
        }
    };
}

macro_rules! store_handler {
    ($name:ident, $meter:ident, |$mem:ident, $addr:ident, $value:ident| $store:expr) => {
        pub fn $name(
            meta: &MetaData,
            rf: &mut RegisterFile,
            $mem: &mut Memory,
            dev: &mut Device,
        ) -> Result<(), FailToInterpret> {
            let $addr = rf[meta.rs1].wrapping_add(meta.imm);
            let $value = rf[meta.rs2];
            $store?;
            dev.bump(Meter::$meter);
            rf.advance();
            Ok(())
        }
    };
}

macro_rules! branch_handler {
    ($name:ident, $meter:ident, |$a:ident, $b:ident| $taken:expr) => {
        pub fn $name(
            meta: &MetaData,
            rf: &mut RegisterFile,
            _mem: &mut Memory,
            dev: &mut Device,
        ) -> Result<(), FailToInterpret> {
            let $a = rf[meta.rs1];
            let $b = rf[meta.rs2];
            let taken = $taken;
            dev.bump(Meter::$meter);
            dev.predict(rf.pc(), taken);
            let step = if taken { meta.imm } else { WORD_BYTES };
            rf.set_pc(rf.pc().wrapping_add(step));
            Ok(())
        }
    };
}

arith_reg_handler!(add, ADD, |a, b| a.wrapping_add(b));
arith_reg_handler!(sub, SUB, |a, b| a.wrapping_sub(b));
arith_reg_handler!(sll, SLL, |a, b| a.wrapping_shl(b));
arith_reg_handler!(slt, SLT, |a, b| ((a as i32) < (b as i32)) as u32);
arith_reg_handler!(sltu, SLTU, |a, b| (a < b) as u32);
arith_reg_handler!(xor, XOR, |a, b| a ^ b);
arith_reg_handler!(srl, SRL, |a, b| a.wrapping_shr(b));
arith_reg_handler!(sra, SRA, |a, b| ((a as i32).wrapping_shr(b)) as u32);
arith_reg_handler!(or, OR, |a, b| a | b);
arith_reg_handler!(and, AND, |a, b| a & b);

arith_reg_handler!(mul, MUL, |a, b| a.wrapping_mul(b));
arith_reg_handler!(mulh, MULH, |a, b| {
    ((i64::from(a as i32) * i64::from(b as i32)) >> 32) as u32
});
arith_reg_handler!(mulhsu, MULHSU, |a, b| {
    ((i64::from(a as i32) * i64::from(b)) >> 32) as u32
});
arith_reg_handler!(mulhu, MULHU, |a, b| {
    ((u64::from(a) * u64::from(b)) >> 32) as u32
});

divide_handler!(div, DIV, |a, b| (a as i32).wrapping_div(b as i32) as u32);
divide_handler!(divu, DIVU, |a, b| a / b);
divide_handler!(rem, REM, |a, b| (a as i32).wrapping_rem(b as i32) as u32);
divide_handler!(remu, REMU, |a, b| a % b);

arith_imm_handler!(addi, ADD, |a, b| a.wrapping_add(b));
arith_imm_handler!(slti, SLT, |a, b| ((a as i32) < (b as i32)) as u32);
arith_imm_handler!(sltiu, SLTU, |a, b| (a < b) as u32);
arith_imm_handler!(xori, XOR, |a, b| a ^ b);
arith_imm_handler!(ori, OR, |a, b| a | b);
arith_imm_handler!(andi, AND, |a, b| a & b);
arith_imm_handler!(slli, SLL, |a, b| a.wrapping_shl(b));
arith_imm_handler!(srli, SRL, |a, b| a.wrapping_shr(b));
arith_imm_handler!(srai, SRA, |a, b| ((a as i32).wrapping_shr(b)) as u32);

load_handler!(lb, LB, |mem, addr| mem.load_i8(addr)? as u32);
load_handler!(lh, LH, |mem, addr| mem.load_i16(addr)? as u32);
load_handler!(lw, LW, |mem, addr| mem.load_u32(addr)?);
load_handler!(lbu, LBU, |mem, addr| u32::from(mem.load_u8(addr)?));
load_handler!(lhu, LHU, |mem, addr| u32::from(mem.load_u16(addr)?));

store_handler!(sb, SB, |mem, addr, value| mem.store_u8(addr, value as u8));
store_handler!(sh, SH, |mem, addr, value| mem.store_u16(addr, value as u16));
store_handler!(sw, SW, |mem, addr, value| mem.store_u32(addr, value));

branch_handler!(beq, BEQ, |a, b| a == b);
branch_handler!(bne, BNE, |a, b| a != b);
branch_handler!(blt, BLT, |a, b| (a as i32) < (b as i32));
branch_handler!(bge, BGE, |a, b| (a as i32) >= (b as i32));
branch_handler!(bltu, BLTU, |a, b| a < b);
branch_handler!(bgeu, BGEU, |a, b| a >= b);

pub fn jal(
    meta: &MetaData,
    rf: &mut RegisterFile,
    _mem: &mut Memory,
    dev: &mut Device,
) -> Result<(), FailToInterpret> {
    let target = rf.pc().wrapping_add(meta.imm);
    rf[meta.rd] = rf.pc().wrapping_add(WORD_BYTES);
    rf.set_pc(target);
    dev.bump(Meter::JAL);
    Ok(())
}

pub fn jalr(
    meta: &MetaData,
    rf: &mut RegisterFile,
    _mem: &mut Memory,
    dev: &mut Device,
) -> Result<(), FailToInterpret> {
    let target = rf[meta.rs1].wrapping_add(meta.imm) & !1;
    rf[meta.rd] = rf.pc().wrapping_add(WORD_BYTES);
    rf.set_pc(target);
    dev.bump(Meter::JALR);
    Ok(())
}

pub fn lui(
    meta: &MetaData,
    rf: &mut RegisterFile,
    _mem: &mut Memory,
    dev: &mut Device,
) -> Result<(), FailToInterpret> {
    rf[meta.rd] = meta.imm;
    dev.bump(Meter::LUI);
    rf.advance();
    Ok(())
}

pub fn auipc(
    meta: &MetaData,
    rf: &mut RegisterFile,
    _mem: &mut Memory,
    dev: &mut Device,
) -> Result<(), FailToInterpret> {
    rf[meta.rd] = rf.pc().wrapping_add(meta.imm);
    dev.bump(Meter::AUIPC);
    rf.advance();
    Ok(())
}
