use super::{addi, ret};
use crate::riscv::command::{self, opcode};
use crate::test::interpreter_for;
use crate::{FailToInterpret, Outcome};
use crate::Register::*;

fn load(funct3: u32, rd: crate::Register, rs1: crate::Register, imm: i32) -> crate::Word {
    command::encode_i(opcode::LOAD, funct3, rd, rs1, imm as u32)
}

fn store(funct3: u32, rs2: crate::Register, rs1: crate::Register, imm: i32) -> crate::Word {
    command::encode_s(funct3, rs1, rs2, imm as u32)
}

#[test]
fn word_round_trip_on_the_stack() {
    let mut vm = interpreter_for(&[
        addi(SP, SP, -16),
        addi(T0, ZERO, -123456),
        store(0b010, T0, SP, 4),
        load(0b010, T1, SP, 4),
        ret(),
    ]);
    vm.run();
    assert_eq!(vm.regs[T1] as i32, -123456);
}

#[test]
fn narrow_loads_extend_correctly() {
    let mut vm = interpreter_for(&[
        addi(SP, SP, -16),
        addi(T0, ZERO, -1), // 0xFFFFFFFF
        store(0b010, T0, SP, 0),
        load(0b000, T1, SP, 0), // lb  -> sign extended
        load(0b100, T2, SP, 0), // lbu -> zero extended
        load(0b001, T3, SP, 0), // lh
        load(0b101, T4, SP, 0), // lhu
        ret(),
    ]);
    vm.run();
    assert_eq!(vm.regs[T1], 0xFFFF_FFFF);
    assert_eq!(vm.regs[T2], 0x0000_00FF);
    assert_eq!(vm.regs[T3], 0xFFFF_FFFF);
    assert_eq!(vm.regs[T4], 0x0000_FFFF);
}

#[test]
fn narrow_stores_truncate() {
    let mut vm = interpreter_for(&[
        addi(SP, SP, -16),
        store(0b010, ZERO, SP, 0), // clear the word
        addi(T0, ZERO, 0x5A5),
        store(0b000, T0, SP, 0), // sb writes 0xA5
        load(0b010, T1, SP, 0),
        ret(),
    ]);
    vm.run();
    assert_eq!(vm.regs[T1], 0xA5);
}

#[test]
fn little_endian_byte_order() {
    let mut vm = interpreter_for(&[
        addi(SP, SP, -16),
        addi(T0, ZERO, 0x102),
        store(0b001, T0, SP, 0), // sh 0x0102
        load(0b100, T1, SP, 0),  // lbu -> low byte first
        load(0b100, T2, SP, 1),
        ret(),
    ]);
    vm.run();
    assert_eq!(vm.regs[T1], 0x02);
    assert_eq!(vm.regs[T2], 0x01);
}

#[test]
fn misaligned_accesses_trap() {
    let mut vm = interpreter_for(&[
        addi(SP, SP, -16),
        load(0b010, T0, SP, 2),
        ret(),
    ]);
    match vm.run() {
        Outcome::Trap(FailToInterpret::LoadMisAligned { align: 4, .. }) => {}
        other => panic!("expected misaligned load, got {:?}", other),
    }

    let mut vm = interpreter_for(&[
        addi(SP, SP, -16),
        store(0b001, T0, SP, 1),
        ret(),
    ]);
    match vm.run() {
        Outcome::Trap(FailToInterpret::StoreMisAligned { align: 2, .. }) => {}
        other => panic!("expected misaligned store, got {:?}", other),
    }
}

#[test]
fn out_of_bound_accesses_trap() {
    // The first mapped byte sits at the text start; below it is a hole.
    let mut vm = interpreter_for(&[
        addi(T0, ZERO, 64),
        load(0b010, T1, T0, 0),
        ret(),
    ]);
    match vm.run() {
        Outcome::Trap(FailToInterpret::LoadOutOfBound { addr: 64, size: 4 }) => {}
        other => panic!("expected out-of-bound load, got {:?}", other),
    }

    let mut vm = interpreter_for(&[
        addi(T0, ZERO, 64),
        store(0b000, T1, T0, 0),
        ret(),
    ]);
    match vm.run() {
        Outcome::Trap(FailToInterpret::StoreOutOfBound { addr: 64, size: 1 }) => {}
        other => panic!("expected out-of-bound store, got {:?}", other),
    }
}
