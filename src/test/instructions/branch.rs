use super::{addi, ret};
use crate::riscv::command;
use crate::test::interpreter_for;
use crate::Register::*;

/// Branch over one instruction when taken.
fn branch(funct3: u32, rs1: crate::Register, rs2: crate::Register) -> crate::Word {
    command::encode_b(funct3, rs1, rs2, 8)
}

/// Run `rs1 = a`, `rs2 = b`, branch over a marker write; t6 ends up 0
/// when the branch was taken and 1 otherwise.
fn branch_result(funct3: u32, a: i32, b: i32) -> u32 {
    let mut vm = interpreter_for(&[
        addi(T0, ZERO, a),
        addi(T1, ZERO, b),
        branch(funct3, T0, T1),
        addi(T6, ZERO, 1),
        ret(),
    ]);
    vm.run();
    vm.regs[T6]
}

#[test]
fn equality_branches() {
    assert_eq!(branch_result(0b000, 5, 5), 0); // beq taken
    assert_eq!(branch_result(0b000, 5, 6), 1);
    assert_eq!(branch_result(0b001, 5, 6), 0); // bne taken
    assert_eq!(branch_result(0b001, 5, 5), 1);
}

#[test]
fn signed_order_branches() {
    assert_eq!(branch_result(0b100, -1, 1), 0); // blt taken
    assert_eq!(branch_result(0b100, 1, -1), 1);
    assert_eq!(branch_result(0b101, 1, -1), 0); // bge taken
    assert_eq!(branch_result(0b101, 1, 2), 1);
    assert_eq!(branch_result(0b101, 2, 2), 0); // bge on equality
}

#[test]
fn unsigned_order_branches() {
    // -1 is the largest unsigned value.
    assert_eq!(branch_result(0b110, -1, 1), 1); // bltu
    assert_eq!(branch_result(0b110, 1, -1), 0);
    assert_eq!(branch_result(0b111, -1, 1), 0); // bgeu
    assert_eq!(branch_result(0b111, 1, -1), 1);
}

#[test]
fn backward_branch_loops() {
    // t0 counts 0..5 with a backward bne.
    let mut vm = interpreter_for(&[
        addi(T1, ZERO, 5),
        addi(T0, T0, 1),
        command::encode_b(0b001, T0, T1, (-4i32) as u32), // bne t0, t1, .-4
        ret(),
    ]);
    vm.run();
    assert_eq!(vm.regs[T0], 5);
}

#[test]
fn branch_counts_cycles_once_per_execution() {
    let mut vm = interpreter_for(&[
        addi(T1, ZERO, 3),
        addi(T0, T0, 1),
        command::encode_b(0b001, T0, T1, (-4i32) as u32),
        ret(),
    ]);
    vm.run();
    assert_eq!(vm.device.counter[crate::Meter::BNE as usize], 3);
}
