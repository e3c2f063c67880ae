use super::{addi, op, ret};
use crate::riscv::command::{self, opcode, FUNCT7_SRA};
use crate::test::interpreter_for;
use crate::Register::*;

#[test]
fn logical_and_arithmetic_shifts() {
    let mut vm = interpreter_for(&[
        addi(T0, ZERO, -16), // 0xFFFFFFF0
        addi(T1, ZERO, 2),
        op(0b001, 0, T2, T0, T1),          // sll
        op(0b101, 0, T3, T0, T1),          // srl
        op(0b101, 0b010_0000, T4, T0, T1), // sra
        ret(),
    ]);
    vm.run();
    assert_eq!(vm.regs[T2], 0xFFFF_FFC0);
    assert_eq!(vm.regs[T3], 0x3FFF_FFFC);
    assert_eq!(vm.regs[T4] as i32, -4);
}

#[test]
fn shift_amount_uses_low_five_bits() {
    let mut vm = interpreter_for(&[
        addi(T0, ZERO, 1),
        addi(T1, ZERO, 33), // effectively 1
        op(0b001, 0, T2, T0, T1),
        ret(),
    ]);
    vm.run();
    assert_eq!(vm.regs[T2], 2);
}

#[test]
fn immediate_shifts() {
    let srai = command::encode_i(
        opcode::OP_IMM,
        0b101,
        T3,
        T0,
        4 | (FUNCT7_SRA << 5),
    );
    let mut vm = interpreter_for(&[
        addi(T0, ZERO, -256),
        command::encode_i(opcode::OP_IMM, 0b001, T1, T0, 4), // slli
        command::encode_i(opcode::OP_IMM, 0b101, T2, T0, 4), // srli
        srai,
        ret(),
    ]);
    vm.run();
    assert_eq!(vm.regs[T1], 0xFFFF_F000);
    assert_eq!(vm.regs[T2], 0x0FFF_FFF0);
    assert_eq!(vm.regs[T3] as i32, -16);
}
