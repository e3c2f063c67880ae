use super::{addi, op, ret};
use crate::test::interpreter_for;
use crate::Outcome;
use crate::Register::*;

#[test]
fn add_and_sub() {
    let mut vm = interpreter_for(&[
        addi(T0, ZERO, 100),
        addi(T1, ZERO, -58),
        op(0b000, 0, T2, T0, T1),          // add
        op(0b000, 0b010_0000, T3, T0, T1), // sub
        ret(),
    ]);
    match vm.run() {
        Outcome::Exited(_) => {}
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(vm.regs[T2], 42);
    assert_eq!(vm.regs[T3] as i32, 158);
}

#[test]
fn add_wraps() {
    let mut vm = interpreter_for(&[
        addi(T0, ZERO, -1),
        addi(T1, ZERO, 1),
        op(0b000, 0, T2, T0, T1),
        ret(),
    ]);
    vm.run();
    assert_eq!(vm.regs[T2], 0);
}

#[test]
fn logic_operations() {
    let mut vm = interpreter_for(&[
        addi(T0, ZERO, 0b1100),
        addi(T1, ZERO, 0b1010),
        op(0b111, 0, T2, T0, T1), // and
        op(0b110, 0, T3, T0, T1), // or
        op(0b100, 0, T4, T0, T1), // xor
        ret(),
    ]);
    vm.run();
    assert_eq!(vm.regs[T2], 0b1000);
    assert_eq!(vm.regs[T3], 0b1110);
    assert_eq!(vm.regs[T4], 0b0110);
}

#[test]
fn comparisons_signed_and_unsigned() {
    let mut vm = interpreter_for(&[
        addi(T0, ZERO, -1),
        addi(T1, ZERO, 1),
        op(0b010, 0, T2, T0, T1), // slt: -1 < 1
        op(0b011, 0, T3, T0, T1), // sltu: 0xFFFFFFFF < 1
        op(0b010, 0, T4, T1, T0), // slt: 1 < -1
        op(0b011, 0, T5, T1, T0), // sltu: 1 < 0xFFFFFFFF
        ret(),
    ]);
    vm.run();
    assert_eq!(vm.regs[T2], 1);
    assert_eq!(vm.regs[T3], 0);
    assert_eq!(vm.regs[T4], 0);
    assert_eq!(vm.regs[T5], 1);
}

#[test]
fn immediate_forms_sign_extend() {
    let mut vm = interpreter_for(&[
        addi(T0, ZERO, -2048),
        addi(T1, T0, 2047),
        ret(),
    ]);
    vm.run();
    assert_eq!(vm.regs[T0] as i32, -2048);
    assert_eq!(vm.regs[T1] as i32, -1);
}
