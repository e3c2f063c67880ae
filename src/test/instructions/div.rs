use super::{addi, op, ret};
use crate::test::interpreter_for;
use crate::{FailToInterpret, Outcome};
use crate::Register::*;

const F7_M: u32 = 0b000_0001;

#[test]
fn signed_division_and_remainder() {
    let mut vm = interpreter_for(&[
        addi(T0, ZERO, -7),
        addi(T1, ZERO, 2),
        op(0b100, F7_M, T2, T0, T1), // div
        op(0b110, F7_M, T3, T0, T1), // rem
        ret(),
    ]);
    vm.run();
    // Truncating division, as the ISA requires.
    assert_eq!(vm.regs[T2] as i32, -3);
    assert_eq!(vm.regs[T3] as i32, -1);
}

#[test]
fn unsigned_division_and_remainder() {
    let mut vm = interpreter_for(&[
        addi(T0, ZERO, -7), // 0xFFFFFFF9
        addi(T1, ZERO, 16),
        op(0b101, F7_M, T2, T0, T1), // divu
        op(0b111, F7_M, T3, T0, T1), // remu
        ret(),
    ]);
    vm.run();
    assert_eq!(vm.regs[T2], 0x0FFF_FFFF);
    assert_eq!(vm.regs[T3], 9);
}

#[test]
fn overflow_case() {
    // INT_MIN / -1 must produce INT_MIN without trapping.
    let mut vm = interpreter_for(&[
        addi(T0, ZERO, 2),
        addi(T1, ZERO, 30),
        op(0b001, 0, T0, T0, T1), // t0 = 0x80000000
        addi(T1, ZERO, -1),
        op(0b100, F7_M, T2, T0, T1), // div
        op(0b110, F7_M, T3, T0, T1), // rem
        ret(),
    ]);
    vm.run();
    assert_eq!(vm.regs[T2], 0x8000_0000);
    assert_eq!(vm.regs[T3], 0);
}

#[test]
fn divide_by_zero_traps_without_touching_rd() {
    for funct3 in &[0b100u32, 0b101, 0b110, 0b111] {
        let mut vm = interpreter_for(&[
            addi(T2, ZERO, 1234),
            addi(T0, ZERO, 5),
            op(*funct3, F7_M, T2, T0, ZERO),
            ret(),
        ]);
        match vm.run() {
            Outcome::Trap(FailToInterpret::DivideByZero { pc }) => {
                assert_eq!(pc, vm.regs.pc());
            }
            other => panic!("expected division trap, got {:?}", other),
        }
        assert_eq!(vm.regs[T2], 1234, "rd must be preserved");
    }
}
