use super::{addi, op, ret};
use crate::test::interpreter_for;
use crate::Register::*;

const F7_M: u32 = 0b000_0001;

#[test]
fn low_product() {
    let mut vm = interpreter_for(&[
        addi(T0, ZERO, 1000),
        addi(T1, ZERO, -3),
        op(0b000, F7_M, T2, T0, T1),
        ret(),
    ]);
    vm.run();
    assert_eq!(vm.regs[T2] as i32, -3000);
}

#[test]
fn high_products() {
    let mut vm = interpreter_for(&[
        addi(T0, ZERO, 2),
        addi(T1, ZERO, 30),
        op(0b001, 0, T0, T0, T1), // sll: t0 = 2 << 30 = 0x80000000
        addi(T2, ZERO, 4),
        op(0b001, F7_M, T3, T0, T2), // mulh
        op(0b011, F7_M, T4, T0, T2), // mulhu
        ret(),
    ]);
    vm.run();
    assert_eq!(vm.regs[T0], 0x8000_0000);
    // signed: (-2^31) * 4 = -2^33 -> high word 0xFFFFFFFE
    assert_eq!(vm.regs[T3], 0xFFFF_FFFE);
    // unsigned: 2^31 * 4 = 2^33 -> high word 2
    assert_eq!(vm.regs[T4], 2);
}

#[test]
fn mulhsu_mixes_signs() {
    let mut vm = interpreter_for(&[
        addi(T0, ZERO, -1),
        addi(T1, ZERO, 2),
        op(0b010, F7_M, T2, T0, T1), // mulhsu: -1 * 2u
        op(0b010, F7_M, T3, T1, T0), // mulhsu: 2 * 0xFFFFFFFFu
        ret(),
    ]);
    vm.run();
    // (-1) * 2 = -2 -> high word all ones
    assert_eq!(vm.regs[T2], 0xFFFF_FFFF);
    // 2 * 0xFFFFFFFF = 0x1_FFFF_FFFE -> high word 1
    assert_eq!(vm.regs[T3], 1);
}
