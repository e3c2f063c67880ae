use super::{addi, ret};
use crate::constants::WORD_BYTES;
use crate::libc::LIBC_END;
use crate::riscv::command::{self, opcode};
use crate::test::interpreter_for;
use crate::{FailToInterpret, Outcome};
use crate::Register::*;

/// Materialize a full 32-bit address in `rd` (the test programs sit just
/// past the libc range, out of `addi` reach).
fn load_address(rd: crate::Register, value: u32) -> [crate::Word; 2] {
    debug_assert_eq!(value >> 12, 0x10);
    [
        command::encode_u(opcode::LUI, rd, value >> 12),
        addi(rd, rd, (value & 0xFFF) as i32),
    ]
}

#[test]
fn jal_links_and_jumps() {
    // jal t0, .+8 skips the marker write.
    let mut vm = interpreter_for(&[
        command::encode_j(T0, 8),
        addi(T6, ZERO, 1),
        ret(),
    ]);
    vm.run();
    assert_eq!(vm.regs[T6], 0);
    assert_eq!(vm.regs[T0], LIBC_END + WORD_BYTES);
}

#[test]
fn jalr_links_jumps_and_masks_bit_zero() {
    let target = LIBC_END + 4 * WORD_BYTES;
    let [hi, lo] = load_address(T0, target + 1); // odd target, bit 0 dropped
    let mut vm = interpreter_for(&[
        hi,
        lo,
        command::encode_i(opcode::JALR, 0, T1, T0, 0),
        addi(T6, ZERO, 1),
        ret(),
    ]);
    vm.run();
    assert_eq!(vm.regs[T6], 0);
    assert_eq!(vm.regs[T1], LIBC_END + 3 * WORD_BYTES);
}

#[test]
fn jalr_negative_offset() {
    let base = LIBC_END + 8 * WORD_BYTES;
    let [hi, lo] = load_address(T0, base);
    // Target is base - 12, the t5 marker below.
    let mut vm = interpreter_for(&[
        hi,
        lo,
        command::encode_i(opcode::JALR, 0, ZERO, T0, (-12i32) as u32),
        addi(T6, ZERO, 1),
        ret(),
        addi(T5, ZERO, 7), // base - 12 lands here
        ret(),
    ]);
    vm.run();
    assert_eq!(vm.regs[T5], 7);
    assert_eq!(vm.regs[T6], 0);
}

#[test]
fn misaligned_jump_target_traps() {
    let [hi, lo] = load_address(T0, LIBC_END + 2);
    let mut vm = interpreter_for(&[
        hi,
        lo,
        command::encode_i(opcode::JALR, 0, ZERO, T0, 0),
        ret(),
    ]);
    match vm.run() {
        Outcome::Trap(FailToInterpret::InsMisAligned { addr, align: 4 }) => {
            assert_eq!(addr, LIBC_END + 2);
        }
        other => panic!("expected misaligned fetch, got {:?}", other),
    }
}

#[test]
fn jump_past_text_traps() {
    let mut vm = interpreter_for(&[
        command::encode_j(ZERO, 0x1000),
        ret(),
    ]);
    match vm.run() {
        Outcome::Trap(FailToInterpret::InsOutOfBound { addr, .. }) => {
            assert_eq!(addr, LIBC_END + 0x1000);
        }
        other => panic!("expected out-of-bound fetch, got {:?}", other),
    }
}
