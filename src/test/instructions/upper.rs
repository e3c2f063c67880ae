use super::ret;
use crate::libc::LIBC_END;
use crate::riscv::command::{self, opcode};
use crate::test::interpreter_for;
use crate::Register::*;

#[test]
fn lui_loads_shifted_immediate() {
    let mut vm = interpreter_for(&[
        command::encode_u(opcode::LUI, T0, 0x12345),
        command::encode_u(opcode::LUI, T1, 0xFFFFF),
        ret(),
    ]);
    vm.run();
    assert_eq!(vm.regs[T0], 0x1234_5000);
    assert_eq!(vm.regs[T1], 0xFFFF_F000);
}

#[test]
fn auipc_adds_to_pc() {
    let mut vm = interpreter_for(&[
        command::encode_u(opcode::AUIPC, T0, 0),
        command::encode_u(opcode::AUIPC, T1, 0x10),
        ret(),
    ]);
    vm.run();
    assert_eq!(vm.regs[T0], LIBC_END);
    assert_eq!(vm.regs[T1], LIBC_END + 4 + 0x10000);
}
