use super::{addi, op, ret};
use crate::test::interpreter_for;
use crate::Outcome;
use crate::Register::*;

#[test]
fn writes_to_zero_are_erased() {
    // The write lands, but the dispatch loop clears it before the next
    // instruction can observe it.
    let mut vm = interpreter_for(&[
        addi(ZERO, ZERO, 5),
        addi(A0, ZERO, 0),
        ret(),
    ]);
    match vm.run() {
        Outcome::Exited(code) => assert_eq!(code, 0),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(vm.regs[ZERO], 0);
}

#[test]
fn zero_reads_as_zero_in_every_position() {
    let mut vm = interpreter_for(&[
        addi(T0, ZERO, 17),
        op(0b000, 0, ZERO, T0, T0), // add zero, t0, t0
        op(0b000, 0, T1, ZERO, T0), // t1 = 0 + 17
        ret(),
    ]);
    vm.run();
    assert_eq!(vm.regs[T1], 17);
    assert_eq!(vm.regs[ZERO], 0);
}
