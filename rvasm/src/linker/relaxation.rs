//! The relaxation pass.
//!
//! Every immediate is first subjected to a trivial fold (see
//! [`Immediate::fold_constant`]); then the two shrinkable commands are
//! rewritten where the final layout permits:
//!
//! - a `call`/`tail` whose resolved distance fits a conservative half of
//!   the `jal` range becomes a single relative jump (the half window
//!   guarantees that other jumps cannot fall out of range when later
//!   rewrites move code around),
//! - a `li` with a concrete sign-12 value becomes `addi rd, zero, imm`,
//!   and a concrete multiple of 4096 becomes a single `lui`.
//!
//! Rewrites never grow a node, so a single pass converges and a second
//! run leaves the image untouched.
//!
//! [`Immediate::fold_constant`]: ../../immediate/enum.Immediate.html#method.fold_constant

use rvsim::{ArithOp, Register};

use super::{evaluate, Linker, LinkError};
use crate::immediate::Immediate;
use crate::storage::{Section, Storage};

/// Half of the signed 21-bit `jal` reach.
const CALL_RELAX_MAX: i32 = ((1 << 19) - 1) / 2;
const CALL_RELAX_MIN: i32 = -(1 << 19) / 2;

const ADDI_MAX: i32 = (1 << 11) - 1;
const ADDI_MIN: i32 = -(1 << 11);
const LUI_UNIT: u32 = 1 << 12;

fn fold_storage(storage: &mut Storage) {
    match storage {
        Storage::ArithmeticImm { imm, .. }
        | Storage::LoadStore { imm, .. }
        | Storage::Branch { imm, .. }
        | Storage::JumpRelative { imm, .. }
        | Storage::JumpRegister { imm, .. }
        | Storage::CallFunction { imm, .. }
        | Storage::LoadImmediate { imm, .. }
        | Storage::LoadUpperImmediate { imm, .. }
        | Storage::AddUpperImmediatePC { imm, .. }
        | Storage::IntegerData { imm, .. } => {
            imm.fold_constant();
        }
        Storage::ArithmeticReg { .. }
        | Storage::Alignment { .. }
        | Storage::ZeroBytes { .. }
        | Storage::Asciz { .. } => {}
    }
}

pub(crate) fn run(linker: &mut Linker) -> Result<(), LinkError> {
    for &section in &Section::LAYOUT_ORDER {
        let ids = linker.sections[section.index()].clone();
        for id in ids {
            for index in 0..linker.chunks[id].storages.len() {
                fold_storage(&mut linker.chunks[id].storages[index]);

                let replacement = {
                    let chunk = &linker.chunks[id];
                    let position = chunk.begin + chunk.offsets[index];
                    match &chunk.storages[index] {
                        Storage::CallFunction { tail, imm } => {
                            relax_call(linker, chunk.file, *tail, imm, position)?
                        }
                        Storage::LoadImmediate { rd, imm } => relax_load_immediate(*rd, imm),
                        _ => None,
                    }
                };

                if let Some(storage) = replacement {
                    linker.chunks[id].storages[index] = storage;
                }
            }
        }
    }
    Ok(())
}

fn relax_call(
    linker: &Linker,
    file: usize,
    tail: bool,
    imm: &Immediate,
    position: u32,
) -> Result<Option<Storage>, LinkError> {
    let destination = evaluate::evaluate(linker, file, imm, position)?;
    let distance = destination.wrapping_sub(position) as i32;

    if (CALL_RELAX_MIN..=CALL_RELAX_MAX).contains(&distance) {
        let rd = if tail { Register::ZERO } else { Register::RA };
        Ok(Some(Storage::JumpRelative {
            rd,
            imm: imm.clone(),
        }))
    } else {
        Ok(None)
    }
}

fn relax_load_immediate(rd: Register, imm: &Immediate) -> Option<Storage> {
    let value = match imm {
        Immediate::Int(value) => *value,
        _ => return None,
    };

    let signed = value as i32;
    if (ADDI_MIN..=ADDI_MAX).contains(&signed) {
        Some(Storage::ArithmeticImm {
            op: ArithOp::ADD,
            rd,
            rs1: Register::ZERO,
            imm: Immediate::Int(value),
        })
    } else if value % LUI_UNIT == 0 {
        Some(Storage::LoadUpperImmediate {
            rd,
            imm: Immediate::Int(value >> 12),
        })
    } else {
        None
    }
}
