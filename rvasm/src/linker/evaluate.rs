//! Symbol resolution and final immediate evaluation.

use super::{Linker, LinkError, SymbolLocation};
use crate::immediate::{split_lo_hi, Immediate, RelOp, TreeOp};

pub(crate) fn location_address(linker: &Linker, location: &SymbolLocation) -> u32 {
    match *location {
        SymbolLocation::Absolute(address) => address,
        SymbolLocation::Chunk { chunk, index } => {
            let chunk = &linker.chunks[chunk];
            chunk.begin + chunk.offsets[index]
        }
    }
}

/// Look a name up in the file's local table first, then globally.
pub(crate) fn resolve(linker: &Linker, file: usize, name: &str) -> Result<u32, LinkError> {
    linker.locals[file]
        .get(name)
        .or_else(|| linker.globals.get(name))
        .map(|location| location_address(linker, location))
        .ok_or_else(|| LinkError::UnknownSymbol {
            name: name.to_string(),
        })
}

/// Evaluate an immediate down to its concrete value. `position` is the
/// address of the storage under evaluation; it resolves the `.` symbol
/// and anchors the pc-relative relocations.
pub(crate) fn evaluate(
    linker: &Linker,
    file: usize,
    imm: &Immediate,
    position: u32,
) -> Result<u32, LinkError> {
    match imm {
        Immediate::Int(value) => Ok(*value),
        Immediate::Symbol(name) => {
            if name == "." {
                Ok(position)
            } else {
                resolve(linker, file, name)
            }
        }
        Immediate::Relocated(op, inner) => {
            let value = evaluate(linker, file, inner, position)?;
            Ok(match op {
                RelOp::Hi => split_lo_hi(value).hi,
                RelOp::Lo => split_lo_hi(value).lo,
                RelOp::PcrelHi => split_lo_hi(value.wrapping_sub(position)).hi,
                RelOp::PcrelLo => split_lo_hi(value.wrapping_sub(position)).lo,
            })
        }
        Immediate::Tree(items) => {
            let mut result = 0u32;
            let mut last_op = TreeOp::Add;
            for (sub, op) in items.iter() {
                let value = evaluate(linker, file, sub, position)?;
                result = match last_op {
                    TreeOp::Add => result.wrapping_add(value),
                    TreeOp::Sub => result.wrapping_sub(value),
                    TreeOp::End => unreachable!(),
                };
                last_op = *op;
            }
            debug_assert_eq!(last_op, TreeOp::End);
            Ok(result)
        }
    }
}
