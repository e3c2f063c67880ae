use std::ops::{Index, IndexMut};

use crate::constants::REGISTER_COUNT;
use crate::riscv::{register_index, Register};

/// The 32 integer registers plus the program counter.
#[derive(Clone, Debug, Default)]
pub struct RegisterFile {
    regs: [u32; REGISTER_COUNT],
    pc: u32,
}

impl RegisterFile {
    pub fn new() -> RegisterFile {
        RegisterFile::default()
    }

    pub fn pc(&self) -> u32 {
        self.pc
    }

    pub fn set_pc(&mut self, value: u32) {
        self.pc = value;
    }

    /// Step past the current instruction.
    #[inline]
    pub fn advance(&mut self) {
        self.pc = self.pc.wrapping_add(crate::constants::WORD_BYTES);
    }

    /// Dump in four columns, for trap diagnostics and the detail report.
    pub fn dump(&self) -> String {
        use num::traits::FromPrimitive;
        let mut out = String::new();
        for row in 0..8 {
            for col in 0..4 {
                let index = col * 8 + row;
                let reg = Register::from_usize(index).unwrap();
                out.push_str(&format!("{:>4} = {:08x}   ", reg.name(), self.regs[index]));
            }
            out.push('\n');
        }
        out.push_str(&format!("  pc = {:08x}\n", self.pc));
        out
    }
}

impl Index<Register> for RegisterFile {
    type Output = u32;

    fn index(&self, reg: Register) -> &u32 {
        &self.regs[register_index(reg)]
    }
}

impl IndexMut<Register> for RegisterFile {
    fn index_mut(&mut self, reg: Register) -> &mut u32 {
        &mut self.regs[register_index(reg)]
    }
}
