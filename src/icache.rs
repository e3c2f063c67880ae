//! The instruction cache: one slot per 32-bit word of text, holding the
//! decoded handler and its operand metadata.
//!
//! Slots start empty and are filled the first time their address is
//! executed; a slot never changes afterwards (self-modifying code is not
//! supported). The slots covering the libc trampoline range are pre-seeded
//! with their host-side handlers, so a `jalr` into low text memory lands
//! directly in the emulated function.

use crate::constants::{TEXT_BASE, WORD_BYTES};
use crate::device::{Device, Meter};
use crate::error::FailToInterpret;
use crate::interpreter::handlers;
use crate::interpreter::RegisterFile;
use crate::layout::MemoryLayout;
use crate::libc;
use crate::memory::Memory;
use crate::riscv::command::{self, opcode, FUNCT7_SRA};
use crate::riscv::{int_to_reg, Register};
use crate::Word;

pub type Handler =
    fn(&MetaData, &mut RegisterFile, &mut Memory, &mut Device) -> Result<(), FailToInterpret>;

/// The decoded operand fields a handler needs. For stores `rs2` is the
/// value register; immediates are pre-sign-extended (and pre-shifted for
/// the upper-immediate formats).
#[derive(Clone, Copy, Debug, Default)]
pub struct MetaData {
    pub rd: Register,
    pub rs1: Register,
    pub rs2: Register,
    pub imm: u32,
}

#[derive(Clone, Copy, Debug)]
pub struct Executable {
    pub func: Handler,
    pub meta: MetaData,
}

impl Executable {
    pub fn run(
        &self,
        rf: &mut RegisterFile,
        mem: &mut Memory,
        dev: &mut Device,
    ) -> Result<(), FailToInterpret> {
        (self.func)(&self.meta, rf, mem, dev)
    }
}

/// Decode one instruction word into its handler and metadata. `None` for
/// anything outside the supported RV32IM subset.
pub fn decode(word: Word) -> Option<Executable> {
    let rd = int_to_reg(command::get_rd(word));
    let rs1 = int_to_reg(command::get_rs1(word));
    let rs2 = int_to_reg(command::get_rs2(word));
    let funct3 = command::get_funct3(word);
    let funct7 = command::get_funct7(word);

    let exe = |func: Handler, meta: MetaData| Some(Executable { func, meta });
    let reg3 = MetaData {
        rd,
        rs1,
        rs2,
        imm: 0,
    };

    match command::get_opcode(word) {
        opcode::OP => {
            let func: Handler = match (funct7, funct3) {
                (0b000_0000, 0b000) => handlers::add,
                (0b010_0000, 0b000) => handlers::sub,
                (0b000_0000, 0b001) => handlers::sll,
                (0b000_0000, 0b010) => handlers::slt,
                (0b000_0000, 0b011) => handlers::sltu,
                (0b000_0000, 0b100) => handlers::xor,
                (0b000_0000, 0b101) => handlers::srl,
                (0b010_0000, 0b101) => handlers::sra,
                (0b000_0000, 0b110) => handlers::or,
                (0b000_0000, 0b111) => handlers::and,
                (0b000_0001, 0b000) => handlers::mul,
                (0b000_0001, 0b001) => handlers::mulh,
                (0b000_0001, 0b010) => handlers::mulhsu,
                (0b000_0001, 0b011) => handlers::mulhu,
                (0b000_0001, 0b100) => handlers::div,
                (0b000_0001, 0b101) => handlers::divu,
                (0b000_0001, 0b110) => handlers::rem,
                (0b000_0001, 0b111) => handlers::remu,
                _ => return None,
            };
            exe(func, reg3)
        }
        opcode::OP_IMM => {
            let imm = command::imm_i(word);
            let meta = MetaData {
                rd,
                rs1,
                rs2: Register::ZERO,
                imm,
            };
            match funct3 {
                0b000 => exe(handlers::addi, meta),
                0b010 => exe(handlers::slti, meta),
                0b011 => exe(handlers::sltiu, meta),
                0b100 => exe(handlers::xori, meta),
                0b110 => exe(handlers::ori, meta),
                0b111 => exe(handlers::andi, meta),
                0b001 if funct7 == 0 => exe(handlers::slli, MetaData { imm: imm & 0x1F, ..meta }),
                0b101 if funct7 == 0 => exe(handlers::srli, MetaData { imm: imm & 0x1F, ..meta }),
                0b101 if funct7 == FUNCT7_SRA => {
                    exe(handlers::srai, MetaData { imm: imm & 0x1F, ..meta })
                }
                _ => None,
            }
        }
        opcode::LOAD => {
            let meta = MetaData {
                rd,
                rs1,
                rs2: Register::ZERO,
                imm: command::imm_i(word),
            };
            match funct3 {
                0b000 => exe(handlers::lb, meta),
                0b001 => exe(handlers::lh, meta),
                0b010 => exe(handlers::lw, meta),
                0b100 => exe(handlers::lbu, meta),
                0b101 => exe(handlers::lhu, meta),
                _ => None,
            }
        }
        opcode::STORE => {
            let meta = MetaData {
                rd: Register::ZERO,
                rs1,
                rs2,
                imm: command::imm_s(word),
            };
            match funct3 {
                0b000 => exe(handlers::sb, meta),
                0b001 => exe(handlers::sh, meta),
                0b010 => exe(handlers::sw, meta),
                _ => None,
            }
        }
        opcode::BRANCH => {
            let meta = MetaData {
                rd: Register::ZERO,
                rs1,
                rs2,
                imm: command::imm_b(word),
            };
            match funct3 {
                0b000 => exe(handlers::beq, meta),
                0b001 => exe(handlers::bne, meta),
                0b100 => exe(handlers::blt, meta),
                0b101 => exe(handlers::bge, meta),
                0b110 => exe(handlers::bltu, meta),
                0b111 => exe(handlers::bgeu, meta),
                _ => None,
            }
        }
        opcode::LUI => exe(
            handlers::lui,
            MetaData {
                rd,
                rs1: Register::ZERO,
                rs2: Register::ZERO,
                imm: command::imm_u(word),
            },
        ),
        opcode::AUIPC => exe(
            handlers::auipc,
            MetaData {
                rd,
                rs1: Register::ZERO,
                rs2: Register::ZERO,
                imm: command::imm_u(word),
            },
        ),
        opcode::JAL => exe(
            handlers::jal,
            MetaData {
                rd,
                rs1: Register::ZERO,
                rs2: Register::ZERO,
                imm: command::imm_j(word),
            },
        ),
        opcode::JALR if funct3 == 0 => exe(
            handlers::jalr,
            MetaData {
                rd,
                rs1,
                rs2: Register::ZERO,
                imm: command::imm_i(word),
            },
        ),
        _ => None,
    }
}

pub struct ICache {
    slots: Vec<Option<Executable>>,
}

impl ICache {
    /// Build the cache covering `[TEXT_BASE, text.end())`, with the libc
    /// range already compiled.
    pub fn new(layout: &MemoryLayout) -> ICache {
        let text_end = layout.text.end();
        debug_assert!(text_end >= TEXT_BASE);
        debug_assert_eq!(text_end % WORD_BYTES, 0);

        let count = ((text_end - TEXT_BASE) / WORD_BYTES) as usize;
        let mut slots = vec![None; count];

        for (index, &func) in libc::HANDLERS.iter().enumerate().take(count) {
            slots[index] = Some(Executable {
                func,
                meta: MetaData::default(),
            });
        }

        ICache { slots }
    }

    /// The slot index for `pc`, usable as a fetch hint.
    pub fn slot_index(&self, pc: u32) -> Option<usize> {
        if pc % WORD_BYTES != 0 {
            return None;
        }
        let index = (pc.checked_sub(TEXT_BASE)? / WORD_BYTES) as usize;
        if index < self.slots.len() {
            Some(index)
        } else {
            None
        }
    }

    /// Fetch the executable for `pc`, decoding it on first use. A valid
    /// `hint` (from [`slot_index`](#method.slot_index)) skips the address
    /// checks.
    pub fn ifetch(
        &mut self,
        pc: u32,
        hint: Option<usize>,
        mem: &Memory,
        dev: &mut Device,
    ) -> Result<Executable, FailToInterpret> {
        let index = match hint {
            Some(index) => index,
            None => {
                if pc % WORD_BYTES != 0 {
                    return Err(FailToInterpret::InsMisAligned {
                        addr: pc,
                        align: WORD_BYTES,
                    });
                }
                match self.slot_index(pc) {
                    Some(index) => index,
                    None => {
                        return Err(FailToInterpret::InsOutOfBound {
                            addr: pc,
                            size: WORD_BYTES,
                        })
                    }
                }
            }
        };

        if let Some(exe) = self.slots[index] {
            return Ok(exe);
        }

        dev.bump(Meter::IPARSE);
        let word = mem.load_cmd(pc)?;
        let exe = decode(word).ok_or(FailToInterpret::InsUnknown { addr: pc, word })?;
        self.slots[index] = Some(exe);
        Ok(exe)
    }
}
