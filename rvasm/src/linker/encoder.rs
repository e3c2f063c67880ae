//! The encoding pass: evaluate every immediate (all of which must now be
//! resolvable) and emit bit-exact RV32IM words and data bytes into the
//! section images.

use byteorder::ByteOrder;
use util::Endian;

use rvsim::riscv::command::{self, opcode, FUNCT7_SRA};
use rvsim::riscv::{ArithOp, Register};
use rvsim::{MemoryLayout, Section as OutSection};

use super::{evaluate, Linker, LinkError};
use crate::immediate::split_lo_hi;
use crate::storage::{DataWidth, Section, Storage};

struct Emitter<'o> {
    out: &'o mut Vec<u8>,
    position: u32,
}

impl<'o> Emitter<'o> {
    fn align_to(&mut self, alignment: u32) {
        debug_assert!(alignment.is_power_of_two());
        let mask = alignment - 1;
        let target = (self.position + mask) & !mask;
        while self.position < target {
            self.out.push(0);
            self.position += 1;
        }
    }

    fn push_byte(&mut self, value: u8) {
        self.out.push(value);
        self.position += 1;
    }

    fn push_half(&mut self, value: u16) {
        let mut buffer = [0u8; 2];
        Endian::write_u16(&mut buffer, value);
        self.out.extend_from_slice(&buffer);
        self.position += 2;
    }

    fn push_word(&mut self, value: u32) {
        let mut buffer = [0u8; 4];
        Endian::write_u32(&mut buffer, value);
        self.out.extend_from_slice(&buffer);
        self.position += 4;
    }

    fn push_command(&mut self, word: u32) {
        debug_assert_eq!(self.position % 4, 0, "command is not aligned");
        self.push_word(word);
    }
}

pub(crate) fn run(linker: &Linker) -> Result<MemoryLayout, LinkError> {
    let mut result = MemoryLayout::default();

    encode_section(linker, Section::Text, &mut result.text)?;
    encode_section(linker, Section::Data, &mut result.data)?;
    encode_section(linker, Section::Rodata, &mut result.rodata)?;
    encode_section(linker, Section::Unknown, &mut result.unknown)?;
    encode_section(linker, Section::Bss, &mut result.bss)?;

    if result.text.bytes.is_empty() {
        result.text.start = rvsim::libc::LIBC_END;
    }

    let text_end = result.text.end();
    connect(text_end, &mut result.data);
    let data_end = result.data.end();
    connect(data_end, &mut result.rodata);
    let rodata_end = result.rodata.end();
    connect(rodata_end, &mut result.unknown);
    let unknown_end = result.unknown.end();
    connect(unknown_end, &mut result.bss);

    for (name, location) in &linker.globals {
        result
            .position_table
            .insert(name.clone(), evaluate::location_address(linker, location));
    }

    if !result.position_table.contains_key("main") {
        return Err(LinkError::MissingMain);
    }

    debug_assert!(
        result.text.end() <= result.data.begin()
            && result.data.end() <= result.rodata.begin()
            && result.rodata.end() <= result.unknown.begin()
            && result.unknown.end() <= result.bss.begin()
    );

    Ok(result)
}

/// An empty section sits right where its predecessor ends.
fn connect(previous_end: u32, next: &mut OutSection) {
    if next.bytes.is_empty() {
        next.start = previous_end;
    }
}

fn encode_section(
    linker: &Linker,
    section: Section,
    out: &mut OutSection,
) -> Result<(), LinkError> {
    let ids = &linker.sections[section.index()];
    if ids.is_empty() {
        return Ok(());
    }

    out.start = linker.chunks[ids[0]].begin;
    let mut emitter = Emitter {
        out: &mut out.bytes,
        position: out.start,
    };

    for &id in ids {
        let chunk = &linker.chunks[id];
        debug_assert_eq!(emitter.position, chunk.begin);
        for (index, storage) in chunk.storages.iter().enumerate() {
            debug_assert_eq!(emitter.position, chunk.begin + chunk.offsets[index]);
            encode_storage(linker, chunk.file, storage, &mut emitter)?;
        }
        debug_assert_eq!(
            emitter.position,
            chunk.begin + chunk.offsets[chunk.storages.len()]
        );
    }

    Ok(())
}

fn encode_storage(
    linker: &Linker,
    file: usize,
    storage: &Storage,
    emitter: &mut Emitter,
) -> Result<(), LinkError> {
    if storage.is_command() {
        emitter.align_to(4);
    }
    let position = emitter.position;
    let eval = |imm, position| evaluate::evaluate(linker, file, imm, position);

    match storage {
        Storage::ArithmeticReg { op, rd, rs1, rs2 } => {
            emitter.push_command(command::encode_r(op.funct3(), op.funct7(), *rd, *rs1, *rs2));
        }
        Storage::ArithmeticImm { op, rd, rs1, imm } => {
            let mut value = eval(imm, position)?;
            if *op == ArithOp::SRA {
                // srai owes its funct7 to the immediate field.
                value = (value & 0x1F) | (FUNCT7_SRA << 5);
            }
            emitter.push_command(command::encode_i(
                opcode::OP_IMM,
                op.funct3(),
                *rd,
                *rs1,
                value,
            ));
        }
        Storage::LoadStore { op, rd, rs1, imm } => {
            let value = eval(imm, position)?;
            let word = if op.is_load() {
                command::encode_i(opcode::LOAD, op.funct3(), *rd, *rs1, value)
            } else {
                command::encode_s(op.funct3(), *rs1, *rd, value)
            };
            emitter.push_command(word);
        }
        Storage::Branch { op, rs1, rs2, imm } => {
            let target = eval(imm, position)?;
            let distance = target.wrapping_sub(position);
            emitter.push_command(command::encode_b(op.funct3(), *rs1, *rs2, distance));
        }
        Storage::JumpRelative { rd, imm } => {
            let target = eval(imm, position)?;
            let distance = target.wrapping_sub(position);
            emitter.push_command(command::encode_j(*rd, distance));
        }
        Storage::JumpRegister { rd, rs1, imm } => {
            let value = eval(imm, position)?;
            emitter.push_command(command::encode_i(opcode::JALR, 0, *rd, *rs1, value));
        }
        Storage::CallFunction { tail, imm } => {
            let target = eval(imm, position)?;
            let split = split_lo_hi(target.wrapping_sub(position));

            // Register usage fixed by the RISC-V assembler manual.
            let (temp, ret) = if *tail {
                (Register::T1, Register::ZERO)
            } else {
                (Register::RA, Register::RA)
            };
            emitter.push_command(command::encode_u(opcode::AUIPC, temp, split.hi));
            emitter.push_command(command::encode_i(opcode::JALR, 0, ret, temp, split.lo));
        }
        Storage::LoadImmediate { rd, imm } => {
            let split = split_lo_hi(eval(imm, position)?);
            emitter.push_command(command::encode_u(opcode::LUI, *rd, split.hi));
            emitter.push_command(command::encode_i(opcode::OP_IMM, 0, *rd, *rd, split.lo));
        }
        Storage::LoadUpperImmediate { rd, imm } => {
            let value = eval(imm, position)?;
            emitter.push_command(command::encode_u(opcode::LUI, *rd, value));
        }
        Storage::AddUpperImmediatePC { rd, imm } => {
            let value = eval(imm, position)?;
            emitter.push_command(command::encode_u(opcode::AUIPC, *rd, value));
        }
        Storage::Alignment { align } => {
            emitter.align_to(*align);
        }
        Storage::IntegerData { width, imm } => {
            emitter.align_to(width.size());
            let value = eval(imm, emitter.position)?;
            match width {
                DataWidth::Byte => emitter.push_byte(value as u8),
                DataWidth::Half => emitter.push_half(value as u16),
                DataWidth::Word => emitter.push_word(value),
            }
        }
        Storage::ZeroBytes { count } => {
            emitter.align_to(1);
            for _ in 0..*count {
                emitter.push_byte(0);
            }
        }
        Storage::Asciz { bytes } => {
            emitter.align_to(1);
            for &byte in bytes {
                emitter.push_byte(byte);
            }
            emitter.push_byte(0);
        }
    }
    Ok(())
}
