//! The per-file assembler: walks the parsed program line by line,
//! tracking the current section and label table, and lowers every
//! directive and (pseudo-)instruction into [`Storage`] nodes.
//!
//! [`Storage`]: ../storage/enum.Storage.html

use std::collections::{HashMap, HashSet};

use pest::iterators::Pair;
use pest::{Parser, Span};

use rvsim::{ArithOp, BranchOp, MemOp, Register};

use crate::immediate::{parse_string_literal, Immediate, RelOp, TreeOp};
use crate::layout::{AssemblyLayout, Label, SourceChunk};
use crate::operands::{self, Operand};
use crate::storage::{DataWidth, Section, Storage};
use crate::{new_parser_error, Result, Rule, RvParser};

const MAX_ALIGN_SHIFT: u32 = 20;
const MAX_ZERO_BYTES: u32 = 1 << 20;

struct LabelInfo {
    line: usize,
    location: Option<(usize, usize)>,
    section: Section,
    global: bool,
}

pub struct Assembler {
    file_name: String,
    current_section: Section,
    chunks: Vec<SourceChunk>,
    labels: HashMap<String, LabelInfo>,
    warned: HashSet<String>,
}

/// Assemble one source file into its layout.
pub fn assemble(file_name: &str, source: &str) -> Result<AssemblyLayout> {
    Assembler::new(file_name)
        .run(source)
        .map_err(|error| error.with_path(file_name))
}

impl Assembler {
    pub fn new(file_name: &str) -> Assembler {
        Assembler {
            file_name: file_name.to_string(),
            current_section: Section::Unknown,
            chunks: vec![SourceChunk::default()],
            labels: HashMap::new(),
            warned: HashSet::new(),
        }
    }

    pub fn run(mut self, source: &str) -> Result<AssemblyLayout> {
        let program = RvParser::parse(Rule::program, source)?.next().unwrap();

        for line in program.into_inner() {
            match line.as_rule() {
                Rule::line => self.process_line(line)?,
                Rule::EOI => {}
                _ => unreachable!(),
            }
        }

        Ok(self.finish())
    }

    fn finish(self) -> AssemblyLayout {
        let mut labels: Vec<Label> = self
            .labels
            .into_iter()
            .filter_map(|(name, info)| {
                let (chunk, index) = info.location?;
                Some(Label {
                    name,
                    line: info.line,
                    chunk,
                    index,
                    global: info.global,
                    section: info.section,
                })
            })
            .collect();
        labels.sort_by_key(|label| (label.chunk, label.index, label.line));

        AssemblyLayout {
            chunks: self.chunks,
            labels,
        }
    }

    fn process_line(&mut self, line: Pair<Rule>) -> Result<()> {
        for item in line.into_inner() {
            match item.as_rule() {
                Rule::label => {
                    let ident = item.into_inner().next().unwrap();
                    self.add_label(&ident)?;
                }
                Rule::statement => {
                    let inner = item.into_inner().next().unwrap();
                    match inner.as_rule() {
                        Rule::directive => self.process_directive(inner)?,
                        Rule::instruction => self.process_instruction(inner)?,
                        _ => unreachable!(),
                    }
                }
                _ => unreachable!(),
            }
        }
        Ok(())
    }

    fn set_section(&mut self, section: Section) {
        self.current_section = section;
        self.chunks.push(SourceChunk {
            section,
            storages: Vec::new(),
        });
    }

    fn push(&mut self, storage: Storage) {
        self.chunks.last_mut().unwrap().storages.push(storage);
    }

    fn add_label(&mut self, ident: &Pair<Rule>) -> Result<()> {
        let name = ident.as_str().to_string();
        let line = ident.as_span().start_pos().line_col().0;

        if let Some(info) = self.labels.get(&name) {
            if info.location.is_some() {
                return Err(new_parser_error(
                    ident.as_span(),
                    format!(
                        "Label \"{}\" already exists\nFirst appearance at line {} in {}",
                        name, info.line, self.file_name
                    ),
                ));
            }
        }
        if self.current_section == Section::Unknown {
            return Err(new_parser_error(
                ident.as_span(),
                "Label must be defined in a section".to_string(),
            ));
        }

        let location = (
            self.chunks.len() - 1,
            self.chunks.last().unwrap().storages.len(),
        );
        let section = self.current_section;
        let info = self.labels.entry(name).or_insert(LabelInfo {
            line,
            location: None,
            section,
            global: false,
        });
        info.line = line;
        info.location = Some(location);
        info.section = section;
        Ok(())
    }

    fn warn_once(&mut self, key: String, message: String) {
        if self.warned.insert(key) {
            eprintln!("warning: {} ({})", message, self.file_name);
        }
    }

    /// Fold an expression operand that must be a plain constant.
    fn constant(&self, pair: Pair<Rule>) -> Result<u32> {
        let span = pair.as_span();
        let mut imm = Immediate::from_expr(pair)?;
        if imm.fold_constant() {
            if let Immediate::Int(value) = imm {
                return Ok(value);
            }
        }
        Err(new_parser_error(
            span,
            "Expected a constant expression".to_string(),
        ))
    }

    fn process_directive(&mut self, pair: Pair<Rule>) -> Result<()> {
        let inner = pair.into_inner().next().unwrap();
        match inner.as_rule() {
            Rule::section_flag => {
                let section = match inner.as_str().trim() {
                    ".text" => Section::Text,
                    ".data" | ".sdata" => Section::Data,
                    ".bss" | ".sbss" => Section::Bss,
                    ".rodata" => Section::Rodata,
                    _ => unreachable!(),
                };
                self.set_section(section);
            }
            Rule::section_dir => {
                let name_pair = inner.into_inner().next().unwrap();
                let name = name_pair.as_str();
                let section = match name.strip_prefix('.') {
                    Some(rest) if rest.starts_with("text") => Section::Text,
                    Some(rest) if rest.starts_with("sdata") || rest.starts_with("data") => {
                        Section::Data
                    }
                    Some(rest) if rest.starts_with("sbss") || rest.starts_with("bss") => {
                        Section::Bss
                    }
                    Some(rest) if rest.starts_with("rodata") => Section::Rodata,
                    _ => {
                        eprintln!("warning: Unknown section: {}", name);
                        Section::Unknown
                    }
                };
                self.set_section(section);
            }
            Rule::align_dir => {
                let expr = inner.into_inner().next().unwrap();
                let span = expr.as_span();
                let shift = self.constant(expr)?;
                if shift >= MAX_ALIGN_SHIFT {
                    return Err(new_parser_error(
                        span,
                        format!("Invalid alignment value: \"{}\"", shift),
                    ));
                }
                self.push(Storage::Alignment { align: 1 << shift });
            }
            Rule::data_dir => {
                let mut pairs = inner.into_inner();
                let keyword = pairs.next().unwrap();
                let width = match keyword.as_str() {
                    ".byte" => DataWidth::Byte,
                    ".half" | ".short" | ".2byte" => DataWidth::Half,
                    _ => DataWidth::Word,
                };
                let imm = Immediate::from_expr(pairs.next().unwrap())?;
                self.push(Storage::IntegerData { width, imm });
            }
            Rule::ascii_dir => {
                let literal = inner.into_inner().next().unwrap();
                let bytes = parse_string_literal(&literal)?;
                self.push(Storage::Asciz { bytes });
            }
            Rule::zero_dir => {
                let expr = inner.into_inner().next().unwrap();
                let span = expr.as_span();
                let count = self.constant(expr)?;
                if count >= MAX_ZERO_BYTES {
                    return Err(new_parser_error(
                        span,
                        format!("Invalid zero count: \"{}\"", count),
                    ));
                }
                self.push(Storage::ZeroBytes { count });
            }
            Rule::globl_dir => {
                let ident = inner.into_inner().next().unwrap();
                let line = ident.as_span().start_pos().line_col().0;
                let section = self.current_section;
                self.labels
                    .entry(ident.as_str().to_string())
                    .or_insert(LabelInfo {
                        line,
                        location: None,
                        section,
                        global: false,
                    })
                    .global = true;
            }
            Rule::set_dir => {
                let mut pairs = inner.into_inner();
                let ident = pairs.next().unwrap();
                let expr = pairs.next().unwrap();
                let span = expr.as_span();
                if !is_current_location(Immediate::from_expr(expr)?) {
                    return Err(new_parser_error(
                        span,
                        "Only `.set name, .` is supported".to_string(),
                    ));
                }
                self.add_label(&ident)?;
            }
            Rule::other_dir => {
                // A known keyword can only end up here when its argument
                // form did not parse.
                const KNOWN: [&str; 21] = [
                    "section", "text", "data", "sdata", "bss", "sbss", "rodata", "align",
                    "p2align", "byte", "half", "short", "2byte", "word", "long", "4byte",
                    "string", "asciz", "zero", "globl", "set",
                ];
                let ident = inner.into_inner().next().unwrap();
                let name = ident.as_str().to_string();
                if KNOWN.contains(&name.as_str()) {
                    return Err(new_parser_error(
                        ident.as_span(),
                        format!("Invalid arguments for .{}", name),
                    ));
                }
                self.warn_once(name.clone(), format!("attribute ignored: .{}", name));
            }
            _ => unreachable!(),
        }
        Ok(())
    }

    fn process_instruction(&mut self, pair: Pair<Rule>) -> Result<()> {
        let span = pair.as_span();
        let mut pairs = pair.into_inner();
        let mnemonic = pairs.next().unwrap();
        let ops = operands::collect(pairs);

        use ArithOp::*;
        use BranchOp::*;
        use MemOp::*;

        match mnemonic.as_str() {
            "add" => self.arith_reg(&span, &ops, ADD),
            "sub" => self.arith_reg(&span, &ops, SUB),
            "and" => self.arith_reg(&span, &ops, AND),
            "or" => self.arith_reg(&span, &ops, OR),
            "xor" => self.arith_reg(&span, &ops, XOR),
            "sll" => self.arith_reg(&span, &ops, SLL),
            "srl" => self.arith_reg(&span, &ops, SRL),
            "sra" => self.arith_reg(&span, &ops, SRA),
            "slt" => self.arith_reg(&span, &ops, SLT),
            "sltu" => self.arith_reg(&span, &ops, SLTU),

            "mul" => self.arith_reg(&span, &ops, MUL),
            "mulh" => self.arith_reg(&span, &ops, MULH),
            "mulhsu" => self.arith_reg(&span, &ops, MULHSU),
            "mulhu" => self.arith_reg(&span, &ops, MULHU),
            "div" => self.arith_reg(&span, &ops, DIV),
            "divu" => self.arith_reg(&span, &ops, DIVU),
            "rem" => self.arith_reg(&span, &ops, REM),
            "remu" => self.arith_reg(&span, &ops, REMU),

            "addi" => self.arith_imm(&span, &ops, ADD),
            "andi" => self.arith_imm(&span, &ops, AND),
            "ori" => self.arith_imm(&span, &ops, OR),
            "xori" => self.arith_imm(&span, &ops, XOR),
            "slli" => self.arith_imm(&span, &ops, SLL),
            "srli" => self.arith_imm(&span, &ops, SRL),
            "srai" => self.arith_imm(&span, &ops, SRA),
            "slti" => self.arith_imm(&span, &ops, SLT),
            "sltiu" => self.arith_imm(&span, &ops, SLTU),

            "lb" => self.load(&span, &ops, LB),
            "lh" => self.load(&span, &ops, LH),
            "lw" => self.load(&span, &ops, LW),
            "lbu" => self.load(&span, &ops, LBU),
            "lhu" => self.load(&span, &ops, LHU),
            "sb" => self.store(&span, &ops, SB),
            "sh" => self.store(&span, &ops, SH),
            "sw" => self.store(&span, &ops, SW),

            "beq" => self.branch(&span, &ops, BEQ, false),
            "bne" => self.branch(&span, &ops, BNE, false),
            "blt" => self.branch(&span, &ops, BLT, false),
            "bge" => self.branch(&span, &ops, BGE, false),
            "bltu" => self.branch(&span, &ops, BLTU, false),
            "bgeu" => self.branch(&span, &ops, BGEU, false),

            "ble" => self.branch(&span, &ops, BGE, true),
            "bleu" => self.branch(&span, &ops, BGEU, true),
            "bgt" => self.branch(&span, &ops, BLT, true),
            "bgtu" => self.branch(&span, &ops, BLTU, true),

            "beqz" => self.branch_zero(&span, &ops, BEQ, false),
            "bnez" => self.branch_zero(&span, &ops, BNE, false),
            "bltz" => self.branch_zero(&span, &ops, BLT, false),
            "bgez" => self.branch_zero(&span, &ops, BGE, false),
            "bgtz" => self.branch_zero(&span, &ops, BLT, true),
            "blez" => self.branch_zero(&span, &ops, BGE, true),

            "jal" => self.jump(&span, &ops),
            "jalr" => self.jump_register(&span, &ops),
            "lui" => self.upper(&span, &ops, false),
            "auipc" => self.upper(&span, &ops, true),

            "mv" => self.two_regs(&span, &ops, |rd, rs1| Storage::ArithmeticImm {
                op: ADD,
                rd,
                rs1,
                imm: Immediate::Int(0),
            }),
            "not" => self.two_regs(&span, &ops, |rd, rs1| Storage::ArithmeticImm {
                op: XOR,
                rd,
                rs1,
                imm: Immediate::Int(-1i32 as u32),
            }),
            "neg" => self.two_regs(&span, &ops, |rd, rs1| Storage::ArithmeticReg {
                op: SUB,
                rd,
                rs1: Register::ZERO,
                rs2: rs1,
            }),
            "seqz" => self.two_regs(&span, &ops, |rd, rs1| Storage::ArithmeticImm {
                op: SLTU,
                rd,
                rs1,
                imm: Immediate::Int(1),
            }),
            "snez" => self.two_regs(&span, &ops, |rd, rs1| Storage::ArithmeticReg {
                op: SLTU,
                rd,
                rs1: Register::ZERO,
                rs2: rs1,
            }),
            "sgtz" => self.two_regs(&span, &ops, |rd, rs1| Storage::ArithmeticReg {
                op: SLT,
                rd,
                rs1: Register::ZERO,
                rs2: rs1,
            }),
            "sltz" => self.two_regs(&span, &ops, |rd, rs1| Storage::ArithmeticReg {
                op: SLT,
                rd,
                rs1,
                rs2: Register::ZERO,
            }),

            "li" | "la" | "lla" => self.load_immediate(&span, &ops),

            "call" => self.call(&span, &ops, false),
            "tail" => self.call(&span, &ops, true),

            "j" => {
                operands::expect_count(&span, &ops, 1)?;
                let imm = operands::immediate(&ops[0])?;
                self.push(Storage::JumpRelative {
                    rd: Register::ZERO,
                    imm,
                });
                Ok(())
            }
            "jr" => {
                operands::expect_count(&span, &ops, 1)?;
                let rs1 = operands::register(&ops[0])?;
                self.push(Storage::JumpRegister {
                    rd: Register::ZERO,
                    rs1,
                    imm: Immediate::Int(0),
                });
                Ok(())
            }
            "ret" => {
                operands::expect_count(&span, &ops, 0)?;
                self.push(Storage::JumpRegister {
                    rd: Register::ZERO,
                    rs1: Register::RA,
                    imm: Immediate::Int(0),
                });
                Ok(())
            }
            "nop" => {
                operands::expect_count(&span, &ops, 0)?;
                self.push(Storage::ArithmeticImm {
                    op: ADD,
                    rd: Register::ZERO,
                    rs1: Register::ZERO,
                    imm: Immediate::Int(0),
                });
                Ok(())
            }

            other => Err(new_parser_error(
                mnemonic.as_span(),
                format!("Unknown command \"{}\"", other),
            )),
        }
    }

    fn arith_reg(&mut self, span: &Span, ops: &[Operand], op: ArithOp) -> Result<()> {
        operands::expect_count(span, ops, 3)?;
        let rd = operands::register(&ops[0])?;
        let rs1 = operands::register(&ops[1])?;
        let rs2 = operands::register(&ops[2])?;
        self.push(Storage::ArithmeticReg { op, rd, rs1, rs2 });
        Ok(())
    }

    fn arith_imm(&mut self, span: &Span, ops: &[Operand], op: ArithOp) -> Result<()> {
        operands::expect_count(span, ops, 3)?;
        let rd = operands::register(&ops[0])?;
        let rs1 = operands::register(&ops[1])?;
        let imm = operands::immediate(&ops[2])?;
        self.push(Storage::ArithmeticImm { op, rd, rs1, imm });
        Ok(())
    }

    fn load(&mut self, span: &Span, ops: &[Operand], op: MemOp) -> Result<()> {
        operands::expect_count(span, ops, 2)?;
        let rd = operands::register(&ops[0])?;
        if operands::has_base(&ops[1]) {
            let (imm, rs1) = operands::offset_register(&ops[1])?;
            self.push(Storage::LoadStore { op, rd, rs1, imm });
        } else {
            // Symbol form: the destination doubles as the address
            // temporary.
            let imm = operands::immediate(&ops[1])?;
            self.push_hi_lo_access(op, rd, rd, imm);
        }
        Ok(())
    }

    fn store(&mut self, span: &Span, ops: &[Operand], op: MemOp) -> Result<()> {
        match ops.len() {
            2 => {
                let rs2 = operands::register(&ops[0])?;
                let (imm, rs1) = operands::offset_register(&ops[1])?;
                self.push(Storage::LoadStore {
                    op,
                    rd: rs2,
                    rs1,
                    imm,
                });
                Ok(())
            }
            3 => {
                // Symbol form with an explicit address temporary.
                let rs2 = operands::register(&ops[0])?;
                let imm = operands::immediate(&ops[1])?;
                let rt = operands::register(&ops[2])?;
                self.push_hi_lo_access(op, rs2, rt, imm);
                Ok(())
            }
            _ => Err(new_parser_error(
                span.clone(),
                format!("Expected 2 or 3 operands, got {}", ops.len()),
            )),
        }
    }

    fn push_hi_lo_access(&mut self, op: MemOp, value: Register, temp: Register, imm: Immediate) {
        self.push(Storage::LoadUpperImmediate {
            rd: temp,
            imm: Immediate::Relocated(RelOp::Hi, Box::new(imm.clone())),
        });
        self.push(Storage::LoadStore {
            op,
            rd: value,
            rs1: temp,
            imm: Immediate::Relocated(RelOp::Lo, Box::new(imm)),
        });
    }

    fn branch(&mut self, span: &Span, ops: &[Operand], op: BranchOp, swap: bool) -> Result<()> {
        operands::expect_count(span, ops, 3)?;
        let mut rs1 = operands::register(&ops[0])?;
        let mut rs2 = operands::register(&ops[1])?;
        let imm = operands::immediate(&ops[2])?;
        if swap {
            std::mem::swap(&mut rs1, &mut rs2);
        }
        self.push(Storage::Branch { op, rs1, rs2, imm });
        Ok(())
    }

    fn branch_zero(&mut self, span: &Span, ops: &[Operand], op: BranchOp, swap: bool) -> Result<()> {
        operands::expect_count(span, ops, 2)?;
        let reg = operands::register(&ops[0])?;
        let imm = operands::immediate(&ops[1])?;
        let (rs1, rs2) = if swap {
            (Register::ZERO, reg)
        } else {
            (reg, Register::ZERO)
        };
        self.push(Storage::Branch { op, rs1, rs2, imm });
        Ok(())
    }

    fn jump(&mut self, span: &Span, ops: &[Operand]) -> Result<()> {
        match ops.len() {
            1 => {
                let imm = operands::immediate(&ops[0])?;
                self.push(Storage::JumpRelative {
                    rd: Register::RA,
                    imm,
                });
                Ok(())
            }
            2 => {
                let rd = operands::register(&ops[0])?;
                let imm = operands::immediate(&ops[1])?;
                self.push(Storage::JumpRelative { rd, imm });
                Ok(())
            }
            _ => Err(new_parser_error(
                span.clone(),
                format!("Expected 1 or 2 operands, got {}", ops.len()),
            )),
        }
    }

    fn jump_register(&mut self, span: &Span, ops: &[Operand]) -> Result<()> {
        match ops.len() {
            1 => {
                let rs1 = operands::register(&ops[0])?;
                self.push(Storage::JumpRegister {
                    rd: Register::RA,
                    rs1,
                    imm: Immediate::Int(0),
                });
                Ok(())
            }
            2 => {
                let rd = operands::register(&ops[0])?;
                let (imm, rs1) = operands::offset_register(&ops[1])?;
                self.push(Storage::JumpRegister { rd, rs1, imm });
                Ok(())
            }
            _ => Err(new_parser_error(
                span.clone(),
                format!("Expected 1 or 2 operands, got {}", ops.len()),
            )),
        }
    }

    fn upper(&mut self, span: &Span, ops: &[Operand], pc_relative: bool) -> Result<()> {
        operands::expect_count(span, ops, 2)?;
        let rd = operands::register(&ops[0])?;
        let imm = operands::immediate(&ops[1])?;
        self.push(if pc_relative {
            Storage::AddUpperImmediatePC { rd, imm }
        } else {
            Storage::LoadUpperImmediate { rd, imm }
        });
        Ok(())
    }

    fn two_regs<F>(&mut self, span: &Span, ops: &[Operand], build: F) -> Result<()>
    where
        F: FnOnce(Register, Register) -> Storage,
    {
        operands::expect_count(span, ops, 2)?;
        let rd = operands::register(&ops[0])?;
        let rs1 = operands::register(&ops[1])?;
        self.push(build(rd, rs1));
        Ok(())
    }

    fn load_immediate(&mut self, span: &Span, ops: &[Operand]) -> Result<()> {
        operands::expect_count(span, ops, 2)?;
        let rd = operands::register(&ops[0])?;
        let imm = operands::immediate(&ops[1])?;
        self.push(Storage::LoadImmediate { rd, imm });
        Ok(())
    }

    fn call(&mut self, span: &Span, ops: &[Operand], tail: bool) -> Result<()> {
        operands::expect_count(span, ops, 1)?;
        let imm = operands::immediate(&ops[0])?;
        self.push(Storage::CallFunction { tail, imm });
        Ok(())
    }
}

/// Accept exactly `.` or `. + 0` as the value of a `.set`.
fn is_current_location(imm: Immediate) -> bool {
    let here = |imm: &Immediate| imm.clone().unwrap_single() == Immediate::Symbol(".".to_string());
    match imm.unwrap_single() {
        Immediate::Symbol(ref name) => name == ".",
        Immediate::Tree(items) => {
            items.len() == 2
                && here(&items[0].0)
                && items[0].1 == TreeOp::Add
                && items[1].0.clone().unwrap_single() == Immediate::Int(0)
                && items[1].1 == TreeOp::End
        }
        _ => false,
    }
}
