//! The RV32IM register and operation model shared by the assembler's
//! encoder and the interpreter's decoder.

pub mod command;

use num::traits::{FromPrimitive, ToPrimitive};
use util::EnumFromStr;
use util_derive::EnumFromStr;

/// The 32 integer registers, in x-register order so that the enum value
/// is the 5-bit field encoded into instructions.
#[derive(Clone, Copy, PartialEq, Eq, Debug, ToPrimitive, FromPrimitive, EnumFromStr)]
pub enum Register {
    ZERO,
    RA,
    SP,
    GP,
    TP,
    T0,
    T1,
    T2,
    S0,
    S1,
    A0,
    A1,
    A2,
    A3,
    A4,
    A5,
    A6,
    A7,
    S2,
    S3,
    S4,
    S5,
    S6,
    S7,
    S8,
    S9,
    S10,
    S11,
    T3,
    T4,
    T5,
    T6,
}

impl Register {
    /// Parse an assembly-level register name: an ABI name (`zero`, `ra`,
    /// `t0`, ...), the frame-pointer alias `fp`, or a numeric `x0`-`x31`.
    pub fn parse(name: &str) -> Option<Register> {
        if name == "fp" {
            return Some(Register::S0);
        }
        if let Some(digits) = name.strip_prefix('x') {
            let index: u32 = digits.parse().ok()?;
            return Register::from_u32(index);
        }
        EnumFromStr::from_str(&name.to_uppercase()).ok()
    }

    /// The ABI name, as printed in diagnostics.
    pub fn name(self) -> &'static str {
        const NAMES: [&str; 32] = [
            "zero", "ra", "sp", "gp", "tp", "t0", "t1", "t2", "s0", "s1", "a0", "a1", "a2", "a3",
            "a4", "a5", "a6", "a7", "s2", "s3", "s4", "s5", "s6", "s7", "s8", "s9", "s10", "s11",
            "t3", "t4", "t5", "t6",
        ];
        NAMES[register_index(self)]
    }
}

impl Default for Register {
    fn default() -> Register {
        Register::ZERO
    }
}

#[inline]
pub fn enum_to_u32<T: ToPrimitive + Copy>(val: T) -> u32 {
    val.to_u32().unwrap()
}

#[inline]
pub fn register_index(reg: Register) -> usize {
    enum_to_u32(reg) as usize
}

#[inline]
pub fn int_to_reg(value: u32) -> Register {
    // Any 5-bit field is a valid register.
    Register::from_u32(value & 0x1F).unwrap()
}

/// Register-register and register-immediate ALU operations, including
/// the M extension.
#[derive(Clone, Copy, PartialEq, Eq, Debug, ToPrimitive, FromPrimitive, EnumFromStr)]
pub enum ArithOp {
    ADD,
    SUB,
    SLL,
    SLT,
    SLTU,
    XOR,
    SRL,
    SRA,
    OR,
    AND,
    MUL,
    MULH,
    MULHSU,
    MULHU,
    DIV,
    DIVU,
    REM,
    REMU,
}

impl ArithOp {
    pub fn funct3(self) -> u32 {
        use ArithOp::*;
        match self {
            ADD | SUB => 0b000,
            SLL => 0b001,
            SLT => 0b010,
            SLTU => 0b011,
            XOR => 0b100,
            SRL | SRA => 0b101,
            OR => 0b110,
            AND => 0b111,
            MUL => 0b000,
            MULH => 0b001,
            MULHSU => 0b010,
            MULHU => 0b011,
            DIV => 0b100,
            DIVU => 0b101,
            REM => 0b110,
            REMU => 0b111,
        }
    }

    pub fn funct7(self) -> u32 {
        use ArithOp::*;
        match self {
            SUB | SRA => 0b010_0000,
            MUL | MULH | MULHSU | MULHU | DIV | DIVU | REM | REMU => 0b000_0001,
            _ => 0b000_0000,
        }
    }
}

/// Memory access operations (the load and store funct3 spaces).
#[derive(Clone, Copy, PartialEq, Eq, Debug, ToPrimitive, FromPrimitive, EnumFromStr)]
pub enum MemOp {
    LB,
    LH,
    LW,
    LBU,
    LHU,
    SB,
    SH,
    SW,
}

impl MemOp {
    pub fn funct3(self) -> u32 {
        use MemOp::*;
        match self {
            LB | SB => 0b000,
            LH | SH => 0b001,
            LW | SW => 0b010,
            LBU => 0b100,
            LHU => 0b101,
        }
    }

    pub fn is_load(self) -> bool {
        use MemOp::*;
        matches!(self, LB | LH | LW | LBU | LHU)
    }
}

/// Conditional branch operations.
#[derive(Clone, Copy, PartialEq, Eq, Debug, ToPrimitive, FromPrimitive, EnumFromStr)]
pub enum BranchOp {
    BEQ,
    BNE,
    BLT,
    BGE,
    BLTU,
    BGEU,
}

impl BranchOp {
    pub fn funct3(self) -> u32 {
        use BranchOp::*;
        match self {
            BEQ => 0b000,
            BNE => 0b001,
            BLT => 0b100,
            BGE => 0b101,
            BLTU => 0b110,
            BGEU => 0b111,
        }
    }
}

macro_rules! impl_enum_display {
    ($e:ty) => {
        impl std::fmt::Display for $e {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                std::fmt::Debug::fmt(self, f)
            }
        }
    };
}

impl_enum_display!(Register);
impl_enum_display!(ArithOp);
impl_enum_display!(MemOp);
impl_enum_display!(BranchOp);
