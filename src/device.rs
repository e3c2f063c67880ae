//! The process environment seen by the interpreter: the guest's I/O
//! streams, the per-opcode counters, and the cycle weights that turn those
//! counters into a simulated cycle total.

use std::io::{self, BufRead, Read, Write};

use num::traits::FromPrimitive;
use util::EnumFromStr;
use util_derive::EnumFromStr;

/// Everything the device keeps a cycle account for. One variant per
/// counted operation; the variant order indexes the count and weight
/// tables.
#[derive(Clone, Copy, PartialEq, Eq, Debug, ToPrimitive, FromPrimitive, EnumFromStr)]
pub enum Meter {
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
    LB,
    LH,
    LW,
    LBU,
    LHU,
    SB,
    SH,
    SW,
    BEQ,
    BNE,
    BLT,
    BGE,
    BLTU,
    BGEU,
    JAL,
    JALR,
    LUI,
    AUIPC,
    IPARSE,
}

pub const METER_COUNT: usize = 37;

impl Meter {
    /// Parse a weight name as written on the command line (`add`, `lw`,
    /// `jalr`, ...).
    pub fn parse(name: &str) -> Option<Meter> {
        EnumFromStr::from_str(&name.to_uppercase()).ok()
    }

    /// The default weight, by operation class.
    pub fn default_weight(self) -> u64 {
        use Meter::*;
        match self {
            ADD | SUB | SLT | SLTU | LUI | AUIPC => 1,
            AND | OR | XOR | SLL | SRL | SRA => 1,
            MUL | MULH | MULHSU | MULHU => 4,
            DIV | DIVU | REM | REMU => 20,
            LB | LH | LW | LBU | LHU | SB | SH | SW => 64,
            BEQ | BNE | BLT | BGE | BLTU | BGEU => 10,
            JAL => 1,
            JALR => 2,
            IPARSE => 0,
        }
    }
}

impl std::fmt::Display for Meter {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// A byte-oriented reader with one byte of lookahead, enough for the
/// emulated `scanf` family.
pub struct InputStream {
    inner: Box<dyn BufRead>,
    peeked: Option<u8>,
}

impl InputStream {
    pub fn new(inner: Box<dyn BufRead>) -> InputStream {
        InputStream {
            inner,
            peeked: None,
        }
    }

    /// Read one byte; `None` at end of input.
    pub fn next_byte(&mut self) -> Option<u8> {
        if let Some(byte) = self.peeked.take() {
            return Some(byte);
        }
        let mut buf = [0u8; 1];
        match self.inner.read(&mut buf) {
            Ok(1) => Some(buf[0]),
            _ => None,
        }
    }

    pub fn peek_byte(&mut self) -> Option<u8> {
        if self.peeked.is_none() {
            self.peeked = self.next_byte();
        }
        self.peeked
    }

    pub fn skip_whitespace(&mut self) {
        while let Some(byte) = self.peek_byte() {
            if byte.is_ascii_whitespace() {
                self.peeked = None;
            } else {
                break;
            }
        }
    }

    /// Skip whitespace, then collect bytes up to the next whitespace.
    pub fn read_token(&mut self) -> Vec<u8> {
        self.skip_whitespace();
        let mut token = Vec::new();
        while let Some(byte) = self.peek_byte() {
            if byte.is_ascii_whitespace() {
                break;
            }
            token.push(byte);
            self.peeked = None;
        }
        token
    }

    /// Skip whitespace, then parse an optionally signed decimal integer.
    /// `None` when the next character does not start a number.
    pub fn read_int(&mut self) -> Option<i64> {
        self.skip_whitespace();
        let negative = match self.peek_byte()? {
            b'-' => {
                self.peeked = None;
                true
            }
            b'+' => {
                self.peeked = None;
                false
            }
            _ => false,
        };

        let mut value: i64 = 0;
        let mut any = false;
        while let Some(byte) = self.peek_byte() {
            if !byte.is_ascii_digit() {
                break;
            }
            value = value.wrapping_mul(10).wrapping_add(i64::from(byte - b'0'));
            any = true;
            self.peeked = None;
        }

        if !any {
            return None;
        }
        Some(if negative { -value } else { value })
    }
}

pub struct Device {
    pub counter: [u64; METER_COUNT],
    weights: [u64; METER_COUNT],
    cycles: u64,
    pub input: InputStream,
    pub output: Box<dyn Write>,
}

impl Device {
    pub fn new(input: Box<dyn BufRead>, output: Box<dyn Write>) -> Device {
        let mut weights = [0u64; METER_COUNT];
        for (index, weight) in weights.iter_mut().enumerate() {
            *weight = Meter::from_usize(index).unwrap().default_weight();
        }
        Device {
            counter: [0; METER_COUNT],
            weights,
            cycles: 0,
            input: InputStream::new(input),
            output,
        }
    }

    /// A device wired to the process's own standard streams.
    pub fn stdio() -> Device {
        Device::new(
            Box::new(io::BufReader::new(io::stdin())),
            Box::new(io::stdout()),
        )
    }

    pub fn set_weight(&mut self, meter: Meter, weight: u64) {
        self.weights[meter as usize] = weight;
    }

    pub fn weight(&self, meter: Meter) -> u64 {
        self.weights[meter as usize]
    }

    #[inline]
    pub fn bump(&mut self, meter: Meter) {
        let index = meter as usize;
        self.counter[index] += 1;
        self.cycles += self.weights[index];
    }

    /// Weighted cycles consumed so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Branch outcome hook for an external predictor. Bookkeeping only;
    /// currently a no-op.
    pub fn predict(&mut self, _pc: u32, _taken: bool) {}

    /// A counter table for the `detail` report, skipping idle counters.
    pub fn report(&self) -> String {
        let mut out = String::new();
        for index in 0..METER_COUNT {
            if self.counter[index] == 0 {
                continue;
            }
            let meter = Meter::from_usize(index).unwrap();
            out.push_str(&format!(
                "{:>8} x {:<8} (weight {})\n",
                self.counter[index], meter, self.weights[index]
            ));
        }
        out.push_str(&format!("total cycles: {}\n", self.cycles));
        out
    }
}
