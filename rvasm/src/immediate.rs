//! Immediate expression trees and their constant folding.
//!
//! The expression parser always produces a [`Tree`](enum.Immediate.html)
//! node, even for a single atom; degenerate trees are collapsed by
//! [`fold_constant`](enum.Immediate.html#method.fold_constant) during the
//! linker's relaxation pass (and by the operand extractors, which need to
//! see through `(reg)` parentheses).

use matches::debug_assert_matches;
use pest::iterators::Pair;

use crate::{new_parser_error, Result, Rule};

/// A relocation operator wrapping an inner expression.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RelOp {
    Hi,
    Lo,
    PcrelHi,
    PcrelLo,
}

/// Operator attached to each tree element; the final element always
/// carries `End`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TreeOp {
    Add,
    Sub,
    End,
}

#[derive(Clone, PartialEq, Debug)]
pub enum Immediate {
    /// A concrete value.
    Int(u32),
    /// An unresolved label name (`.` is the current location).
    Symbol(String),
    /// `%hi`/`%lo`/`%pcrel_hi`/`%pcrel_lo` around an inner expression.
    Relocated(RelOp, Box<Immediate>),
    /// An ordered `(operand, operator)` sequence.
    Tree(Vec<(Immediate, TreeOp)>),
}

/// The canonical RISC-V upper/lower split: `hi` is rounded up so that the
/// sign-extended 12-bit `lo` added back on top reproduces the value.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SplitImm {
    pub lo: u32,
    pub hi: u32,
}

pub fn split_lo_hi(value: u32) -> SplitImm {
    SplitImm {
        lo: value & 0xFFF,
        hi: value.wrapping_add(0x800) >> 12,
    }
}

impl Immediate {
    /// Build the tree for an `expr` pair.
    pub fn from_expr(pair: Pair<Rule>) -> Result<Immediate> {
        debug_assert_matches!(pair.as_rule(), Rule::expr);

        let mut tree = Vec::new();
        let mut pairs = pair.into_inner().peekable();

        if let Some(first) = pairs.peek() {
            if first.as_rule() == Rule::neg {
                pairs.next();
                tree.push((Immediate::Int(0), TreeOp::Sub));
            }
        }

        loop {
            let term = pairs.next().unwrap();
            let imm = Immediate::from_term(term)?;
            match pairs.next() {
                None => {
                    tree.push((imm, TreeOp::End));
                    break;
                }
                Some(op) => {
                    let op = match op.as_str() {
                        "+" => TreeOp::Add,
                        _ => TreeOp::Sub,
                    };
                    tree.push((imm, op));
                }
            }
        }

        Ok(Immediate::Tree(tree))
    }

    fn from_term(pair: Pair<Rule>) -> Result<Immediate> {
        debug_assert_matches!(pair.as_rule(), Rule::term);
        let inner = pair.into_inner().next().unwrap();
        match inner.as_rule() {
            Rule::integer => Ok(Immediate::Int(parse_integer(&inner)?)),
            Rule::character => Ok(Immediate::Int(parse_character(&inner)?)),
            Rule::ident => {
                let name = inner.as_str();
                if name.starts_with(|c: char| c.is_ascii_digit()) {
                    return Err(new_parser_error(
                        inner.as_span(),
                        format!("Invalid integer \"{}\"", name),
                    ));
                }
                Ok(Immediate::Symbol(name.to_string()))
            }
            Rule::expr => Immediate::from_expr(inner),
            Rule::relocation => {
                let mut pairs = inner.into_inner();
                let name = pairs.next().unwrap();
                let op = match name.as_str() {
                    "hi" => RelOp::Hi,
                    "lo" => RelOp::Lo,
                    "pcrel_hi" => RelOp::PcrelHi,
                    _ => RelOp::PcrelLo,
                };
                let sub = Immediate::from_expr(pairs.next().unwrap())?;
                Ok(Immediate::Relocated(op, Box::new(sub)))
            }
            _ => unreachable!(),
        }
    }

    /// Rewrite any location-independent subtree into an `Int`, collapsing
    /// one-element trees on the way. Returns whether `self` is now
    /// concrete; symbolic leaves (and the pc-relative relocations, whose
    /// value depends on the final position) leave it untouched.
    pub fn fold_constant(&mut self) -> bool {
        match self {
            Immediate::Int(_) => true,
            Immediate::Symbol(_) => false,
            Immediate::Relocated(op, inner) => {
                let op = *op;
                match op {
                    RelOp::Hi | RelOp::Lo => {
                        if !inner.fold_constant() {
                            return false;
                        }
                        let value = match **inner {
                            Immediate::Int(value) => value,
                            _ => unreachable!(),
                        };
                        let split = split_lo_hi(value);
                        let folded = if op == RelOp::Hi { split.hi } else { split.lo };
                        *self = Immediate::Int(folded);
                        true
                    }
                    // The pc-relative pair cannot fold early; its value
                    // depends on where the command finally lands.
                    _ => false,
                }
            }
            Immediate::Tree(items) => {
                if items.len() == 1 {
                    let (inner, _) = items.pop().unwrap();
                    *self = inner;
                    return self.fold_constant();
                }

                let mut concrete = true;
                for (sub, _) in items.iter_mut() {
                    concrete &= sub.fold_constant();
                }
                if !concrete {
                    return false;
                }

                let mut result = 0u32;
                let mut last_op = TreeOp::Add;
                for (sub, op) in items.iter() {
                    let value = match sub {
                        Immediate::Int(value) => *value,
                        _ => unreachable!(),
                    };
                    result = match last_op {
                        TreeOp::Add => result.wrapping_add(value),
                        TreeOp::Sub => result.wrapping_sub(value),
                        TreeOp::End => unreachable!(),
                    };
                    last_op = *op;
                }
                debug_assert_matches!(last_op, TreeOp::End);

                *self = Immediate::Int(result);
                true
            }
        }
    }

    /// See through degenerate one-element trees without folding anything.
    pub fn unwrap_single(self) -> Immediate {
        match self {
            Immediate::Tree(mut items) if items.len() == 1 => {
                items.pop().unwrap().0.unwrap_single()
            }
            other => other,
        }
    }
}

fn parse_integer(pair: &Pair<Rule>) -> Result<u32> {
    let text = pair.as_str();
    let fail = || new_parser_error(pair.as_span(), format!("Invalid integer \"{}\"", text));

    if let Some(hex) = text.strip_prefix("0x") {
        return u32::from_str_radix(hex, 16).map_err(|_| fail());
    }
    if let Some(bin) = text.strip_prefix("0b") {
        return u32::from_str_radix(bin, 2).map_err(|_| fail());
    }
    if text.len() > 1 && text.starts_with('0') {
        return u32::from_str_radix(&text[1..], 8).map_err(|_| fail());
    }

    let value: u64 = text.parse().map_err(|_| fail())?;
    if value > u64::from(u32::max_value()) {
        return Err(fail());
    }
    Ok(value as u32)
}

fn parse_character(pair: &Pair<Rule>) -> Result<u32> {
    let text = pair.as_str().as_bytes();
    let fail = || {
        new_parser_error(
            pair.as_span(),
            format!("Invalid character literal {}", pair.as_str()),
        )
    };

    // The grammar guarantees surrounding single quotes.
    match &text[1..text.len() - 1] {
        [byte] => Ok(u32::from(*byte)),
        [b'\\', escape] => match escape {
            b'n' => Ok(u32::from(b'\n')),
            b't' => Ok(u32::from(b'\t')),
            b'r' => Ok(u32::from(b'\r')),
            b'0' => Ok(0),
            b'\\' => Ok(u32::from(b'\\')),
            b'\'' => Ok(u32::from(b'\'')),
            _ => Err(fail()),
        },
        _ => Err(fail()),
    }
}

/// Un-escape a string literal body for `.asciz`/`.string`.
pub fn parse_string_literal(pair: &Pair<Rule>) -> Result<Vec<u8>> {
    let text = pair.as_str().as_bytes();
    debug_assert!(text.len() >= 2);

    let mut bytes = Vec::with_capacity(text.len() - 2);
    let mut iter = text[1..text.len() - 1].iter().copied();
    while let Some(byte) = iter.next() {
        if byte != b'\\' {
            bytes.push(byte);
            continue;
        }
        let escape = iter.next().ok_or_else(|| {
            new_parser_error(pair.as_span(), "Trailing backslash in string".to_string())
        })?;
        bytes.push(match escape {
            b'n' => b'\n',
            b't' => b'\t',
            b'r' => b'\r',
            b'0' => 0,
            b'\\' => b'\\',
            b'"' => b'"',
            b'\'' => b'\'',
            _ => {
                return Err(new_parser_error(
                    pair.as_span(),
                    format!("Unsupported escape \\{}", escape as char),
                ))
            }
        });
    }
    Ok(bytes)
}
