//! Typed extraction of instruction operands.
//!
//! The grammar parses every operand as a generic expression with an
//! optional `(reg)` base; each mnemonic then pulls its operands through
//! the extractors here, which validate the shape and produce registers,
//! immediates, or offset-register pairs.

use matches::debug_assert_matches;
use pest::iterators::{Pair, Pairs};
use pest::Span;

use rvsim::Register;

use crate::immediate::Immediate;
use crate::{new_parser_error, Result, Rule};

pub struct Operand<'i> {
    pub expr: Pair<'i, Rule>,
    pub base: Option<Pair<'i, Rule>>,
    pub span: Span<'i>,
}

impl<'i> Operand<'i> {
    fn new(pair: Pair<'i, Rule>) -> Operand<'i> {
        debug_assert_matches!(pair.as_rule(), Rule::operand);
        let span = pair.as_span();
        let mut pairs = pair.into_inner();
        let expr = pairs.next().unwrap();
        let base = pairs.next().map(|pair| pair.into_inner().next().unwrap());
        Operand { expr, base, span }
    }
}

/// Collect the operand list of an `instruction` pair (the mnemonic has
/// already been taken from `pairs`).
pub fn collect<'i>(pairs: Pairs<'i, Rule>) -> Vec<Operand<'i>> {
    pairs.map(Operand::new).collect()
}

/// Require exactly `count` operands.
pub fn expect_count(span: &Span, operands: &[Operand], count: usize) -> Result<()> {
    if operands.len() != count {
        return Err(new_parser_error(
            span.clone(),
            format!("Expected {} operands, got {}", count, operands.len()),
        ));
    }
    Ok(())
}

fn parse_register(pair: &Pair<Rule>) -> Result<Register> {
    Register::parse(pair.as_str()).ok_or_else(|| {
        new_parser_error(
            pair.as_span(),
            format!("Expected register, got \"{}\"", pair.as_str()),
        )
    })
}

/// The operand as a plain register.
pub fn register(operand: &Operand) -> Result<Register> {
    if operand.base.is_some() {
        return Err(new_parser_error(
            operand.span.clone(),
            "Expected register, got an address operand".to_string(),
        ));
    }
    match Immediate::from_expr(operand.expr.clone())?.unwrap_single() {
        Immediate::Symbol(name) => Register::parse(&name).ok_or_else(|| {
            new_parser_error(
                operand.span.clone(),
                format!("Expected register, got \"{}\"", name),
            )
        }),
        _ => Err(new_parser_error(
            operand.span.clone(),
            "Expected register".to_string(),
        )),
    }
}

/// The operand as an immediate expression.
pub fn immediate(operand: &Operand) -> Result<Immediate> {
    if operand.base.is_some() {
        return Err(new_parser_error(
            operand.span.clone(),
            "Unexpected base register on immediate operand".to_string(),
        ));
    }
    Immediate::from_expr(operand.expr.clone())
}

/// The operand as `offset(base)`. A bare register counts as offset 0.
pub fn offset_register<'i>(operand: &Operand<'i>) -> Result<(Immediate, Register)> {
    match &operand.base {
        Some(base) => {
            let reg = parse_register(base)?;
            let imm = Immediate::from_expr(operand.expr.clone())?;
            Ok((imm, reg))
        }
        None => {
            let reg = register(operand)?;
            Ok((Immediate::Int(0), reg))
        }
    }
}

/// Whether the operand has an explicit `(base)` part.
pub fn has_base(operand: &Operand) -> bool {
    operand.base.is_some()
}
