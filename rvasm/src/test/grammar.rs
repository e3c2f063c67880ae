use rvsim::riscv::command::sign_extend;

use super::parse_rule;
use crate::immediate::{parse_string_literal, split_lo_hi, Immediate, RelOp, TreeOp};
use crate::Rule;

fn expr(input: &str) -> Immediate {
    Immediate::from_expr(parse_rule(Rule::expr, input).unwrap()).unwrap()
}

fn atom(imm: Immediate) -> Immediate {
    Immediate::Tree(vec![(imm, TreeOp::End)])
}

#[test]
fn integer_literals() {
    assert_eq!(expr("42"), atom(Immediate::Int(42)));
    assert_eq!(expr("0x10"), atom(Immediate::Int(16)));
    assert_eq!(expr("0b101"), atom(Immediate::Int(5)));
    assert_eq!(expr("017"), atom(Immediate::Int(15)));
    assert_eq!(expr("0"), atom(Immediate::Int(0)));
    assert_eq!(expr("4294967295"), atom(Immediate::Int(0xFFFF_FFFF)));
}

#[test]
fn out_of_range_and_malformed_integers() {
    assert!(Immediate::from_expr(parse_rule(Rule::expr, "4294967296").unwrap()).is_err());
    assert!(Immediate::from_expr(parse_rule(Rule::expr, "9foo").unwrap()).is_err());
    assert!(Immediate::from_expr(parse_rule(Rule::expr, "090").unwrap()).is_err());
}

#[test]
fn character_literals() {
    assert_eq!(expr("'A'"), atom(Immediate::Int(65)));
    assert_eq!(expr(r"'\n'"), atom(Immediate::Int(10)));
    assert_eq!(expr(r"'\t'"), atom(Immediate::Int(9)));
    assert_eq!(expr(r"'\0'"), atom(Immediate::Int(0)));
    assert_eq!(expr(r"'\\'"), atom(Immediate::Int(92)));
}

#[test]
fn negative_literals() {
    assert_eq!(
        expr("-5"),
        Immediate::Tree(vec![
            (Immediate::Int(0), TreeOp::Sub),
            (Immediate::Int(5), TreeOp::End),
        ])
    );
}

#[test]
fn symbols_and_arithmetic() {
    assert_eq!(expr("loop"), atom(Immediate::Symbol("loop".to_string())));
    assert_eq!(
        expr("a + b - 3"),
        Immediate::Tree(vec![
            (Immediate::Symbol("a".to_string()), TreeOp::Add),
            (Immediate::Symbol("b".to_string()), TreeOp::Sub),
            (Immediate::Int(3), TreeOp::End),
        ])
    );
}

#[test]
fn parenthesized_subtrees() {
    assert_eq!(
        expr("(x + 1)"),
        atom(Immediate::Tree(vec![
            (Immediate::Symbol("x".to_string()), TreeOp::Add),
            (Immediate::Int(1), TreeOp::End),
        ]))
    );
}

#[test]
fn relocations() {
    assert_eq!(
        expr("%hi(sym)"),
        atom(Immediate::Relocated(
            RelOp::Hi,
            Box::new(atom(Immediate::Symbol("sym".to_string()))),
        ))
    );
    assert_eq!(
        expr("%pcrel_lo(sym + 4)"),
        atom(Immediate::Relocated(
            RelOp::PcrelLo,
            Box::new(Immediate::Tree(vec![
                (Immediate::Symbol("sym".to_string()), TreeOp::Add),
                (Immediate::Int(4), TreeOp::End),
            ])),
        ))
    );
}

#[test]
fn folding_constants() {
    let mut imm = expr("1 + 2 - 3");
    assert!(imm.fold_constant());
    assert_eq!(imm, Immediate::Int(0));

    let mut imm = expr("(((5)))");
    assert!(imm.fold_constant());
    assert_eq!(imm, Immediate::Int(5));

    let mut imm = expr("%hi(0x12345678)");
    assert!(imm.fold_constant());
    assert_eq!(imm, Immediate::Int(0x12345));

    let mut imm = expr("%lo(0x12345678)");
    assert!(imm.fold_constant());
    assert_eq!(imm, Immediate::Int(0x678));
}

#[test]
fn folding_stops_at_symbols_and_pcrel() {
    let mut imm = expr("sym + 1");
    assert!(!imm.fold_constant());

    let mut imm = expr("%pcrel_hi(8)");
    assert!(!imm.fold_constant());

    // The current-location marker can only be resolved by the linker.
    let mut imm = expr(". + 8");
    assert!(!imm.fold_constant());
}

#[test]
fn split_reconstructs_the_value() {
    for &value in &[
        0u32,
        1,
        0x7FF,
        0x800,
        0x801,
        0xFFF,
        0x1000,
        0x12345678,
        0x7FFF_FFFF,
        0x8000_0000,
        0xFFFF_F800,
        0xFFFF_FFFF,
    ] {
        let split = split_lo_hi(value);
        let rebuilt = (split.hi << 12).wrapping_add(sign_extend(split.lo, 12));
        assert_eq!(rebuilt, value, "value {:#x}", value);
        assert!(split.lo < 0x1000);
    }
}

#[test]
fn string_literals_unescape() {
    let pair = parse_rule(Rule::string, r#""a\nb\0\\\"""#).unwrap();
    assert_eq!(
        parse_string_literal(&pair).unwrap(),
        vec![b'a', b'\n', b'b', 0, b'\\', b'"']
    );

    let pair = parse_rule(Rule::string, r#""bad\q""#).unwrap();
    assert!(parse_string_literal(&pair).is_err());
}

#[test]
fn comments_and_blank_lines_parse() {
    let source = "# leading comment\n\n  .text  # trailing\nmain: nop\n";
    assert!(parse_rule(Rule::program, source).is_ok());
}

#[test]
fn unterminated_string_fails() {
    assert!(crate::assembler::assemble("t.s", ".data\n.asciz \"oops\n").is_err());
}
