//! Encode→decode round trips: every supported operation, a spread of
//! registers and immediates, compared field-for-field against the decoder.

use crate::icache::{decode, Handler};
use crate::interpreter::handlers;
use crate::riscv::command::{self, opcode, FUNCT7_SRA};
use crate::riscv::{int_to_reg, ArithOp, Register};

const REGS: [u32; 6] = [0, 1, 2, 10, 17, 31];
const IMM12: [i32; 8] = [-2048, -1, 0, 1, 5, 100, 2046, 2047];

fn arith_reg_handler(op: ArithOp) -> Handler {
    use ArithOp::*;
    match op {
        ADD => handlers::add,
        SUB => handlers::sub,
        SLL => handlers::sll,
        SLT => handlers::slt,
        SLTU => handlers::sltu,
        XOR => handlers::xor,
        SRL => handlers::srl,
        SRA => handlers::sra,
        OR => handlers::or,
        AND => handlers::and,
        MUL => handlers::mul,
        MULH => handlers::mulh,
        MULHSU => handlers::mulhsu,
        MULHU => handlers::mulhu,
        DIV => handlers::div,
        DIVU => handlers::divu,
        REM => handlers::rem,
        REMU => handlers::remu,
    }
}

#[test]
fn register_register_operations() {
    use ArithOp::*;
    let all = [
        ADD, SUB, SLL, SLT, SLTU, XOR, SRL, SRA, OR, AND, MUL, MULH, MULHSU, MULHU, DIV, DIVU,
        REM, REMU,
    ];

    for &op in all.iter() {
        for &rd in REGS.iter() {
            for &rs1 in REGS.iter() {
                for &rs2 in REGS.iter() {
                    let word = command::encode_r(
                        op.funct3(),
                        op.funct7(),
                        int_to_reg(rd),
                        int_to_reg(rs1),
                        int_to_reg(rs2),
                    );
                    let exe = decode(word).unwrap_or_else(|| panic!("{:?} failed", op));
                    assert!(exe.func == arith_reg_handler(op), "handler for {:?}", op);
                    assert_eq!(exe.meta.rd, int_to_reg(rd));
                    assert_eq!(exe.meta.rs1, int_to_reg(rs1));
                    assert_eq!(exe.meta.rs2, int_to_reg(rs2));
                }
            }
        }
    }
}

#[test]
fn immediate_operations() {
    let cases: [(u32, Handler); 6] = [
        (0b000, handlers::addi as Handler),
        (0b010, handlers::slti),
        (0b011, handlers::sltiu),
        (0b100, handlers::xori),
        (0b110, handlers::ori),
        (0b111, handlers::andi),
    ];

    for &(funct3, handler) in cases.iter() {
        for &imm in IMM12.iter() {
            let word = command::encode_i(
                opcode::OP_IMM,
                funct3,
                Register::A0,
                Register::T2,
                imm as u32,
            );
            let exe = decode(word).unwrap();
            assert!(exe.func == handler);
            assert_eq!(exe.meta.imm as i32, imm, "funct3 {}", funct3);
            assert_eq!(exe.meta.rd, Register::A0);
            assert_eq!(exe.meta.rs1, Register::T2);
        }
    }
}

#[test]
fn shift_immediates() {
    for shamt in 0..32u32 {
        let slli = command::encode_i(opcode::OP_IMM, 0b001, Register::A1, Register::A1, shamt);
        let exe = decode(slli).unwrap();
        assert!(exe.func == handlers::slli as Handler);
        assert_eq!(exe.meta.imm, shamt);

        let srli = command::encode_i(opcode::OP_IMM, 0b101, Register::A1, Register::A1, shamt);
        let exe = decode(srli).unwrap();
        assert!(exe.func == handlers::srli as Handler);
        assert_eq!(exe.meta.imm, shamt);

        let srai = command::encode_i(
            opcode::OP_IMM,
            0b101,
            Register::A1,
            Register::A1,
            shamt | (FUNCT7_SRA << 5),
        );
        let exe = decode(srai).unwrap();
        assert!(exe.func == handlers::srai as Handler);
        assert_eq!(exe.meta.imm, shamt);
    }
}

#[test]
fn loads_and_stores() {
    let loads: [(u32, Handler); 5] = [
        (0b000, handlers::lb as Handler),
        (0b001, handlers::lh),
        (0b010, handlers::lw),
        (0b100, handlers::lbu),
        (0b101, handlers::lhu),
    ];
    for &(funct3, handler) in loads.iter() {
        for &imm in IMM12.iter() {
            let word =
                command::encode_i(opcode::LOAD, funct3, Register::A0, Register::SP, imm as u32);
            let exe = decode(word).unwrap();
            assert!(exe.func == handler);
            assert_eq!(exe.meta.imm as i32, imm);
        }
    }

    let stores: [(u32, Handler); 3] = [
        (0b000, handlers::sb as Handler),
        (0b001, handlers::sh),
        (0b010, handlers::sw),
    ];
    for &(funct3, handler) in stores.iter() {
        for &imm in IMM12.iter() {
            let word = command::encode_s(funct3, Register::SP, Register::A0, imm as u32);
            let exe = decode(word).unwrap();
            assert!(exe.func == handler);
            assert_eq!(exe.meta.rs1, Register::SP);
            assert_eq!(exe.meta.rs2, Register::A0);
            assert_eq!(exe.meta.imm as i32, imm);
        }
    }
}

#[test]
fn branches() {
    let cases: [(u32, Handler); 6] = [
        (0b000, handlers::beq as Handler),
        (0b001, handlers::bne),
        (0b100, handlers::blt),
        (0b101, handlers::bge),
        (0b110, handlers::bltu),
        (0b111, handlers::bgeu),
    ];
    for &(funct3, handler) in cases.iter() {
        for &distance in &[-4096i32, -256, -2, 0, 2, 8, 4094] {
            let word = command::encode_b(funct3, Register::S1, Register::S2, distance as u32);
            let exe = decode(word).unwrap();
            assert!(exe.func == handler);
            assert_eq!(exe.meta.imm as i32, distance);
        }
    }
}

#[test]
fn jumps_and_uppers() {
    for &distance in &[-1048576i32, -2048, 0, 2, 1048574] {
        let word = command::encode_j(Register::RA, distance as u32);
        let exe = decode(word).unwrap();
        assert!(exe.func == handlers::jal as Handler);
        assert_eq!(exe.meta.rd, Register::RA);
        assert_eq!(exe.meta.imm as i32, distance);
    }

    for &imm in IMM12.iter() {
        let word = command::encode_i(opcode::JALR, 0, Register::RA, Register::T0, imm as u32);
        let exe = decode(word).unwrap();
        assert!(exe.func == handlers::jalr as Handler);
        assert_eq!(exe.meta.imm as i32, imm);
    }

    for &upper in &[0u32, 1, 0x12345, 0xFFFFF] {
        let word = command::encode_u(opcode::LUI, Register::T0, upper);
        let exe = decode(word).unwrap();
        assert!(exe.func == handlers::lui as Handler);
        assert_eq!(exe.meta.imm, upper << 12);

        let word = command::encode_u(opcode::AUIPC, Register::T0, upper);
        let exe = decode(word).unwrap();
        assert!(exe.func == handlers::auipc as Handler);
        assert_eq!(exe.meta.imm, upper << 12);
    }
}

#[test]
fn rejects_unknown_words() {
    // Unused opcode space.
    assert!(decode(0x0000_0000).is_none());
    assert!(decode(0xFFFF_FFFF).is_none());
    // R-format with an undefined funct7.
    assert!(decode(command::encode_r(0, 0b111_1111, Register::A0, Register::A0, Register::A0))
        .is_none());
    // Shift with a stray funct7.
    assert!(decode(command::encode_i(
        opcode::OP_IMM,
        0b001,
        Register::A0,
        Register::A0,
        (0b100_0000 << 5) | 3
    ))
    .is_none());
}
