use disasm_arm64::{symbolic, Decoder, Options};
use disasm_core::{
    error::Error,
    expr::{Expr, Location},
    insn::{Insn, INSN_BRANCH, INSN_CALL, INSN_STOP},
    operand::{OperandKind, Reg},
    ArchDecoder,
};

fn decoder() -> Decoder<'static> {
    Decoder::new(&disasm_core::Options::default(), &Options::default())
}

fn decode(word: u32, address: u64) -> Insn {
    decoder()
        .decode_insn(&word.to_le_bytes(), address)
        .unwrap_or_else(|| panic!("failed to decode {word:#010x}"))
}

fn operands(insn: &Insn) -> Vec<Expr> {
    insn.operands().iter().map(symbolic).collect()
}

#[test]
fn short_input() {
    let decoder = decoder();
    let mut insn = Insn::new();
    let word = 0xd503201fu32.to_le_bytes();
    for len in 0..4 {
        assert_eq!(
            decoder.decode(0, &word[..len], &mut insn),
            Err(Error::More(4))
        );
        assert!(decoder.decode_insn(&word[..len], 0).is_none());
    }
    assert_eq!(decoder.decode(0, &word, &mut insn), Ok(4));
}

#[test]
fn no_match() {
    let decoder = decoder();
    let mut insn = Insn::new();
    for word in [0x0000_0000u32, 0xffff_ffff] {
        let err = decoder.decode(0, &word.to_le_bytes(), &mut insn);
        assert_eq!(err, Err(Error::Failed(4)));
    }
}

#[test]
fn deterministic() {
    let decoder = decoder();
    let words = [0x91004020u32, 0x94000040, 0xa9bf7bfd, 0xb2003c20, 0x58000400];
    for word in words {
        let a = decoder.decode_insn(&word.to_le_bytes(), 0x1000).unwrap();
        let b = decoder.decode_insn(&word.to_le_bytes(), 0x1000).unwrap();
        assert_eq!(a.opcode(), b.opcode());
        assert_eq!(a.operands(), b.operands());
    }
}

#[test]
fn insn_state() {
    let insn = decode(0x94000040, 0x2000);
    assert_eq!(insn.raw(), 0x94000040);
    assert_eq!(insn.address(), 0x2000);
    assert_eq!(insn.len(), 4);
    assert_eq!(insn.next_address(), 0x2004);
    assert!(insn.flags().any(INSN_BRANCH));
    assert!(insn.flags().any(INSN_CALL));
    assert!(!insn.flags().any(INSN_STOP));

    let insn = decode(0x14000004, 0x2000);
    assert!(insn.flags().all(INSN_BRANCH | INSN_STOP));
    assert!(!insn.flags().any(INSN_CALL));

    let insn = decode(0x91004020, 0);
    assert!(!insn.flags().any(INSN_BRANCH | INSN_CALL | INSN_STOP));
}

#[test]
fn zero_register() {
    // add x0, sp, #0x10: stack pointer
    let insn = decode(0x910043e0, 0);
    let rn = insn.operands()[1].as_reg().unwrap();
    assert!(rn.is_sp());

    // adds x0, sp, #0x1: flag-setting immediate reads the stack pointer
    let insn = decode(0xb10007e0, 0);
    assert!(insn.operands()[1].as_reg().unwrap().is_sp());

    // cmn x1, x2 is adds xzr, x1, x2: zero register
    let insn = decode(0xab02003f, 0);
    assert!(insn.operands().iter().all(|i| match i.kind() {
        OperandKind::Reg(reg) => !reg.is_sp(),
        _ => true,
    }));

    // and sp, xzr, #0x1: logical immediate writes sp and reads xzr
    let insn = decode(0x924003ff, 0);
    assert!(insn.operands()[0].as_reg().unwrap().is_sp());
    assert!(insn.operands()[1].as_reg().unwrap().is_zero());

    // adr xzr, #0
    let insn = decode(0x1000001f, 0);
    assert!(insn.operands()[0].as_reg().unwrap().is_zero());

    // movz wzr, #0x1
    let insn = decode(0x5280003f, 0);
    assert_eq!(insn.operands()[0].as_reg(), Some(Reg::new(Reg::ZERO, 32)));
}

#[test]
fn fixup() {
    // b with a negative displacement
    let insn = decode(0x17ffffff, 0x1000);
    assert_eq!(insn.operands()[0].as_expr(), Some(&Expr::Const(0xffc)));
    assert!(insn.operands()[0].is_address());

    // adr x0, #-4
    let insn = decode(0x10ffffe0, 0x1000);
    assert_eq!(insn.operands()[1].as_expr(), Some(&Expr::Const(0xffc)));

    // adrp x0, #0x1000 from an unaligned address
    let insn = decode(0xb0000000, 0x1234);
    assert_eq!(insn.operands()[1].as_expr(), Some(&Expr::Const(0x2000)));

    // ldr x0, literal
    let insn = decode(0x58000040, 0x1000);
    assert_eq!(insn.operands()[1].as_expr(), Some(&Expr::Const(0x1008)));

    // cbz keeps the register, fixes the target
    let insn = decode(0xb4000041, 0x1000);
    assert_eq!(insn.operands()[0].as_reg(), Some(Reg::new(1, 64)));
    assert_eq!(insn.operands()[1].as_expr(), Some(&Expr::Const(0x1008)));

    // br x16 stays a register
    let insn = decode(0xd61f0200, 0x1000);
    assert_eq!(insn.operands()[0].as_reg(), Some(Reg::new(16, 64)));
    assert!(!insn.operands()[0].is_address());

    // add is not relative
    let insn = decode(0x91004020, 0x1000);
    assert_eq!(insn.operands()[2].as_expr(), Some(&Expr::Const(0x10)));
    assert!(!insn.operands()[2].is_address());
}

#[test]
fn symbolic_operands() {
    // ldr w2, [x3, #4]
    let insn = decode(0xb9400462, 0);
    assert_eq!(
        operands(&insn),
        [
            Expr::op(disasm_core::expr::Op::And, "x2", 0xffff_ffff_i64),
            Expr::mem(Expr::add("x3", 4_i64), 4),
        ]
    );

    // ldr x0, [sp], #16 reads before the increment
    let insn = decode(0xf84107e0, 0);
    assert_eq!(operands(&insn)[1], Expr::mem("sp", 8));
}

#[test]
fn fallback_is_incomplete() {
    let decoder = decoder();

    // madd x0, x1, x2, x3
    let insn = decode(0x9b020c20, 0);
    let binding = decoder.backtrace_binding(&insn);
    assert!(binding.is_incomplete());
    assert_eq!(binding.len(), 1);
    assert_eq!(binding.get(&Location::Reg("x0")), Some(&Expr::Unknown));

    // svc #0x0 writes nothing known
    let insn = decode(0xd4000001, 0);
    let binding = decoder.backtrace_binding(&insn);
    assert!(binding.is_incomplete());
    assert!(binding.is_empty());
}

#[test]
fn bindings() {
    let decoder = decoder();

    // sub sp, sp, #0x20
    let insn = decode(0xd10083ff, 0);
    let binding = decoder.backtrace_binding(&insn);
    assert!(!binding.is_incomplete());
    assert_eq!(
        binding.get(&Location::Reg("sp")),
        Some(&Expr::op(disasm_core::expr::Op::Sub, "sp", 0x20_i64))
    );

    // bl at 0x1000 links the next instruction
    let insn = decode(0x94000040, 0x1000);
    let binding = decoder.backtrace_binding(&insn);
    assert_eq!(binding.get(&Location::Reg("x30")), Some(&Expr::Const(0x1004)));

    // b.ne
    let insn = decode(0x54000041, 0x1000);
    assert!(decoder.backtrace_binding(&insn).is_empty());
}

#[test]
fn shift_bindings() {
    use disasm_core::expr::Op;

    let decoder = decoder();
    let x0 = |word: u32| {
        let insn = decode(word, 0);
        decoder.backtrace_binding(&insn).get(&Location::Reg("x0")).cloned()
    };
    let low = |e: Expr| Expr::op(Op::And, e, 0xffff_ffff_i64);
    let sext = |reg: &'static str| Expr::op(Op::Sar, Expr::op(Op::Shl, reg, 32_i64), 32_i64);

    // lsl x0, x1, x2: amount taken modulo 64
    assert_eq!(
        x0(0x9ac22020),
        Some(Expr::op(Op::Shl, "x1", Expr::op(Op::And, "x2", 0x3f_i64)))
    );

    // asr w0, w1, w2: bit 31 is copied, amount taken modulo 32
    assert_eq!(
        x0(0x1ac22820),
        Some(low(Expr::op(
            Op::Sar,
            sext("x1"),
            Expr::op(Op::And, "x2", 0x1f_i64)
        )))
    );

    // add w0, w1, w2, asr #4
    let shifted = Expr::op(Op::Sar, Expr::op(Op::Shl, "x2", 32_i64), 36_i64);
    assert_eq!(
        x0(0x0b821020),
        Some(low(Expr::add(low("x1".into()), low(shifted))))
    );

    // add w0, w1, wzr, asr #4
    assert_eq!(x0(0x0b9f1020), Some(low("x1".into())));
}

#[test]
fn xrefs() {
    let decoder = decoder();

    let insn = decode(0x14000004, 0x1000);
    assert_eq!(decoder.control_flow_targets(&insn), [Expr::Const(0x1010)]);

    let insn = decode(0x94000040, 0x1000);
    assert_eq!(decoder.control_flow_targets(&insn), [Expr::Const(0x1100)]);

    let insn = decode(0xb4000041, 0x1000);
    assert_eq!(decoder.control_flow_targets(&insn), [Expr::Const(0x1008)]);

    let insn = decode(0xd61f0200, 0x1000);
    assert_eq!(decoder.control_flow_targets(&insn), [Expr::Sym("x16")]);

    let insn = decode(0xd65f03c0, 0x1000);
    assert_eq!(decoder.control_flow_targets(&insn), [Expr::Sym("x30")]);

    for word in [0x91004020u32, 0x58000040, 0xb0000000, 0xd503201f] {
        let insn = decode(word, 0x1000);
        assert!(decoder.control_flow_targets(&insn).is_empty());
    }
}
