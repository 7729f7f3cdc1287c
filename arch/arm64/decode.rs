//! Operand synthesis and address fixup.

use disasm_core::{
    expr::{Expr, Op},
    insn::Insn,
    operand::{MemRef, Operand, OperandKind, Reg, Shift},
    utils::sign_extend,
};

use crate::{
    consts::*,
    opcodes::{Arg, FieldName, OpcodeSpec},
};

/// Decodes a bitmask immediate of a logical instruction.
///
/// The element size is derived from `n:!s`, a run of `s + 1` ones is rotated
/// right by `r` inside the element and the element is replicated up to 64
/// bits. The result is truncated to `width` bits.
pub fn decode_bit_masks(n: u32, s: u32, r: u32, width: u8) -> u64 {
    // highest set bit of the 7-bit value, smeared to the right
    let mut levels = ((n << 6) | (s ^ 0x3f)) >> 1;
    levels |= levels >> 1;
    levels |= levels >> 2;
    levels |= levels >> 4;

    let mut esize = levels + 1;
    let s = s & levels;
    let r = r & levels;

    let welem: u128 = (1 << (s + 1)) - 1;
    let rot = r % esize;
    let mut wmask = (welem >> rot) | (welem << (esize - rot));
    wmask &= (1 << esize) - 1;

    while esize < 64 {
        wmask |= wmask << esize;
        esize *= 2;
    }

    (wmask & ((1 << width) - 1)) as u64
}

struct Synth<'a> {
    op: &'a OpcodeSpec,
    word: u32,
}

impl Synth<'_> {
    fn field(&self, name: FieldName) -> u32 {
        name.field().extract(self.word)
    }

    fn reg(&self, name: FieldName) -> Reg {
        let mut index = self.field(name) as u8;
        let zero = self.op.has(R_Z) || (name == FieldName::Rn && self.op.has(RN_Z));
        if index == Reg::SP && zero {
            index = Reg::ZERO;
        }
        Reg::new(index, self.op.reg_width())
    }

    fn shifted(&self, shift: Shift, amount: FieldName) -> Operand {
        let reg = self.reg(FieldName::Rm);
        OperandKind::Shifted(reg, shift, self.field(amount) as u8).into()
    }

    /// Word aligned displacement.
    fn disp(&self, name: FieldName) -> Operand {
        let size = name.field().size();
        Operand::imm(Expr::Const(sign_extend(self.field(name) as u64, size) << 2))
    }

    fn mem(&self, offset: i64) -> Operand {
        let op = self.op;
        OperandKind::Mem(MemRef {
            base: Reg::new(self.field(FieldName::Rn) as u8, 64),
            index: None,
            scale: None,
            offset: Expr::Const(offset),
            size: op.mem_size(),
            incr: op.props.mem_incr,
        })
        .into()
    }

    fn bitmask_imm(&self, out: &Insn) -> Operand {
        let width = match out.operands().first().map(Operand::kind) {
            Some(OperandKind::Reg(reg)) => reg.width(),
            _ => unreachable!(
                "{}: {} without a destination register",
                self.op.name,
                Arg::BitmaskImm,
            ),
        };
        let imm = decode_bit_masks(
            self.field(FieldName::BitmaskN),
            self.field(FieldName::BitmaskS),
            self.field(FieldName::BitmaskR),
            width,
        );
        Operand::imm(Expr::Const(imm as i64))
    }

    fn operand(&self, arg: Arg, out: &Insn) -> Operand {
        use FieldName as F;

        match arg {
            Arg::Rn => Operand::reg(self.reg(F::Rn)),
            Arg::Rt => Operand::reg(self.reg(F::Rt)),
            Arg::Rt2 => Operand::reg(self.reg(F::Rt2)),
            Arg::Rm => Operand::reg(self.reg(F::Rm)),
            Arg::RmLslI6 => self.shifted(Shift::Lsl, F::I6_10),
            Arg::RmLsrI6 => self.shifted(Shift::Lsr, F::I6_10),
            Arg::RmAsrI6 => self.shifted(Shift::Asr, F::I6_10),
            Arg::RmLslI5 => self.shifted(Shift::Lsl, F::I5_10),
            Arg::RmLsrI5 => self.shifted(Shift::Lsr, F::I5_10),
            Arg::RmAsrI5 => self.shifted(Shift::Asr, F::I5_10),
            Arg::I16_5 => Operand::imm(Expr::Const(self.field(F::I16_5) as i64)),
            Arg::I16_5Hw => {
                let imm = (self.field(F::I16_5) as i64) << (16 * self.field(F::Hw));
                Operand::imm(Expr::Const(imm))
            }
            Arg::I19_5 => self.disp(F::I19_5),
            Arg::I26_0 => self.disp(F::I26_0),
            Arg::I12_10S1 => {
                let mut imm = self.field(F::I12_10S1);
                if (imm >> 12) & 1 == 1 {
                    imm = (imm & 0xfff) << 12;
                }
                Operand::imm(Expr::Const(imm as i64))
            }
            Arg::I19_5_2_29 => {
                let imm = (self.field(F::I19_5) << 2) | self.field(F::I2_29);
                Operand::imm(Expr::Const(sign_extend(imm as u64, 21)))
            }
            Arg::BitmaskImm => self.bitmask_imm(out),
            Arg::MemRnS9 => self.mem(sign_extend(self.field(F::S9_12) as u64, 9)),
            Arg::MemRnU12 => {
                let size = self.op.mem_size() as i64;
                self.mem(self.field(F::U12_10) as i64 * size)
            }
            Arg::MemRnS7 => {
                let size = self.op.mem_size() as i64;
                self.mem(sign_extend(self.field(F::S7_15) as u64, 7) * size)
            }
        }
    }
}

/// Decodes the operands of `op` from `word` into `out`, in declared order.
pub(crate) fn decode_operands(op: &OpcodeSpec, word: u32, out: &mut Insn) {
    let synth = Synth { op, word };
    for &arg in &op.args {
        let operand = synth.operand(arg, out);
        out.push_operand(operand);
    }
}

/// Rewrites a relative last operand into an absolute address.
pub(crate) fn fixup(op: &OpcodeSpec, address: u64, out: &mut Insn) {
    let Some(last) = out.operands_mut().last_mut() else {
        return;
    };

    let addr = Expr::Const(address as i64);
    let expr = match last.as_expr() {
        Some(expr) if op.has(SETIP | PCREL) => Expr::add(addr, expr.clone()),
        Some(expr) if op.has(PCREL_PAGE) => Expr::add(
            Expr::op(Op::And, addr, !0xfff_i64),
            Expr::op(Op::Shl, expr.clone(), 12_i64),
        ),
        // indirect branch
        None if op.has(SETIP) => return,
        None if op.has(PCREL | PCREL_PAGE) => {
            unreachable!("{}: relative operand is not an immediate", op.name)
        }
        _ => return,
    };

    *last = Operand::imm(expr.reduce()).address();
}
