//! Symbolic effects and control-flow targets of decoded instructions.

use alloc::vec::Vec;
use std::{collections::HashMap, sync::OnceLock};

use disasm_core::{
    expr::{Binding, Expr, Location, Op},
    insn::Insn,
    operand::{MemIncr, MemRef, Operand, OperandKind, Reg, Shift},
};

use crate::{consts::*, opcodes::OpcodeSpec};

type BindingFn = fn(&Insn, &[Expr]) -> Binding;

const NZCV: &str = "nzcv";
const LR: &str = "x30";

fn reg_symbolic(reg: Reg) -> Expr {
    if reg.is_zero() {
        return Expr::Const(0);
    }
    let sym = Expr::Sym(X_NAME[reg.index() as usize]);
    if reg.width() == 32 {
        Expr::op(Op::And, sym, 0xffff_ffff_i64)
    } else {
        sym
    }
}

/// Sign extends the low 32 bits of a register value.
fn sign_extend32(value: Expr) -> Expr {
    let value = match value {
        Expr::Op(Op::And, x, mask) if *mask == Expr::Const(0xffff_ffff) => *x,
        value => value,
    };
    Expr::op(Op::Sar, Expr::op(Op::Shl, value, 32_i64), 32_i64)
}

fn mem_symbolic(mem: &MemRef) -> Expr {
    let mut ptr = reg_symbolic(mem.base);
    if let Some(index) = mem.index {
        let shift = mem.scale.map_or(0, |i| i.trailing_zeros() as i64);
        ptr = Expr::add(ptr, Expr::op(Op::Shl, reg_symbolic(index), shift));
    }
    if mem.incr != MemIncr::Post {
        ptr = Expr::add(ptr, mem.offset.clone());
    }
    Expr::mem(ptr.reduce(), mem.size)
}

/// Symbolic form of an operand: registers become symbols, memory references
/// become memory locations.
pub fn symbolic(operand: &Operand) -> Expr {
    match operand.kind() {
        OperandKind::Reg(reg) => reg_symbolic(*reg),
        OperandKind::Shifted(reg, Shift::Asr, amount) if reg.width() == 32 => {
            let value = Expr::op(Op::Sar, sign_extend32(reg_symbolic(*reg)), *amount as i64);
            Expr::op(Op::And, value, 0xffff_ffff_i64).reduce()
        }
        OperandKind::Shifted(reg, shift, amount) => {
            let op = match shift {
                Shift::Lsl => Op::Shl,
                Shift::Lsr => Op::Shr,
                Shift::Asr => Op::Sar,
            };
            Expr::op(op, reg_symbolic(*reg), *amount as i64).reduce()
        }
        OperandKind::Imm(expr) => expr.clone(),
        OperandKind::Mem(mem) => mem_symbolic(mem),
    }
}

/// Stores `value` into the location named by the symbolic operand `dst`.
///
/// Writes to a 32-bit register clear the upper half, writes to the zero
/// register are discarded.
fn write(binding: &mut Binding, dst: &Expr, value: Expr) {
    match dst {
        Expr::Sym(name) => {
            binding.set(Location::Reg(*name), value);
        }
        Expr::Op(Op::And, reg, mask) => match (&**reg, &**mask) {
            (Expr::Sym(name), Expr::Const(0xffff_ffff)) => {
                let value = Expr::op(Op::And, value, 0xffff_ffff_i64);
                binding.set(Location::Reg(*name), value);
            }
            _ => unreachable!("unexpected destination {dst}"),
        },
        Expr::Mem(ptr, size) => {
            binding.set(Location::Mem((**ptr).clone(), *size), value);
        }
        Expr::Const(0) => {}
        _ => unreachable!("unexpected destination {dst}"),
    }
}

fn writeback(binding: &mut Binding, insn: &Insn) {
    for operand in insn.operands() {
        if let OperandKind::Mem(mem) = operand.kind() {
            if mem.incr != MemIncr::None {
                let base = X_NAME[mem.base.index() as usize];
                binding.set(Location::Reg(base), Expr::add(base, mem.offset.clone()));
            }
        }
    }
}

fn flags(binding: &mut Binding) {
    binding.set(Location::Reg(NZCV), Expr::Unknown);
}

fn assign(a: &[Expr], value: Expr) -> Binding {
    let mut binding = Binding::new();
    write(&mut binding, &a[0], value);
    binding
}

fn binop(a: &[Expr], op: Op) -> Binding {
    assign(a, Expr::op(op, a[1].clone(), a[2].clone()))
}

fn bind_mov(_: &Insn, a: &[Expr]) -> Binding {
    assign(a, a[1].clone())
}

fn bind_movn(_: &Insn, a: &[Expr]) -> Binding {
    assign(a, Expr::op(Op::Xor, a[1].clone(), -1_i64))
}

fn bind_add(_: &Insn, a: &[Expr]) -> Binding {
    binop(a, Op::Add)
}

fn bind_adds(_: &Insn, a: &[Expr]) -> Binding {
    let mut binding = binop(a, Op::Add);
    flags(&mut binding);
    binding
}

fn bind_sub(_: &Insn, a: &[Expr]) -> Binding {
    binop(a, Op::Sub)
}

fn bind_subs(_: &Insn, a: &[Expr]) -> Binding {
    let mut binding = binop(a, Op::Sub);
    flags(&mut binding);
    binding
}

fn bind_neg(_: &Insn, a: &[Expr]) -> Binding {
    assign(a, Expr::op(Op::Sub, 0_i64, a[1].clone()))
}

fn bind_and(_: &Insn, a: &[Expr]) -> Binding {
    binop(a, Op::And)
}

fn bind_ands(_: &Insn, a: &[Expr]) -> Binding {
    let mut binding = binop(a, Op::And);
    flags(&mut binding);
    binding
}

fn bind_orr(_: &Insn, a: &[Expr]) -> Binding {
    binop(a, Op::Or)
}

fn bind_eor(_: &Insn, a: &[Expr]) -> Binding {
    binop(a, Op::Xor)
}

/// Register shifts take the amount modulo the register width.
fn shift(insn: &Insn, a: &[Expr], op: Op) -> Binding {
    let width = insn.operands()[0].as_reg().map_or(64, |reg| reg.width());
    let amount = Expr::op(Op::And, a[2].clone(), i64::from(width - 1));
    let value = match (op, width) {
        (Op::Sar, 32) => sign_extend32(a[1].clone()),
        _ => a[1].clone(),
    };
    assign(a, Expr::op(op, value, amount))
}

fn bind_lsl(insn: &Insn, a: &[Expr]) -> Binding {
    shift(insn, a, Op::Shl)
}

fn bind_lsr(insn: &Insn, a: &[Expr]) -> Binding {
    shift(insn, a, Op::Shr)
}

fn bind_asr(insn: &Insn, a: &[Expr]) -> Binding {
    shift(insn, a, Op::Sar)
}

fn bind_cmp(_: &Insn, _: &[Expr]) -> Binding {
    let mut binding = Binding::new();
    flags(&mut binding);
    binding
}

fn bind_ldr(insn: &Insn, a: &[Expr]) -> Binding {
    let src = match &a[1] {
        Expr::Mem(..) => a[1].clone(),
        // literal pool
        addr => {
            let size = insn.operands()[0].as_reg().map_or(8, |reg| reg.width() / 8);
            Expr::mem(addr.clone(), size)
        }
    };
    let mut binding = assign(a, src);
    writeback(&mut binding, insn);
    binding
}

fn bind_str(insn: &Insn, a: &[Expr]) -> Binding {
    let mut binding = Binding::new();
    write(&mut binding, &a[1], a[0].clone());
    writeback(&mut binding, insn);
    binding
}

/// Second slot of a register pair access.
fn pair_next(mem: &Expr) -> Expr {
    match mem {
        Expr::Mem(ptr, size) => {
            let ptr = Expr::add((**ptr).clone(), *size as i64);
            Expr::mem(ptr.reduce(), *size)
        }
        _ => unreachable!("unexpected pair operand {mem}"),
    }
}

fn bind_ldp(insn: &Insn, a: &[Expr]) -> Binding {
    let mut binding = Binding::new();
    write(&mut binding, &a[0], a[2].clone());
    write(&mut binding, &a[1], pair_next(&a[2]));
    writeback(&mut binding, insn);
    binding
}

fn bind_stp(insn: &Insn, a: &[Expr]) -> Binding {
    let mut binding = Binding::new();
    write(&mut binding, &a[2], a[0].clone());
    write(&mut binding, &pair_next(&a[2]), a[1].clone());
    writeback(&mut binding, insn);
    binding
}

fn bind_call(insn: &Insn, _: &[Expr]) -> Binding {
    let mut binding = Binding::new();
    binding.set(Location::Reg(LR), Expr::Const(insn.next_address() as i64));
    binding
}

/// Branches and `nop` define no data location.
fn bind_none(_: &Insn, _: &[Expr]) -> Binding {
    Binding::new()
}

fn init_backtrace_binding() -> HashMap<&'static str, BindingFn> {
    let mut map: HashMap<&'static str, BindingFn> = HashMap::new();

    for name in ["mov", "movz", "adr", "adrp"] {
        map.insert(name, bind_mov);
    }
    map.insert("movn", bind_movn);
    map.insert("add", bind_add);
    map.insert("adds", bind_adds);
    map.insert("sub", bind_sub);
    map.insert("subs", bind_subs);
    map.insert("neg", bind_neg);
    map.insert("and", bind_and);
    map.insert("ands", bind_ands);
    map.insert("orr", bind_orr);
    map.insert("eor", bind_eor);
    map.insert("lsl", bind_lsl);
    map.insert("lsr", bind_lsr);
    map.insert("asr", bind_asr);
    for name in ["cmp", "cmn", "tst"] {
        map.insert(name, bind_cmp);
    }
    for name in ["ldr", "ldrb", "ldrh", "ldur", "ldurb", "ldurh"] {
        map.insert(name, bind_ldr);
    }
    for name in ["str", "strb", "strh", "stur", "sturb", "sturh"] {
        map.insert(name, bind_str);
    }
    map.insert("ldp", bind_ldp);
    map.insert("stp", bind_stp);
    map.insert("bl", bind_call);
    map.insert("blr", bind_call);
    for name in ["b", "cbz", "cbnz", "br", "ret", "nop"] {
        map.insert(name, bind_none);
    }
    for name in B_COND_NAME {
        map.insert(name, bind_none);
    }

    map
}

fn backtrace_binding() -> &'static HashMap<&'static str, BindingFn> {
    static BINDING: OnceLock<HashMap<&'static str, BindingFn>> = OnceLock::new();
    BINDING.get_or_init(init_backtrace_binding)
}

/// Assumes only the first operand is modified, to an unknown value.
fn fallback(op: &OpcodeSpec, insn: &Insn, a: &[Expr]) -> Binding {
    warn!(
        "arm64: unhandled instruction to backtrace: {} at {:#x}",
        op.name,
        insn.address()
    );

    let mut binding = Binding::new();
    match a.first() {
        Some(dst @ (Expr::Sym(_) | Expr::Mem(..))) => {
            if let Some(location) = Location::from_expr(dst) {
                binding.set(location, Expr::Unknown);
            }
        }
        Some(dst) => {
            if let Some(root) = dst.externals().first() {
                binding.set(Location::Reg(*root), Expr::Unknown);
            }
        }
        None => {}
    }
    binding.set_incomplete();
    binding
}

pub(crate) fn get_backtrace_binding(op: &OpcodeSpec, insn: &Insn) -> Binding {
    let a: Vec<Expr> = insn.operands().iter().map(symbolic).collect();
    match backtrace_binding().get(op.name) {
        Some(binding) => binding(insn, &a),
        None => fallback(op, insn, &a),
    }
}

pub(crate) fn get_xrefs_x(op: &OpcodeSpec, insn: &Insn) -> Vec<Expr> {
    if op.has(SETIP) {
        insn.operands().last().map(symbolic).into_iter().collect()
    } else {
        // loads into the instruction pointer are not followed
        Vec::new()
    }
}
