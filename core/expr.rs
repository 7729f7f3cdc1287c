//! Symbolic expressions used by data-flow consumers of the decoder.

use core::fmt;

use alloc::{boxed::Box, collections::BTreeMap, vec::Vec};

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Op {
    Add,
    Sub,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Sar,
}

impl Op {
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::And => "&",
            Self::Or => "|",
            Self::Xor => "^",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::Sar => ">>>",
        }
    }

    fn eval(&self, a: i64, b: i64) -> i64 {
        match self {
            Self::Add => a.wrapping_add(b),
            Self::Sub => a.wrapping_sub(b),
            Self::And => a & b,
            Self::Or => a | b,
            Self::Xor => a ^ b,
            Self::Shl => a.checked_shl(b as u32).unwrap_or(0),
            Self::Shr => (a as u64).checked_shr(b as u32).unwrap_or(0) as i64,
            Self::Sar => a.checked_shr(b as u32).unwrap_or(a >> 63),
        }
    }

    /// `x op identity == x`
    fn identity(&self) -> i64 {
        match self {
            Self::And => -1,
            _ => 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Expr {
    Const(i64),
    /// Named location, a register.
    Sym(&'static str),
    /// Memory at the pointer expression, access size in bytes.
    Mem(Box<Expr>, u8),
    Op(Op, Box<Expr>, Box<Expr>),
    /// Value that cannot be determined.
    Unknown,
}

impl Expr {
    pub fn op(op: Op, lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Self {
        Self::Op(op, Box::new(lhs.into()), Box::new(rhs.into()))
    }

    pub fn add(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Self {
        Self::op(Op::Add, lhs, rhs)
    }

    pub fn mem(ptr: impl Into<Expr>, size: u8) -> Self {
        Self::Mem(Box::new(ptr.into()), size)
    }

    pub fn as_const(&self) -> Option<i64> {
        match *self {
            Self::Const(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Folds constants and drops identity operations.
    pub fn reduce(&self) -> Expr {
        match self {
            Self::Mem(ptr, size) => Self::Mem(Box::new(ptr.reduce()), *size),
            Self::Op(op, lhs, rhs) => reduce_op(*op, lhs.reduce(), rhs.reduce()),
            _ => self.clone(),
        }
    }

    /// Symbols referenced by the expression, in order of appearance.
    pub fn externals(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        self.collect_externals(&mut out);
        out
    }

    /// First symbol referenced by the expression.
    pub fn root(&self) -> Option<&'static str> {
        match self {
            Self::Sym(name) => Some(*name),
            Self::Mem(ptr, _) => ptr.root(),
            Self::Op(_, lhs, rhs) => lhs.root().or_else(|| rhs.root()),
            Self::Const(_) | Self::Unknown => None,
        }
    }

    fn collect_externals(&self, out: &mut Vec<&'static str>) {
        match self {
            Self::Sym(name) => {
                if !out.contains(name) {
                    out.push(*name);
                }
            }
            Self::Mem(ptr, _) => ptr.collect_externals(out),
            Self::Op(_, lhs, rhs) => {
                lhs.collect_externals(out);
                rhs.collect_externals(out);
            }
            Self::Const(_) | Self::Unknown => {}
        }
    }
}

fn reduce_op(op: Op, lhs: Expr, rhs: Expr) -> Expr {
    match (op, lhs, rhs) {
        (_, Expr::Unknown, _) | (_, _, Expr::Unknown) => Expr::Unknown,
        (op, Expr::Const(a), Expr::Const(b)) => Expr::Const(op.eval(a, b)),
        (op, lhs, Expr::Const(b)) if b == op.identity() => lhs,
        (Op::Add | Op::Or | Op::Xor, Expr::Const(0), rhs) => rhs,
        (Op::And, Expr::Const(-1), rhs) => rhs,
        // (x + a) + b => x + (a + b)
        (Op::Add, Expr::Op(Op::Add, x, a), Expr::Const(b)) => match *a {
            Expr::Const(a) => reduce_op(Op::Add, *x, Expr::Const(a.wrapping_add(b))),
            a => Expr::op(Op::Add, Expr::Op(Op::Add, x, Box::new(a)), b),
        },
        // (x & a) & b => x & (a & b)
        (Op::And, Expr::Op(Op::And, x, a), Expr::Const(b)) => match *a {
            Expr::Const(a) => reduce_op(Op::And, *x, Expr::Const(a & b)),
            a => Expr::op(Op::And, Expr::Op(Op::And, x, Box::new(a)), b),
        },
        // (x >> a) >> b => x >> (a + b)
        (op @ (Op::Shl | Op::Shr | Op::Sar), Expr::Op(inner, x, a), Expr::Const(b))
            if inner == op =>
        {
            match *a {
                Expr::Const(a) if (0..64).contains(&a) && (0..64).contains(&b) && a + b < 64 => {
                    Expr::op(op, *x, a + b)
                }
                a => Expr::op(op, Expr::Op(inner, x, Box::new(a)), b),
            }
        }
        (op, lhs, rhs) => Expr::op(op, lhs, rhs),
    }
}

impl From<i64> for Expr {
    fn from(value: i64) -> Self {
        Self::Const(value)
    }
}

impl From<u64> for Expr {
    fn from(value: u64) -> Self {
        Self::Const(value as i64)
    }
}

impl From<&'static str> for Expr {
    fn from(value: &'static str) -> Self {
        Self::Sym(value)
    }
}

fn ptr_name(size: u8) -> &'static str {
    match size {
        1 => "byte",
        2 => "word",
        4 => "dword",
        8 => "qword",
        16 => "oword",
        _ => "mem",
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Const(value) if *value < 0 => write!(fmt, "-{:#x}", value.unsigned_abs()),
            Self::Const(value) => write!(fmt, "{value:#x}"),
            Self::Sym(name) => fmt.write_str(name),
            Self::Mem(ptr, size) => write!(fmt, "{} ptr [{ptr}]", ptr_name(*size)),
            Self::Op(op, lhs, rhs) => {
                let paren = |fmt: &mut fmt::Formatter, e: &Expr| match e {
                    Self::Op(..) => write!(fmt, "({e})"),
                    _ => write!(fmt, "{e}"),
                };
                paren(fmt, lhs)?;
                write!(fmt, " {} ", op.symbol())?;
                paren(fmt, rhs)
            }
            Self::Unknown => fmt.write_str("unknown"),
        }
    }
}

/// Location defined by an instruction.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Location {
    Reg(&'static str),
    /// Memory at the pointer expression, access size in bytes.
    Mem(Expr, u8),
}

impl Location {
    /// Location named by a symbolic operand, if the operand names one.
    pub fn from_expr(expr: &Expr) -> Option<Self> {
        match expr {
            Expr::Sym(name) => Some(Self::Reg(*name)),
            Expr::Mem(ptr, size) => Some(Self::Mem((**ptr).clone(), *size)),
            _ => None,
        }
    }

    pub fn to_expr(&self) -> Expr {
        match self {
            Self::Reg(name) => Expr::Sym(*name),
            Self::Mem(ptr, size) => Expr::mem(ptr.clone(), *size),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        self.to_expr().fmt(fmt)
    }
}

/// Symbolic effect of an instruction: every location it defines and the
/// expression, over the values before execution, stored there.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Binding {
    effects: BTreeMap<Location, Expr>,
    incomplete: bool,
}

impl Binding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, location: Location, value: Expr) -> &mut Self {
        self.effects.insert(location, value.reduce());
        self
    }

    /// Marks a binding guessed by a heuristic.
    pub fn set_incomplete(&mut self) -> &mut Self {
        self.incomplete = true;
        self
    }

    pub fn is_incomplete(&self) -> bool {
        self.incomplete
    }

    pub fn get(&self, location: &Location) -> Option<&Expr> {
        self.effects.get(location)
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Location, &Expr)> {
        self.effects.iter()
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        for (i, (location, value)) in self.effects.iter().enumerate() {
            if i != 0 {
                fmt.write_str(", ")?;
            }
            write!(fmt, "{location} = {value}")?;
        }
        if self.incomplete {
            if !self.effects.is_empty() {
                fmt.write_str(", ")?;
            }
            fmt.write_str("incomplete")?;
        }
        Ok(())
    }
}
