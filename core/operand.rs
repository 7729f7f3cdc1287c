use crate::{expr::Expr, flags::Flags};

/// General purpose register.
///
/// Index 32 stands for the zero register where an encoding allows it, index
/// 31 for the stack pointer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Reg {
    index: u8,
    width: u8,
}

impl Reg {
    pub const SP: u8 = 31;
    pub const ZERO: u8 = 32;

    pub const fn new(index: u8, width: u8) -> Self {
        assert!(index <= Self::ZERO);
        assert!(width == 32 || width == 64);
        Self { index, width }
    }

    pub const fn index(&self) -> u8 {
        self.index
    }

    /// Width in bits, 32 or 64.
    pub const fn width(&self) -> u8 {
        self.width
    }

    pub const fn is_zero(&self) -> bool {
        self.index == Self::ZERO
    }

    pub const fn is_sp(&self) -> bool {
        self.index == Self::SP
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Shift {
    Lsl,
    Lsr,
    Asr,
}

impl Shift {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Lsl => "lsl",
            Self::Lsr => "lsr",
            Self::Asr => "asr",
        }
    }
}

/// Base register update mode of a memory access.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum MemIncr {
    #[default]
    None,
    Pre,
    Post,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemRef {
    pub base: Reg,
    pub index: Option<Reg>,
    pub scale: Option<u8>,
    /// Byte offset from the base.
    pub offset: Expr,
    /// Access size in bytes.
    pub size: u8,
    pub incr: MemIncr,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OperandKind {
    /// reg
    Reg(Reg),
    /// reg, shift #amount
    Shifted(Reg, Shift, u8),
    /// immediate or address expression
    Imm(Expr),
    /// memory reference
    Mem(MemRef),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Operand {
    kind: OperandKind,
    flags: Flags,
}

impl Operand {
    const NO_PRINT: u32 = 1 << 0;
    const ADDRESS: u32 = 1 << 1;

    pub fn new(kind: OperandKind) -> Self {
        Self {
            kind,
            flags: Flags::empty(),
        }
    }

    pub fn reg(reg: Reg) -> Self {
        Self::new(OperandKind::Reg(reg))
    }

    pub fn imm(expr: Expr) -> Self {
        Self::new(OperandKind::Imm(expr))
    }

    pub fn non_printable(mut self, non_printable: bool) -> Self {
        self.flags.set_if(Self::NO_PRINT, non_printable);
        self
    }

    /// Marks an immediate which holds an absolute address.
    pub fn address(mut self) -> Self {
        self.flags.set(Self::ADDRESS);
        self
    }

    pub fn kind(&self) -> &OperandKind {
        &self.kind
    }

    pub fn as_reg(&self) -> Option<Reg> {
        match self.kind {
            OperandKind::Reg(reg) => Some(reg),
            _ => None,
        }
    }

    pub fn as_expr(&self) -> Option<&Expr> {
        match &self.kind {
            OperandKind::Imm(expr) => Some(expr),
            _ => None,
        }
    }

    pub fn is_printable(&self) -> bool {
        !self.flags.any(Self::NO_PRINT)
    }

    pub fn is_address(&self) -> bool {
        self.flags.any(Self::ADDRESS)
    }
}

impl From<OperandKind> for Operand {
    fn from(value: OperandKind) -> Self {
        Operand::new(value)
    }
}
