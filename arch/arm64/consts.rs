//! Opcode properties.

/// Register operands are 32-bit.
pub const R_32: u32 = 1 << 0;
/// Register 31 names the zero register instead of the stack pointer.
pub const R_Z: u32 = 1 << 1;
/// Last operand is a branch target relative to the instruction address.
pub const SETIP: u32 = 1 << 2;
/// Execution does not fall through.
pub const STOPEXEC: u32 = 1 << 3;
/// Return address is saved in x30.
pub const SAVEIP: u32 = 1 << 4;
/// Last operand is an offset from the instruction address.
pub const PCREL: u32 = 1 << 5;
/// Last operand is a 4KiB page offset from the instruction page.
pub const PCREL_PAGE: u32 = 1 << 6;
/// Register 31 in `rn` names the zero register, `rt` keeps the stack pointer.
pub const RN_Z: u32 = 1 << 7;

/// Properties which rewrite the last operand into an absolute address.
pub const FIXUP_MASK: u32 = SETIP | PCREL | PCREL_PAGE;

#[rustfmt::skip]
pub(crate) const X_NAME: [&str; 33] = [
    "x0",  "x1",  "x2",  "x3",  "x4",  "x5",  "x6",  "x7",
    "x8",  "x9",  "x10", "x11", "x12", "x13", "x14", "x15",
    "x16", "x17", "x18", "x19", "x20", "x21", "x22", "x23",
    "x24", "x25", "x26", "x27", "x28", "x29", "x30", "sp",
    "xzr",
];

#[rustfmt::skip]
pub(crate) const W_NAME: [&str; 33] = [
    "w0",  "w1",  "w2",  "w3",  "w4",  "w5",  "w6",  "w7",
    "w8",  "w9",  "w10", "w11", "w12", "w13", "w14", "w15",
    "w16", "w17", "w18", "w19", "w20", "w21", "w22", "w23",
    "w24", "w25", "w26", "w27", "w28", "w29", "w30", "wsp",
    "wzr",
];

#[rustfmt::skip]
pub(crate) const B_COND_NAME: [&str; 16] = [
    "b.eq", "b.ne", "b.cs", "b.cc", "b.mi", "b.pl", "b.vs", "b.vc",
    "b.hi", "b.ls", "b.ge", "b.lt", "b.gt", "b.le", "b.al", "b.nv",
];
