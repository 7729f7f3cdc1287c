use alloc::vec::Vec;

use crate::{flags::Flags, operand::Operand};

/// Instruction transfers control.
pub const INSN_BRANCH: u32 = 1 << 0;
/// Instruction saves a return address.
pub const INSN_CALL: u32 = 1 << 1;
/// Execution never falls through to the next instruction.
pub const INSN_STOP: u32 = 1 << 2;

/// Index of an encoding in the decoder's opcode table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Opcode(pub u32);

impl Opcode {
    pub const INVALID: Self = Self(u32::MAX);

    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug)]
pub struct Insn {
    opcode: Opcode,
    raw: u32,
    address: u64,
    len: usize,
    flags: Flags,
    operands: Vec<Operand>,
}

impl Insn {
    pub fn new() -> Self {
        Self {
            opcode: Opcode::INVALID,
            raw: 0,
            address: 0,
            len: 0,
            flags: Flags::empty(),
            operands: Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.opcode = Opcode::INVALID;
        self.raw = 0;
        self.address = 0;
        self.len = 0;
        self.flags = Flags::empty();
        self.operands.clear();
    }

    pub fn flags(&self) -> &Flags {
        &self.flags
    }

    pub fn flags_mut(&mut self) -> &mut Flags {
        &mut self.flags
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn set_opcode(&mut self, opcode: Opcode) {
        self.opcode = opcode;
    }

    pub fn is_valid(&self) -> bool {
        self.opcode != Opcode::INVALID
    }

    /// Raw instruction word.
    pub fn raw(&self) -> u32 {
        self.raw
    }

    pub fn set_raw(&mut self, raw: u32) {
        self.raw = raw;
    }

    pub fn address(&self) -> u64 {
        self.address
    }

    pub fn set_address(&mut self, address: u64) {
        self.address = address;
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn set_len(&mut self, len: usize) {
        self.len = len;
    }

    /// Address of the following instruction.
    pub fn next_address(&self) -> u64 {
        self.address.wrapping_add(self.len as u64)
    }

    pub fn operands(&self) -> &[Operand] {
        self.operands.as_slice()
    }

    pub fn operands_mut(&mut self) -> &mut [Operand] {
        self.operands.as_mut_slice()
    }

    pub fn push_operand<T>(&mut self, operand: T)
    where
        T: Into<Operand>,
    {
        self.operands.push(operand.into());
    }
}

impl Default for Insn {
    fn default() -> Self {
        Self::new()
    }
}
