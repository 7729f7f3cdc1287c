use alloc::vec::Vec;
use core::fmt;
use std::sync::OnceLock;

use disasm_core::insn::Opcode;

use crate::{
    consts::*,
    opcodes::{opcode_list, Arg, FieldName, OpcodeSpec},
};

/// Inconsistent opcode description.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TableError {
    /// A field is registered twice.
    DuplicateField {
        opcode: &'static str,
        field: FieldName,
    },
    /// An argument reads a field the opcode does not register.
    MissingField {
        opcode: &'static str,
        arg: Arg,
        field: FieldName,
    },
    /// A bitmask immediate without a destination register to take the width from.
    MissingDestination { opcode: &'static str },
    /// More than one of `SETIP`, `PCREL` and `PCREL_PAGE`.
    ConflictingFixup { opcode: &'static str },
    /// An address fixup on an opcode whose last operand is not an immediate.
    NonImmediateFixup { opcode: &'static str },
}

impl fmt::Display for TableError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::DuplicateField { opcode, field } => {
                write!(fmt, "{opcode}: field {field} is registered twice")
            }
            Self::MissingField { opcode, arg, field } => {
                write!(fmt, "{opcode}: argument {arg} reads unregistered field {field}")
            }
            Self::MissingDestination { opcode } => {
                write!(fmt, "{opcode}: bitmask immediate without destination register")
            }
            Self::ConflictingFixup { opcode } => {
                write!(fmt, "{opcode}: more than one address fixup")
            }
            Self::NonImmediateFixup { opcode } => {
                write!(fmt, "{opcode}: address fixup of a non-immediate operand")
            }
        }
    }
}

impl std::error::Error for TableError {}

fn validate(op: &OpcodeSpec) -> Result<(), TableError> {
    let opcode = op.name;

    for (i, field) in op.fields.iter().enumerate() {
        if op.fields[..i].contains(field) {
            let field = *field;
            return Err(TableError::DuplicateField { opcode, field });
        }
    }

    for &arg in &op.args {
        if let Some(&field) = arg.fields().iter().find(|i| !op.fields.contains(i)) {
            return Err(TableError::MissingField { opcode, arg, field });
        }
    }

    if op.args.contains(&Arg::BitmaskImm) && !op.args.first().is_some_and(|i| i.is_reg()) {
        return Err(TableError::MissingDestination { opcode });
    }

    if op.props.flags.count(FIXUP_MASK) > 1 {
        return Err(TableError::ConflictingFixup { opcode });
    }

    if op.has(PCREL | PCREL_PAGE) && !op.args.last().is_some_and(|i| i.is_imm()) {
        return Err(TableError::NonImmediateFixup { opcode });
    }

    Ok(())
}

/// Appends `opcode` to every bucket whose byte agrees with the fixed bits of
/// the top byte of the encoding.
fn push_lookaside(lookaside: &mut [Vec<Opcode>], opcode: Opcode, bin: u32, bin_mask: u32) {
    let mask = (bin_mask >> 24) & 0xff;
    let b = (bin >> 24) & mask;
    for i in b..=(b | (0xff ^ mask)) {
        if i & mask == b {
            lookaside[i as usize].push(opcode);
        }
    }
}

/// Validated opcode list with the lookaside index.
#[derive(Debug)]
pub struct Table {
    opcodes: Vec<OpcodeSpec>,
    bin_masks: Vec<u32>,
    lookaside: Vec<Vec<Opcode>>,
}

impl Table {
    pub fn new(opcodes: Vec<OpcodeSpec>) -> Result<Self, TableError> {
        for op in &opcodes {
            validate(op)?;
        }

        let bin_masks: Vec<u32> = opcodes.iter().map(OpcodeSpec::bin_mask).collect();
        let mut lookaside = vec![Vec::new(); 256];
        for (i, (op, bin_mask)) in opcodes.iter().zip(&bin_masks).enumerate() {
            push_lookaside(&mut lookaside, Opcode(i as u32), op.bin, *bin_mask);
        }

        debug!(
            "arm64: {} opcodes, {} lookaside entries, {} empty buckets",
            opcodes.len(),
            lookaside.iter().map(Vec::len).sum::<usize>(),
            lookaside.iter().filter(|i| i.is_empty()).count(),
        );

        Ok(Self {
            opcodes,
            bin_masks,
            lookaside,
        })
    }

    /// Table for the built-in opcode list, built on first use.
    pub fn builtin() -> &'static Table {
        static TABLE: OnceLock<Table> = OnceLock::new();
        TABLE.get_or_init(|| match Table::new(opcode_list()) {
            Ok(table) => table,
            Err(err) => panic!("invalid arm64 opcode table: {err}"),
        })
    }

    pub fn len(&self) -> usize {
        self.opcodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.opcodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Opcode, &OpcodeSpec)> {
        self.opcodes
            .iter()
            .enumerate()
            .map(|(i, op)| (Opcode(i as u32), op))
    }

    pub fn spec(&self, opcode: Opcode) -> Option<&OpcodeSpec> {
        self.opcodes.get(opcode.index())
    }

    pub fn mnemonic(&self, opcode: Opcode) -> Option<&'static str> {
        self.spec(opcode).map(|op| op.name)
    }

    pub fn bin_mask(&self, opcode: Opcode) -> Option<u32> {
        self.bin_masks.get(opcode.index()).copied()
    }

    /// Candidates for words with the top byte `byte`, in registration order.
    pub fn bucket(&self, byte: u8) -> &[Opcode] {
        &self.lookaside[byte as usize]
    }

    /// First opcode in registration order whose fixed bits agree with `word`.
    pub fn find(&self, word: u32) -> Option<Opcode> {
        self.bucket((word >> 24) as u8)
            .iter()
            .copied()
            .find(|opcode| {
                let op = &self.opcodes[opcode.index()];
                let mask = self.bin_masks[opcode.index()];
                op.bin & mask == word & mask
            })
    }
}
