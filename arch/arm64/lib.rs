#[macro_use]
extern crate log;

extern crate alloc;

mod backtrace;
mod consts;
mod decode;
mod opcodes;
mod table;

#[cfg(feature = "print")]
mod printer;

use alloc::{boxed::Box, vec::Vec};

use disasm_core::{
    bytes::{Bytes, Endian},
    error::Error,
    expr::{Binding, Expr},
    insn::{Insn, INSN_BRANCH, INSN_CALL, INSN_STOP},
    ArchDecoder,
};

pub use self::backtrace::symbolic;
pub use self::consts::*;
pub use self::decode::decode_bit_masks;
pub use self::opcodes::{opcode_list, Arg, FieldName, OpcodeList, OpcodeSpec, Props};
pub use self::table::{Table, TableError};

#[cfg(feature = "print")]
pub use self::printer::{printer, printer_with_table};

/// Instruction length in bytes.
pub const INSN_SIZE: usize = 4;

#[derive(Copy, Clone, Debug, Default)]
pub struct Options {
    /// Byte order of instruction words.
    pub endian: Endian,
}

pub struct Decoder<'a> {
    alias: bool,
    opts_arch: Options,
    table: &'a Table,
}

impl Decoder<'static> {
    pub fn new(opts: &disasm_core::Options, opts_arch: &Options) -> Self {
        Self::with_table(Table::builtin(), opts, opts_arch)
    }
}

impl<'a> Decoder<'a> {
    pub fn with_table(table: &'a Table, opts: &disasm_core::Options, opts_arch: &Options) -> Self {
        Self {
            alias: opts.alias,
            opts_arch: *opts_arch,
            table,
        }
    }

    pub fn table(&self) -> &'a Table {
        self.table
    }

    /// Decodes one instruction, `None` if `bytes` are too short or match no
    /// opcode.
    pub fn decode_insn(&self, bytes: &[u8], address: u64) -> Option<Insn> {
        let mut insn = Insn::new();
        self.decode(address, bytes, &mut insn).ok()?;
        Some(insn)
    }

    fn spec(&self, insn: &Insn) -> Option<&'a OpcodeSpec> {
        self.table.spec(insn.opcode())
    }
}

impl ArchDecoder for Decoder<'_> {
    fn decode(&self, address: u64, bytes: &[u8], out: &mut Insn) -> Result<usize, Error> {
        let mut bytes = Bytes::new(bytes);
        let word = bytes.read_u32(self.opts_arch.endian)?;
        let opcode = self.table.find(word).ok_or(Error::Failed(INSN_SIZE))?;
        let op = self.table.spec(opcode).ok_or(Error::Failed(INSN_SIZE))?;

        out.clear();
        out.set_opcode(opcode);
        out.set_raw(word);
        out.set_address(address);
        out.set_len(INSN_SIZE);
        out.flags_mut()
            .set_if(INSN_BRANCH, op.has(SETIP))
            .set_if(INSN_CALL, op.has(SAVEIP))
            .set_if(INSN_STOP, op.has(STOPEXEC));

        decode::decode_operands(op, word, out);
        decode::fixup(op, address, out);

        if self.alias && op.name == "ret" {
            if let Some(rn) = out.operands_mut().first_mut() {
                let hide = rn.as_reg().is_some_and(|reg| reg.index() == 30);
                *rn = rn.clone().non_printable(hide);
            }
        }

        Ok(INSN_SIZE)
    }

    fn mnemonic(&self, insn: &Insn) -> Option<&'static str> {
        self.table.mnemonic(insn.opcode())
    }

    fn backtrace_binding(&self, insn: &Insn) -> Binding {
        match self.spec(insn) {
            Some(op) => backtrace::get_backtrace_binding(op, insn),
            None => Binding::new(),
        }
    }

    fn control_flow_targets(&self, insn: &Insn) -> Vec<Expr> {
        match self.spec(insn) {
            Some(op) => backtrace::get_xrefs_x(op, insn),
            None => Vec::new(),
        }
    }
}

pub fn decoder(opts: &disasm_core::Options, opts_arch: &Options) -> Box<dyn ArchDecoder> {
    Box::new(Decoder::new(opts, opts_arch))
}
