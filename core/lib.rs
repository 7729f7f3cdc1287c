extern crate alloc;

pub mod bytes;
pub mod error;
pub mod expr;
pub mod flags;
pub mod insn;
pub mod operand;
pub mod utils;

#[cfg(feature = "print")]
pub mod printer;

use alloc::vec::Vec;

use crate::{
    error::Error,
    expr::{Binding, Expr},
    insn::Insn,
};

pub trait ArchDecoder: Send + Sync {
    /// Decode one instruction at `address` from the start of `bytes`.
    ///
    /// Returns the length of the instruction in bytes.
    fn decode(&self, address: u64, bytes: &[u8], out: &mut Insn) -> Result<usize, Error>;

    fn mnemonic(&self, insn: &Insn) -> Option<&'static str>;

    /// Symbolic effect of a decoded instruction.
    fn backtrace_binding(&self, insn: &Insn) -> Binding;

    /// Possible control-flow targets of a decoded instruction.
    fn control_flow_targets(&self, insn: &Insn) -> Vec<Expr>;
}

#[derive(Copy, Clone)]
pub struct Options {
    pub alias: bool,
    pub decode_zeroes: bool,
    pub show_bindings: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            alias: true,
            decode_zeroes: false,
            show_bindings: false,
        }
    }
}
