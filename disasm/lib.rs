extern crate alloc;

pub mod arch;

#[cfg(feature = "print")]
mod printer;

use alloc::{boxed::Box, vec::Vec};

use disasm_core::ArchDecoder;

pub use disasm_core::{
    bytes::Endian,
    error::Error,
    expr::{Binding, Expr, Location},
    insn::{Insn, Opcode},
    operand::{MemIncr, MemRef, Operand, OperandKind, Reg, Shift},
    Options,
};

#[cfg(feature = "print")]
pub use crate::printer::{Printer, PrinterExt, Style};

#[non_exhaustive]
#[derive(Copy, Clone)]
pub enum Arch {
    #[cfg(feature = "arm64")]
    Arm64(crate::arch::arm64::Options),
}

impl Arch {
    pub fn bytes_per_line(&self) -> usize {
        match self {
            #[cfg(feature = "arm64")]
            Arch::Arm64(..) => 4,
        }
    }

    /// Shortest run of zero bytes folded into `...` in listings.
    pub fn skip_zeroes(&self) -> usize {
        match self {
            #[cfg(feature = "arm64")]
            Arch::Arm64(..) => 4,
        }
    }

    pub fn addr_size(&self) -> usize {
        match self {
            #[cfg(feature = "arm64")]
            Arch::Arm64(..) => 64,
        }
    }

    pub fn insn_size_min(&self) -> usize {
        match self {
            #[cfg(feature = "arm64")]
            Arch::Arm64(..) => crate::arch::arm64::INSN_SIZE,
        }
    }

    pub fn insn_size_max(&self) -> usize {
        self.insn_size_min()
    }

    pub fn insn_alignment(&self) -> usize {
        self.insn_size_min()
    }

    pub fn endian(&self) -> Endian {
        match self {
            #[cfg(feature = "arm64")]
            Arch::Arm64(opts) => opts.endian,
        }
    }
}

pub struct Decoder {
    address: u64,
    opts: Options,
    arch: Arch,
    decoder: Box<dyn ArchDecoder>,
}

impl Decoder {
    pub fn new(arch: Arch, address: u64, opts: Options) -> Self {
        use crate::arch::*;

        let decoder = match arch {
            #[cfg(feature = "arm64")]
            Arch::Arm64(arch_opts) => arm64::decoder(&opts, &arch_opts),
        };

        Self {
            address,
            opts,
            arch,
            decoder,
        }
    }

    #[cfg(feature = "print")]
    pub fn printer<E: PrinterExt>(self, ext: E, section_name: &str) -> Printer<E> {
        Printer::new(self, ext, section_name)
    }

    pub fn arch(&self) -> &Arch {
        &self.arch
    }

    pub fn opts(&self) -> &Options {
        &self.opts
    }

    /// Current decoding address.
    pub fn address(&self) -> u64 {
        self.address
    }

    /// Decodes one instruction at the current address and advances past it.
    pub fn decode(&mut self, bytes: &[u8], out: &mut Insn) -> Result<usize, Error> {
        let len = self.decoder.decode(self.address, bytes, out)?;
        self.address += len as u64;
        Ok(len)
    }

    /// Do not decode `size` bytes.
    pub fn skip(&mut self, size: u64) {
        self.address += size;
    }

    pub fn mnemonic(&self, insn: &Insn) -> Option<&'static str> {
        self.decoder.mnemonic(insn)
    }

    /// Symbolic effect of a decoded instruction.
    pub fn backtrace_binding(&self, insn: &Insn) -> Binding {
        self.decoder.backtrace_binding(insn)
    }

    /// Possible control-flow targets of a decoded instruction.
    pub fn control_flow_targets(&self, insn: &Insn) -> Vec<Expr> {
        self.decoder.control_flow_targets(insn)
    }
}
