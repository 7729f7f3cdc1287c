use alloc::{borrow::Cow, boxed::Box};

use disasm_core::{
    insn::Insn,
    operand::Reg,
    printer::{ArchPrinter, PrinterExt},
};

use crate::{
    consts::{W_NAME, X_NAME},
    table::Table,
    Options,
};

struct Printer<'a> {
    table: &'a Table,
}

impl<'a> Printer<'a> {
    fn new(table: &'a Table, _: &disasm_core::Options, _: &Options) -> Self {
        Self { table }
    }
}

impl<E: PrinterExt> ArchPrinter<E> for Printer<'_> {
    fn mnemonic(&self, insn: &Insn) -> Option<&'static str> {
        self.table.mnemonic(insn.opcode())
    }

    fn register_name(&self, reg: Reg) -> Cow<'static, str> {
        let names = if reg.width() == 32 { W_NAME } else { X_NAME };
        names[reg.index() as usize].into()
    }
}

/// Printer for instructions decoded with the built-in table.
pub fn printer<E: PrinterExt>(
    opts: &disasm_core::Options,
    opts_arch: &Options,
) -> Box<dyn ArchPrinter<E>> {
    printer_with_table(Table::builtin(), opts, opts_arch)
}

/// Printer for instructions decoded with `table`.
///
/// Mnemonics are looked up by opcode index, so the table must be the one the
/// instructions were decoded with.
pub fn printer_with_table<'a, E: PrinterExt>(
    table: &'a Table,
    opts: &disasm_core::Options,
    opts_arch: &Options,
) -> Box<dyn ArchPrinter<E> + 'a> {
    Box::new(Printer::new(table, opts, opts_arch))
}
