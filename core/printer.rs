use std::{
    borrow::Cow,
    fmt::{self, Write},
};

use crate::{
    expr::Expr,
    insn::Insn,
    operand::{MemIncr, MemRef, Operand, OperandKind, Reg, Shift},
};

pub struct FormatterFn<F>(pub F)
where
    F: Fn(&mut fmt::Formatter) -> fmt::Result;

impl<F> fmt::Display for FormatterFn<F>
where
    F: Fn(&mut fmt::Formatter) -> fmt::Result,
{
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        self.0(fmt)
    }
}

#[derive(Copy, Clone)]
pub enum Separator {
    Tab,
    Char(char),
    Str(&'static str),
    Width(usize),
}

impl Separator {
    pub fn print(&self, fmt: &mut fmt::Formatter, mnemonic_len: usize) -> fmt::Result {
        match self {
            Separator::Tab => fmt.write_char('\t'),
            Separator::Char(c) => fmt.write_char(*c),
            Separator::Str(s) => fmt.write_str(s),
            Separator::Width(w) => {
                let w = w - std::cmp::min(*w, mnemonic_len);
                write!(fmt, "{:w$}", ' ')
            }
        }
    }
}

#[derive(Copy, Clone)]
pub enum Style {
    Mnemonic,
    Register,
    Immediate,
    Address,
    AddressOffset,
    Symbol,
    Comment,
}

pub trait PrinterExt {
    /// Get symbol with address less then or equal to `address`.
    fn get_symbol(&self, address: u64) -> Option<(u64, &str)>;

    /// Get symbol with address greater then `address`.
    fn get_symbol_after(&self, address: u64) -> Option<(u64, &str)>;

    fn print_styled(
        &self,
        fmt: &mut fmt::Formatter,
        #[allow(unused_variables)] style: Style,
        display: impl fmt::Display,
    ) -> fmt::Result {
        display.fmt(fmt)
    }

    fn print_mnemonic(&self, fmt: &mut fmt::Formatter, display: impl fmt::Display) -> fmt::Result {
        self.print_styled(fmt, Style::Mnemonic, display)
    }

    fn print_register(&self, fmt: &mut fmt::Formatter, display: impl fmt::Display) -> fmt::Result {
        self.print_styled(fmt, Style::Register, display)
    }

    fn print_immediate(&self, fmt: &mut fmt::Formatter, display: impl fmt::Display) -> fmt::Result {
        self.print_styled(fmt, Style::Immediate, display)
    }

    fn print_address(&self, fmt: &mut fmt::Formatter, display: impl fmt::Display) -> fmt::Result {
        self.print_styled(fmt, Style::Address, display)
    }

    fn print_address_offset(
        &self,
        fmt: &mut fmt::Formatter,
        display: impl fmt::Display,
    ) -> fmt::Result {
        self.print_styled(fmt, Style::AddressOffset, display)
    }

    fn print_symbol(&self, fmt: &mut fmt::Formatter, display: impl fmt::Display) -> fmt::Result {
        self.print_styled(fmt, Style::Symbol, display)
    }

    fn print_comment(&self, fmt: &mut fmt::Formatter, display: impl fmt::Display) -> fmt::Result {
        self.print_styled(fmt, Style::Comment, display)
    }
}

impl PrinterExt for () {
    fn get_symbol(&self, _: u64) -> Option<(u64, &str)> {
        None
    }

    fn get_symbol_after(&self, _: u64) -> Option<(u64, &str)> {
        None
    }
}

impl<T: PrinterExt> PrinterExt for &T {
    fn get_symbol(&self, address: u64) -> Option<(u64, &str)> {
        (**self).get_symbol(address)
    }

    fn get_symbol_after(&self, address: u64) -> Option<(u64, &str)> {
        (**self).get_symbol_after(address)
    }

    fn print_styled(
        &self,
        fmt: &mut fmt::Formatter,
        style: Style,
        display: impl fmt::Display,
    ) -> fmt::Result {
        (**self).print_styled(fmt, style, display)
    }
}

/// `#0x10`, `#-0x10`
struct Imm(i64);

impl fmt::Display for Imm {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        if self.0 < 0 {
            write!(fmt, "#-{:#x}", self.0.unsigned_abs())
        } else {
            write!(fmt, "#{:#x}", self.0)
        }
    }
}

pub trait ArchPrinter<E: PrinterExt>: Send + Sync {
    fn mnemonic(&self, insn: &Insn) -> Option<&'static str>;

    fn register_name(&self, reg: Reg) -> Cow<'static, str>;

    fn insn_separator(&self) -> Separator {
        Separator::Tab
    }

    fn operand_separator(&self, _operand: &Operand) -> Separator {
        Separator::Str(", ")
    }

    fn print_mnemonic(
        &self,
        fmt: &mut fmt::Formatter,
        ext: &E,
        insn: &Insn,
        separator: bool,
    ) -> fmt::Result {
        let mnemonic = self.mnemonic(insn).unwrap_or("<invalid>");
        ext.print_mnemonic(fmt, mnemonic)?;
        if separator && insn.operands().iter().any(|i| i.is_printable()) {
            self.insn_separator().print(fmt, mnemonic.len())?;
        }
        Ok(())
    }

    fn print_symbol(&self, fmt: &mut fmt::Formatter, ext: &E, addr: u64) -> fmt::Result {
        if let Some((sym_addr, sym_name)) = ext.get_symbol(addr) {
            fmt.write_str(" <")?;
            ext.print_symbol(fmt, sym_name)?;
            let diff = addr - sym_addr;
            if diff != 0 {
                fmt.write_char('+')?;
                ext.print_address_offset(fmt, FormatterFn(|fmt| write!(fmt, "{diff:#x}")))?;
            }
            fmt.write_char('>')?;
        }
        Ok(())
    }

    fn print_expr(
        &self,
        fmt: &mut fmt::Formatter,
        ext: &E,
        operand: &Operand,
        expr: &Expr,
    ) -> fmt::Result {
        match expr.as_const() {
            Some(addr) if operand.is_address() => {
                let addr = addr as u64;
                ext.print_address(fmt, FormatterFn(|fmt| write!(fmt, "{addr:x}")))?;
                self.print_symbol(fmt, ext, addr)
            }
            Some(imm) => ext.print_immediate(fmt, Imm(imm)),
            None => ext.print_immediate(fmt, expr),
        }
    }

    fn print_mem(&self, fmt: &mut fmt::Formatter, ext: &E, mem: &MemRef) -> fmt::Result {
        let offset = FormatterFn(|fmt| match mem.offset.as_const() {
            Some(offset) => write!(fmt, "#{offset}"),
            None => write!(fmt, "{}", mem.offset),
        });
        let has_offset = mem.offset.as_const() != Some(0);

        fmt.write_char('[')?;
        ext.print_register(fmt, self.register_name(mem.base))?;
        if let Some(index) = mem.index {
            fmt.write_str(", ")?;
            ext.print_register(fmt, self.register_name(index))?;
            if let Some(scale) = mem.scale.filter(|i| *i > 1) {
                write!(fmt, ", lsl #{}", scale.trailing_zeros())?;
            }
        }
        match mem.incr {
            MemIncr::Post => {
                fmt.write_str("], ")?;
                ext.print_address_offset(fmt, offset)?;
            }
            _ => {
                if has_offset {
                    fmt.write_str(", ")?;
                    ext.print_address_offset(fmt, offset)?;
                }
                fmt.write_char(']')?;
                if mem.incr == MemIncr::Pre {
                    fmt.write_char('!')?;
                }
            }
        }
        Ok(())
    }

    fn print_operand_default(
        &self,
        fmt: &mut fmt::Formatter,
        ext: &E,
        _: &Insn,
        operand: &Operand,
    ) -> fmt::Result {
        match operand.kind() {
            OperandKind::Reg(reg) => {
                ext.print_register(fmt, self.register_name(*reg))?;
            }
            OperandKind::Shifted(reg, shift, amount) => {
                ext.print_register(fmt, self.register_name(*reg))?;
                if *amount != 0 || *shift != Shift::Lsl {
                    write!(fmt, ", {} ", shift.name())?;
                    ext.print_immediate(fmt, FormatterFn(|fmt| write!(fmt, "#{amount}")))?;
                }
            }
            OperandKind::Imm(expr) => {
                self.print_expr(fmt, ext, operand, expr)?;
            }
            OperandKind::Mem(mem) => {
                self.print_mem(fmt, ext, mem)?;
            }
        }
        Ok(())
    }

    fn print_operand(
        &self,
        fmt: &mut fmt::Formatter,
        ext: &E,
        insn: &Insn,
        operand: &Operand,
    ) -> fmt::Result {
        self.print_operand_default(fmt, ext, insn, operand)
    }

    fn print_operands(&self, fmt: &mut fmt::Formatter, ext: &E, insn: &Insn) -> fmt::Result {
        let operands = insn.operands().iter().filter(|i| i.is_printable());
        for (i, operand) in operands.enumerate() {
            if i != 0 {
                self.operand_separator(operand).print(fmt, 0)?;
            }
            self.print_operand(fmt, ext, insn, operand)?;
        }
        Ok(())
    }

    fn print_insn(&self, fmt: &mut fmt::Formatter, ext: &E, insn: &Insn) -> fmt::Result {
        self.print_mnemonic(fmt, ext, insn, true)?;
        self.print_operands(fmt, ext, insn)
    }
}
