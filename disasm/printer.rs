use std::{
    cmp,
    io::{self, Write},
    ops::{Deref, DerefMut},
    string::FromUtf8Error,
};

use crate::{Arch, Decoder, Endian, Error, Insn};

pub use disasm_core::printer::{ArchPrinter, FormatterFn, PrinterExt, Style};

pub trait WriteExt: Write {
    fn write_u8_hex(&mut self, byte: u8) -> io::Result<()> {
        const MAP: [u8; 16] = *b"0123456789abcdef";
        let buf = [MAP[(byte >> 4) as usize & 15], MAP[byte as usize & 15]];
        self.write_all(&buf)
    }

    fn write_spaces(&mut self, mut width: usize) -> io::Result<()> {
        while width > 0 {
            const FILL: [u8; 32] = [b' '; 32];
            let len = cmp::min(width, FILL.len());
            self.write_all(&FILL[..len])?;
            width -= len;
        }
        Ok(())
    }
}

impl<T: Write> WriteExt for T {}

/// Listing printer: address, raw bytes and the decoded text of every
/// instruction, symbol headers and folded runs of zeroes.
pub struct Printer<E: PrinterExt = ()> {
    decoder: Decoder,
    insn: Insn,
    printer: Box<dyn ArchPrinter<E>>,
    ext: E,
    section_name: Box<str>,
}

impl<E: PrinterExt> Printer<E> {
    pub(crate) fn new(decoder: Decoder, ext: E, section_name: &str) -> Self {
        use crate::arch::*;

        let opts = &decoder.opts;
        let printer = match &decoder.arch {
            #[cfg(feature = "arm64")]
            Arch::Arm64(arch_opts) => arm64::printer(opts, arch_opts),
        };

        Self {
            decoder,
            insn: Insn::new(),
            printer,
            ext,
            section_name: section_name.to_owned().into_boxed_str(),
        }
    }

    /// Length of the zero run at the start of `cur` to fold, if any.
    fn zeroes(&self, cur: &[u8]) -> Option<usize> {
        let skip_zeroes = self.arch.skip_zeroes();
        if self.opts.decode_zeroes
            || cur.len() < skip_zeroes
            || !cur.iter().take(skip_zeroes).all(|i| *i == 0)
        {
            return None;
        }

        let address = self.address();
        let len = self
            .ext
            .get_symbol_after(address)
            .map(|(addr, _)| cmp::min((addr - address) as usize, cur.len()))
            .unwrap_or(cur.len());
        let zeroes = cur.iter().take(len).position(|i| *i != 0).unwrap_or(len);
        if (len != 0 && zeroes == len) || zeroes >= (skip_zeroes * 2 - 1) {
            let skip = cmp::min(zeroes & !(skip_zeroes - 1), cur.len());
            Some(skip).filter(|i| *i != 0)
        } else {
            None
        }
    }

    fn print_raw<W: Write>(&self, out: &mut W, bytes: &[u8]) -> io::Result<()> {
        match self.arch.endian() {
            Endian::Little => bytes.iter().rev().try_for_each(|i| out.write_u8_hex(*i))?,
            Endian::Big => bytes.iter().try_for_each(|i| out.write_u8_hex(*i))?,
        }
        let width = self.arch.bytes_per_line().saturating_sub(bytes.len()) * 2;
        out.write_spaces(width + 1)
    }

    pub fn print<W>(&mut self, out: &mut W, data: &[u8], first: bool) -> io::Result<()>
    where
        W: Write,
    {
        let address = self.address();
        let mut next_symbol = self.ext.get_symbol_after(address);
        let mut first_symbol = match self.ext.get_symbol(address) {
            Some((addr, name)) if address == addr => Some((name, 0)),
            _ if first => match next_symbol {
                Some((addr, name)) => Some((name, addr - address)),
                _ => Some((self.section_name.as_ref(), 0)),
            },
            _ => None,
        };

        let width = self.arch.addr_size() / 4;
        let mut print_symbol = |out: &mut W, address, next_symbol: &mut _| -> io::Result<()> {
            if let Some((name, offset)) = first_symbol.take() {
                if offset != 0 {
                    writeln!(out, "\n{address:0width$x} <{name}-{offset:#x}>:")?;
                } else {
                    writeln!(out, "\n{address:0width$x} <{name}>:")?;
                }
            } else if let Some((addr, name)) = *next_symbol {
                if addr == address {
                    writeln!(out, "\n{address:0width$x} <{name}>:")?;
                    *next_symbol = self.ext.get_symbol_after(address);
                }
            }
            Ok(())
        };

        let mut cur = data;
        while !cur.is_empty() {
            let address = self.address();

            if let Some(skip) = self.zeroes(cur) {
                print_symbol(out, address, &mut next_symbol)?;
                writeln!(out, "\t...")?;
                self.decoder.skip(skip as u64);
                cur = &cur[skip..];
                continue;
            }

            let (len, is_ok) = match self.decoder.decode(cur, &mut self.insn) {
                Ok(len) => (len, true),
                Err(err) => {
                    let len = match err {
                        Error::More(_) => cur.len(),
                        Error::Failed(len) => len,
                    };
                    self.decoder.skip(len as u64);
                    (len, false)
                }
            };

            print_symbol(out, address, &mut next_symbol)?;

            let addr_width = if address >= 0x1000 { 8 } else { 4 };
            write!(out, "{address:addr_width$x}:\t")?;
            self.print_raw(out, &cur[..len])?;

            if is_ok {
                let insn = &self.insn;
                let display = FormatterFn(|fmt| self.printer.print_insn(fmt, &self.ext, insn));
                write!(out, "\t{display}")?;

                if self.opts.show_bindings {
                    let binding = self.decoder.backtrace_binding(insn);
                    if !binding.is_empty() || binding.is_incomplete() {
                        let display = FormatterFn(|fmt| {
                            self.ext.print_comment(fmt, format_args!("; {binding}"))
                        });
                        write!(out, "\t{display}")?;
                    }
                }
            } else {
                write!(out, "\tfailed to decode")?;
            }

            out.write_all(b"\n")?;
            cur = &cur[len..];
        }

        Ok(())
    }

    pub fn print_to_vec(&mut self, data: &[u8], first: bool) -> Vec<u8> {
        let mut out = Vec::new();
        // writes to a vector do not fail
        let _ = self.print(&mut out, data, first);
        out
    }

    pub fn print_to_string(&mut self, data: &[u8], first: bool) -> Result<String, FromUtf8Error> {
        String::from_utf8(self.print_to_vec(data, first))
    }
}

impl<E: PrinterExt> Deref for Printer<E> {
    type Target = Decoder;

    fn deref(&self) -> &Self::Target {
        &self.decoder
    }
}

impl<E: PrinterExt> DerefMut for Printer<E> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.decoder
    }
}
