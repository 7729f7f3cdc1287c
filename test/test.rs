//! `.test` listing files.
//!
//! ```text
//! // comment, flags for the following test: +alias -bindings
//! 1000: d503201f      nop
//!       91004020      add x0, x1, #0x10 ; x0 = x1 + 0x10   // +bindings
//!       00000000      (bad)
//! ```
//!
//! Every line holds an optional address, instruction words in hex and the
//! expected text after at least two spaces. A word is stored in little endian
//! byte order. Lines without an address continue after the previous test.

use std::{
    fmt::{self, Write},
    str::Lines,
};

use disasm_core::{
    insn::Insn,
    printer::{ArchPrinter, FormatterFn},
    ArchDecoder,
};

use super::utils::Diff;

/// Expected text for bytes which do not decode.
pub const BAD: &str = "(bad)";

const COMMENT: &str = "//";

#[derive(Clone, Debug, PartialEq, Eq)]
struct ParserError {
    file: String,
    line: usize,
    msg: String,
}

impl fmt::Display for ParserError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "error: {}, {}:{}", self.msg, self.file, self.line)
    }
}

#[derive(Clone, Debug, Default)]
pub struct Test<'a> {
    pub line: usize,
    pub comment: &'a str,
    pub address: u64,
    pub bytes: Vec<u8>,
    pub asm: &'a str,
}

pub struct Parser<'a> {
    file: String,
    lines: Lines<'a>,
    line: usize,
    next_address: u64,
}

impl<'a> Parser<'a> {
    pub fn new(file: &str, input: &'a str) -> Self {
        Self {
            file: file.to_owned(),
            lines: input.lines(),
            line: 0,
            next_address: 0,
        }
    }

    fn error<T>(&self, msg: String) -> Result<T, String> {
        let err = ParserError {
            file: self.file.clone(),
            line: self.line,
            msg,
        };
        Err(err.to_string())
    }

    pub fn parse(&mut self, output: &mut Test<'a>) -> Result<bool, String> {
        output.bytes.clear();

        while let Some(line) = self.lines.next() {
            self.line += 1;

            let (line, comment) = line.split_once(COMMENT).unwrap_or((line, ""));
            let mut cur = line.trim();
            if cur.is_empty() {
                continue;
            }

            output.line = self.line;
            output.comment = comment.trim();
            output.address = self.next_address;

            let address = cur.split_once(':').filter(|(head, _)| !head.trim().contains(' '));
            if let Some((head, tail)) = address {
                match u64::from_str_radix(head.trim(), 16) {
                    Ok(address) => output.address = address,
                    Err(_) => return self.error(format!("invalid address \"{head}\"")),
                }
                cur = tail.trim_start();
            }

            // words end at the first run of two spaces
            let (words, asm) = match cur.find("  ") {
                Some(pos) => cur.split_at(pos),
                None => (cur, ""),
            };
            for word in words.split_whitespace() {
                if word.len() % 2 != 0 || !word.chars().all(|c| c.is_ascii_hexdigit()) {
                    return self.error(format!("invalid instruction word \"{word}\""));
                }
                let raw = match u64::from_str_radix(word, 16) {
                    Ok(raw) => raw,
                    Err(_) => return self.error(format!("invalid instruction word \"{word}\"")),
                };
                output.bytes.extend_from_slice(&raw.to_le_bytes()[..word.len() / 2]);
            }

            if output.bytes.is_empty() {
                return self.error("no instruction bytes".to_owned());
            }

            output.asm = asm.trim();
            self.next_address = output.address + output.bytes.len() as u64;
            return Ok(true);
        }

        Ok(false)
    }

    /// Concatenates the bytes of every test, zero filling gaps between
    /// addresses.
    pub fn parse_all(src: &str) -> Result<(u64, Vec<u8>), String> {
        let mut parser = Parser::new("input", src);
        let mut test = Test::default();
        let mut start = None;
        let mut data = vec![];
        while parser.parse(&mut test)? {
            let base = *start.get_or_insert(test.address);
            let offset = test.address.checked_sub(base).map(|i| i as usize);
            match offset {
                Some(offset) if offset >= data.len() => {
                    data.resize(offset, 0);
                    data.extend_from_slice(&test.bytes);
                }
                _ => return parser.error(format!("address {:#x} goes backwards", test.address)),
            }
        }
        Ok((start.unwrap_or(0), data))
    }
}

pub fn parse_flags(s: &str) -> impl Iterator<Item = (&str, bool)> {
    s.split_whitespace().filter_map(|i| {
        let state = match i.chars().next() {
            Some('+') => true,
            Some('-') => false,
            _ => return None,
        };
        Some((&i[1..], state))
    })
}

/// Collapses whitespace runs into a single space.
fn push_normalized(out: &mut String, s: &str) {
    for (i, s) in s.split_whitespace().enumerate() {
        if i != 0 {
            out.push(' ');
        }
        out.push_str(s);
    }
}

pub struct Target {
    pub decoder: Box<dyn ArchDecoder>,
    pub printer: Box<dyn ArchPrinter<()>>,
    /// Append the backtrace binding after ` ; `.
    pub bindings: bool,
}

impl Target {
    pub fn insn_to_string(&self, insn: &Insn) -> String {
        let mut buf = String::new();
        write!(
            &mut buf,
            "{}",
            FormatterFn(|fmt| self.printer.print_insn(fmt, &(), insn))
        )
        .unwrap();
        if self.bindings {
            let binding = self.decoder.backtrace_binding(insn);
            write!(&mut buf, " ; {binding}").unwrap();
        }
        let mut out = String::new();
        push_normalized(&mut out, &buf);
        out
    }
}

pub trait Runner {
    fn create(&mut self, test: &Test) -> Target;

    fn run(&mut self, file: &str, tests: &str) -> Result<(), String> {
        let mut insn = Insn::new();
        let mut test = Test::default();
        let mut parser = Parser::new(file, tests);
        let mut failed = 0;
        while parser.parse(&mut test)? {
            let target = self.create(&test);
            let decoded = target.decoder.decode(test.address, &test.bytes, &mut insn);
            let (len, result) = match decoded {
                Ok(len) => (len, target.insn_to_string(&insn)),
                Err(_) => (test.bytes.len(), BAD.to_owned()),
            };

            let mut expect = String::new();
            push_normalized(&mut expect, test.asm);

            let expect_len = test.bytes.len();
            if len != expect_len || result != expect {
                failed += 1;

                if len != expect_len {
                    eprintln!("error: invalid length, {}:{}", file, test.line);
                    eprintln!("  expect: {expect_len}");
                    eprintln!("  result: {len}");
                }
                if result != expect {
                    eprintln!("error: invalid output, {}:{}", file, test.line);
                }

                let diff = Diff::new(file, test.line, &test.bytes, &expect, &result);
                eprintln!("{diff}");
            }
        }
        if failed == 0 {
            Ok(())
        } else {
            Err(format!("failed {failed} tests"))
        }
    }
}
