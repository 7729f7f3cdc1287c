use std::fmt::{self, Write as _};

struct HexBytes<'a>(&'a [u8]);

impl fmt::Display for HexBytes<'_> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if i != 0 {
                fmt.write_char(' ')?;
            }
            write!(fmt, "{b:02x}")?;
        }
        Ok(())
    }
}

/// Shows tabs and trailing spaces of a line.
struct Visible<'a>(&'a str);

impl fmt::Display for Visible<'_> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let trimmed = self.0.trim_end();
        for c in trimmed.chars() {
            match c {
                '\t' => fmt.write_char('→')?,
                _ => fmt.write_char(c)?,
            }
        }
        for _ in self.0[trimmed.len()..].chars() {
            fmt.write_char('•')?;
        }
        Ok(())
    }
}

/// Line diff between expected and decoded text.
pub struct Diff<'a> {
    file: &'a str,
    line: usize,
    bytes: &'a [u8],
    expect: &'a str,
    result: &'a str,
}

impl<'a> Diff<'a> {
    pub fn new(
        file: &'a str,
        line: usize,
        bytes: &'a [u8],
        expect: &'a str,
        result: &'a str,
    ) -> Self {
        Self {
            file,
            line,
            bytes,
            expect,
            result,
        }
    }
}

impl fmt::Display for Diff<'_> {
    fn fmt(&self, out: &mut fmt::Formatter) -> fmt::Result {
        use diff::Result as D;

        let w = 5;
        if !self.file.is_empty() {
            writeln!(out, "{:w$}--> {}:{}", ' ', self.file, self.line)?;
        }
        if !self.bytes.is_empty() {
            writeln!(out, "{:>w$} | {}", "raw", HexBytes(self.bytes))?;
        }
        let mut ln = self.line.max(1);
        for diff in diff::lines(self.expect, self.result) {
            match diff {
                D::Left(l) => writeln!(out, "{ln:w$} - {}", Visible(l))?,
                D::Both(l, _) => {
                    writeln!(out, "{ln:w$} | {}", Visible(l))?;
                    ln += 1;
                }
                D::Right(r) => writeln!(out, "{ln:w$} + {}", Visible(r))?,
            }
        }
        Ok(())
    }
}

/// Compares two multi-line texts, printing a diff on mismatch.
pub fn check(file: &str, line: usize, expect: &str, result: &str) -> Result<(), String> {
    if expect != result {
        let err = "invalid result";
        eprintln!("error: {err}");
        eprintln!("{}", Diff::new(file, line, &[], expect, result));
        return Err(err.to_string());
    }
    Ok(())
}
