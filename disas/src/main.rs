#[macro_use]
extern crate log;

mod cli;

use std::{
    error::Error,
    fs,
    io::{self, Write},
    process,
};

use disasm::{arch::arm64, Arch, Decoder, Endian, Options, PrinterExt};
use object::{
    read::macho::{FatArch, MachOFatFile32, MachOFatFile64},
    Architecture, BinaryFormat, FileKind, Object, ObjectSection, SectionKind,
};

#[cfg(feature = "color")]
use std::fmt;

#[cfg(feature = "color")]
use disasm::Style;

use crate::cli::{Cli, Color, Demangle};

const HELP_ARM64: &str = "\
  little      Read instruction words in little endian
  big         Read instruction words in big endian
  no-aliases  Print the return register of `ret x30`
  bindings    Print the backtrace binding of every instruction
";

fn unsupported_arch() -> ! {
    eprintln!("error: unsupported architecture");
    process::exit(1);
}

#[cfg(feature = "demangle")]
fn demangle(style: Demangle, name: &str) -> Option<String> {
    match style {
        Demangle::Auto => {
            if let Ok(symbol) = rustc_demangle::try_demangle(name) {
                return Some(format!("{symbol:#}"));
            }
            cpp_demangle::Symbol::new(name).ok().map(|i| i.to_string())
        }
        Demangle::Gnuv3 => cpp_demangle::Symbol::new(name).ok().map(|i| i.to_string()),
        Demangle::Rust => rustc_demangle::try_demangle(name)
            .ok()
            .map(|i| format!("{i:#}")),
        Demangle::None => None,
    }
}

#[cfg(not(feature = "demangle"))]
fn demangle(_: Demangle, _: &str) -> Option<String> {
    None
}

struct Info {
    #[cfg_attr(not(feature = "color"), allow(dead_code))]
    color: Color,
    /// Sorted by address.
    symbols: Vec<(u64, String)>,
}

impl Info {
    fn new(file: Option<&object::File>, color: Color, style: Demangle) -> Self {
        let mut symbols = Vec::new();
        if let Some(file) = file {
            for symbol in file.symbol_map().symbols() {
                let name = symbol.name();
                let name = demangle(style, name).unwrap_or_else(|| name.to_owned());
                symbols.push((symbol.address(), name));
            }
        }
        symbols.sort_by_key(|i| i.0);
        debug!("{} symbols", symbols.len());
        Self { color, symbols }
    }
}

impl PrinterExt for Info {
    fn get_symbol(&self, address: u64) -> Option<(u64, &str)> {
        let index = self.symbols.partition_point(|i| i.0 <= address);
        let (addr, name) = self.symbols.get(index.checked_sub(1)?)?;
        Some((*addr, name.as_str()))
    }

    fn get_symbol_after(&self, address: u64) -> Option<(u64, &str)> {
        let index = self.symbols.partition_point(|i| i.0 <= address);
        let (addr, name) = self.symbols.get(index)?;
        Some((*addr, name.as_str()))
    }

    #[cfg(feature = "color")]
    fn print_styled(
        &self,
        fmt: &mut fmt::Formatter,
        style: Style,
        display: impl fmt::Display,
    ) -> fmt::Result {
        use fmt::Display;
        use owo_colors::OwoColorize;

        match self.color {
            Color::Off => display.fmt(fmt),
            Color::On | Color::Extended => match style {
                Style::Mnemonic => display.yellow().fmt(fmt),
                Style::Register => display.blue().fmt(fmt),
                Style::Immediate => display.magenta().fmt(fmt),
                Style::Address => display.magenta().fmt(fmt),
                Style::AddressOffset => display.magenta().fmt(fmt),
                Style::Symbol => display.green().fmt(fmt),
                Style::Comment => display.dimmed().fmt(fmt),
            },
        }
    }
}

/// Input after container sniffing.
enum Input<'a> {
    Object(object::File<'a>),
    /// Instruction words without a recognised container.
    Raw(&'a [u8]),
}

impl<'a> Input<'a> {
    fn fat_slice<A: FatArch>(arches: &[A], data: &'a [u8]) -> Result<&'a [u8], Box<dyn Error>> {
        let arch = arches
            .iter()
            .find(|i| i.architecture() == Architecture::Aarch64)
            .ok_or("fat Mach-O without an arm64 slice")?;
        Ok(arch.data(data)?)
    }

    fn parse(data: &'a [u8], raw: bool) -> Result<Self, Box<dyn Error>> {
        if raw {
            return Ok(Input::Raw(data));
        }
        let data = match FileKind::parse(data) {
            Ok(FileKind::MachOFat32) => {
                let fat = MachOFatFile32::parse(data)?;
                Self::fat_slice(fat.arches(), data)?
            }
            Ok(FileKind::MachOFat64) => {
                let fat = MachOFatFile64::parse(data)?;
                Self::fat_slice(fat.arches(), data)?
            }
            Ok(kind) => {
                debug!("file kind {kind:?}");
                data
            }
            Err(err) => {
                debug!("{err}, disassembling as raw code");
                return Ok(Input::Raw(data));
            }
        };
        Ok(Input::Object(object::File::parse(data)?))
    }
}

struct App<'a> {
    cli: &'a Cli,
    opts: Options,
    arch: Arch,
    info: Info,
}

impl<'a> App<'a> {
    fn get_disasm_arch(input: &Input, cli: &Cli) -> Arch {
        let mut opts = arm64::Options::default();

        if let Input::Object(file) = input {
            match file.architecture() {
                Architecture::Aarch64 | Architecture::Aarch64_Ilp32 => {}
                _ => unsupported_arch(),
            }
            if !file.is_little_endian() {
                opts.endian = Endian::Big;
            }
        }

        for i in cli.disassembler_options.iter() {
            match i.as_str() {
                "help" => {
                    println!("Available options:");
                    print!("{HELP_ARM64}");
                    process::exit(0);
                }
                "little" => opts.endian = Endian::Little,
                "big" => opts.endian = Endian::Big,
                "no-aliases" | "bindings" => {}
                _ => eprintln!("warning: unsupported option `{i}`"),
            }
        }

        Arch::Arm64(opts)
    }

    fn get_file_format(input: &Input, arch: &Arch) -> String {
        let file = match input {
            Input::Object(file) => file,
            Input::Raw(..) => return "binary".to_owned(),
        };

        let container = match (file.format(), file.is_64()) {
            (BinaryFormat::Elf, false) => "elf32",
            (BinaryFormat::Elf, true) => "elf64",
            (BinaryFormat::MachO, _) => "mach-o",
            (BinaryFormat::Pe, _) => "pei",
            (BinaryFormat::Coff, _) => "coff",
            _ => "unknown",
        };
        let endianess = match arch.endian() {
            Endian::Little => "little",
            Endian::Big => "big",
        };
        format!("{container}-{endianess}aarch64")
    }

    fn new(cli: &'a Cli, input: &Input) -> Self {
        let opts = Options {
            alias: !cli.disassembler_options.iter().any(|i| i == "no-aliases"),
            decode_zeroes: cli.disassemble_zeroes,
            show_bindings: cli.disassembler_options.iter().any(|i| i == "bindings"),
        };

        let arch = Self::get_disasm_arch(input, cli);
        let format = Self::get_file_format(input, &arch);
        let file = match input {
            Input::Object(file) => Some(file),
            Input::Raw(..) => None,
        };

        println!();
        println!("{}:     file format {format}", cli.path);
        println!();

        Self {
            cli,
            opts,
            arch,
            info: Info::new(file, cli.disassembler_color, cli.demangle),
        }
    }

    fn disassemble_sections(&self, file: &object::File) -> Result<(), Box<dyn Error>> {
        if self.cli.sections.is_empty() {
            for section in file.sections() {
                let kind = section.kind();
                let selected = kind == SectionKind::Text
                    || (self.cli.disassemble_all && kind != SectionKind::UninitializedData);
                if selected {
                    self.disassemble_section(section.name()?, section.address(), section.data()?)?;
                }
            }
        } else {
            for name in &self.cli.sections {
                match file.section_by_name(name) {
                    Some(section) => {
                        self.disassemble_section(name, section.address(), section.data()?)?;
                    }
                    None => warn!("section {name} not found"),
                }
            }
        }
        Ok(())
    }

    fn disassemble_section(
        &self,
        section_name: &str,
        mut start_address: u64,
        mut data: &[u8],
    ) -> io::Result<()> {
        // ignore broken pipe error
        fn helper(result: io::Result<()>) -> io::Result<()> {
            if matches!(result, Err(ref e) if e.kind() == io::ErrorKind::BrokenPipe) {
                Ok(())
            } else {
                result
            }
        }

        let stop_address = start_address + data.len() as u64;
        if start_address >= self.cli.stop_address || stop_address <= self.cli.start_address {
            return Ok(());
        }

        if self.cli.stop_address < stop_address {
            data = &data[..(self.cli.stop_address - start_address) as usize];
        }

        if start_address < self.cli.start_address {
            data = &data[(self.cli.start_address - start_address) as usize..];
            start_address = self.cli.start_address;
        }

        helper({
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "\nDisassembly of section {section_name}:")
        })?;

        helper(self.disassemble_code(start_address, data, section_name))
    }

    fn disassemble_code(&self, address: u64, data: &[u8], section_name: &str) -> io::Result<()> {
        let stdout = std::io::stdout();

        #[allow(unused_mut)]
        let mut out = stdout.lock();

        #[cfg(all(unix, feature = "block-buffering"))]
        let mut out = {
            use std::{
                fs::File,
                io::BufWriter,
                os::fd::{AsRawFd, FromRawFd},
            };
            BufWriter::new(unsafe { File::from_raw_fd(out.as_raw_fd()) })
        };

        let res = Decoder::new(self.arch, address, self.opts)
            .printer(&self.info, section_name)
            .print(&mut out, data, true);

        // do not close stdout if BufWriter is used
        #[cfg(all(unix, feature = "block-buffering"))]
        {
            use std::os::fd::IntoRawFd;
            match out.into_inner() {
                Ok(out) => {
                    let _ = out.into_raw_fd();
                }
                Err(err) => {
                    let (err, out) = err.into_parts();
                    let (out, _) = out.into_parts();
                    let _ = out.into_raw_fd();
                    return Err(err);
                }
            }
        }

        res
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let cli = cli::parse_cli();
    let data = fs::read(&cli.path)?;
    let input = Input::parse(&data, cli.raw)?;
    let app = App::new(&cli, &input);

    match &input {
        Input::Object(file) => app.disassemble_sections(file)?,
        Input::Raw(data) => app.disassemble_section("raw", cli.adjust_vma, data)?,
    }

    Ok(())
}
