use std::{fmt, num::ParseIntError, str::FromStr};

use bpaf::*;

#[derive(Copy, Clone, Debug)]
pub enum Color {
    Off,
    On,
    Extended,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Demangle {
    None,
    Auto,
    Gnuv3,
    Rust,
}

impl fmt::Display for Demangle {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Demangle::None => "none",
            Demangle::Auto => "auto",
            Demangle::Gnuv3 => "gnu-v3",
            Demangle::Rust => "rust",
        };
        fmt.write_str(s)
    }
}

impl FromStr for Demangle {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Demangle::None),
            "auto" => Ok(Demangle::Auto),
            "gnu-v3" => Ok(Demangle::Gnuv3),
            "rust" => Ok(Demangle::Rust),
            _ => Err("invalid demangle style"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Cli {
    pub disassemble_all: bool,
    pub disassemble_zeroes: bool,
    pub sections: Vec<String>,
    pub disassembler_options: Vec<String>,
    pub disassembler_color: Color,
    pub demangle: Demangle,
    pub start_address: u64,
    pub stop_address: u64,
    pub raw: bool,
    pub adjust_vma: u64,
    pub path: String,
}

fn parse_address(s: &str) -> Result<u64, ParseIntError> {
    if s.starts_with("0x") || s.starts_with("0X") {
        u64::from_str_radix(&s[2..], 16)
    } else {
        s.parse()
    }
}

pub fn parse_cli() -> Cli {
    // the only mode, accepted for objdump compatibility
    let disassemble = short('d')
        .long("disassemble")
        .help("Display assembler contents of executable sections")
        .switch();

    let disassemble_all = short('D')
        .long("disassemble-all")
        .help("Display assembler contents of all sections")
        .switch();
    let disassemble_all = construct!(disassemble, disassemble_all).map(|(_, all)| all);

    let disassemble_zeroes = short('z')
        .long("disassemble-zeroes")
        .help("Do not skip blocks of zeroes when disassembling")
        .switch();

    let disassembler_options = short('M')
        .long("disassembler-options")
        .help("Pass text OPT on to the disassembler, `-M help` lists them")
        .argument::<String>("OPT")
        .many()
        .map(|v| {
            v.join(",")
                .split(',')
                .map(|i| i.trim())
                .filter(|i| !i.is_empty())
                .map(|i| i.into())
                .collect()
        })
        .fallback(Vec::new());

    #[cfg(feature = "color")]
    let auto_color =
        supports_color::on(supports_color::Stream::Stdout).map_or(Color::Off, |_| Color::On);

    #[cfg(not(feature = "color"))]
    let auto_color = Color::Off;

    let disassembler_color = long("disassembler-color")
        .help("Enable or disable disassembler color output [default: auto, valid modes: off, on, auto, terminal, extended]")
        .argument::<String>("MODE")
        .parse(move |s| {
            match s.as_str() {
                "off" => Ok(Color::Off),
                "on" => Ok(Color::On),
                "auto" | "terminal" => Ok(auto_color),
                "extended" => Ok(Color::Extended),
                _ => Err(format!("invalid color {s}")),
            }
        })
        .fallback(auto_color);

    let demangle_flag = short('C')
        .long("demangle")
        .switch()
        .hide()
        .map(|_| Demangle::Auto);
    let demangle_arg = short('C')
        .long("demangle")
        .help("Decode mangled/processed symbol names [default: auto, valid styles: none, auto, gnu-v3, rust]")
        .argument::<Demangle>("STYLE");
    let demangle = construct!([demangle_arg, demangle_flag])
        .last()
        .fallback(Demangle::Auto);

    let sections = short('j')
        .long("section")
        .help("Only display information for section NAME")
        .argument("NAME")
        .many();

    let start_address = long("start-address")
        .help("Only process data whose address is >= ADDR")
        .argument::<String>("ADDR")
        .parse(move |s| parse_address(&s))
        .fallback(0);

    let stop_address = long("stop-address")
        .help("Only process data whose address is < ADDR")
        .argument::<String>("ADDR")
        .parse(move |s| parse_address(&s))
        .fallback(u64::MAX);

    let raw = long("raw")
        .help("Treat the input as raw instruction words, do not sniff the container")
        .switch();

    let adjust_vma = long("adjust-vma")
        .help("Load address of raw input [default: 0]")
        .argument::<String>("ADDR")
        .parse(move |s| parse_address(&s))
        .fallback(0);

    let path = positional("FILE")
        .help("File to process")
        .fallback("a.out".into());

    construct!(Cli {
        disassemble_all,
        disassemble_zeroes,
        sections,
        start_address,
        stop_address,
        disassembler_options,
        disassembler_color,
        demangle,
        raw,
        adjust_vma,
        path,
    })
    .to_options()
    .version(env!("CARGO_PKG_VERSION"))
    .descr("Display the ARM64 instructions of object files and raw code")
    .fallback_to_usage()
    .run()
}
