#![cfg(all(feature = "print", feature = "arm64"))]

use disasm::{arch::arm64, Arch, Decoder, Endian, Options, PrinterExt};
use disasm_test::check;

fn words(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|i| i.to_le_bytes()).collect()
}

fn listing<E: PrinterExt>(opts: Options, ext: E, address: u64, data: &[u8]) -> String {
    Decoder::new(Arch::Arm64(arm64::Options::default()), address, opts)
        .printer(ext, ".text")
        .print_to_string(data, true)
        .unwrap()
}

struct Symbols(&'static [(u64, &'static str)]);

impl PrinterExt for Symbols {
    fn get_symbol(&self, address: u64) -> Option<(u64, &str)> {
        self.0.iter().rev().find(|i| i.0 <= address).copied()
    }

    fn get_symbol_after(&self, address: u64) -> Option<(u64, &str)> {
        self.0.iter().find(|i| i.0 > address).copied()
    }
}

#[test]
fn listing_format() -> Result<(), String> {
    let mut data = words(&[0xd503201f, 0, 0, 0x91004020, 0xffffffff]);
    data.extend_from_slice(&[0x01, 0x02]);

    let expect = "
0000000000001000 <.text>:
    1000:\td503201f \tnop
\t...
    100c:\t91004020 \tadd\tx0, x1, #0x10
    1010:\tffffffff \tfailed to decode
    1014:\t0201     \tfailed to decode
";
    let result = listing(Options::default(), (), 0x1000, &data);
    check("", 0, expect, &result)
}

#[test]
fn decode_zeroes() -> Result<(), String> {
    let opts = Options {
        decode_zeroes: true,
        ..Options::default()
    };
    let expect = "
0000000000000000 <.text>:
   0:\t00000000 \tfailed to decode
   4:\t00000000 \tfailed to decode
";
    let result = listing(opts, (), 0, &words(&[0, 0]));
    check("", 0, expect, &result)
}

#[test]
fn symbols() -> Result<(), String> {
    let data = words(&[0x94000002, 0xd65f03c0, 0xd503201f, 0xd65f03c0]);
    let ext = Symbols(&[(0x1000, "main"), (0x1008, "helper")]);
    let expect = "
0000000000001000 <main>:
    1000:\t94000002 \tbl\t1008 <helper>
    1004:\td65f03c0 \tret

0000000000001008 <helper>:
    1008:\td503201f \tnop
    100c:\td65f03c0 \tret
";
    let result = listing(Options::default(), ext, 0x1000, &data);
    check("", 0, expect, &result)
}

#[test]
fn bindings() -> Result<(), String> {
    let opts = Options {
        show_bindings: true,
        ..Options::default()
    };
    let data = words(&[0x94000040, 0xd10083ff, 0x14000000]);
    let expect = "
0000000000001000 <.text>:
    1000:\t94000040 \tbl\t1100\t; x30 = 0x1004
    1004:\td10083ff \tsub\tsp, sp, #0x20\t; sp = sp - 0x20
    1008:\t14000000 \tb\t1008
";
    let result = listing(opts, (), 0x1000, &data);
    check("", 0, expect, &result)
}

#[test]
fn decoder_state() {
    let arch = Arch::Arm64(arm64::Options {
        endian: Endian::Big,
    });
    let mut decoder = Decoder::new(arch, 0x1000, Options::default());
    let mut insn = disasm::Insn::new();

    assert_eq!(decoder.decode(&0xd503201fu32.to_be_bytes(), &mut insn), Ok(4));
    assert_eq!(decoder.mnemonic(&insn), Some("nop"));
    assert_eq!(decoder.address(), 0x1004);

    decoder.skip(4);
    assert_eq!(decoder.decode(&0x14000000u32.to_be_bytes(), &mut insn), Ok(4));
    assert_eq!(insn.address(), 0x1008);
    assert_eq!(
        decoder.control_flow_targets(&insn),
        [disasm::Expr::Const(0x1008)]
    );
    assert!(decoder.backtrace_binding(&insn).is_empty());

    assert!(decoder.decode(&[0xd5, 0x03], &mut insn).is_err());
    assert_eq!(decoder.address(), 0x100c);
}
