use disasm_arm64 as arm64;
use disasm_core::{bytes::Endian, Options};
use disasm_test::test::{self, Runner, Target, Test};

#[derive(Default)]
struct Arm64;

impl Runner for Arm64 {
    fn create(&mut self, test: &Test) -> Target {
        let mut opts = Options::default();
        let mut opts_arch = arm64::Options::default();
        let mut bindings = false;

        for (name, state) in test::parse_flags(test.comment) {
            match name {
                "alias" => opts.alias = state,
                "bindings" => bindings = state,
                "big" if state => opts_arch.endian = Endian::Big,
                "big" => opts_arch.endian = Endian::Little,
                _ => panic!("unexpected flag {name}"),
            }
        }

        Target {
            decoder: arm64::decoder(&opts, &opts_arch),
            printer: arm64::printer(&opts, &opts_arch),
            bindings,
        }
    }
}

macro_rules! test {
    ($name:ident, $file:expr) => {
        #[test]
        fn $name() -> Result<(), String> {
            Arm64.run($file, include_str!($file))
        }
    };
}

test!(decode, "decode.test");
test!(bindings, "bindings.test");
test!(alias, "alias.test");
test!(endian, "endian.test");
