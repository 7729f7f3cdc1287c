//! Encoding descriptions and the built-in opcode list.

use alloc::vec::Vec;
use core::fmt;

use disasm_core::{
    flags::{Field, Flags},
    operand::MemIncr,
};

use crate::consts::*;

const SF: u32 = 1 << 31;

/// Named bit-field of an instruction word.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FieldName {
    Rt,
    Rn,
    Rt2,
    Rm,
    I5_10,
    I6_10,
    I16_5,
    Hw,
    I19_5,
    I26_0,
    I12_10S1,
    I2_29,
    BitmaskN,
    BitmaskS,
    BitmaskR,
    S9_12,
    U12_10,
    S7_15,
}

impl FieldName {
    pub const fn field(self) -> Field {
        match self {
            Self::Rt => Field::new(0, 5),
            Self::Rn => Field::new(5, 5),
            Self::Rt2 => Field::new(10, 5),
            Self::Rm => Field::new(16, 5),
            Self::I5_10 => Field::new(10, 5),
            Self::I6_10 => Field::new(10, 6),
            Self::I16_5 => Field::new(5, 16),
            Self::Hw => Field::new(21, 2),
            Self::I19_5 => Field::new(5, 19),
            Self::I26_0 => Field::new(0, 26),
            Self::I12_10S1 => Field::new(10, 13),
            Self::I2_29 => Field::new(29, 2),
            Self::BitmaskN => Field::new(22, 1),
            Self::BitmaskS => Field::new(10, 6),
            Self::BitmaskR => Field::new(16, 6),
            Self::S9_12 => Field::new(12, 9),
            Self::U12_10 => Field::new(10, 12),
            Self::S7_15 => Field::new(15, 7),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Rt => "rt",
            Self::Rn => "rn",
            Self::Rt2 => "rt2",
            Self::Rm => "rm",
            Self::I5_10 => "i5_10",
            Self::I6_10 => "i6_10",
            Self::I16_5 => "i16_5",
            Self::Hw => "hw",
            Self::I19_5 => "i19_5",
            Self::I26_0 => "i26_0",
            Self::I12_10S1 => "i12_10_s1",
            Self::I2_29 => "i2_29",
            Self::BitmaskN => "bitmask_n",
            Self::BitmaskS => "bitmask_s",
            Self::BitmaskR => "bitmask_r",
            Self::S9_12 => "s9_12",
            Self::U12_10 => "u12_10",
            Self::S7_15 => "s7_15",
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(self.name())
    }
}

/// Operand kind, one per operand in instruction order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Arg {
    Rn,
    Rt,
    Rt2,
    Rm,
    RmLslI6,
    RmLsrI6,
    RmAsrI6,
    RmLslI5,
    RmLsrI5,
    RmAsrI5,
    I16_5,
    /// `i16_5 << (16 * hw)`
    I16_5Hw,
    I19_5,
    I26_0,
    I12_10S1,
    I19_5_2_29,
    BitmaskImm,
    MemRnS9,
    MemRnU12,
    MemRnS7,
}

impl Arg {
    /// Fields read to decode the operand.
    pub const fn fields(self) -> &'static [FieldName] {
        use FieldName as F;

        match self {
            Self::Rn => &[F::Rn],
            Self::Rt => &[F::Rt],
            Self::Rt2 => &[F::Rt2],
            Self::Rm => &[F::Rm],
            Self::RmLslI6 | Self::RmLsrI6 | Self::RmAsrI6 => &[F::Rm, F::I6_10],
            Self::RmLslI5 | Self::RmLsrI5 | Self::RmAsrI5 => &[F::Rm, F::I5_10],
            Self::I16_5 => &[F::I16_5],
            Self::I16_5Hw => &[F::I16_5, F::Hw],
            Self::I19_5 => &[F::I19_5],
            Self::I26_0 => &[F::I26_0],
            Self::I12_10S1 => &[F::I12_10S1],
            Self::I19_5_2_29 => &[F::I19_5, F::I2_29],
            Self::BitmaskImm => &[F::BitmaskN, F::BitmaskS, F::BitmaskR],
            Self::MemRnS9 => &[F::Rn, F::S9_12],
            Self::MemRnU12 => &[F::Rn, F::U12_10],
            Self::MemRnS7 => &[F::Rn, F::S7_15],
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Rn => "rn",
            Self::Rt => "rt",
            Self::Rt2 => "rt2",
            Self::Rm => "rm",
            Self::RmLslI6 => "rm_lsl_i6",
            Self::RmLsrI6 => "rm_lsr_i6",
            Self::RmAsrI6 => "rm_asr_i6",
            Self::RmLslI5 => "rm_lsl_i5",
            Self::RmLsrI5 => "rm_lsr_i5",
            Self::RmAsrI5 => "rm_asr_i5",
            Self::I16_5 => "i16_5",
            Self::I16_5Hw => "i16_5_hw",
            Self::I19_5 => "i19_5",
            Self::I26_0 => "i26_0",
            Self::I12_10S1 => "i12_10_s1",
            Self::I19_5_2_29 => "i19_5_2_29",
            Self::BitmaskImm => "bitmask_imm",
            Self::MemRnS9 => "m_rn_s9",
            Self::MemRnU12 => "m_rn_u12",
            Self::MemRnS7 => "m_rn_s7",
        }
    }

    /// Plain register operand.
    pub const fn is_reg(self) -> bool {
        matches!(self, Self::Rn | Self::Rt | Self::Rt2 | Self::Rm)
    }

    /// Immediate operand, an expression after decoding.
    pub const fn is_imm(self) -> bool {
        matches!(
            self,
            Self::I16_5
                | Self::I16_5Hw
                | Self::I19_5
                | Self::I26_0
                | Self::I12_10S1
                | Self::I19_5_2_29
                | Self::BitmaskImm
        )
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(self.name())
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Props {
    pub flags: Flags,
    /// Memory access size override in bytes.
    pub mem_sz: Option<u8>,
    pub mem_incr: MemIncr,
}

/// One instruction encoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpcodeSpec {
    pub name: &'static str,
    /// Fixed bits of the encoding.
    pub bin: u32,
    pub fields: Vec<FieldName>,
    pub args: Vec<Arg>,
    pub props: Props,
}

impl OpcodeSpec {
    pub fn new(name: &'static str, bin: u32, args: &[Arg], flags: u32) -> Self {
        let mut fields = Vec::new();
        for field in args.iter().flat_map(|arg| arg.fields()) {
            if !fields.contains(field) {
                fields.push(*field);
            }
        }
        Self {
            name,
            bin,
            fields,
            args: args.to_vec(),
            props: Props {
                flags: Flags::from_raw(flags),
                ..Props::default()
            },
        }
    }

    pub fn has(&self, flags: u32) -> bool {
        self.props.flags.any(flags)
    }

    pub fn mem_sz(&mut self, size: u8) -> &mut Self {
        self.props.mem_sz = Some(size);
        self
    }

    pub fn mem_incr(&mut self, incr: MemIncr) -> &mut Self {
        self.props.mem_incr = incr;
        self
    }

    /// Bits fixed by the encoding: every bit not covered by a field.
    pub fn bin_mask(&self) -> u32 {
        !self.fields.iter().fold(0, |mask, f| mask | f.field().mask())
    }

    /// Fixed bits of the encoding with the field bits cleared.
    pub fn skeleton(&self) -> u32 {
        self.bin & self.bin_mask()
    }

    /// Register width in bits.
    pub fn reg_width(&self) -> u8 {
        if self.has(R_32) {
            32
        } else {
            64
        }
    }

    /// Memory access size in bytes.
    pub fn mem_size(&self) -> u8 {
        self.props
            .mem_sz
            .unwrap_or(if self.has(R_32) { 4 } else { 8 })
    }
}

/// Opcode list in registration order.
///
/// Encodings may overlap, the first registered one wins. Aliases must be added
/// before the general form they shadow.
#[derive(Clone, Debug, Default)]
pub struct OpcodeList {
    list: Vec<OpcodeSpec>,
}

impl OpcodeList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn addop(
        &mut self,
        name: &'static str,
        bin: u32,
        args: &[Arg],
        flags: u32,
    ) -> &mut OpcodeSpec {
        self.list.push(OpcodeSpec::new(name, bin, args, flags));
        let last = self.list.len() - 1;
        &mut self.list[last]
    }

    /// Adds the 64-bit (`sf` set) and the 32-bit form of an encoding.
    fn addop_sf(&mut self, name: &'static str, bin: u32, args: &[Arg], flags: u32) {
        self.addop(name, bin | SF, args, flags);
        self.addop(name, bin, args, flags | R_32);
    }

    /// Adds the `lsl`, `lsr` and `asr` forms of a shifted register encoding,
    /// 64 and 32-bit each.
    fn addop_shifted(&mut self, name: &'static str, bin: u32, head: &[Arg], flags: u32) {
        let shifts = [
            (0, Arg::RmLslI6, Arg::RmLslI5),
            (1, Arg::RmLsrI6, Arg::RmLsrI5),
            (2, Arg::RmAsrI6, Arg::RmAsrI5),
        ];
        for (shift, rm64, rm32) in shifts {
            let bin = bin | (shift << 22);
            let mut args = head.to_vec();
            args.push(rm64);
            self.addop(name, bin | SF, &args, flags | R_Z);
            args.pop();
            args.push(rm32);
            self.addop(name, bin, &args, flags | R_Z | R_32);
        }
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn into_vec(self) -> Vec<OpcodeSpec> {
        self.list
    }
}

/// Built-in opcode list.
pub fn opcode_list() -> Vec<OpcodeSpec> {
    let mut list = OpcodeList::new();
    init_pc_rel(&mut list);
    init_arith_imm(&mut list);
    init_logical_imm(&mut list);
    init_move_wide(&mut list);
    init_branch(&mut list);
    init_system(&mut list);
    init_arith_shifted(&mut list);
    init_data_proc(&mut list);
    init_load_store(&mut list);
    list.into_vec()
}

fn init_pc_rel(list: &mut OpcodeList) {
    use Arg::*;

    list.addop("adr", 0x1000_0000, &[Rt, I19_5_2_29], PCREL | R_Z);
    list.addop("adrp", 0x9000_0000, &[Rt, I19_5_2_29], PCREL_PAGE | R_Z);
}

fn init_arith_imm(list: &mut OpcodeList) {
    use Arg::*;

    list.addop_sf("cmp", 0x7100_001f, &[Rn, I12_10S1], 0);
    list.addop_sf("cmn", 0x3100_001f, &[Rn, I12_10S1], 0);
    list.addop_sf("mov", 0x1100_0000, &[Rt, Rn], 0);
    list.addop_sf("add", 0x1100_0000, &[Rt, Rn, I12_10S1], 0);
    list.addop_sf("adds", 0x3100_0000, &[Rt, Rn, I12_10S1], 0);
    list.addop_sf("sub", 0x5100_0000, &[Rt, Rn, I12_10S1], 0);
    list.addop_sf("subs", 0x7100_0000, &[Rt, Rn, I12_10S1], 0);
}

fn init_logical_imm(list: &mut OpcodeList) {
    use Arg::*;

    list.addop_sf("mov", 0x3200_03e0, &[Rt, BitmaskImm], 0);
    list.addop_sf("and", 0x1200_0000, &[Rt, Rn, BitmaskImm], RN_Z);
    list.addop_sf("orr", 0x3200_0000, &[Rt, Rn, BitmaskImm], RN_Z);
    list.addop_sf("eor", 0x5200_0000, &[Rt, Rn, BitmaskImm], RN_Z);
    list.addop_sf("tst", 0x7200_001f, &[Rn, BitmaskImm], R_Z);
    list.addop_sf("ands", 0x7200_0000, &[Rt, Rn, BitmaskImm], R_Z);
}

fn init_move_wide(list: &mut OpcodeList) {
    use Arg::*;

    list.addop_sf("movn", 0x1280_0000, &[Rt, I16_5Hw], R_Z);
    list.addop_sf("movz", 0x5280_0000, &[Rt, I16_5Hw], R_Z);
    list.addop_sf("movk", 0x7280_0000, &[Rt, I16_5Hw], R_Z);
}

fn init_branch(list: &mut OpcodeList) {
    use Arg::*;

    list.addop("b", 0x1400_0000, &[I26_0], SETIP | STOPEXEC);
    list.addop("bl", 0x9400_0000, &[I26_0], SETIP | SAVEIP);
    for (cond, name) in B_COND_NAME.into_iter().enumerate() {
        list.addop(name, 0x5400_0000 | cond as u32, &[I19_5], SETIP);
    }
    list.addop_sf("cbz", 0x3400_0000, &[Rt, I19_5], SETIP | R_Z);
    list.addop_sf("cbnz", 0x3500_0000, &[Rt, I19_5], SETIP | R_Z);
    list.addop("br", 0xd61f_0000, &[Rn], SETIP | STOPEXEC);
    list.addop("blr", 0xd63f_0000, &[Rn], SETIP | SAVEIP);
    list.addop("ret", 0xd65f_0000, &[Rn], SETIP | STOPEXEC);
}

fn init_system(list: &mut OpcodeList) {
    use Arg::*;

    list.addop("nop", 0xd503_201f, &[], 0);
    list.addop("svc", 0xd400_0001, &[I16_5], 0);
    list.addop("hvc", 0xd400_0002, &[I16_5], 0);
    list.addop("smc", 0xd400_0003, &[I16_5], 0);
    list.addop("brk", 0xd420_0000, &[I16_5], 0);
    list.addop("hlt", 0xd440_0000, &[I16_5], 0);
}

fn init_arith_shifted(list: &mut OpcodeList) {
    use Arg::*;

    // aliases with shift lsl #0
    list.addop_sf("mov", 0x2a00_03e0, &[Rt, Rm], R_Z);

    list.addop_shifted("cmp", 0x6b00_001f, &[Rn], 0);
    list.addop_shifted("cmn", 0x2b00_001f, &[Rn], 0);
    list.addop_shifted("tst", 0x6a00_001f, &[Rn], 0);
    list.addop_shifted("neg", 0x4b00_03e0, &[Rt], 0);
    list.addop_shifted("mvn", 0x2a20_03e0, &[Rt], 0);

    list.addop_shifted("add", 0x0b00_0000, &[Rt, Rn], 0);
    list.addop_shifted("adds", 0x2b00_0000, &[Rt, Rn], 0);
    list.addop_shifted("sub", 0x4b00_0000, &[Rt, Rn], 0);
    list.addop_shifted("subs", 0x6b00_0000, &[Rt, Rn], 0);
    list.addop_shifted("and", 0x0a00_0000, &[Rt, Rn], 0);
    list.addop_shifted("bic", 0x0a20_0000, &[Rt, Rn], 0);
    list.addop_shifted("orr", 0x2a00_0000, &[Rt, Rn], 0);
    list.addop_shifted("orn", 0x2a20_0000, &[Rt, Rn], 0);
    list.addop_shifted("eor", 0x4a00_0000, &[Rt, Rn], 0);
    list.addop_shifted("eon", 0x4a20_0000, &[Rt, Rn], 0);
    list.addop_shifted("ands", 0x6a00_0000, &[Rt, Rn], 0);
    list.addop_shifted("bics", 0x6a20_0000, &[Rt, Rn], 0);
}

fn init_data_proc(list: &mut OpcodeList) {
    use Arg::*;

    list.addop_sf("mul", 0x1b00_7c00, &[Rt, Rn, Rm], R_Z);
    list.addop_sf("mneg", 0x1b00_fc00, &[Rt, Rn, Rm], R_Z);
    list.addop_sf("madd", 0x1b00_0000, &[Rt, Rn, Rm, Rt2], R_Z);
    list.addop_sf("msub", 0x1b00_8000, &[Rt, Rn, Rm, Rt2], R_Z);
    list.addop_sf("udiv", 0x1ac0_0800, &[Rt, Rn, Rm], R_Z);
    list.addop_sf("sdiv", 0x1ac0_0c00, &[Rt, Rn, Rm], R_Z);
    list.addop_sf("lsl", 0x1ac0_2000, &[Rt, Rn, Rm], R_Z);
    list.addop_sf("lsr", 0x1ac0_2400, &[Rt, Rn, Rm], R_Z);
    list.addop_sf("asr", 0x1ac0_2800, &[Rt, Rn, Rm], R_Z);
}

fn init_load_store(list: &mut OpcodeList) {
    use Arg::*;

    // (store, load, encoding of the store, flags, access size)
    let unsigned = [
        ("strb", "ldrb", 0x3900_0000, R_32, Some(1)),
        ("strh", "ldrh", 0x7900_0000, R_32, Some(2)),
        ("str", "ldr", 0xb900_0000, R_32, None),
        ("str", "ldr", 0xf900_0000, 0, None),
    ];
    for (st, ld, bin, flags, size) in unsigned {
        for (name, bin) in [(st, bin), (ld, bin | 0x0040_0000)] {
            let op = list.addop(name, bin, &[Rt, MemRnU12], flags | R_Z);
            if let Some(size) = size {
                op.mem_sz(size);
            }
        }
    }
    list.addop("ldrsb", 0x3980_0000, &[Rt, MemRnU12], R_Z).mem_sz(1);
    list.addop("ldrsh", 0x7980_0000, &[Rt, MemRnU12], R_Z).mem_sz(2);
    list.addop("ldrsw", 0xb980_0000, &[Rt, MemRnU12], R_Z).mem_sz(4);

    // (unscaled store, unscaled load, indexed store, indexed load, ...)
    let indexed = [
        ("sturb", "ldurb", "strb", "ldrb", 0x3800_0000, R_32, Some(1)),
        ("sturh", "ldurh", "strh", "ldrh", 0x7800_0000, R_32, Some(2)),
        ("stur", "ldur", "str", "ldr", 0xb800_0000, R_32, None),
        ("stur", "ldur", "str", "ldr", 0xf800_0000, 0, None),
    ];
    for (stu, ldu, st, ld, bin, flags, size) in indexed {
        let forms = [
            (stu, bin, MemIncr::None),
            (st, bin | 0x400, MemIncr::Post),
            (st, bin | 0xc00, MemIncr::Pre),
            (ldu, bin | 0x0040_0000, MemIncr::None),
            (ld, bin | 0x0040_0400, MemIncr::Post),
            (ld, bin | 0x0040_0c00, MemIncr::Pre),
        ];
        for (name, bin, incr) in forms {
            let op = list.addop(name, bin, &[Rt, MemRnS9], flags | R_Z);
            op.mem_incr(incr);
            if let Some(size) = size {
                op.mem_sz(size);
            }
        }
    }

    for (bin, flags) in [(0xa800_0000, 0), (0x2800_0000, R_32)] {
        let forms = [
            (0x0080_0000, MemIncr::Post),
            (0x0100_0000, MemIncr::None),
            (0x0180_0000, MemIncr::Pre),
        ];
        for (mode, incr) in forms {
            let bin = bin | mode;
            list.addop("stp", bin, &[Rt, Rt2, MemRnS7], flags | R_Z)
                .mem_incr(incr);
            list.addop("ldp", bin | 0x0040_0000, &[Rt, Rt2, MemRnS7], flags | R_Z)
                .mem_incr(incr);
        }
    }

    list.addop("ldr", 0x1800_0000, &[Rt, I19_5], PCREL | R_Z | R_32);
    list.addop("ldr", 0x5800_0000, &[Rt, I19_5], PCREL | R_Z);
    list.addop("ldrsw", 0x9800_0000, &[Rt, I19_5], PCREL | R_Z);
}
