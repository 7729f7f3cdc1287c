/// Returns `len` bits of `value` starting at bit `pos`, zero-extended.
pub const fn zextract(value: u32, pos: u32, len: u32) -> u32 {
    (value << (32 - pos - len)) >> (32 - len)
}

/// Interprets the low `bits` bits of `value` as a two's complement number.
pub const fn sign_extend(value: u64, bits: u32) -> i64 {
    let shift = 64 - bits;
    ((value << shift) as i64) >> shift
}

/// Replaces `len` bits of `value` starting at bit `pos` with `field`.
pub const fn deposit(value: u32, pos: u32, len: u32, field: u32) -> u32 {
    let mask = (u32::MAX >> (32 - len)) << pos;
    (value & !mask) | ((field << pos) & mask)
}
