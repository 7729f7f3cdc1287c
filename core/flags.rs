use crate::utils::zextract;

/// Bit range inside a 32-bit word.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Field {
    start: u8,
    size: u8,
}

impl Field {
    pub const fn new(start: u8, size: u8) -> Self {
        debug_assert!(size != 0 && start < 32 && (start + size) <= 32);
        Self { start, size }
    }

    pub const fn start(&self) -> u32 {
        self.start as u32
    }

    pub const fn size(&self) -> u32 {
        self.size as u32
    }

    /// Mask of the field value before it is shifted into place.
    pub const fn width_mask(&self) -> u32 {
        u32::MAX >> (32 - self.size as u32)
    }

    /// Bits of a word covered by the field.
    pub const fn mask(&self) -> u32 {
        self.width_mask() << self.start
    }

    pub fn extract(&self, word: u32) -> u32 {
        zextract(word, self.start(), self.size())
    }
}

#[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
pub struct Flags {
    raw: u32,
}

impl Flags {
    pub const fn empty() -> Self {
        Self { raw: 0 }
    }

    pub const fn from_raw(raw: u32) -> Self {
        Self { raw }
    }

    pub const fn raw(&self) -> u32 {
        self.raw
    }

    pub fn clear(&mut self, flags: u32) -> &mut Self {
        self.raw &= !flags;
        self
    }

    pub fn set(&mut self, flags: u32) -> &mut Self {
        self.raw |= flags;
        self
    }

    pub fn set_if(&mut self, flags: u32, cond: bool) -> &mut Self {
        if cond {
            self.raw |= flags;
        } else {
            self.raw &= !flags;
        }
        self
    }

    pub const fn any(&self, flags: u32) -> bool {
        self.raw & flags != 0
    }

    pub const fn all(&self, flags: u32) -> bool {
        self.raw & flags == flags
    }

    /// Number of set flags among `flags`.
    pub const fn count(&self, flags: u32) -> u32 {
        (self.raw & flags).count_ones()
    }
}
