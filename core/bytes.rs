use crate::error::Error;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Endian {
    #[default]
    Little,
    Big,
}

/// Read cursor over a code buffer.
pub struct Bytes<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Bytes<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    pub fn advance(&mut self, count: usize) {
        self.offset += count;
    }

    pub fn read(&mut self, len: usize) -> Result<&'a [u8], Error> {
        if self.offset + len > self.data.len() {
            return Err(Error::More(len));
        }
        let bytes = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(bytes)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        let mut raw = [0; N];
        raw.copy_from_slice(self.read(N)?);
        Ok(raw)
    }

    pub fn read_u32(&mut self, endian: Endian) -> Result<u32, Error> {
        let raw = self.read_array::<4>()?;
        Ok(match endian {
            Endian::Little => u32::from_le_bytes(raw),
            Endian::Big => u32::from_be_bytes(raw),
        })
    }
}
