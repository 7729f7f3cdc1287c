use core::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// Need more bytes to decode an instruction.
    More(usize),
    /// No encoding matches the bytes.
    Failed(usize),
}

impl Error {
    /// Number of bytes the failed attempt covered.
    pub fn size(&self) -> usize {
        match *self {
            Self::More(len) | Self::Failed(len) => len,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::More(_) => fmt.write_str("Need more data"),
            Self::Failed(_) => fmt.write_str("Failed to decode"),
        }
    }
}

impl std::error::Error for Error {}
