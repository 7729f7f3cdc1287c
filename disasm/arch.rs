#[cfg(feature = "arm64")]
pub mod arm64 {
    pub use disasm_arm64::*;
}
