//! Test tooling for decoder crates: `.test` listings and readable diffs.

pub mod test;

mod utils;

pub use self::utils::check;
