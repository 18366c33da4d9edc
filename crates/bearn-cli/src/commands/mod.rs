// crates/bearn-cli/src/commands/mod.rs
//
// Command module declarations for the Bearn CLI.

pub mod params;
pub mod simulate;
