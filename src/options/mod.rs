//! Command line options shared by the bring-up subcommands

pub mod drain;

pub use drain::{DrainDirectives, DrainTarget};
