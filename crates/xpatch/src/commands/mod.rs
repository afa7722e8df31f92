//! Subcommand implementations.

pub mod apply;
pub mod check;
