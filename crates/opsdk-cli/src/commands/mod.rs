//! CLI commands

pub mod gen_csv;
