//! operator-sdk core - shared building blocks for CSV generation
//!
//! This crate provides the pieces every other crate in the workspace leans on:
//! - `FileSystem`: pluggable file access (`OsFileSystem` for disk, `MemFileSystem` for tests)
//! - `yaml`: multi-document manifest scanning and `TypeMeta` sniffing
//! - `naming`: human-friendly display names derived from identifiers

pub mod error;
pub mod fs;
pub mod naming;
pub mod yaml;

pub use error::{CoreError, Result};
pub use fs::{FileSystem, MemFileSystem, OsFileSystem};
pub use naming::display_name;
pub use yaml::{GroupVersionKind, TypeMeta, split_documents, type_meta_from_bytes};
