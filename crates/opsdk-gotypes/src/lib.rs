//! Go source indexing for operator-sdk generators
//!
//! This crate reads the Go API packages of an operator project and exposes
//! what the CSV generator needs from them: type declarations, struct
//! members with their serialization tags, and the doc comments above both.

pub mod ast;
pub mod error;
pub mod literal;
pub mod parser;
pub mod tags;
pub mod universe;

pub use ast::{Member, SourceFile, TypeDecl, TypeExpr};
pub use error::{GoTypesError, Result};
pub use literal::{LiteralError, StructTag, parse_struct_tags, unquote};
pub use parser::ParseError;
pub use tags::extract_comment_tags;
pub use universe::{GoSourceIndexer, Package, Resolved, ResolvedKey, TypeUniverseProvider, Universe};
