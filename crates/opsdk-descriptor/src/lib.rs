//! CSV descriptor generation for operator-sdk
//!
//! Go API types carry `+operator-sdk:gen-csv:` annotations in their doc
//! comments. This crate parses those annotations, walks the API type trees
//! and assembles the owned-CRD descriptions embedded in a
//! ClusterServiceVersion.
//!
//! ```text
//! // +operator-sdk:gen-csv:customresourcedefinitions.specDescriptors=true
//! // +operator-sdk:gen-csv:customresourcedefinitions.specDescriptors.displayName="Pods"
//! Size int32 `json:"size"`
//! ```

pub mod annotations;
pub mod crd_description;
pub mod error;
pub mod model;
pub mod parse;
pub mod resolve;
pub mod tree;

pub use crd_description::{crd_description_for_gvk, crd_description_with, expected_package_dir};
pub use error::{DescriptorError, Result};
pub use model::{ActionDescriptor, ApiResourceReference, CrdDescription, SpecDescriptor, StatusDescriptor};
pub use parse::{CSV_GEN_PREFIX, Descriptor, DescriptorKind, ParsedCrdDescriptions, parse_csv_gen_annotations};
pub use tree::{PathSegment, TypeTree};
