//! Brand Profile Schema core types
//!
//! Leaf types shared by the migration engine.
//!
//! # Core Concepts
//!
//! - [`Document`]: Versioned JSON record addressed by [`FieldPath`]
//! - [`SchemaVersion`]: Dotted version string, ordered by [`compare_versions`]
//! - [`VersionRegistry`]: Immutable table of [`VersionDescriptor`]s
//! - [`Checksum`]: Blake3 fingerprint over canonical JSON
//!
//! # Example
//!
//! ```rust,ignore
//! use bps_core::{compare_versions, Document};
//! use std::cmp::Ordering;
//!
//! let doc = Document::new(serde_json::json!({ "version": "1.1" }));
//! assert_eq!(compare_versions(doc.version().unwrap(), "2.0"), Ordering::Less);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod checksum;
mod document;
mod path;
mod registry;
mod version;

pub use checksum::{Checksum, ChecksumError};
pub use document::{Document, DocumentError, SCHEMA_FIELD, VERSION_FIELD};
pub use path::{FieldPath, PathError};
pub use registry::{VersionDescriptor, VersionRegistry};
pub use version::{compare_versions, SchemaVersion, VersionError};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
