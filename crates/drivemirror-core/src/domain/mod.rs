//! Domain entities and business logic
//!
//! This module contains the core domain types for drivemirror:
//! - Newtypes for type-safe identifiers and validated paths
//! - Remote hierarchy nodes and their classification
//! - Pending listing work for the tree walker
//! - Backup variants derived from remote files
//! - The export policy for native Google documents
//! - Local name sanitization
//! - Domain-specific error types

pub mod errors;
pub mod export_policy;
pub mod naming;
pub mod newtypes;
pub mod remote_item;
pub mod variant;
pub mod walk_item;

// Re-export commonly used types
pub use errors::DomainError;
pub use export_policy::{ExportPolicy, FOLDER_MIME_TYPE};
pub use naming::{local_name, sanitize_name};
pub use newtypes::*;
pub use remote_item::{
    FileKind, RemoteDir, RemoteEntry, RemoteFile, RemoteItem, REPOSITORY_POINTER_SUFFIX,
};
pub use variant::{BackupVariant, UsedPath, VariantKind, VariantSource};
pub use walk_item::WalkItem;
