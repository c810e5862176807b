//! # Deterministic Tools
//!
//! Plain Rust around the agents: everything here is reproducible and never
//! calls the LLM.
//!
//! ## Modules
//!
//! - `extractor` - Fenced-file and import-name extraction from agent text
//! - `registry` - npm package resolution (plain, retrying, batch)
//! - `manifest` - `package.json` synthesis
//! - `workspace` - Load/write a FileSet from/to disk

pub mod extractor;
pub mod manifest;
pub mod registry;
pub mod workspace;

pub use extractor::{
    canonical_package_name, extract_dependencies, extract_files, extract_import_names,
    ExtractedDependency, FileSet,
};
pub use manifest::{synthesize_manifest, MANIFEST_PATH};
pub use registry::{
    resolve_batch, resolve_with_retry, validate_package_name, BatchResolution, NpmRegistry,
    PackageInfo, PackageResolver, PackageStatus, ResolvedPackage, RetryPolicy,
};
pub use workspace::{load_files, write_files};
