#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::return_self_not_must_use)]

//! Rewrites ES module import specifiers against an import map so the
//! output loads in a browser (or a bundler) without a package manager.

pub mod config;
pub mod error;
pub mod import_map;
pub mod imports;
pub mod resolver;
pub mod rewrite;
pub mod transform;
pub mod version;

pub use config::{Config, ResolvedOptions, RewriteOptions};
pub use error::Error;
pub use import_map::{load_import_map, ImportMap, LoadedImportMap};
pub use imports::{scan_import_sites, ImportSite, SiteKind};
pub use resolver::{FsResolver, ModuleResolver, ResolveError, ResolveReasonCode};
pub use rewrite::{rewrite_specifier, ImportRewriter, RewriteKind, RewriteRequest, Rewritten};
pub use transform::{transform_files, transform_source, FileTransform, SiteRewrite, TransformOutput};
pub use version::VERSION;
