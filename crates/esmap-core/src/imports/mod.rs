//! Import site discovery for JavaScript files.
//!
//! Provides a lexical scanner that locates import/export/dynamic-import
//! specifiers together with their byte spans.

mod scan;

pub use scan::{escape_specifier, scan_import_sites, ImportSite, SiteKind};
