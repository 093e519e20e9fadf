use std::path::PathBuf;
use thiserror::Error;

/// Core error type for esmap operations.
///
/// Only loading failures live here. Problems with individual specifiers are
/// recovered inside the rewriter and reported through
/// [`RewriteKind`](crate::rewrite::RewriteKind) instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error(
        "Import map not found. Generate one before rewriting imports.{}",
        format_tried(.tried)
    )]
    MapNotFound { tried: Vec<PathBuf> },

    #[error("Failed to read import map at {path}: {source}")]
    MapRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse import map at {path}: {source}")]
    MapParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Config file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Failed to read config at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    /// Whether this error means no import map file exists at the searched locations.
    #[must_use]
    pub fn is_map_not_found(&self) -> bool {
        matches!(self, Self::MapNotFound { .. })
    }

    /// Stable machine-readable code for JSON output.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::MapNotFound { .. } => "MAP_NOT_FOUND",
            Self::MapRead { .. } => "MAP_READ_FAILED",
            Self::MapParse { .. } => "MAP_PARSE_FAILED",
            Self::ConfigNotFound { .. } => "CONFIG_NOT_FOUND",
            Self::ConfigRead { .. } => "CONFIG_READ_FAILED",
            Self::ConfigParse { .. } => "CONFIG_PARSE_FAILED",
        }
    }
}

fn format_tried(tried: &[PathBuf]) -> String {
    tried
        .iter()
        .map(|p| format!("\n  ✘ {}", p.display()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_not_found_lists_every_path() {
        let err = Error::MapNotFound {
            tried: vec![
                PathBuf::from("/app/web_modules/import-map.local.json"),
                PathBuf::from("/app/web_modules/import-map.json"),
            ],
        };
        let msg = err.to_string();
        assert!(msg.starts_with("Import map not found."));
        assert!(msg.contains("✘ /app/web_modules/import-map.local.json"));
        assert!(msg.contains("✘ /app/web_modules/import-map.json"));
        assert!(err.is_map_not_found());
    }

    #[test]
    fn test_parse_error_is_not_not_found() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = Error::MapParse {
            path: PathBuf::from("import-map.json"),
            source,
        };
        assert!(!err.is_map_not_found());
        assert!(err.to_string().contains("Failed to parse import map"));
        assert_eq!(err.code(), "MAP_PARSE_FAILED");
    }
}
