use std::path::PathBuf;
use thiserror::Error;

/// Format a YAML error for user-friendly display, including the field path
fn format_yaml_error(e: &serde_path_to_error::Error<serde_yaml::Error>) -> String {
    let path = e.path().to_string();
    let inner = e.inner();
    let msg = inner.to_string();

    let located = if let Some(loc) = inner.location() {
        format!("Line {}, Column {}: {}", loc.line(), loc.column(), msg)
    } else {
        msg
    };

    if path.is_empty() || path == "." {
        located
    } else {
        format!("{}: {}", path, located)
    }
}

/// Errors raised while loading configuration and wiring up the sidecar.
#[derive(Error, Debug)]
pub enum SidecarError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse config file '{path}':\n  {}", format_yaml_error(.source))]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_path_to_error::Error<serde_yaml::Error>,
    },

    #[error("Config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Failed to read config file '{path}': {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, SidecarError>;
