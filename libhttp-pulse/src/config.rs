use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::types::EndpointSpec;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("Config {} defines no endpoints", .path.display())]
    NoEndpoints { path: PathBuf },
}

/// Load the endpoint document: a YAML sequence of endpoint mappings.
///
/// Any malformed entry, including one with a missing `url`, fails the whole
/// load so the monitor never starts against a partially understood fleet.
pub fn load_endpoints(path: &Path) -> Result<Vec<EndpointSpec>, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let endpoints: Vec<EndpointSpec> =
        serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    if endpoints.is_empty() {
        return Err(ConfigError::NoEndpoints {
            path: path.to_path_buf(),
        });
    }

    Ok(endpoints)
}
