use crate::dsl::Blueprint;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON blueprint: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid YAML blueprint: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("unsupported blueprint format '{0}' (expected .json, .yaml or .yml)")]
    UnsupportedFormat(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    pub fn from_path(path: &Path) -> Result<Format, LoadError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "json" => Ok(Format::Json),
            "yaml" | "yml" => Ok(Format::Yaml),
            _ => Err(LoadError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

pub fn from_json_str(raw: &str) -> Result<Blueprint, LoadError> {
    Ok(serde_json::from_str(raw)?)
}

pub fn from_yaml_str(raw: &str) -> Result<Blueprint, LoadError> {
    Ok(serde_yaml::from_str(raw)?)
}

/// Pretty-printed JSON export. Exporting an imported blueprint gives back
/// the same document.
pub fn to_json_string(blueprint: &Blueprint) -> Result<String, LoadError> {
    Ok(serde_json::to_string_pretty(blueprint)?)
}

pub fn to_yaml_string(blueprint: &Blueprint) -> Result<String, LoadError> {
    Ok(serde_yaml::to_string(blueprint)?)
}

fn read(path: &Path) -> Result<String, LoadError> {
    fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Raw JSON value of a blueprint file, for validation before typing.
pub fn load_value(path: impl AsRef<Path>) -> Result<serde_json::Value, LoadError> {
    let path = path.as_ref();
    let content = read(path)?;
    match Format::from_path(path)? {
        Format::Json => Ok(serde_json::from_str(&content)?),
        Format::Yaml => Ok(serde_yaml::from_str(&content)?),
    }
}

pub fn load_blueprint(path: impl AsRef<Path>) -> Result<Blueprint, LoadError> {
    let path = path.as_ref();
    let content = read(path)?;
    match Format::from_path(path)? {
        Format::Json => from_json_str(&content),
        Format::Yaml => from_yaml_str(&content),
    }
}

pub fn save_blueprint(blueprint: &Blueprint, path: impl AsRef<Path>) -> Result<(), LoadError> {
    let path = path.as_ref();
    let content = match Format::from_path(path)? {
        Format::Json => to_json_string(blueprint)?,
        Format::Yaml => to_yaml_string(blueprint)?,
    };
    fs::write(path, content).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })
}
