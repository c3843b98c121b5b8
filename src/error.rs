use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Which side of a match an override string guards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideSide {
    Before,
    After,
}

impl std::fmt::Display for OverrideSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverrideSide::Before => f.write_str("no_before"),
            OverrideSide::After => f.write_str("no_after"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ReactError {
    #[error("Trigger term key must not be empty")]
    EmptyKey,

    #[error("Trigger term key {key:?} must be printable ASCII")]
    InvalidKey { key: String },

    #[error("Trigger term {key:?} has an empty {side} entry")]
    EmptyOverride { key: String, side: OverrideSide },

    #[error("Trigger term {key:?} is defined more than once")]
    DuplicateKey { key: String },

    #[error("Failed to read catalogue from {path}: {source}")]
    CatalogueRead { path: PathBuf, source: io::Error },

    #[error("Failed to parse catalogue: {0}")]
    CatalogueParse(String),

    #[error("Catalogue not found at {0}")]
    CatalogueNotFound(PathBuf),

    #[error("Config directory not found")]
    NoConfigDir,

    #[error("Failed to read stdin: {0}")]
    StdinRead(#[from] io::Error),

    #[error("Failed to parse request JSON: {0}")]
    RequestParse(#[from] serde_json::Error),
}
