//! File-system boundary: reads schema documents off disk. The compilation
//! core itself never touches I/O beyond the resolver's external-ref reads.

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::node::{SchemaNode, SchemaSource};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("schema file is not valid JSON: {}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("schema file is not an object: {}", .0.display())]
    NotAnObject(PathBuf),
}

/// Read and parse one schema file.
pub fn load_schema_file(path: &Path) -> Result<SchemaNode, LoadError> {
    let text = fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let json: Value = serde_json::from_str(&text).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    if !json.is_object() {
        return Err(LoadError::NotAnObject(path.to_path_buf()));
    }
    SchemaNode::from_value(json).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load every `.json` file directly under `dir`, sorted by path so the
/// compilation (and therefore the emitted DDL) is deterministic.
pub fn load_schema_dir(dir: &Path) -> Result<Vec<SchemaSource>, LoadError> {
    let entries = fs::read_dir(dir).map_err(|source| LoadError::Read {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| LoadError::Read {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("json") {
            paths.push(path);
        }
    }
    paths.sort();

    paths
        .into_iter()
        .map(|path| {
            let schema = load_schema_file(&path)?;
            Ok(SchemaSource { path, schema })
        })
        .collect()
}
