//! `$ref` resolution over a schema document.
//!
//! Local refs (`#/...`) are inlined by merging the target into the referring
//! node. External refs (`./other.json#/...`) are validated and preserved so
//! the compiler can infer foreign keys from them. Legacy `definitions`
//! containers are folded into `$defs` at every level first, so later lookups
//! only check one container.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

use super::node::SchemaNode;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("unsupported JSON pointer: {0}")]
    UnsupportedPointer(String),
    #[error("invalid pointer '{0}' (hit non-object)")]
    PointerThroughNonObject(String),
    #[error("invalid $ref target (not an object): {file}:{reference}")]
    InvalidTarget { file: String, reference: String },
    #[error("external $ref requires a base directory: {file}:{reference}")]
    MissingBaseDir { file: String, reference: String },
    #[error("circular $ref detected: {0}")]
    CircularRef(String),
    #[error("failed to read schema file {}", .path.display())]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("schema file is not valid JSON: {}", .path.display())]
    ParseFile {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("schema file is not an object: {}", .0.display())]
    FileNotAnObject(PathBuf),
    #[error("resolved schema is not structurally valid")]
    InvalidSchema(#[source] serde_json::Error),
}

pub struct ResolveOptions<'a> {
    /// File label used in error messages, typically the root schema's path.
    pub file: &'a str,
    /// Base directory for resolving relative external refs. Without it only
    /// local refs are supported.
    pub base_dir: Option<&'a Path>,
}

/// Resolve every `$ref` in `schema`. See the module docs for the contract.
pub fn resolve_schema(
    schema: &SchemaNode,
    opts: &ResolveOptions,
) -> Result<SchemaNode, ResolveError> {
    let resolved = resolve_value(&schema.to_value(), opts)?;
    SchemaNode::from_value(resolved).map_err(ResolveError::InvalidSchema)
}

/// Untyped variant of [`resolve_schema`], operating on a raw JSON document.
pub fn resolve_value(value: &Value, opts: &ResolveOptions) -> Result<Value, ResolveError> {
    let root = match value {
        Value::Object(map) => Value::Object(normalize_defs(map.clone())),
        _ => {
            return Err(ResolveError::InvalidTarget {
                file: opts.file.to_string(),
                reference: "#".to_string(),
            })
        }
    };
    let mut resolver = Resolver {
        root: root.clone(),
        opts,
        external_cache: HashMap::new(),
        ref_stack: Vec::new(),
    };
    resolver.walk(&root)
}

/// One resolution run. The external-document cache lives and dies with it;
/// nothing is shared across invocations.
struct Resolver<'a> {
    root: Value,
    opts: &'a ResolveOptions<'a>,
    external_cache: HashMap<PathBuf, Map<String, Value>>,
    /// Local pointers currently being inlined, for cycle detection.
    ref_stack: Vec<String>,
}

impl Resolver<'_> {
    fn walk(&mut self, node: &Value) -> Result<Value, ResolveError> {
        match node {
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.walk(item)?);
                }
                Ok(Value::Array(out))
            }
            Value::Object(map) => self.walk_object(map),
            other => Ok(other.clone()),
        }
    }

    fn walk_object(&mut self, map: &Map<String, Value>) -> Result<Value, ResolveError> {
        let mut out = Map::new();
        for (key, value) in map {
            // An enum list of strings is structurally indistinguishable from
            // array items; pass it through as a leaf.
            if key == "enum" {
                out.insert(key.clone(), value.clone());
                continue;
            }
            if key == "$ref" {
                if let Value::String(raw) = value {
                    let normalized = normalize_ref_string(raw);
                    let (file_part, pointer) = split_ref(&normalized);

                    if file_part.is_none() {
                        // Local ref: inline the target, merged under the
                        // referring node's sibling keys, then walk again so
                        // nested refs resolve transitively.
                        if self.ref_stack.iter().any(|p| p == &pointer) {
                            return Err(ResolveError::CircularRef(format!(
                                "{}:{}",
                                self.opts.file, normalized
                            )));
                        }
                        let target = self.local_target(&normalized, &pointer)?;
                        let mut merged =
                            merge_schema_objects(&target, &normalize_defs(map.clone()));
                        merged.remove("$ref");

                        self.ref_stack.push(pointer);
                        let walked = self.walk(&Value::Object(merged))?;
                        self.ref_stack.pop();
                        return Ok(walked);
                    }

                    // External ref: validate the target but keep the
                    // normalized ref string for FK inference.
                    self.external_target(&normalized, file_part.unwrap_or(""), &pointer)?;
                    out.insert(key.clone(), Value::String(normalized));
                    continue;
                }
            }
            out.insert(key.clone(), self.walk(value)?);
        }
        Ok(Value::Object(normalize_defs(out)))
    }

    fn local_target(
        &self,
        reference: &str,
        pointer: &str,
    ) -> Result<Map<String, Value>, ResolveError> {
        let target = get_by_json_pointer(&self.root, pointer)?;
        match target {
            Value::Object(map) => Ok(normalize_defs(map)),
            _ => Err(ResolveError::InvalidTarget {
                file: self.opts.file.to_string(),
                reference: reference.to_string(),
            }),
        }
    }

    fn external_target(
        &mut self,
        reference: &str,
        file_part: &str,
        pointer: &str,
    ) -> Result<Map<String, Value>, ResolveError> {
        let base_dir = self
            .opts
            .base_dir
            .ok_or_else(|| ResolveError::MissingBaseDir {
                file: self.opts.file.to_string(),
                reference: reference.to_string(),
            })?;
        let path = normalize_path(&base_dir.join(file_part));

        let ext_root = match self.external_cache.get(&path) {
            Some(cached) => cached.clone(),
            None => {
                let loaded = read_json_object(&path)?;
                self.external_cache.insert(path.clone(), loaded.clone());
                loaded
            }
        };

        let normalized_root = Value::Object(normalize_defs(ext_root));
        let target = get_by_json_pointer(&normalized_root, pointer)?;
        match target {
            Value::Object(map) => Ok(normalize_defs(map)),
            _ => Err(ResolveError::InvalidTarget {
                file: path.display().to_string(),
                reference: reference.to_string(),
            }),
        }
    }
}

fn read_json_object(path: &Path) -> Result<Map<String, Value>, ResolveError> {
    let text = fs::read_to_string(path).map_err(|source| ResolveError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let json: Value = serde_json::from_str(&text).map_err(|source| ResolveError::ParseFile {
        path: path.to_path_buf(),
        source,
    })?;
    match json {
        Value::Object(map) => Ok(map),
        _ => Err(ResolveError::FileNotAnObject(path.to_path_buf())),
    }
}

/// Fold a legacy `definitions` container into `$defs` (`$defs` wins on
/// conflicting names).
pub(crate) fn normalize_defs(mut map: Map<String, Value>) -> Map<String, Value> {
    let legacy = match map.get("definitions") {
        Some(Value::Object(defs)) => defs.clone(),
        _ => return map,
    };
    let mut merged = legacy;
    if let Some(Value::Object(defs)) = map.get("$defs") {
        for (name, def) in defs {
            merged.insert(name.clone(), def.clone());
        }
    }
    map.insert("$defs".to_string(), Value::Object(merged));
    map
}

/// Rewrite `#/definitions/X` pointer fragments (bare or file-qualified) to
/// `#/$defs/X`.
pub(crate) fn normalize_ref_string(reference: &str) -> String {
    const LEGACY: &str = "#/definitions/";
    let (file_part, pointer) = split_ref(reference);
    match (file_part, pointer.strip_prefix(LEGACY)) {
        (Some(file), Some(rest)) => format!("{file}#/$defs/{rest}"),
        (None, Some(rest)) => format!("#/$defs/{rest}"),
        _ => reference.to_string(),
    }
}

/// Split a `$ref` into its optional file part and a `#...` pointer.
pub(crate) fn split_ref(reference: &str) -> (Option<&str>, String) {
    match reference.find('#') {
        None => (Some(reference), "#".to_string()),
        Some(0) => (None, reference.to_string()),
        Some(idx) => (
            Some(&reference[..idx]),
            format!("#{}", &reference[idx + 1..]),
        ),
    }
}

fn decode_pointer_segment(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// Walk `root` by JSON pointer. Missing keys surface as `Null` so the caller
/// rejects them with a target-shape error rather than a pointer error.
fn get_by_json_pointer(root: &Value, pointer: &str) -> Result<Value, ResolveError> {
    if pointer.is_empty() || pointer == "#" {
        return Ok(root.clone());
    }
    let rest = pointer
        .strip_prefix("#/")
        .ok_or_else(|| ResolveError::UnsupportedPointer(pointer.to_string()))?;

    let mut current = root;
    for segment in rest.split('/').map(decode_pointer_segment) {
        match current {
            Value::Object(map) => {
                current = map.get(segment.as_str()).unwrap_or(&Value::Null);
            }
            _ => {
                return Err(ResolveError::PointerThroughNonObject(pointer.to_string()));
            }
        }
    }
    Ok(current.clone())
}

/// Merge two schema objects: object-valued keys merge recursively, anything
/// else (arrays included) is replaced by the overlay's value. The overlay's
/// `$ref` never survives the merge.
fn merge_schema_objects(
    base: &Map<String, Value>,
    overlay: &Map<String, Value>,
) -> Map<String, Value> {
    let mut out = base.clone();
    for (key, value) in overlay {
        if key == "$ref" {
            continue;
        }
        match (out.get(key), value) {
            (Some(Value::Object(prev)), Value::Object(next)) => {
                let merged = merge_schema_objects(prev, next);
                out.insert(key.clone(), Value::Object(merged));
            }
            _ => {
                out.insert(key.clone(), value.clone());
            }
        }
    }
    out
}

/// Lexically resolve `.` and `..` components without touching the filesystem.
pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn resolve(value: Value) -> Result<Value, ResolveError> {
        resolve_value(
            &value,
            &ResolveOptions {
                file: "test.json",
                base_dir: None,
            },
        )
    }

    #[test]
    fn test_local_ref_is_inlined_with_sibling_merge() {
        let resolved = resolve(json!({
            "type": "object",
            "$defs": {"Name": {"type": "string", "description": "a name"}},
            "properties": {
                "name": {"$ref": "#/$defs/Name", "description": "override"}
            }
        }))
        .unwrap();

        let name = &resolved["properties"]["name"];
        assert_eq!(name["type"], json!("string"));
        assert_eq!(name["description"], json!("override"));
        assert!(name.get("$ref").is_none());
    }

    #[test]
    fn test_legacy_definitions_are_normalized() {
        let resolved = resolve(json!({
            "type": "object",
            "definitions": {"Age": {"type": "integer"}},
            "properties": {
                "age": {"$ref": "#/definitions/Age"}
            }
        }))
        .unwrap();

        assert_eq!(resolved["properties"]["age"]["type"], json!("integer"));
        assert_eq!(resolved["$defs"]["Age"]["type"], json!("integer"));
    }

    #[test]
    fn test_defs_wins_over_definitions_on_conflict() {
        let resolved = resolve(json!({
            "type": "object",
            "definitions": {"Id": {"type": "integer"}},
            "$defs": {"Id": {"type": "string"}},
            "properties": {"id": {"$ref": "#/$defs/Id"}}
        }))
        .unwrap();

        assert_eq!(resolved["properties"]["id"]["type"], json!("string"));
    }

    #[test]
    fn test_enum_values_are_not_walked() {
        let resolved = resolve(json!({
            "type": "object",
            "properties": {
                "status": {"type": "string", "enum": ["#/$defs/bogus", "ok"]}
            }
        }))
        .unwrap();

        assert_eq!(
            resolved["properties"]["status"]["enum"],
            json!(["#/$defs/bogus", "ok"])
        );
    }

    #[test]
    fn test_unsupported_pointer_fails() {
        let err = resolve(json!({
            "properties": {"x": {"$ref": "#defs/X"}}
        }))
        .unwrap_err();
        assert!(matches!(err, ResolveError::UnsupportedPointer(_)));
    }

    #[test]
    fn test_missing_target_fails() {
        let err = resolve(json!({
            "properties": {"x": {"$ref": "#/$defs/Nope"}}
        }))
        .unwrap_err();
        assert!(matches!(err, ResolveError::PointerThroughNonObject(_)));
    }

    #[test]
    fn test_non_object_target_fails() {
        let err = resolve(json!({
            "$defs": {"Nope": "not a schema"},
            "properties": {"x": {"$ref": "#/$defs/Nope"}}
        }))
        .unwrap_err();
        assert!(matches!(err, ResolveError::InvalidTarget { .. }));
    }

    #[test]
    fn test_external_ref_requires_base_dir() {
        let err = resolve(json!({
            "properties": {"author": {"$ref": "./user.json"}}
        }))
        .unwrap_err();
        assert!(matches!(err, ResolveError::MissingBaseDir { .. }));
    }

    #[test]
    fn test_external_ref_is_preserved_and_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let user_path = dir.path().join("user.json");
        let mut f = std::fs::File::create(&user_path).unwrap();
        write!(
            f,
            "{}",
            json!({
                "definitions": {"User": {"type": "object"}},
                "type": "object",
                "properties": {"id": {"type": "string"}}
            })
        )
        .unwrap();

        let resolved = resolve_value(
            &json!({
                "type": "object",
                "properties": {
                    "author": {"$ref": "./user.json#/definitions/User"}
                }
            }),
            &ResolveOptions {
                file: "post.json",
                base_dir: Some(dir.path()),
            },
        )
        .unwrap();

        // Kept, but with the legacy fragment rewritten.
        assert_eq!(
            resolved["properties"]["author"]["$ref"],
            json!("./user.json#/$defs/User")
        );
    }

    #[test]
    fn test_circular_local_ref_is_detected() {
        let err = resolve(json!({
            "type": "object",
            "$defs": {
                "Node": {
                    "type": "object",
                    "properties": {"next": {"$ref": "#/$defs/Node"}}
                }
            },
            "properties": {"root": {"$ref": "#/$defs/Node"}}
        }))
        .unwrap_err();
        assert!(matches!(err, ResolveError::CircularRef(_)));
    }

    #[test]
    fn test_chained_top_level_ref_is_dropped_after_merge() {
        let resolved = resolve(json!({
            "type": "object",
            "$defs": {
                "A": {"$ref": "#/$defs/B", "title": "a"},
                "B": {"type": "string"}
            },
            "properties": {"x": {"$ref": "#/$defs/A"}}
        }))
        .unwrap();

        // A's own top-level ref does not survive the merge.
        let x = &resolved["properties"]["x"];
        assert!(x.get("$ref").is_none());
        assert_eq!(x["title"], json!("a"));
    }

    #[test]
    fn test_pointer_segment_unescaping() {
        let resolved = resolve(json!({
            "type": "object",
            "$defs": {"a/b": {"type": "boolean"}},
            "properties": {"flag": {"$ref": "#/$defs/a~1b"}}
        }))
        .unwrap();
        assert_eq!(resolved["properties"]["flag"]["type"], json!("boolean"));
    }

    #[test]
    fn test_normalize_ref_string_file_qualified() {
        assert_eq!(
            normalize_ref_string("./other.json#/definitions/User"),
            "./other.json#/$defs/User"
        );
        assert_eq!(
            normalize_ref_string("#/definitions/User"),
            "#/$defs/User"
        );
        assert_eq!(normalize_ref_string("#/$defs/User"), "#/$defs/User");
        assert_eq!(normalize_ref_string("./user.json"), "./user.json");
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path(Path::new("/a/b/./../c/user.json")),
            PathBuf::from("/a/c/user.json")
        );
    }
}
