//! Per-file table name and primary-key descriptor, precomputed from the raw
//! (unresolved) schemas of a multi-file compile.
//!
//! Foreign keys are synthesized from this registry so a file's refs never
//! have to be resolved just to name and type the columns that point at it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::ir::{ColumnType, JsonType};
use crate::schema::node::{SchemaNode, SchemaSource};
use crate::schema::resolver::normalize_path;

use super::naming::{default_table_name, to_snake_case};

/// The single column a cross-file reference targets. Composite keys are only
/// honored within their owning table; references always target the first
/// declared key column.
#[derive(Debug, Clone)]
pub struct PrimaryKeyRef {
    pub column: String,
    pub ty: ColumnType,
}

#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub path: PathBuf,
    pub table_name: String,
    pub primary_key: PrimaryKeyRef,
}

/// Built once per multi-file compile, read-only afterwards, keyed by
/// normalized absolute path.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    entries: HashMap<PathBuf, RegistryEntry>,
}

impl SchemaRegistry {
    pub fn build(sources: &[SchemaSource]) -> Self {
        let mut entries = HashMap::new();
        for source in sources {
            let path = normalize_path(&source.path);
            let schema = &source.schema;
            let table_name = table_name_from_schema_file(&source.path, schema);

            let pk_prop = schema
                .ext
                .as_ref()
                .and_then(|e| e.primary_key.as_ref())
                .and_then(|keys| keys.first())
                .map(String::as_str)
                .unwrap_or("id");

            let pk_schema = schema
                .properties
                .as_ref()
                .and_then(|props| props.get(pk_prop));
            let ty = pk_schema
                .map(infer_column_type)
                .unwrap_or_else(|| ColumnType::with_format(JsonType::String, "uuid"));
            let column = pk_schema
                .and_then(|p| p.ext.as_ref())
                .and_then(|e| e.column.clone())
                .unwrap_or_else(|| to_snake_case(pk_prop));

            entries.insert(
                path.clone(),
                RegistryEntry {
                    path,
                    table_name,
                    primary_key: PrimaryKeyRef { column, ty },
                },
            );
        }
        Self { entries }
    }

    pub fn get(&self, path: &Path) -> Option<&RegistryEntry> {
        self.entries.get(&normalize_path(path))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Infer a column type from one schema node: `object`/`array` map to a JSON
/// document column; scalars copy `format` through, and a string with a
/// closed all-string `enum` keeps its values. Unknown types default to string.
pub fn infer_column_type(schema: &SchemaNode) -> ColumnType {
    match schema.type_tag() {
        Some("object") => ColumnType::new(JsonType::Object),
        Some("array") => ColumnType::new(JsonType::Array),
        Some(tag @ ("string" | "integer" | "number" | "boolean")) => {
            let json_type = match tag {
                "string" => JsonType::String,
                "integer" => JsonType::Integer,
                "number" => JsonType::Number,
                _ => JsonType::Boolean,
            };
            let mut ty = ColumnType::new(json_type);
            ty.format = schema.format.clone();
            if json_type == JsonType::String {
                ty.enum_values = schema.string_enum();
            }
            ty
        }
        _ => ColumnType::new(JsonType::String),
    }
}

/// Table name for a schema file: the explicit `x-schemabase.table` override,
/// else `$id`, else `title`, else the file stem, snake_cased and pluralized.
pub fn table_name_from_schema_file(path: &Path, schema: &SchemaNode) -> String {
    if let Some(explicit) = schema.ext.as_ref().and_then(|e| e.table.as_deref()) {
        return explicit.to_string();
    }
    let base = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("schema");
    let stem = base.strip_suffix(".json").unwrap_or(base);
    let source = schema
        .id
        .as_deref()
        .or(schema.title.as_deref())
        .unwrap_or(stem);
    default_table_name(source)
}
