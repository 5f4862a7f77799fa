//! In-memory representation of a parsed JSON Schema document.
//!
//! Only the keywords the compiler interprets are typed; everything else is
//! carried opaquely in `extra` and round-trips untouched.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// The `type` keyword: a single tag or an array of tags. Downstream code
/// only ever looks at the first tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeTag {
    One(String),
    Many(Vec<String>),
}

impl TypeTag {
    pub fn first(&self) -> Option<&str> {
        match self {
            TypeTag::One(t) => Some(t),
            TypeTag::Many(tags) => tags.first().map(String::as_str),
        }
    }
}

/// The `x-schemabase` extension block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaExtension {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(rename = "primaryKey", skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<Vec<String>>,
    #[serde(flatten, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

/// A single schema node. Recursive through `properties`, `items`, and the
/// two definition containers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaNode {
    #[serde(rename = "$id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<TypeTag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, SchemaNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaNode>>,
    /// Legacy definition container; the resolver folds it into `$defs`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definitions: Option<IndexMap<String, SchemaNode>>,
    #[serde(rename = "$defs", skip_serializing_if = "Option::is_none")]
    pub defs: Option<IndexMap<String, SchemaNode>>,
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(rename = "x-schemabase", skip_serializing_if = "Option::is_none")]
    pub ext: Option<SchemaExtension>,
    /// Unrecognized keywords, preserved but never interpreted.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SchemaNode {
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).expect("schema node serializes to JSON")
    }

    /// First `type` tag, if any.
    pub fn type_tag(&self) -> Option<&str> {
        self.schema_type.as_ref().and_then(TypeTag::first)
    }

    /// True when this node carries a `$ref` pointing outside its document.
    pub fn is_external_ref(&self) -> bool {
        matches!(&self.reference, Some(r) if !r.starts_with('#'))
    }

    /// The `enum` values when the list is non-empty and all strings.
    pub fn string_enum(&self) -> Option<Vec<String>> {
        let values = self.enum_values.as_ref()?;
        if values.is_empty() {
            return None;
        }
        values
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect()
    }
}

/// A schema paired with the path of the file it was loaded from. The unit of
/// input for multi-file compilation.
#[derive(Debug, Clone)]
pub struct SchemaSource {
    pub path: PathBuf,
    pub schema: SchemaNode,
}
