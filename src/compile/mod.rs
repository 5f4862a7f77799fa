//! Compilation of resolved JSON Schemas into the relational IR.
//!
//! One schema file becomes one table. Properties compile in declaration
//! order, trying three shapes in turn: cross-file reference (FK column),
//! nested object/array (JSON document column), scalar.

pub mod inference;
pub mod naming;
pub mod registry;

pub use inference::infer_enums;
pub use registry::{RegistryEntry, SchemaRegistry};

use indexmap::IndexMap;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::ir::{
    Column, ColumnType, ForeignKey, Index, JsonType, Provenance, RelationalIR, Table,
    TablePrimaryKey,
};
use crate::schema::node::{SchemaNode, SchemaSource};
use crate::schema::resolver::{
    normalize_path, resolve_schema, split_ref, ResolveError, ResolveOptions,
};

use naming::{fk_column_name, to_snake_case};
use registry::{infer_column_type, table_name_from_schema_file};

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("top-level schema must be an object (got {0})")]
    NotAnObject(String),
    #[error("schema has no properties to infer columns from")]
    NoColumns,
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

pub struct CompileOptions<'a> {
    /// Path of the schema being compiled; drives the table name, provenance,
    /// and relative ref resolution.
    pub file: &'a Path,
    /// Base directory for external refs; defaults to `file`'s directory.
    pub base_dir: Option<&'a Path>,
    /// Registry for multi-file compilation (FK table/type resolution).
    pub registry: Option<&'a SchemaRegistry>,
}

/// Compile one schema: resolve its refs, build its table, and run the enum
/// pass over the singleton model.
pub fn compile_schema_to_ir(
    schema: &SchemaNode,
    opts: &CompileOptions,
) -> Result<RelationalIR, CompileError> {
    let file_label = opts.file.display().to_string();
    let base_dir: Option<PathBuf> = opts
        .base_dir
        .map(Path::to_path_buf)
        .or_else(|| opts.file.parent().map(Path::to_path_buf));
    let resolved = resolve_schema(
        schema,
        &ResolveOptions {
            file: &file_label,
            base_dir: base_dir.as_deref(),
        },
    )?;

    let (table, foreign_keys) = compile_table(schema, &resolved, opts)?;
    let mut ir = RelationalIR {
        tables: vec![table],
        foreign_keys,
        enums: Vec::new(),
    };
    ir.enums = infer_enums(&ir);
    Ok(ir)
}

/// Compile a set of interlinked schema files: build the registry from the
/// raw schemas up front, compile each file against it in input order, then
/// run the enum pass once over the merged model.
pub fn compile_schemas_to_ir(
    sources: &[SchemaSource],
    base_dir: Option<&Path>,
) -> Result<RelationalIR, CompileError> {
    let registry = SchemaRegistry::build(sources);

    let mut tables = Vec::new();
    let mut foreign_keys = Vec::new();
    for source in sources {
        let file_label = source.path.display().to_string();
        let resolve_base: Option<PathBuf> = base_dir
            .map(Path::to_path_buf)
            .or_else(|| source.path.parent().map(Path::to_path_buf));
        let resolved = resolve_schema(
            &source.schema,
            &ResolveOptions {
                file: &file_label,
                base_dir: resolve_base.as_deref(),
            },
        )?;

        let opts = CompileOptions {
            file: &source.path,
            base_dir: None,
            registry: Some(&registry),
        };
        let (table, fks) = compile_table(&source.schema, &resolved, &opts)?;
        tables.push(table);
        foreign_keys.extend(fks);
    }

    let mut ir = RelationalIR {
        tables,
        foreign_keys,
        enums: Vec::new(),
    };
    ir.enums = infer_enums(&ir);
    Ok(ir)
}

/// Compile one resolved schema into a table plus the foreign keys implied by
/// its external references. `schema` is the raw document (its extension block
/// drives overrides); `resolved` drives columns.
pub fn compile_table(
    schema: &SchemaNode,
    resolved: &SchemaNode,
    opts: &CompileOptions,
) -> Result<(Table, Vec<ForeignKey>), CompileError> {
    if resolved.type_tag() != Some("object") {
        return Err(CompileError::NotAnObject(
            resolved.type_tag().unwrap_or("unknown").to_string(),
        ));
    }

    let table_name = table_name_from_schema_file(opts.file, schema);

    let required: HashSet<&str> = resolved
        .required
        .iter()
        .flatten()
        .map(String::as_str)
        .collect();
    let empty = IndexMap::new();
    let properties = resolved.properties.as_ref().unwrap_or(&empty);

    let pk_props = schema
        .ext
        .as_ref()
        .and_then(|e| e.primary_key.as_ref())
        .filter(|keys| !keys.is_empty());
    let pk_set: Option<HashSet<&str>> =
        pk_props.map(|keys| keys.iter().map(String::as_str).collect());

    let mut columns = Vec::new();
    let mut foreign_keys = Vec::new();
    let mut indexes = Vec::new();
    for (prop_name, prop_schema) in properties {
        let ctx = PropertyContext {
            prop_name,
            prop_schema,
            table_name: &table_name,
            required: &required,
            pk_set: pk_set.as_ref(),
            opts,
        };
        let compiled = compile_property(&ctx);
        columns.push(compiled.column);
        foreign_keys.extend(compiled.foreign_key);
        indexes.extend(compiled.indexes);
    }

    if columns.is_empty() {
        return Err(CompileError::NoColumns);
    }

    indexes.extend(infer_indexes(&table_name, resolved));

    // Composite key columns map to the *compiled* column names: external
    // refs use the FK column name, everything else its override or snake case.
    let primary_key = pk_props.map(|keys| TablePrimaryKey {
        columns: keys
            .iter()
            .map(|prop| match properties.get(prop) {
                Some(p) if p.is_external_ref() => fk_column_name(prop),
                Some(p) => p
                    .ext
                    .as_ref()
                    .and_then(|e| e.column.clone())
                    .unwrap_or_else(|| to_snake_case(prop)),
                None => to_snake_case(prop),
            })
            .collect(),
    });

    let table = Table {
        name: table_name,
        columns,
        indexes,
        primary_key,
        provenance: Provenance {
            file: opts.file.display().to_string(),
            pointer: "/".to_string(),
        },
    };
    Ok((table, foreign_keys))
}

struct PropertyContext<'a> {
    prop_name: &'a str,
    prop_schema: &'a SchemaNode,
    table_name: &'a str,
    required: &'a HashSet<&'a str>,
    pk_set: Option<&'a HashSet<&'a str>>,
    opts: &'a CompileOptions<'a>,
}

struct CompiledProperty {
    column: Column,
    foreign_key: Option<ForeignKey>,
    indexes: Vec<Index>,
}

fn compile_property(ctx: &PropertyContext) -> CompiledProperty {
    if let Some(compiled) = compile_external_ref_property(ctx) {
        return compiled;
    }
    if let Some(compiled) = compile_nested_property(ctx) {
        return compiled;
    }
    compile_scalar_property(ctx)
}

/// A key column is never nullable; otherwise nullability is the negation of
/// `required`.
fn nullable_from(ctx: &PropertyContext) -> bool {
    let is_pk = ctx.pk_set.is_some_and(|set| set.contains(ctx.prop_name));
    if is_pk {
        false
    } else {
        !ctx.required.contains(ctx.prop_name)
    }
}

fn compile_external_ref_property(ctx: &PropertyContext) -> Option<CompiledProperty> {
    let reference = ctx
        .prop_schema
        .reference
        .as_deref()
        .filter(|r| !r.starts_with('#'))?;

    let column_name = fk_column_name(ctx.prop_name);
    let nullable = nullable_from(ctx);

    let target = resolve_ref_path(reference, ctx.opts.file)
        .and_then(|path| ctx.opts.registry.and_then(|r| r.get(&path)));

    let mut ty = target
        .map(|entry| entry.primary_key.ty.clone())
        .unwrap_or_else(|| ColumnType::with_format(JsonType::String, "uuid"));
    ty.reference = Some(reference.to_string());

    let unique = ctx
        .prop_schema
        .ext
        .as_ref()
        .and_then(|e| e.unique)
        .unwrap_or(false);
    let indexes = if unique {
        vec![Index {
            name: format!("{}_{}_uidx", ctx.table_name, column_name),
            table: ctx.table_name.to_string(),
            columns: vec![column_name.clone()],
            unique: true,
        }]
    } else {
        Vec::new()
    };

    let foreign_key = target.map(|entry| ForeignKey {
        name: format!("{}_{}_fkey", ctx.table_name, column_name),
        table: ctx.table_name.to_string(),
        columns: vec![column_name.clone()],
        referenced_table: entry.table_name.clone(),
        referenced_columns: vec![entry.primary_key.column.clone()],
        on_delete: None,
        on_update: None,
    });

    Some(CompiledProperty {
        column: Column {
            name: column_name,
            ty,
            nullable,
            primary_key: None,
        },
        foreign_key,
        indexes,
    })
}

fn compile_nested_property(ctx: &PropertyContext) -> Option<CompiledProperty> {
    let json_type = match ctx.prop_schema.type_tag() {
        Some("object") => JsonType::Object,
        Some("array") => JsonType::Array,
        _ => return None,
    };
    Some(CompiledProperty {
        column: Column {
            name: column_name_for(ctx),
            ty: ColumnType::new(json_type),
            nullable: nullable_from(ctx),
            primary_key: None,
        },
        foreign_key: None,
        indexes: Vec::new(),
    })
}

fn compile_scalar_property(ctx: &PropertyContext) -> CompiledProperty {
    let nullable = nullable_from(ctx);
    let primary_key = ctx.prop_name == "id" && !nullable;
    CompiledProperty {
        column: Column {
            name: column_name_for(ctx),
            ty: infer_column_type(ctx.prop_schema),
            nullable,
            primary_key: primary_key.then_some(true),
        },
        foreign_key: None,
        indexes: Vec::new(),
    }
}

fn column_name_for(ctx: &PropertyContext) -> String {
    ctx.prop_schema
        .ext
        .as_ref()
        .and_then(|e| e.column.clone())
        .unwrap_or_else(|| to_snake_case(ctx.prop_name))
}

/// Standard index inference over the resolved top-level properties.
/// Cross-file refs are skipped here; their indexes were produced while the
/// FK column was compiled (its name can differ from the property's).
fn infer_indexes(table_name: &str, resolved: &SchemaNode) -> Vec<Index> {
    let Some(properties) = resolved.properties.as_ref() else {
        return Vec::new();
    };
    let mut indexes = Vec::new();
    for (prop_name, prop_schema) in properties {
        if prop_schema.is_external_ref() {
            continue;
        }
        let Some(ext) = prop_schema.ext.as_ref() else {
            continue;
        };
        let unique = ext.unique == Some(true);
        let index = ext.index == Some(true);
        if !unique && !index {
            continue;
        }
        let column = to_snake_case(prop_name);
        indexes.push(Index {
            name: format!(
                "{}_{}_{}",
                table_name,
                column,
                if unique { "uidx" } else { "idx" }
            ),
            table: table_name.to_string(),
            columns: vec![column],
            unique,
        });
    }
    indexes
}

/// Absolute path a cross-file `$ref` points at, resolved against the
/// referring file's directory.
fn resolve_ref_path(reference: &str, from_file: &Path) -> Option<PathBuf> {
    let (file_part, _) = split_ref(reference);
    let file_part = file_part?;
    if file_part.is_empty() {
        return None;
    }
    let dir = from_file.parent().unwrap_or_else(|| Path::new(""));
    Some(normalize_path(&dir.join(file_part)))
}
