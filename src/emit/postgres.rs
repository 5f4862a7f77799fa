//! Postgres DDL emission.
//!
//! Statement order: enum types, tables, foreign-key constraints, indexes.
//! Foreign keys run as ALTER TABLE statements after every table exists, so
//! reference cycles across tables emit without ordering errors.

use crate::ir::{Column, EnumType, ForeignKey, Index, JsonType, RelationalIR, Table};

use super::{EmitError, SqlEmitter};

#[derive(Debug)]
pub struct PostgresEmitter;

impl SqlEmitter for PostgresEmitter {
    fn dialect(&self) -> &'static str {
        "postgres"
    }

    fn emit(&self, ir: &RelationalIR) -> Result<String, EmitError> {
        let mut statements = Vec::new();
        for enum_type in &ir.enums {
            statements.push(create_enum(enum_type));
        }
        for table in &ir.tables {
            statements.push(create_table(table));
        }
        for fk in &ir.foreign_keys {
            statements.push(add_foreign_key(fk));
        }
        for table in &ir.tables {
            for index in &table.indexes {
                statements.push(create_index(index));
            }
        }
        Ok(format!("{}\n", statements.join("\n\n")))
    }
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn create_enum(enum_type: &EnumType) -> String {
    let values: Vec<String> = enum_type.values.iter().map(|v| quote_literal(v)).collect();
    format!(
        "CREATE TYPE {} AS ENUM ({});",
        enum_type.name,
        values.join(", ")
    )
}

fn pg_type(table: &str, column: &Column) -> String {
    if column
        .ty
        .enum_values
        .as_ref()
        .is_some_and(|v| !v.is_empty())
    {
        return format!("{}_{}_enum", table, column.name);
    }
    match column.ty.json_type {
        JsonType::Object | JsonType::Array => "JSONB".to_string(),
        JsonType::Integer => "INTEGER".to_string(),
        JsonType::Number => "DOUBLE PRECISION".to_string(),
        JsonType::Boolean => "BOOLEAN".to_string(),
        JsonType::String => match column.ty.format.as_deref() {
            Some("uuid") => "UUID".to_string(),
            Some("date-time") => "TIMESTAMPTZ".to_string(),
            _ => "TEXT".to_string(),
        },
    }
}

fn create_table(table: &Table) -> String {
    let composite = table.primary_key.is_some();
    let mut lines: Vec<String> = table
        .columns
        .iter()
        .map(|column| {
            let mut parts = vec![format!("{} {}", column.name, pg_type(&table.name, column))];
            if !column.nullable {
                parts.push("NOT NULL".to_string());
            }
            if column.primary_key == Some(true) && !composite {
                parts.push("PRIMARY KEY".to_string());
            }
            format!("  {}", parts.join(" "))
        })
        .collect();
    if let Some(pk) = &table.primary_key {
        lines.push(format!("  PRIMARY KEY ({})", pk.columns.join(", ")));
    }
    format!("CREATE TABLE {} (\n{}\n);", table.name, lines.join(",\n"))
}

fn add_foreign_key(fk: &ForeignKey) -> String {
    let mut sql = format!(
        "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
        fk.table,
        fk.name,
        fk.columns.join(", "),
        fk.referenced_table,
        fk.referenced_columns.join(", ")
    );
    if let Some(action) = &fk.on_delete {
        sql.push_str(" ON DELETE ");
        sql.push_str(action.sql());
    }
    if let Some(action) = &fk.on_update {
        sql.push_str(" ON UPDATE ");
        sql.push_str(action.sql());
    }
    sql.push(';');
    sql
}

fn create_index(index: &Index) -> String {
    format!(
        "CREATE {}INDEX {} ON {} ({});",
        if index.unique { "UNIQUE " } else { "" },
        index.name,
        index.table,
        index.columns.join(", ")
    )
}
