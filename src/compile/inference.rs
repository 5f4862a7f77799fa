//! Post-pass that derives named enum types from columns restricted to a
//! closed set of string literals.

use std::collections::HashSet;

use crate::ir::{EnumType, RelationalIR};

/// Derive one `EnumType` per enum-valued column, named
/// `{table}_{column}_enum`. When two columns collide on the derived name the
/// first occurrence wins and the rest are skipped.
pub fn infer_enums(ir: &RelationalIR) -> Vec<EnumType> {
    let mut enums = Vec::new();
    let mut seen = HashSet::new();

    for table in &ir.tables {
        for column in &table.columns {
            let Some(values) = column.ty.enum_values.as_ref().filter(|v| !v.is_empty()) else {
                continue;
            };
            let name = format!("{}_{}_enum", table.name, column.name);
            if !seen.insert(name.clone()) {
                continue;
            }
            let mut deduped: Vec<String> = Vec::with_capacity(values.len());
            for value in values {
                if !deduped.contains(value) {
                    deduped.push(value.clone());
                }
            }
            enums.push(EnumType {
                name,
                values: deduped,
                provenance: table.provenance.clone(),
            });
        }
    }
    enums
}
