//! Naming conventions shared by the table compiler and the registry.

/// Convert a property or schema name to snake_case. Case boundaries become
/// underscores, as do spaces, dots, and dashes; runs collapse to one.
/// Idempotent: snake_cased input comes back unchanged.
pub fn to_snake_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 4);
    let mut prev: Option<char> = None;
    for ch in input.trim().chars() {
        let mapped = if matches!(ch, ' ' | '.' | '-') { '_' } else { ch };
        if ch.is_ascii_uppercase()
            && matches!(prev, Some(p) if p.is_ascii_lowercase() || p.is_ascii_digit())
        {
            out.push('_');
        }
        if mapped == '_' {
            if !out.ends_with('_') {
                out.push('_');
            }
        } else {
            out.push(mapped.to_ascii_lowercase());
        }
        prev = Some(ch);
    }
    out
}

/// Naive pluralization: append `s` unless the name already ends in one.
pub fn pluralize(name: &str) -> String {
    let n = name.to_lowercase();
    if n.ends_with('s') {
        n
    } else {
        format!("{n}s")
    }
}

/// Default table name derived from an `$id` or `title`.
pub fn default_table_name(id_or_title: &str) -> String {
    pluralize(&to_snake_case(id_or_title))
}

/// Column name for a cross-file reference property. A property already named
/// like a key (`authorId`, `author_id`) is snake_cased as-is; anything else
/// gets an `_id` suffix.
pub fn fk_column_name(prop_name: &str) -> String {
    if prop_name.ends_with("Id") || prop_name.ends_with("_id") {
        to_snake_case(prop_name)
    } else {
        to_snake_case(&format!("{prop_name}_id"))
    }
}
