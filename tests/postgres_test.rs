//! SQL emission tests over full compile output.

use serde_json::{json, Value};
use std::fs;
use std::path::Path;

use schemabase::compile::{compile_schema_to_ir, compile_schemas_to_ir, CompileOptions};
use schemabase::emit::{PostgresEmitter, SqlEmitter};
use schemabase::schema::{SchemaNode, SchemaSource};

fn write_schema(dir: &Path, name: &str, value: Value) -> SchemaSource {
    let path = dir.join(name);
    fs::write(&path, value.to_string()).expect("write schema fixture");
    SchemaSource {
        path,
        schema: SchemaNode::from_value(value).expect("fixture is a valid schema"),
    }
}

#[test]
fn test_emits_sql_for_simple_schema() {
    let schema = SchemaNode::from_value(json!({
        "$id": "User",
        "type": "object",
        "required": ["id", "email"],
        "properties": {
            "id": {"type": "string", "format": "uuid"},
            "email": {"type": "string", "format": "email", "x-schemabase": {"unique": true}}
        }
    }))
    .unwrap();

    let ir = compile_schema_to_ir(
        &schema,
        &CompileOptions {
            file: Path::new("inline"),
            base_dir: None,
            registry: None,
        },
    )
    .unwrap();
    let sql = PostgresEmitter.emit(&ir).unwrap();

    assert!(sql.contains("CREATE TABLE users"));
    assert!(sql.contains("id UUID NOT NULL PRIMARY KEY"));
    assert!(sql.contains("email TEXT NOT NULL"));
    assert!(sql.contains("CREATE UNIQUE INDEX users_email_uidx ON users (email);"));
}

#[test]
fn test_enum_types_are_emitted_before_tables() {
    let schema = SchemaNode::from_value(json!({
        "$id": "User",
        "type": "object",
        "required": ["id", "status"],
        "properties": {
            "id": {"type": "string", "format": "uuid"},
            "status": {"type": "string", "enum": ["active", "banned"]}
        }
    }))
    .unwrap();

    let ir = compile_schema_to_ir(
        &schema,
        &CompileOptions {
            file: Path::new("user.json"),
            base_dir: None,
            registry: None,
        },
    )
    .unwrap();
    let sql = PostgresEmitter.emit(&ir).unwrap();

    let type_pos = sql
        .find("CREATE TYPE users_status_enum AS ENUM ('active', 'banned');")
        .unwrap();
    let table_pos = sql.find("CREATE TABLE users").unwrap();
    assert!(type_pos < table_pos);
    assert!(sql.contains("status users_status_enum NOT NULL"));
}

#[test]
fn test_composite_key_emits_table_level_clause() {
    let dir = tempfile::tempdir().unwrap();
    let user = write_schema(
        dir.path(),
        "user.json",
        json!({
            "$id": "User",
            "type": "object",
            "required": ["id"],
            "properties": {"id": {"type": "string", "format": "uuid"}}
        }),
    );
    let tag = write_schema(
        dir.path(),
        "tag.json",
        json!({
            "$id": "Tag",
            "type": "object",
            "required": ["id"],
            "properties": {"id": {"type": "string", "format": "uuid"}}
        }),
    );
    let user_tag = write_schema(
        dir.path(),
        "user_tag.json",
        json!({
            "$id": "UserTag",
            "type": "object",
            "properties": {
                "userId": {"$ref": "./user.json"},
                "tagId": {"$ref": "./tag.json"}
            },
            "x-schemabase": {"primaryKey": ["userId", "tagId"]}
        }),
    );

    let ir = compile_schemas_to_ir(&[user, tag, user_tag], None).unwrap();
    let sql = PostgresEmitter.emit(&ir).unwrap();

    assert!(sql.contains("PRIMARY KEY (user_id, tag_id)"));
    assert!(!sql.contains("user_id UUID NOT NULL PRIMARY KEY,"));
}

#[test]
fn test_mutual_references_emit_foreign_keys_after_all_tables() {
    let dir = tempfile::tempdir().unwrap();
    let author = write_schema(
        dir.path(),
        "author.json",
        json!({
            "$id": "Author",
            "type": "object",
            "required": ["id"],
            "properties": {
                "id": {"type": "string", "format": "uuid"},
                "favoriteBookId": {"$ref": "./book.json"}
            }
        }),
    );
    let book = write_schema(
        dir.path(),
        "book.json",
        json!({
            "$id": "Book",
            "type": "object",
            "required": ["id", "authorId"],
            "properties": {
                "id": {"type": "string", "format": "uuid"},
                "authorId": {"$ref": "./author.json"}
            }
        }),
    );

    let ir = compile_schemas_to_ir(&[author, book], None).unwrap();
    let sql = PostgresEmitter.emit(&ir).unwrap();

    let create_authors = sql.find("CREATE TABLE authors").unwrap();
    let create_books = sql.find("CREATE TABLE books").unwrap();
    let fk_authors = sql
        .find("ALTER TABLE authors ADD CONSTRAINT authors_favorite_book_id_fkey")
        .unwrap();
    let fk_books = sql
        .find("ALTER TABLE books ADD CONSTRAINT books_author_id_fkey")
        .unwrap();

    assert!(fk_authors > create_authors.max(create_books));
    assert!(fk_books > create_authors.max(create_books));
    assert!(sql.contains(
        "ALTER TABLE books ADD CONSTRAINT books_author_id_fkey \
         FOREIGN KEY (author_id) REFERENCES authors (id);"
    ));
}

#[test]
fn test_nested_and_scalar_types_map_to_postgres_types() {
    let schema = SchemaNode::from_value(json!({
        "$id": "Event",
        "type": "object",
        "required": ["id", "at"],
        "properties": {
            "id": {"type": "string", "format": "uuid"},
            "at": {"type": "string", "format": "date-time"},
            "count": {"type": "integer"},
            "score": {"type": "number"},
            "active": {"type": "boolean"},
            "payload": {"type": "object"}
        }
    }))
    .unwrap();

    let ir = compile_schema_to_ir(
        &schema,
        &CompileOptions {
            file: Path::new("event.json"),
            base_dir: None,
            registry: None,
        },
    )
    .unwrap();
    let sql = PostgresEmitter.emit(&ir).unwrap();

    assert!(sql.contains("at TIMESTAMPTZ NOT NULL"));
    assert!(sql.contains("count INTEGER"));
    assert!(sql.contains("score DOUBLE PRECISION"));
    assert!(sql.contains("active BOOLEAN"));
    assert!(sql.contains("payload JSONB"));
}
