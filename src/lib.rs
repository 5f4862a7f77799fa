pub mod cli;
pub mod compile;
pub mod emit;
pub mod ir;
pub mod schema;

pub use compile::{
    compile_schema_to_ir, compile_schemas_to_ir, CompileError, CompileOptions, SchemaRegistry,
};
pub use emit::{emitter_for, EmitError, PostgresEmitter, SqlEmitter};
pub use ir::RelationalIR;
pub use schema::{
    load_schema_dir, load_schema_file, resolve_schema, LoadError, ResolveError, ResolveOptions,
    SchemaNode, SchemaSource,
};
