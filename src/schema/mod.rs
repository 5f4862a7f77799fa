pub mod loader;
pub mod node;
pub mod resolver;

pub use loader::{load_schema_dir, load_schema_file, LoadError};
pub use node::{SchemaExtension, SchemaNode, SchemaSource, TypeTag};
pub use resolver::{resolve_schema, resolve_value, ResolveError, ResolveOptions};
