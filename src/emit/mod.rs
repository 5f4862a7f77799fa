pub mod postgres;

pub use postgres::PostgresEmitter;

use thiserror::Error;

use crate::ir::RelationalIR;

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("unsupported SQL dialect: {0}")]
    UnsupportedDialect(String),
}

/// One SQL dialect's serialization of the relational IR.
pub trait SqlEmitter: std::fmt::Debug {
    fn dialect(&self) -> &'static str;
    fn emit(&self, ir: &RelationalIR) -> Result<String, EmitError>;
}

/// Look up the emitter for a dialect name.
pub fn emitter_for(dialect: &str) -> Result<Box<dyn SqlEmitter>, EmitError> {
    match dialect {
        "postgres" => Ok(Box::new(PostgresEmitter)),
        other => Err(EmitError::UnsupportedDialect(other.to_string())),
    }
}
