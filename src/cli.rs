use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "schemabase")]
#[command(version, about = "Compile JSON Schema files into relational DDL")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate DDL (or the relational IR) from a schema file or directory
    Generate {
        /// JSON Schema file, or a directory of .json schema files
        schema_path: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "sql")]
        format: OutputFormat,

        /// Target database dialect
        #[arg(long, default_value = "postgres")]
        db: String,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Emitted DDL text
    Sql,
    /// Relational IR as JSON
    Ir,
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
