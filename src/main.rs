use anyhow::Result;
use schemabase::{
    cli::{Cli, Commands, OutputFormat},
    compile::{compile_schema_to_ir, compile_schemas_to_ir, CompileOptions},
    emit::emitter_for,
    schema::{load_schema_dir, load_schema_file},
};

fn main() -> Result<()> {
    let cli = Cli::parse_args();

    match cli.command {
        Commands::Generate {
            schema_path,
            format,
            db,
        } => {
            let ir = if schema_path.is_dir() {
                let sources = load_schema_dir(&schema_path)?;
                compile_schemas_to_ir(&sources, None)?
            } else {
                let schema = load_schema_file(&schema_path)?;
                compile_schema_to_ir(
                    &schema,
                    &CompileOptions {
                        file: &schema_path,
                        base_dir: None,
                        registry: None,
                    },
                )?
            };

            let output = match format {
                OutputFormat::Ir => format!("{}\n", serde_json::to_string_pretty(&ir)?),
                OutputFormat::Sql => emitter_for(&db)?.emit(&ir)?,
            };
            print!("{}", output);
        }
    }

    Ok(())
}
