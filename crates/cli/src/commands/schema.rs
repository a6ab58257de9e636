use anyhow::bail;
use keel_orm::migrations::compile_schema;
use keel_orm::{example_schema, SchemaManager};

use crate::config::GlobalArgs;

/// Print the schema's DDL in dependency order without touching the database
pub fn sql(global: &GlobalArgs) -> anyhow::Result<()> {
    let manager = SchemaManager::open(&global.schema)?;
    let scripts = compile_schema(manager.schema())?;

    if scripts.is_empty() {
        tracing::warn!("Schema {} has no tables", global.schema.display());
    }
    println!("{}", scripts.join("\n\n"));
    Ok(())
}

pub fn example(global: &GlobalArgs, force: bool) -> anyhow::Result<()> {
    if global.schema.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            global.schema.display()
        );
    }

    let mut manager = SchemaManager::new(&global.schema);
    for table in example_schema().tables {
        manager.add_table(table)?;
    }
    manager.save_schema()?;

    println!("Example schema written to {}", global.schema.display());
    Ok(())
}
