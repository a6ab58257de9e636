mod commands;
mod config;
mod logging;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use commands::*;
use config::GlobalArgs;

#[derive(Parser)]
#[command(name = "keel")]
#[command(version, about = "Schema-driven migrations for PostgreSQL")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the migrations directory and tracking table
    Init,

    /// Create a new migration from the current schema
    Create {
        /// Migration name (letters, digits, '_' and '-')
        name: String,
    },

    /// Run all pending migrations
    Up,

    /// Rollback the last migration
    Down,

    /// Forcefully clear the database by dropping all schema tables
    Clear,

    /// Show which migrations are applied and which are pending
    Status,

    /// Schema document tools
    Schema {
        #[command(subcommand)]
        schema_command: SchemaCommands,
    },
}

#[derive(Subcommand)]
enum SchemaCommands {
    /// Print the DDL the current schema compiles to
    Sql,

    /// Write the example blog schema to the schema path
    Example {
        /// Overwrite an existing schema file
        #[arg(long)]
        force: bool,
    },
}

impl Commands {
    /// What the command was trying to do, for error reports
    fn action(&self) -> &'static str {
        match self {
            Commands::Init => "initialize database",
            Commands::Create { .. } => "create migration",
            Commands::Up => "run migrations",
            Commands::Down => "rollback migration",
            Commands::Clear => "clear the database",
            Commands::Status => "read migration status",
            Commands::Schema { schema_command } => match schema_command {
                SchemaCommands::Sql => "compile schema",
                SchemaCommands::Example { .. } => "write example schema",
            },
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init_logging(cli.global.logging_config()) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    let action = cli.command.action();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Failed to {}: {:#}", action, e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let global = cli.global;

    match cli.command {
        Commands::Init => migrate::init(&global).await,
        Commands::Create { name } => migrate::create(&global, &name),
        Commands::Up => migrate::up(&global).await,
        Commands::Down => migrate::down(&global).await,
        Commands::Clear => migrate::clear(&global).await,
        Commands::Status => migrate::status(&global).await,
        Commands::Schema { schema_command } => match schema_command {
            SchemaCommands::Sql => schema::sql(&global),
            SchemaCommands::Example { force } => schema::example(&global, force),
        },
    }
}
