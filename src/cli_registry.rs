use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use gazette_watcher::config::ConfigArgs;
use gazette_watcher::server::metrics;
use gazette_watcher::{
    build_pipeline, PersonRegistry, RegistryAdmin, RunOutcome, RunTrigger, SqliteRegistry,
};

/// Manage the people watched for in the gazette.
#[derive(Parser, Debug)]
struct CliArgs {
    #[clap(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Registers a person with the given name and email.
    Add { name: String, email: String },

    /// Removes a person and their selection history.
    Remove { id: String },

    /// Shows every registered person.
    List,

    /// Shows the most recent selections.
    Selections {
        #[clap(long, default_value_t = 20)]
        limit: usize,
    },

    /// Runs the pipeline once, ignoring the earliest hour and today's completion.
    /// Refused while another process holds the run lease.
    RunOnce {
        /// Also run on weekends and holidays.
        #[clap(long)]
        force: bool,
    },
}

fn open_registry(config: &ConfigArgs) -> Result<SqliteRegistry> {
    let path = config.resolve_registry_db_path()?;
    SqliteRegistry::new(&path).with_context(|| format!("Failed to open registry at {:?}", path))
}

async fn run_once(config: &ConfigArgs, force: bool) -> Result<()> {
    let app_config = config.resolve()?;
    metrics::init_metrics();
    let registry = Arc::new(SqliteRegistry::new(app_config.registry_db_path())?);
    let pipeline = build_pipeline(&app_config, registry)?;

    let outcome = pipeline.run(RunTrigger::Manual { force }).await;
    println!("{}", outcome);
    if let RunOutcome::Aborted(reason) = outcome {
        bail!("Run aborted: {}", reason);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    match cli_args.command {
        Command::Add { name, email } => {
            let registry = open_registry(&cli_args.config)?;
            let person = registry.add_person(&name, &email)?;
            println!("Added {} <{}> with id {}", person.name, person.email, person.id);
        }
        Command::Remove { id } => {
            let registry = open_registry(&cli_args.config)?;
            registry.remove_person(&id)?;
            println!("Removed {}", id);
        }
        Command::List => {
            let registry = open_registry(&cli_args.config)?;
            let people = registry.list_people()?;
            if people.is_empty() {
                println!("No one registered.");
            }
            for person in people {
                println!("{}  {}  <{}>", person.id, person.name, person.email);
            }
        }
        Command::Selections { limit } => {
            let registry = open_registry(&cli_args.config)?;
            for selection in registry.get_selections(limit)? {
                println!(
                    "{}  {}  {}",
                    selection.id,
                    selection.person_id,
                    selection.selected_at.to_rfc3339()
                );
            }
        }
        Command::RunOnce { force } => run_once(&cli_args.config, force).await?,
    }
    Ok(())
}
