//! Smallstep Provider CLI - schemas, docs and test sweeps for the Smallstep provider

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod exit_codes;
mod suggest;

#[derive(Parser)]
#[command(name = "smallstep-provider")]
#[command(author = "Smallstep Provider Contributors")]
#[command(version)]
#[command(about = "Declarative controller for a Smallstep private PKI", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the schema of a resource or data source
    Schema {
        /// Type name, e.g. smallstep_authority (lists all types if omitted)
        type_name: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate markdown reference docs for every resource and data source
    Docs {
        /// Directory to write the docs to
        #[arg(short, long)]
        output_dir: PathBuf,
    },

    /// Describe a component of the bundled OpenAPI document
    Describe {
        /// Component name, e.g. NewAuthority (lists all components if omitted)
        component: Option<String>,
    },

    /// Delete leftover acceptance test objects from the live API
    Sweep {
        /// Name prefix of the objects to delete [env: SWEEP_PREFIX, default: tfprovider]
        #[arg(long)]
        prefix: Option<String>,

        /// Minimum age of the objects to delete, e.g. 10m [env: SWEEP_AGE, default: 1m]
        #[arg(long)]
        age: Option<String>,

        /// Also delete prefixed objects the API reports without a creation time
        #[arg(long)]
        include_undated: bool,
    },
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    let result = match cli.command {
        Commands::Schema { type_name, json } => commands::schema::run(type_name.as_deref(), json),
        Commands::Docs { output_dir } => commands::docs::run(&output_dir),
        Commands::Describe { component } => commands::describe::run(component.as_deref()),
        Commands::Sweep {
            prefix,
            age,
            include_undated,
        } => commands::sweep::run(prefix, age, include_undated).await,
    };

    if let Err(err) = result {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}
