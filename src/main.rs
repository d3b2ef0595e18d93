use clap::Parser;
use credvault::cli::commands::{getall::GetAllArgs, put::PutArgs};
use credvault::cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() {
    // Diagnostics go to stderr so they never mix with secret values.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("CREDVAULT_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Setup => credvault::cli::commands::setup::execute(&cli),
        Commands::Put {
            ref name,
            ref value,
            ref context,
            ref version,
            ref digest,
        } => credvault::cli::commands::put::execute(
            &cli,
            PutArgs {
                name,
                value,
                context,
                version: version.as_deref(),
                digest: digest.as_deref(),
            },
        ),
        Commands::Get {
            ref name,
            ref context,
            ref version,
        } => credvault::cli::commands::get::execute(&cli, name, context, version.as_deref()),
        Commands::Getall {
            ref context,
            ref version,
            ref starts_with,
            ref format,
        } => credvault::cli::commands::getall::execute(
            &cli,
            GetAllArgs {
                context,
                version: version.as_deref(),
                starts_with: starts_with.as_deref(),
                format,
            },
        ),
        Commands::Versions {
            ref name,
            ref context,
            limit,
        } => credvault::cli::commands::versions::execute(&cli, name, context, limit),
        Commands::List => credvault::cli::commands::list::execute(&cli),
        Commands::Delete {
            ref name,
            ref version,
            force,
        } => credvault::cli::commands::delete::execute(&cli, name, version.as_deref(), force),
        Commands::Config => credvault::cli::commands::config::execute(&cli),
        Commands::Completions { shell } => credvault::cli::commands::completions::execute(shell),
        Commands::Audit {
            ref name,
            last,
            since,
        } => credvault::cli::commands::audit_cmd::execute(&cli, name.as_deref(), last, since),
    };

    if let Err(e) = result {
        credvault::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}
