//! Configstore - plain-text and encrypted configuration in a local JSON file.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use configstore::cli::output;
use configstore::cli::{execute, Cli};
use configstore::error::{ConflictError, Error, NotFoundError, ProviderError, ValidationError};

fn hint(e: &Error) -> Option<&'static str> {
    match e {
        Error::File { .. } => Some("check --db, or create a store with: configstore init"),
        Error::NotFound(NotFoundError::Environment(_)) => {
            Some("list environments with: configstore package ls")
        }
        Error::NotFound(NotFoundError::Directory(_)) => {
            Some("create the package layout with: configstore package init")
        }
        Error::Conflict(ConflictError::UnknownOverrideKey { .. }) => {
            Some("set the key in the main environment first")
        }
        Error::Validation(ValidationError::MissingMasterKey) => {
            Some("pass --master-key, or --insecure for local development")
        }
        Error::Validation(ValidationError::NotText(_)) => Some("store it with --secret"),
        Error::Provider(ProviderError::Request { .. }) => {
            Some("check your AWS credentials, or retry with --ignore-role")
        }
        _ => None,
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber with env-filter support
    let filter = EnvFilter::try_from_env("CONFIGSTORE_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("configstore=debug")
        } else {
            EnvFilter::new("configstore=warn")
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).without_time().with_writer(std::io::stderr))
        .init();

    if let Err(e) = execute(cli.command, cli.ignore_role) {
        output::error(&e.to_string());
        if let Some(h) = hint(&e) {
            output::hint(h);
        }
        std::process::exit(1);
    }
}
