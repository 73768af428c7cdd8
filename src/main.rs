// ABOUTME: Entry point for the fornax CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use fornax::build::CancelToken;
use fornax::catalog::{self, CatalogEntry};
use fornax::cloud::{CloudBackend, MemoryCloud};
use fornax::config::{self, FactoryConfig};
use fornax::error::{Error, Result};
use fornax::factory::Factory;
use fornax::password::generate_password;
use fornax::triggers::TriggerEvent;
use fornax::types::ApplianceName;
use fornax::worker::LocalRunner;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let result = run(cli).await;

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init {
            region,
            zone,
            force,
        } => {
            let cwd = env::current_dir().expect("Failed to get current directory");
            config::init_config(&cwd, region.as_deref(), zone.as_deref(), force)
        }
        Commands::Build { appliance } => {
            let config = discover_config()?;
            let entries = catalog::load_catalog(&config.catalog).await;
            let appliance = appliance
                .map(|name| {
                    ApplianceName::new(&name).map_err(|_| Error::UnknownAppliance(name.clone()))
                })
                .transpose()?;
            if let Some(name) = &appliance {
                if !entries.iter().any(|e| &e.appliance == name) {
                    return Err(Error::UnknownAppliance(name.to_string()));
                }
            }

            let factory = wire_factory(&config, &entries).await?;
            let cancel = CancelToken::new();
            let reports = factory
                .dispatch(TriggerEvent::Force { appliance }, &cancel)
                .await;

            let mut failed = 0;
            for report in &reports {
                let verdict = if report.succeeded() { "ok" } else { "failed" };
                println!("{} ({}): {verdict}", report.appliance, report.branch);
                if !report.succeeded() {
                    failed += 1;
                }
            }
            if failed > 0 {
                return Err(Error::BuildsFailed {
                    failed,
                    total: reports.len(),
                });
            }
            Ok(())
        }
        Commands::Run => {
            let config = discover_config()?;
            let entries = catalog::load_catalog(&config.catalog).await;
            let factory = wire_factory(&config, &entries).await?;
            println!(
                "fornax: {} pipelines registered, {} workers",
                factory.registrations().len(),
                factory.pool().len()
            );
            if let Some(image) = factory.base_image() {
                println!("worker base image: {image}");
            }

            let cancel = CancelToken::new();
            let stop = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    stop.cancel();
                }
            });
            factory.run_timer(&cancel).await;
            Ok(())
        }
        Commands::SyncCatalog { url, output } => {
            let config = discover_config()?;
            let url = url
                .or_else(|| config.catalog.url.clone())
                .ok_or_else(|| Error::InvalidConfig("no marketplace URL configured".into()))?;

            let username = env::var(&config.catalog.username_var).ok();
            let password = env::var(&config.catalog.password_var).ok();
            let auth = match (&username, &password) {
                (Some(u), Some(p)) => Some((u.as_str(), p.as_str())),
                _ => None,
            };

            let entries = catalog::fetch_catalog(&url, auth).await?;
            let output = output
                .map(PathBuf::from)
                .unwrap_or_else(|| config.catalog.cache_path.clone());
            catalog::write_catalog(&output, &entries)?;
            println!("wrote {} appliances to {}", entries.len(), output.display());
            Ok(())
        }
        Commands::GenPassword { min, max } => {
            if min == 0 || min > max {
                return Err(Error::InvalidConfig(format!(
                    "invalid password length range {min}..={max}"
                )));
            }
            println!("{}", generate_password(min, max));
            Ok(())
        }
    }
}

fn discover_config() -> Result<FactoryConfig> {
    let cwd = env::current_dir().expect("Failed to get current directory");
    FactoryConfig::discover(&cwd)
}

async fn wire_factory(config: &FactoryConfig, entries: &[CatalogEntry]) -> Result<Factory> {
    if !matches!(config.cloud.backend, CloudBackend::Memory) {
        return Err(Error::InvalidConfig(
            "only the in-memory cloud backend is wired into the CLI".into(),
        ));
    }
    let provider = Arc::new(MemoryCloud::new(&config.cloud));
    let runner = Arc::new(LocalRunner);
    Factory::from_config(config, entries, provider, runner).await
}
