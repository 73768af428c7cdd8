// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "fornax")]
#[command(about = "Appliance image build factory for cloud regions")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new fornax.yml configuration file
    Init {
        /// Cloud region to build in
        #[arg(short, long)]
        region: Option<String>,

        /// Availability zone for scratch volumes
        #[arg(short, long)]
        zone: Option<String>,

        /// Overwrite an existing configuration file
        #[arg(short, long)]
        force: bool,
    },

    /// Force a build of one appliance, or of the whole catalog
    Build {
        /// Appliance to build (all registered appliances when omitted)
        appliance: Option<String>,
    },

    /// Run the factory daemon: nightly triggers against the catalog
    Run,

    /// Fetch the appliance catalog and write the local cache file
    SyncCatalog {
        /// Marketplace base URL (overrides the configured one)
        #[arg(short, long)]
        url: Option<String>,

        /// Output path (defaults to the configured cache path)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Generate a random alphanumeric password
    GenPassword {
        /// Minimum length
        #[arg(long, default_value_t = fornax::password::DEFAULT_MIN_LEN)]
        min: usize,

        /// Maximum length
        #[arg(long, default_value_t = fornax::password::DEFAULT_MAX_LEN)]
        max: usize,
    },
}
