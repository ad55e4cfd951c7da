//! kdm - maintain release channel manifests
//!
//! Adds newly published releases to a channel manifest such as
//! `channels-rke2.yaml`. Each entry inherits its predecessor's tables by
//! YAML reference and pins only the charts that changed.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use kdm_core::DEFAULT_PRODUCT;

mod commands;
mod error;
mod exit_codes;

const DEFAULT_MANIFEST: &str = "channels-rke2.yaml";

#[derive(Parser)]
#[command(name = "kdm")]
#[command(version)]
#[command(about = "Maintain release channel manifests", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Product tag in release versions (v1.33.2+<product>r1)
    #[arg(long, global = true, env = "KDM_PRODUCT", default_value = DEFAULT_PRODUCT)]
    product: String,

    /// Chart source configuration file (default: <config dir>/kdm/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Add releases to a channel manifest
    Channels {
        /// Channel manifest to update
        #[arg(short, long, default_value = DEFAULT_MANIFEST)]
        file: PathBuf,

        /// Release version(s) to add, in publication order
        #[arg(short, long = "release", value_delimiter = ',', required = true)]
        releases: Vec<String>,

        /// Print the updated manifest instead of writing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Print chart pins changed between a release and its predecessor
    Charts {
        /// Release version
        release: String,

        /// Release to compare against (default: resolved predecessor)
        #[arg(long)]
        previous: Option<String>,

        /// Channel manifest used as release history
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Show the release a new version follows
    Predecessor {
        /// Release version
        release: String,

        /// Channel manifest used as release history
        #[arg(short, long, default_value = DEFAULT_MANIFEST)]
        file: PathBuf,
    },
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    let result = match cli.command {
        Commands::Channels {
            file,
            releases,
            dry_run,
        } => commands::channels::run(
            &file,
            &releases,
            &cli.product,
            cli.config.as_deref(),
            dry_run,
        ),

        Commands::Charts {
            release,
            previous,
            file,
        } => commands::charts::run(
            &release,
            previous.as_deref(),
            file.as_deref(),
            &cli.product,
            cli.config.as_deref(),
        ),

        Commands::Predecessor { release, file } => {
            commands::predecessor::run(&release, &file, &cli.product)
        }
    };

    if let Err(err) = result {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}
