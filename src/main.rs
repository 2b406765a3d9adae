//! jet-factory - switchroot rootfs image builder.
//!
//! Downloads a distribution's base image, customizes it in a chroot and packs
//! it into a filesystem image, optionally laid out for hekate.

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use jet_factory::commands;
use jet_factory::config::Config;
use jet_factory::resolve::BuildOptions;
use jet_factory::BuildError;

#[derive(Parser)]
#[command(name = "jet-factory")]
#[command(about = "Switchroot Linux image builder")]
#[command(
    after_help = "QUICK START:\n  jet-factory preflight             Check host tools\n  jet-factory list                  Show buildable distributions\n  jet-factory build --distro arch   Build an image\n  jet-factory clean                 Remove staging trees"
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a distribution or variant (prompts when --distro is omitted)
    Build {
        /// Distribution, variant or alias to build
        #[arg(long, default_value = "")]
        distro: String,

        /// Target architecture
        #[arg(long = "archi", default_value = "aarch64")]
        arch: String,

        /// Package for hekate (split image + bootloader archive)
        #[arg(long)]
        hekate: bool,

        /// Install locally built packages (reserved)
        #[arg(long)]
        staging: bool,

        /// Reuse the existing staging tree, skip download and extraction
        #[arg(long)]
        skip: bool,

        /// Re-download even when a cached file exists
        #[arg(long)]
        force: bool,
    },

    /// List distributions and variants in the catalog
    List,

    /// Show information
    Show {
        #[command(subcommand)]
        what: ShowTarget,
    },

    /// Clean the work directory (default: staging trees, preserves downloads)
    Clean {
        #[command(subcommand)]
        what: Option<CleanTarget>,
    },

    /// Run preflight checks (verify host tools before build)
    Preflight {
        /// Fail if any checks fail (exit code 1)
        #[arg(long)]
        strict: bool,
    },
}

#[derive(Subcommand)]
enum ShowTarget {
    /// Show current configuration
    Config,
}

#[derive(Subcommand)]
enum CleanTarget {
    /// Clean the download cache
    Downloads,
    /// Clean everything (staging trees + downloads)
    All,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            match e.downcast_ref::<BuildError>() {
                Some(build_error) => ExitCode::from(build_error.exit_code()),
                None => ExitCode::FAILURE,
            }
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load();

    match cli.command {
        Commands::Build {
            distro,
            arch,
            hekate,
            staging,
            skip,
            force,
        } => {
            let options = BuildOptions {
                distro,
                arch,
                hekate,
                staging,
                skip,
                force,
            };
            commands::cmd_build(&config, &options)?;
        }

        Commands::List => {
            commands::cmd_list(&config)?;
        }

        Commands::Show { what } => {
            let show_target = match what {
                ShowTarget::Config => commands::ShowTarget::Config,
            };
            commands::cmd_show(show_target, &config)?;
        }

        Commands::Clean { what } => {
            let clean_target = match what {
                None => commands::CleanTarget::Staging,
                Some(CleanTarget::Downloads) => commands::CleanTarget::Downloads,
                Some(CleanTarget::All) => commands::CleanTarget::All,
            };
            commands::cmd_clean(&config, clean_target)?;
        }

        Commands::Preflight { strict } => {
            commands::cmd_preflight(&config, strict)?;
        }
    }

    Ok(())
}
