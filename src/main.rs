//! zpack CLI - SysEx dump decoder and ZPK1 pack builder
//!
//! Command-line interface for the zpack library.

use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use env_logger::Env;
use log::{debug, error};

use zpack::cli::{commands, Cli, Commands};
use zpack::pack::EntryFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logger
    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    debug!("zpack v{}", env!("CARGO_PKG_VERSION"));

    match handle_command(cli.command) {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn handle_command(cmd: Commands) -> anyhow::Result<ExitCode> {
    match cmd {
        Commands::Pack(args) => {
            let Some(mode) = args.mode() else {
                Cli::command()
                    .error(
                        ErrorKind::MissingRequiredArgument,
                        "pack needs INPUT and --out, or --in-dir and --out-dir",
                    )
                    .exit();
            };
            commands::pack(&args, mode)
        }
        Commands::Index { dir, out, glob } => {
            commands::index(&dir, &glob, out.as_deref()).map(|_| ExitCode::SUCCESS)
        }
        Commands::InspectPreset { pack } => {
            commands::inspect_preset(&pack).map(|_| ExitCode::SUCCESS)
        }
        Commands::LayerFilters {
            dir,
            out,
            limit,
            glob,
        } => commands::layer_filters(&dir, &glob, limit, out.as_deref()).map(|_| ExitCode::SUCCESS),
        Commands::Entries {
            pack,
            record_type,
            subtype,
            hex,
        } => {
            let filter = EntryFilter {
                record_type,
                subtype,
            };
            commands::entries(&pack, filter, hex).map(|_| ExitCode::SUCCESS)
        }
        Commands::Models {
            out_dir,
            models,
            frames,
        } => commands::models(models.as_deref(), &out_dir, frames),
    }
}
