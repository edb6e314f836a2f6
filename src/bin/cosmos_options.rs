//! cosmos-options: inspect the Cosmos provider options a process would use.
//!
//! Usage:
//!   cosmos-options show [--config <path>]    Load options and print their derived info
//!   cosmos-options version                   Show version information
//!   cosmos-options help                      Show this help message

use std::path::PathBuf;

use anyhow::Context;
use cosmos_orm::{CosmosOptions, OptionsConfig, OptionsExtensionInfo};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let outcome = match args[1].as_str() {
        "show" => cmd_show(&args[2..]),
        "version" | "--version" | "-V" => {
            cmd_version();
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(err) = outcome {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn print_usage() {
    println!(
        r#"cosmos-options: Cosmos provider options inspector

USAGE:
    cosmos-options <COMMAND> [OPTIONS]

COMMANDS:
    show [--config <path>]      Print log fragment, service provider hash and debug info
    version                     Show version information
    help                        Show this help message

ENVIRONMENT:
    COSMOS_*                    Option overrides (COSMOS_ACCOUNT_ENDPOINT, COSMOS_DATABASE, ...)
    RUST_LOG                    Log filter (default: warn)"#
    );
}

fn cmd_version() {
    println!("cosmos-options {}", env!("CARGO_PKG_VERSION"));
}

fn config_path(args: &[String]) -> Option<PathBuf> {
    args.iter()
        .position(|arg| arg == "--config")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from)
}

fn load_options(args: &[String]) -> anyhow::Result<CosmosOptions> {
    let file = match config_path(args) {
        Some(path) => OptionsConfig::from_path(&path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => OptionsConfig::default(),
    };
    let env = OptionsConfig::from_env().context("failed to read COSMOS_* variables")?;
    let options = file
        .merge(env)
        .into_options()
        .context("invalid Cosmos options")?;
    Ok(options)
}

fn cmd_show(args: &[String]) -> anyhow::Result<()> {
    let options = load_options(args)?;
    let info = options.info();

    println!("Log fragment:          {}", info.log_fragment().trim_end());
    println!("Service provider hash: {:#018x}", info.service_provider_hash_code());
    if let Some(mode) = options.connection_mode() {
        println!("Connection mode:       {mode}");
    }

    let mut debug_info = std::collections::BTreeMap::new();
    info.populate_debug_info(&mut debug_info);
    println!();
    println!("Debug info:");
    for (label, value) in &debug_info {
        println!("  {label} = {value}");
    }
    Ok(())
}
